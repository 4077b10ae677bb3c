//! Corpus preparation and exploratory analysis for a study of Finnish
//! parliamentary expert statements ("asiantuntijalausunnot"), compared against
//! blog and forum text from the UD Finnish-TDT treebank.
//!
//! The expert statements are published by the Finnish Parliament at
//! <https://avoindata.eduskunta.fi>. Each subcommand of this program is one
//! stage of the pipeline, reading and writing a directory of files:
//!
//! `download` → `extract` → `cleanup` → (`treebank`) → `analyze`

mod acquire;
mod batch;
mod cleanup;
mod config;
mod conllu;
mod extract;
mod file;
mod geometry;
mod language;
mod plot;
mod progress;
mod report;
mod stats;
mod tagger;
mod top;
mod treebank;

use crate::{
    config::{
        AnalyzeConfig, CleanupConfig, CorpusSpec, DownloadConfig, ExtractConfig, TreebankConfig,
    },
    progress::ProgressReport,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::{num::NonZeroUsize, path::PathBuf};

/// Build and analyze a corpus of Finnish expert statements
#[derive(Parser, Debug)]
#[command(version, author)]
struct Args {
    /// Pipeline stage to run
    #[command(subcommand)]
    command: Command,
}
//
impl Args {
    /// Decode and validate CLI arguments
    pub fn parse_and_check() -> Result<Self> {
        // Decode CLI arguments
        let args = Args::parse();

        // Check CLI arguments for basic sanity
        match &args.command {
            Command::Download(download) => {
                anyhow::ensure!(
                    (EARLIEST_STATEMENT_YEAR..=LATEST_STATEMENT_YEAR).contains(&download.year),
                    "the expert statement dataset only covers years \
                     {EARLIEST_STATEMENT_YEAR} to {LATEST_STATEMENT_YEAR}"
                );
            }
            Command::Extract(extract) => {
                anyhow::ensure!(
                    !extract.ocr_language.is_empty(),
                    "an OCR language must be specified"
                );
            }
            Command::Cleanup(cleanup) => {
                anyhow::ensure!(
                    cleanup.input_dir != cleanup.output_dir,
                    "cleaned texts must not overwrite the raw texts"
                );
            }
            Command::Treebank(treebank) => {
                anyhow::ensure!(
                    treebank.prefixes.iter().all(|prefix| !prefix.is_empty()),
                    "sentence id prefixes must not be empty"
                );
            }
            Command::Analyze(analyze) => {
                anyhow::ensure!(
                    !analyze.corpora.is_empty(),
                    "at least one corpus must be analyzed"
                );
            }
        }
        Ok(args)
    }
}

/// Pipeline stages
#[derive(Subcommand, Debug)]
enum Command {
    /// Download expert statement metadata and PDF documents
    Download(DownloadArgs),

    /// Convert downloaded PDFs to plain text, with OCR for scanned documents
    Extract(ExtractArgs),

    /// Repair line-wrap hyphenation and drop page number lines
    Cleanup(CleanupArgs),

    /// Derive the blog corpus from the UD Finnish-TDT treebank
    Treebank(TreebankArgs),

    /// Tag and lemmatize the corpora, report frequencies and plot them
    Analyze(AnalyzeArgs),
}

/// Arguments of the `download` stage
#[derive(clap::Args, Debug)]
struct DownloadArgs {
    /// Directory where metadata.csv and the pdf/ subdirectory are written
    #[arg(short, long, default_value = "data/asiantuntijalausunnot")]
    data_dir: PathBuf,

    /// Only keep statements that were drafted on this year
    #[arg(short, long, default_value = "2018")]
    year: i32,

    /// Location of the expert statement metadata CSV
    #[arg(long, default_value = acquire::METADATA_URL)]
    metadata_url: String,

    /// Pause before each document request, in milliseconds
    ///
    /// The open data service is a public resource, please be gentle with it.
    #[arg(long, default_value = "200")]
    delay_ms: u64,

    /// Maximal number of retries for a document on transient server errors
    #[arg(long, default_value = "3")]
    max_retries: u32,
}

/// Arguments of the `extract` stage
#[derive(clap::Args, Debug)]
struct ExtractArgs {
    /// Directory of downloaded PDF documents
    #[arg(long, default_value = "data/asiantuntijalausunnot/pdf")]
    pdf_dir: PathBuf,

    /// Directory where raw text files are written
    #[arg(long, default_value = "data/asiantuntijalausunnot/text_orig")]
    text_dir: PathBuf,

    /// Extracted text files smaller than this are considered scanned, and
    /// their PDF goes through OCR instead
    #[arg(long, default_value = "100")]
    min_text_bytes: u64,

    /// Tesseract language model used for OCR
    #[arg(long, default_value = "fin")]
    ocr_language: String,
}

/// Arguments of the `cleanup` stage
#[derive(clap::Args, Debug)]
struct CleanupArgs {
    /// Directory of raw text files
    #[arg(long, default_value = "data/asiantuntijalausunnot/text_orig")]
    input_dir: PathBuf,

    /// Directory where cleaned text files are written
    #[arg(long, default_value = "data/asiantuntijalausunnot/text")]
    output_dir: PathBuf,
}

/// Arguments of the `treebank` stage
#[derive(clap::Args, Debug)]
struct TreebankArgs {
    /// CoNLL-U treebank file
    #[arg(
        long,
        default_value = "data/blogit/UD_Finnish-TDT/fi_tdt-ud-train.conllu"
    )]
    input: PathBuf,

    /// Directory where sentences.txt is written
    #[arg(long, default_value = "data/blogit/text")]
    output_dir: PathBuf,

    /// Sentence id prefixes of the treebank sections to keep
    ///
    /// In UD Finnish-TDT, "b" marks blog posts and "f" marks forum posts.
    #[arg(long = "prefix", default_values = ["b", "f"])]
    prefixes: Vec<String>,
}

/// Arguments of the `analyze` stage
#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    /// Corpus to analyze, as LABEL=DIRECTORY (can be repeated)
    #[arg(
        long = "corpus",
        default_values = [
            "Expert statements=data/asiantuntijalausunnot/text",
            "Blogs=data/blogit/text",
        ]
    )]
    corpora: Vec<CorpusSpec>,

    /// Tagger program, which must read raw text on stdin and write CoNLL-U
    /// on stdout
    #[arg(long, default_value = "udpipe")]
    tagger: String,

    /// Argument passed to the tagger program (can be repeated)
    #[arg(
        long = "tagger-arg",
        allow_hyphen_values = true,
        default_values = [
            "--tokenize",
            "--tag",
            "models/finnish-tdt-ud-2.5-191206.udpipe",
        ]
    )]
    tagger_args: Vec<String>,

    /// Number of lemmas listed per word class
    #[arg(long, default_value = "10")]
    top: NonZeroUsize,

    /// Where the part-of-speech comparison chart is saved
    #[arg(long, default_value = "images/posfreq.svg")]
    chart: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up logging
    setup_logging().map_err(|e| anyhow::format_err!("{e}"))?;

    // Decode CLI arguments
    let args = Args::parse_and_check()?;

    // Set up progress reporting
    let report = ProgressReport::new();

    // Run the requested pipeline stage
    match args.command {
        Command::Download(args) => {
            let config = DownloadConfig::new(args);
            let summary = acquire::run(&config, &report).await?;
            println!("{summary}");
        }
        Command::Extract(args) => {
            let config = ExtractConfig::new(args);
            let summary = run_blocking(move || extract::run(&config, &report)).await?;
            println!("{summary}");
        }
        Command::Cleanup(args) => {
            let config = CleanupConfig::new(args);
            let summary = run_blocking(move || cleanup::run(&config, &report)).await?;
            println!("{summary}");
        }
        Command::Treebank(args) => {
            let config = TreebankConfig::new(args);
            let num_sentences = run_blocking(move || treebank::run(&config)).await?;
            println!("Extracted {num_sentences} sentences from the treebank");
        }
        Command::Analyze(args) => {
            let config = AnalyzeConfig::new(args);
            run_blocking(move || report::run(&config, &report)).await?;
        }
    }
    Ok(())
}

/// Run a synchronous pipeline stage outside of the async executor
async fn run_blocking<T: Send + 'static>(
    stage: impl FnOnce() -> Result<T> + Send + 'static,
) -> Result<T> {
    tokio::task::spawn_blocking(stage)
        .await
        .context("running a pipeline stage")?
}

/// Use anyhow for Result type erasure
pub use anyhow::Result;

/// First year covered by the expert statement dataset
pub const EARLIEST_STATEMENT_YEAR: i32 = 2015;

/// Last year covered by the expert statement dataset
pub const LATEST_STATEMENT_YEAR: i32 = 2019;

/// Set up logging
fn setup_logging() -> syslog::Result<()> {
    syslog::init(
        syslog::Facility::LOG_USER,
        if cfg!(feature = "log-trace") {
            LevelFilter::Trace
        } else if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        None,
    )
}
