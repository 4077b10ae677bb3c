//! Pipeline stage configuration
//!
//! Every stage receives its configuration explicitly, so that it can be
//! pointed at any set of directories. CLI defaults reproduce the directory
//! layout used by the research project.

use crate::{AnalyzeArgs, CleanupArgs, DownloadArgs, ExtractArgs, TreebankArgs};
use std::{
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

/// Configuration of the `download` stage
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DownloadConfig {
    /// Where the filtered metadata CSV is saved
    pub metadata_path: PathBuf,

    /// Where downloaded documents are saved
    pub document_dir: PathBuf,

    /// Location of the remote metadata CSV
    pub metadata_url: Box<str>,

    /// Drafting year of the statements that we keep
    pub year: i32,

    /// Pause before each document request
    pub request_delay: Duration,

    /// Retry policy for document downloads
    pub retry: RetryPolicy,
}
//
impl DownloadConfig {
    /// Determine stage configuration from CLI arguments
    pub(crate) fn new(args: DownloadArgs) -> Self {
        let DownloadArgs {
            data_dir,
            year,
            metadata_url,
            delay_ms,
            max_retries,
        } = args;
        Self {
            metadata_path: data_dir.join("metadata.csv"),
            document_dir: data_dir.join("pdf"),
            metadata_url: metadata_url.into(),
            year,
            request_delay: Duration::from_millis(delay_ms),
            retry: RetryPolicy {
                max_retries,
                ..RetryPolicy::default()
            },
        }
    }
}

/// How transient download failures are retried
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt
    pub max_retries: u32,

    /// Backoff before the first retry, doubled on each subsequent retry
    pub initial_backoff: Duration,

    /// Bound on connection establishment and on each body read
    pub timeout: Duration,
}
//
impl RetryPolicy {
    /// Backoff to be applied before the given retry (counting from 0)
    pub fn backoff(&self, retry: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(retry)
    }
}
//
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Configuration of the `extract` stage
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtractConfig {
    /// Directory of PDF documents
    pub pdf_dir: PathBuf,

    /// Directory where raw text files are written
    pub text_dir: PathBuf,

    /// Extracted texts below this size trigger OCR
    pub min_text_bytes: u64,

    /// Tesseract language model
    pub ocr_language: Box<str>,
}
//
impl ExtractConfig {
    /// Determine stage configuration from CLI arguments
    pub(crate) fn new(args: ExtractArgs) -> Self {
        let ExtractArgs {
            pdf_dir,
            text_dir,
            min_text_bytes,
            ocr_language,
        } = args;
        Self {
            pdf_dir,
            text_dir,
            min_text_bytes,
            ocr_language: ocr_language.into(),
        }
    }
}

/// Configuration of the `cleanup` stage
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CleanupConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}
//
impl CleanupConfig {
    /// Determine stage configuration from CLI arguments
    pub(crate) fn new(args: CleanupArgs) -> Self {
        let CleanupArgs {
            input_dir,
            output_dir,
        } = args;
        Self {
            input_dir,
            output_dir,
        }
    }
}

/// Configuration of the `treebank` stage
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TreebankConfig {
    /// CoNLL-U input file
    pub input: PathBuf,

    /// Output file, with one sentence per line
    pub output: PathBuf,

    /// Sentence id prefixes of the sentences to keep
    pub prefixes: Box<[Box<str>]>,
}
//
impl TreebankConfig {
    /// Determine stage configuration from CLI arguments
    pub(crate) fn new(args: TreebankArgs) -> Self {
        let TreebankArgs {
            input,
            output_dir,
            prefixes,
        } = args;
        Self {
            input,
            output: output_dir.join("sentences.txt"),
            prefixes: prefixes.into_iter().map(String::into_boxed_str).collect(),
        }
    }
}

/// Configuration of the `analyze` stage
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AnalyzeConfig {
    /// Corpora to be analyzed, in report order
    pub corpora: Box<[CorpusSpec]>,

    /// External tagger program
    pub tagger_program: Box<str>,

    /// Arguments of the external tagger program
    pub tagger_args: Box<[Box<str>]>,

    /// Number of lemmas listed per word class
    pub top: NonZeroUsize,

    /// Output path of the comparison chart
    pub chart_path: PathBuf,
}
//
impl AnalyzeConfig {
    /// Determine stage configuration from CLI arguments
    pub(crate) fn new(args: AnalyzeArgs) -> Self {
        let AnalyzeArgs {
            corpora,
            tagger,
            tagger_args,
            top,
            chart,
        } = args;
        Self {
            corpora: corpora.into(),
            tagger_program: tagger.into(),
            tagger_args: tagger_args.into_iter().map(String::into_boxed_str).collect(),
            top,
            chart_path: chart,
        }
    }
}

/// Labeled directory of text files
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CorpusSpec {
    /// Human-readable name, used in reports and charts
    pub label: Box<str>,

    /// Directory of `.txt` files
    pub dir: PathBuf,
}
//
impl FromStr for CorpusSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((label, dir)) = s.split_once('=') else {
            return Err(format!("expected LABEL=DIRECTORY, got {s:?}"));
        };
        let label = label.trim();
        if label.is_empty() || dir.is_empty() {
            return Err(format!("corpus label and directory must not be empty in {s:?}"));
        }
        Ok(Self {
            label: label.into(),
            dir: PathBuf::from(dir),
        })
    }
}
