//! Conversion of PDF documents to plain text
//!
//! Text is first extracted with `pdftotext`. If that yields next to nothing,
//! the document is most likely a scan, and is run through OCR instead
//! (ImageMagick's `montage` to rasterize the pages, then `tesseract`).

use crate::{
    batch::BatchSummary,
    config::ExtractConfig,
    file,
    geometry::PaperSize,
    progress::{ProgressConfig, ProgressReport, Work},
    Result,
};
use anyhow::{bail, Context};
use std::{
    ffi::OsStr,
    fmt, fs,
    path::{Path, PathBuf},
    process::Command,
};

/// Extract the text of every PDF document of the input directory
pub fn run(config: &ExtractConfig, report: &ProgressReport) -> Result<BatchSummary> {
    file::create_output_dir(&config.text_dir)?;
    let inputs = file::list_inputs(&config.pdf_dir, "pdf")?;
    let progress = report.add(
        "Extracting text from the PDFs",
        ProgressConfig::new(Work::Documents(inputs.len())),
    );
    let mut summary = BatchSummary::new("extract");
    for input in inputs {
        let result = extract_document(config, &input, &mut SystemTools);
        if let Some(method) = summary.record(&input.display().to_string(), result) {
            log::debug!("Extracted text from {} ({method})", input.display());
        }
        progress.make_progress(1);
    }
    progress.finish();
    Ok(summary)
}

/// How the text of a document was obtained
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExtractionMethod {
    /// The PDF has a text layer, which `pdftotext` could read
    TextLayer,

    /// The PDF was scanned, and its text was recognized by OCR
    Ocr(PaperSize),

    /// The PDF has no usable text layer, but its pages are not shaped like
    /// documents so OCR was not attempted
    SkippedOcr,
}
//
impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TextLayer => write!(f, "text layer"),
            Self::Ocr(paper) => write!(f, "OCR of {paper} pages"),
            Self::SkippedOcr => write!(f, "no text layer, OCR skipped"),
        }
    }
}

/// Something that runs the external text extraction tools
pub trait ToolRunner {
    /// Run `command` to process `document`, turning failures into errors
    fn run(&mut self, command: &mut Command, document: &Path) -> Result<()>;
}

/// Runs tools as child processes of this program
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTools;
//
impl ToolRunner for SystemTools {
    fn run(&mut self, command: &mut Command, document: &Path) -> Result<()> {
        run_tool(command, document)
    }
}

/// Extract the text of a single PDF document into the text directory
pub fn extract_document(
    config: &ExtractConfig,
    pdf_path: &Path,
    tools: &mut impl ToolRunner,
) -> Result<ExtractionMethod> {
    let doc_id = file::document_id(pdf_path)?;
    let text_path = config.text_dir.join(format!("{doc_id}.txt"));

    // Try to use the PDF's text layer first
    extract_text_layer(tools, pdf_path, &text_path)?;
    let text_size = fs::metadata(&text_path)
        .with_context(|| format!("checking size of {}", text_path.display()))?
        .len();
    if !needs_ocr(text_size, config.min_text_bytes) {
        return Ok(ExtractionMethod::TextLayer);
    }

    // Only OCR documents that look like regular paper documents
    let paper = PaperSize::of_pdf(pdf_path)?;
    if !paper.is_document() {
        log::info!(
            "Not running OCR on {} whose page size is {paper}",
            pdf_path.display()
        );
        return Ok(ExtractionMethod::SkippedOcr);
    }
    log::debug!(
        "Text layer of {} only has {text_size} bytes, running OCR",
        pdf_path.display()
    );
    ocr_pdf(tools, pdf_path, &text_path, &config.ocr_language)?;
    Ok(ExtractionMethod::Ocr(paper))
}

/// Truth that an extracted text is too small to be the actual document text
pub fn needs_ocr(text_size: u64, min_text_bytes: u64) -> bool {
    text_size < min_text_bytes
}

/// Extract a PDF's text layer with `pdftotext`
fn extract_text_layer(
    tools: &mut impl ToolRunner,
    pdf_path: &Path,
    text_path: &Path,
) -> Result<()> {
    tools.run(
        Command::new("pdftotext").arg(pdf_path).arg(text_path),
        pdf_path,
    )
}

/// Recognize the text of a scanned PDF
///
/// Pages are rasterized at 150 DPI into a single temporary TIFF, eight pages
/// per image tile, which tesseract then reads with the selected language.
fn ocr_pdf(
    tools: &mut impl ToolRunner,
    pdf_path: &Path,
    text_path: &Path,
    language: &str,
) -> Result<()> {
    let image = tempfile::Builder::new()
        .prefix("lausunto-ocr-")
        .suffix(".tiff")
        .tempfile()
        .context("creating temporary OCR image")?
        .into_temp_path();

    tools.run(
        Command::new("montage")
            .args(["-density", "150"])
            .arg(pdf_path)
            .args(["-mode", "Concatenate", "-tile", "1x8", "-depth", "8"])
            .arg(&*image),
        pdf_path,
    )?;

    // tesseract appends the .txt extension itself
    let output_base: PathBuf = text_path.with_extension("");
    tools.run(
        Command::new("tesseract")
            .arg(&*image)
            .arg(&output_base)
            .args([OsStr::new("-l"), OsStr::new(language), OsStr::new("quiet")]),
        pdf_path,
    )
}

/// Run an external tool to completion, turning failures into errors
fn run_tool(command: &mut Command, document: &Path) -> Result<()> {
    let program = command.get_program().to_string_lossy().into_owned();
    log::trace!("Running {command:?}");
    let output = command
        .output()
        .with_context(|| format!("failed to execute {program} for {}", document.display()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{program} returned {} for {}: {}",
            output.status,
            document.display(),
            stderr.trim()
        );
    }
    Ok(())
}
