//! Cleanup of raw extracted/OCR'd text
//!
//! Two local, stateless transformations are applied to each document:
//!
//! - Words that were split across lines by typesetting hyphenation are
//!   rejoined, while genuine compound hyphens are kept.
//! - Lines that are dominated by digits and numeric punctuation (page
//!   numbers, running dates...) are removed.

use crate::{
    batch::BatchSummary,
    config::CleanupConfig,
    file,
    progress::{ProgressConfig, ProgressReport, Work},
    Result,
};
use anyhow::Context;
use regex::{Captures, Regex};
use std::{fs, path::Path, sync::OnceLock};

/// Clean up every raw text file of the input directory
pub fn run(config: &CleanupConfig, report: &ProgressReport) -> Result<BatchSummary> {
    file::create_output_dir(&config.output_dir)?;
    let inputs = file::list_inputs(&config.input_dir, "txt")?;
    let progress = report.add(
        "Cleaning up text",
        ProgressConfig::new(Work::Documents(inputs.len())),
    );
    let mut summary = BatchSummary::new("cleanup");
    for input in inputs {
        let result = clean_file(&input, &config.output_dir);
        summary.record(&input.display().to_string(), result);
        progress.make_progress(1);
    }
    progress.finish();
    Ok(summary)
}

/// Clean up one raw text file into the output directory, under the same name
fn clean_file(input: &Path, output_dir: &Path) -> Result<()> {
    let raw = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let file_name = input
        .file_name()
        .with_context(|| format!("{} has no file name", input.display()))?;
    let output = output_dir.join(file_name);
    fs::write(&output, clean_text(&raw)).with_context(|| format!("writing {}", output.display()))
}

/// Full cleanup of a document's text
pub fn clean_text(raw: &str) -> String {
    filter_noise_lines(&merge_hyphenation(raw))
}

/// Rejoin words that were split across lines by a line-wrap hyphen
///
/// The text is scanned in a single pass for a letter or digit, a hyphen, a
/// line feed, at most one blank line, then another letter or digit. Each match
/// is replaced either by the two characters alone (line-wrap artifact) or by
/// the two characters around a hyphen (genuine compound, see
/// [`keeps_hyphen()`]).
pub fn merge_hyphenation(text: &str) -> String {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"([a-zåäöA-ZÅÄÖ0-9])-\n\n?([a-zåäöA-ZÅÄÖ0-9])")
            .expect("the hyphenation pattern should be a valid regex")
    });
    pattern
        .replace_all(text, |captures: &Captures| {
            let (before, after) = (first_char(&captures[1]), first_char(&captures[2]));
            if keeps_hyphen(before, after) {
                log::trace!("Kept compound hyphen in {before}-{after}");
                format!("{before}-{after}")
            } else {
                format!("{before}{after}")
            }
        })
        .into_owned()
}

/// Truth that a hyphen found between two characters at a line break belongs
/// to the text, rather than to the typesetting
///
/// In Finnish, a compound word whose parts meet on the same vowel is written
/// with a hyphen ("maa-alue"). A doubled character whose case or kind changes
/// across the break ("A-a", "1-1"...) is also kept as is.
pub fn keeps_hyphen(before: char, after: char) -> bool {
    fold_case(before) == fold_case(after)
        && (is_vowel(before) || CharClass::of(before) != CharClass::of(after))
}

/// Kind of character found around a hyphen
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CharClass {
    Digit,
    Lowercase,
    Uppercase,
}
//
impl CharClass {
    /// Classify a character, anything that is not a digit nor lowercase
    /// being considered uppercase
    fn of(c: char) -> Self {
        if c.is_ascii_digit() {
            Self::Digit
        } else if c.is_lowercase() {
            Self::Lowercase
        } else {
            Self::Uppercase
        }
    }
}

/// Truth that a character is a Finnish vowel, in either case
fn is_vowel(c: char) -> bool {
    matches!(fold_case(c), 'a' | 'e' | 'i' | 'o' | 'u' | 'y' | 'å' | 'ä' | 'ö')
}

/// Lowercase version of a single character
///
/// All characters matched by the hyphenation pattern have a single-character
/// lowercase form.
fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// First character of a single-character regex capture
fn first_char(capture: &str) -> char {
    capture
        .chars()
        .next()
        .expect("hyphenation captures always hold one character")
}

/// Drop lines that mostly consist of digits, whitespace and numeric
/// punctuation
///
/// Lines are split on line feeds and rejoined in order, so a trailing line
/// feed survives. Empty lines are always kept.
pub fn filter_noise_lines(text: &str) -> String {
    text.split('\n')
        .filter(|line| !is_noise_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truth that a line looks like a page number, a date or similar
/// typesetting noise
pub fn is_noise_line(line: &str) -> bool {
    let (mut length, mut numeric) = (0usize, 0usize);
    for c in line.chars() {
        length += 1;
        if c.is_ascii_digit() || c.is_whitespace() || matches!(c, '(' | ')' | '.' | ',' | '/') {
            numeric += 1;
        }
    }
    length > 0 && 2 * numeric >= length
}
