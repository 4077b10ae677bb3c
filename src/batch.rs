//! Skip-and-continue bookkeeping for batch stages
//!
//! A failure on one document never stops a batch. Instead, the failure is
//! logged, recorded here, and the stage moves on to the next document.

use std::fmt;

/// Outcome tally of one batch stage
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchSummary {
    /// Human-readable stage name, used in logs and in the final report
    stage: &'static str,

    /// Number of documents that went through the stage
    succeeded: usize,

    /// Documents that were skipped, with the reason why
    skipped: Vec<(Box<str>, Box<str>)>,
}
//
impl BatchSummary {
    /// Start tallying a batch stage
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            succeeded: 0,
            skipped: Vec::new(),
        }
    }

    /// Record the outcome of processing one document
    ///
    /// Successful results are passed through, errors are logged and
    /// recorded as a skipped document.
    pub fn record<T>(&mut self, document: &str, result: crate::Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.succeeded += 1;
                Some(value)
            }
            Err(e) => {
                log::warn!("{}: skipping {document}: {e:#}", self.stage);
                self.skipped.push((document.into(), format!("{e:#}").into()));
                None
            }
        }
    }

    /// Number of documents that went through the stage
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Documents that were skipped, with the reason why
    pub fn skipped(&self) -> &[(Box<str>, Box<str>)] {
        &self.skipped
    }
}
//
impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} processed, {} skipped",
            self.stage,
            self.succeeded,
            self.skipped.len()
        )?;
        for (document, reason) in &self.skipped {
            write!(f, "\n  {document}: {reason}")?;
        }
        Ok(())
    }
}
