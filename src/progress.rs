//! Progress reporting infrastructure

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::{
    borrow::Cow,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// CLI progress report of ongoing pipeline stages
///
/// To avoid corrupted terminal output, you should not write anything to stdout
/// or stderr yourself as long as a report is being displayed. Please use logs
/// for debug messages, and print stage results once the bars are gone.
#[derive(Clone, Debug, Default)]
pub struct ProgressReport(MultiProgress);
//
impl ProgressReport {
    /// Prepare to report progress on the cli
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare to report on a batch of documents
    pub fn add(
        &self,
        what: impl Into<Cow<'static, str>>,
        config: ProgressConfig,
    ) -> ProgressTracker {
        let ProgressConfig {
            initial_work,
            can_add_work,
        } = config;
        let style_trailer = match initial_work {
            Work::Documents(_) => "{pos}/{len} ({eta} left)",
            Work::Bytes(_) => "{decimal_bytes}/{decimal_total_bytes} ({decimal_bytes_per_sec})",
        };
        let bar = ProgressBar::new(initial_work.into())
            .with_prefix(what.into())
            .with_style(
                ProgressStyle::with_template(&format!("{{prefix}} {{wide_bar}} {style_trailer}"))
                    .expect("all styles above should be valid indicatif styles"),
            );
        let added = u64::from(initial_work) > 0;
        if added {
            self.0.add(bar.clone());
        }
        ProgressTracker {
            bar,
            report: self.0.clone(),
            added: Arc::new(AtomicBool::new(added)),
            upcoming: Arc::new(AtomicBool::new(can_add_work)),
        }
    }
}

/// Progress bar configuration
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ProgressConfig {
    /// Initial length of the progress bar
    initial_work: Work,

    /// Can add more work after initial configuration
    can_add_work: bool,
}
//
impl ProgressConfig {
    /// Default configuration, with some initial amount of work
    pub fn new(initial_work: Work) -> Self {
        Self {
            initial_work,
            can_add_work: false,
        }
    }

    /// Enable addition of work after initial configuration
    pub fn allow_adding_work(self) -> Self {
        Self {
            can_add_work: true,
            ..self
        }
    }
}

/// Work whose progression can be tracked
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Work {
    /// Documents to be processed
    Documents(usize),

    /// Bytes to be transferred
    Bytes(u64),
}
//
impl From<Work> for u64 {
    fn from(value: Work) -> Self {
        match value {
            Work::Documents(d) => d as u64,
            Work::Bytes(b) => b,
        }
    }
}

/// Mechanism to track progress
#[derive(Clone, Debug)]
pub struct ProgressTracker {
    /// Progress bar for this specific stage
    bar: ProgressBar,

    /// Underlying progress report
    report: MultiProgress,

    /// Truth that the progress bar has already been added to the report
    added: Arc<AtomicBool>,

    /// Truth that more work can still be added to this progress bar
    upcoming: Arc<AtomicBool>,
}
//
impl ProgressTracker {
    /// Show that a certain amount of progress has been made
    pub fn make_progress(&self, progress: u64) {
        // Track progress
        self.bar.inc(progress);
        let current = self.bar.position();
        let max = self.bar.length().unwrap_or(0);

        // Hide progress bar once done
        if current >= max && !self.upcoming.load(Ordering::Acquire) {
            self.finish();
        }
    }

    /// Increment the amount of progress that remains to be done
    ///
    /// Note that this operation is disabled by default, and you must enable it
    /// in [`ProgressConfig`]. If you use it, call `done_adding_work()` once you
    /// know no further work will be coming.
    pub fn add_work(&self, remaining: u64) {
        assert!(
            self.upcoming.load(Ordering::Acquire),
            "should not add work after done_adding_work"
        );
        if remaining > 0 && !self.added.swap(true, Ordering::AcqRel) {
            self.report.add(self.bar.clone());
        }
        self.bar.inc_length(remaining);
    }

    /// Promise that add_work will not be called anymore
    ///
    /// This allows for the progress bar to be hidden once full.
    pub fn done_adding_work(&self) {
        assert!(
            self.upcoming.swap(false, Ordering::Release),
            "should only need to freeze remaining work once"
        );
        if self.bar.position() >= self.bar.length().unwrap_or(0) {
            self.finish();
        }
    }

    /// Hide the progress bar, even if not all work has been done
    ///
    /// Batch stages that stop early call this so that their final report is
    /// not mixed with a stale bar.
    pub fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
            self.report.remove(&self.bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_are_hidden_once_done() {
        let report = ProgressReport::new();
        let documents = report.add("documents", ProgressConfig::new(Work::Documents(2)));
        documents.make_progress(1);
        assert!(!documents.bar.is_finished());
        documents.make_progress(1);
        assert!(documents.bar.is_finished());

        // Growing bars stay up until no more work can come
        let bytes = report.add(
            "bytes",
            ProgressConfig::new(Work::Bytes(0)).allow_adding_work(),
        );
        bytes.add_work(10);
        bytes.make_progress(10);
        assert!(!bytes.bar.is_finished());
        bytes.done_adding_work();
        assert!(bytes.bar.is_finished());
    }
}
