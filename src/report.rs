//! Run result aggregation and delivery.

use crate::fetch::FetchTask;
use crate::types::{FailureCode, FetchOutcome};
use std::path::PathBuf;

/// Receives the result of a completed run.
///
/// Each method is called at most once per run: `on_success` only when at
/// least one sheet was saved, `on_failure` only when at least one failed.
/// An empty run calls neither.
pub trait ReportSink: Send + Sync {
    /// Paths of the saved sheets, in submission order.
    fn on_success(&self, paths: &[PathBuf]);

    /// Failure codes of the failed sheets, in submission order.
    fn on_failure(&self, codes: &[FailureCode]);
}

/// Sink that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ReportSink for NoopSink {
    fn on_success(&self, _paths: &[PathBuf]) {}

    fn on_failure(&self, _codes: &[FailureCode]) {}
}

/// Aggregated result of one run, ordered by submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// `(sheet name, written path)` for each saved sheet.
    pub successes: Vec<(String, PathBuf)>,
    /// `(sheet name, terminal outcome)` for each failed sheet.
    pub failures: Vec<(String, FetchOutcome)>,
}

impl RunReport {
    /// Partitions terminal tasks into successes and failures, keeping their order.
    pub fn aggregate(tasks: impl IntoIterator<Item = FetchTask>) -> Self {
        let mut report = RunReport::default();
        for task in tasks {
            let name = task.descriptor.name().to_string();
            match task.outcome {
                FetchOutcome::Success(path) => report.successes.push((name, path)),
                outcome => report.failures.push((name, outcome)),
            }
        }
        report
    }

    /// Number of sheets covered by the report.
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn success_paths(&self) -> Vec<PathBuf> {
        self.successes.iter().map(|(_, path)| path.clone()).collect()
    }

    pub fn failure_codes(&self) -> Vec<FailureCode> {
        self.failures
            .iter()
            .filter_map(|(_, outcome)| outcome.failure_code())
            .collect()
    }

    /// Hands the report to `sink`, skipping empty halves.
    pub fn deliver(&self, sink: &dyn ReportSink) {
        if !self.failures.is_empty() {
            sink.on_failure(&self.failure_codes());
        }
        if !self.successes.is_empty() {
            sink.on_success(&self.success_paths());
        }
    }
}
