//! Units of work and their outcomes.

use std::path::PathBuf;

use crate::fetch::{FetchError, FetchOutcome};

/// One download: a source URL, its destination, and its submission index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// 0-based position among the submitted input lines.
    pub index: usize,
    pub url: String,
    pub destination: PathBuf,
}

/// Outcome of processing one job. Produced once per job by a worker.
#[derive(Debug)]
pub struct JobResult {
    pub job: Job,
    pub outcome: Result<FetchOutcome, FetchError>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.outcome.as_ref().err()
    }
}
