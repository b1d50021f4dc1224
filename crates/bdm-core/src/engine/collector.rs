//! Result collection and completion detection.

use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};

use crate::fetch::FetchError;

use super::job::JobResult;
use super::progress::BatchProgress;

/// Every result of a completed run, ordered by job index.
#[derive(Debug, Default)]
pub struct BatchReport {
    results: Vec<JobResult>,
}

impl BatchReport {
    fn new(mut results: Vec<JobResult>) -> Self {
        results.sort_by_key(|r| r.job.index);
        Self { results }
    }

    pub fn results(&self) -> &[JobResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<JobResult> {
        self.results
    }

    pub fn submitted(&self) -> usize {
        self.results.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.submitted() - self.succeeded()
    }

    /// True when no job failed (vacuously true for an empty run).
    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&JobResult, &FetchError)> {
        self.results
            .iter()
            .filter_map(|r| r.error().map(|e| (r, e)))
    }
}

/// Single reader of the shared result stream.
pub struct Collector {
    results: mpsc::Receiver<JobResult>,
    submitted: oneshot::Receiver<usize>,
    progress: Option<mpsc::Sender<BatchProgress>>,
}

impl Collector {
    /// `submitted` delivers the final job count once the dispatcher has read all input.
    pub fn new(
        results: mpsc::Receiver<JobResult>,
        submitted: oneshot::Receiver<usize>,
        progress: Option<mpsc::Sender<BatchProgress>>,
    ) -> Self {
        Self {
            results,
            submitted,
            progress,
        }
    }

    /// Reads results in arrival order until their count equals the submitted count.
    /// Failed jobs are logged and counted; they never stop collection.
    pub async fn collect(mut self) -> Result<BatchReport> {
        let mut total: Option<usize> = None;
        let mut collected: Vec<JobResult> = Vec::new();
        let mut failed = 0usize;
        let mut stream_closed = false;

        loop {
            if let Some(total) = total {
                if collected.len() == total {
                    break;
                }
                if stream_closed {
                    anyhow::bail!(
                        "result stream closed after {} of {} results",
                        collected.len(),
                        total
                    );
                }
            }

            tokio::select! {
                count = &mut self.submitted, if total.is_none() => {
                    let count = count.context("dispatcher stopped without reporting a job count")?;
                    tracing::debug!(submitted = count, collected = collected.len(), "job count received");
                    total = Some(count);
                }
                result = self.results.recv(), if !stream_closed => {
                    let Some(result) = result else {
                        stream_closed = true;
                        continue;
                    };
                    match &result.outcome {
                        Ok(outcome) => tracing::info!(
                            job = result.job.index,
                            bytes = outcome.bytes,
                            path = %result.job.destination.display(),
                            "download finished"
                        ),
                        Err(e) => {
                            failed += 1;
                            tracing::warn!(
                                job = result.job.index,
                                url = %result.job.url,
                                error = %e,
                                "download failed"
                            );
                        }
                    }
                    collected.push(result);
                    if let Some(tx) = &self.progress {
                        let _ = tx
                            .send(BatchProgress {
                                finished: collected.len(),
                                failed,
                                total,
                            })
                            .await;
                    }
                }
            }
        }

        Ok(BatchReport::new(collected))
    }
}
