//! Long-lived worker bound to one queue.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::fetch::{Fetch, FetchError, FetchOutcome};

use super::job::{Job, JobResult};

pub struct Worker<F> {
    id: usize,
    queue: mpsc::Receiver<Job>,
    results: mpsc::Sender<JobResult>,
    cancel: CancellationToken,
    fetcher: Arc<F>,
}

impl<F: Fetch> Worker<F> {
    pub fn new(
        id: usize,
        queue: mpsc::Receiver<Job>,
        results: mpsc::Sender<JobResult>,
        cancel: CancellationToken,
        fetcher: Arc<F>,
    ) -> Self {
        Self {
            id,
            queue,
            results,
            cancel,
            fetcher,
        }
    }

    /// Processes jobs until cancelled or until the queue is closed and drained.
    /// Cancellation wins over a pending job; queued jobs are left unprocessed.
    /// Returns the number of jobs processed.
    pub async fn run(mut self) -> usize {
        let mut processed = 0usize;
        loop {
            let job = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!(worker = self.id, processed, "worker cancelled");
                    break;
                }
                job = self.queue.recv() => match job {
                    Some(job) => job,
                    None => {
                        tracing::debug!(worker = self.id, processed, "worker queue closed");
                        break;
                    }
                },
            };

            let outcome = fetch_blocking(Arc::clone(&self.fetcher), job.clone()).await;
            processed += 1;
            if self.results.send(JobResult { job, outcome }).await.is_err() {
                tracing::debug!(worker = self.id, "result stream closed");
                break;
            }
        }
        processed
    }
}

/// Runs the blocking fetch off the async worker threads. Errors, including a
/// panicking fetcher, become the job's outcome.
async fn fetch_blocking<F: Fetch>(fetcher: Arc<F>, job: Job) -> Result<FetchOutcome, FetchError> {
    tokio::task::spawn_blocking(move || fetcher.fetch(&job))
        .await
        .unwrap_or_else(|e| Err(FetchError::Task(e.to_string())))
}
