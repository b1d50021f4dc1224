//! Turns input lines into jobs and routes them to worker queues.

use anyhow::{Context, Result};
use std::io;
use tokio::sync::mpsc;

use crate::naming::Namer;

use super::job::Job;

/// Worker queue for the job with sequence index `index`: static round-robin.
pub fn route(index: usize, workers: usize) -> usize {
    index % workers
}

/// Owns the sending side of every worker queue. Consumed by `dispatch`; dropping it
/// closes the queues, so workers exit once they drain what they were given.
pub struct Dispatcher {
    queues: Vec<mpsc::Sender<Job>>,
    namer: Namer,
}

impl Dispatcher {
    pub fn new(queues: Vec<mpsc::Sender<Job>>, namer: Namer) -> Result<Self> {
        if queues.is_empty() {
            anyhow::bail!("dispatcher needs at least one worker queue");
        }
        Ok(Self { queues, namer })
    }

    /// Reads `lines` in order, skipping blank ones, and sends job `i` to queue `i % P`.
    /// Blocks while the target queue is full, so call it from a blocking thread.
    ///
    /// Returns the number of jobs submitted. A read error aborts dispatch: it is fatal
    /// to the whole run.
    pub fn dispatch<I>(mut self, lines: I) -> Result<usize>
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let workers = self.queues.len();
        let mut submitted = 0usize;

        for (line_no, line) in lines.into_iter().enumerate() {
            let line = line.with_context(|| format!("failed to read input line {}", line_no + 1))?;
            let url = line.trim();
            if url.is_empty() {
                continue;
            }

            let index = submitted;
            let job = Job {
                index,
                url: url.to_string(),
                destination: self.namer.destination(index, url),
            };
            let worker = route(index, workers);
            tracing::info!(job = index, worker, url = %job.url, "downloading");
            self.queues[worker]
                .blocking_send(job)
                .map_err(|_| anyhow::anyhow!("worker {} stopped before job {} was queued", worker, index))?;
            submitted += 1;
        }

        Ok(submitted)
    }
}
