//! Fetch strategy for one job.
//!
//! With segmented fetching enabled and more than one connection, a HEAD probe checks
//! for range support; if present the resource is split into one range per connection
//! and fetched concurrently. Otherwise, or when any range fails, a single-stream GET
//! downloads the whole body. Both strategies write through a `.part` temp file so the
//! destination only ever holds the bytes of the strategy that succeeded.

mod easy;
mod error;
pub mod probe;
mod segmented;
mod single;

use std::path::Path;
use std::time::Duration;

use crate::engine::Job;
use crate::segmenter;
use crate::storage::StorageWriter;

pub use error::FetchError;
pub use probe::ProbeResult;

/// Transfer parameters, fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Upper bound for each HTTP request (probe, range, or full GET).
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// Try the segmented strategy first.
    pub segmented: bool,
    /// Connections (and ranges) per segmented fetch.
    pub connections: usize,
}

impl FetchOptions {
    pub fn segmented_enabled(&self) -> bool {
        self.segmented && self.connections > 1
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        crate::config::RunOptions::default().fetch_options()
    }
}

/// Why a job went down the single-stream path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingleStreamReason {
    /// Segmented fetching is off, or there is only one connection.
    Disabled,
    /// The HEAD probe itself failed (e.g. HEAD not allowed).
    ProbeFailed(String),
    /// No `Accept-Ranges: bytes`.
    NoRangeSupport,
    /// No usable `Content-Length`.
    UnknownLength,
    /// `Content-Length: 0`; there is nothing to split.
    EmptyResource,
    /// The segmented attempt failed; carries its error.
    SegmentedFailed(String),
}

/// Strategy that produced the destination file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    Segmented { segments: usize },
    SingleStream(SingleStreamReason),
}

/// A completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub bytes: u64,
    pub strategy: Strategy,
}

/// Produces a job's destination file. Called on a blocking thread, one job at a time per worker.
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, job: &Job) -> Result<FetchOutcome, FetchError>;
}

impl<F> Fetch for F
where
    F: Fn(&Job) -> Result<FetchOutcome, FetchError> + Send + Sync + 'static,
{
    fn fetch(&self, job: &Job) -> Result<FetchOutcome, FetchError> {
        self(job)
    }
}

/// libcurl-backed fetcher implementing segmented-then-single-stream.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    opts: FetchOptions,
}

enum Attempt {
    Done(FetchOutcome),
    Skipped(SingleStreamReason),
}

impl HttpFetcher {
    pub fn new(opts: FetchOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.opts
    }

    fn try_segmented(&self, job: &Job) -> Result<Attempt, FetchError> {
        let probe = match probe::probe(&job.url, &self.opts) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!(job = job.index, error = %e, "range probe failed");
                return Ok(Attempt::Skipped(SingleStreamReason::ProbeFailed(e.to_string())));
            }
        };
        if !probe.accept_ranges {
            return Ok(Attempt::Skipped(SingleStreamReason::NoRangeSupport));
        }
        let Some(total) = probe.segmentable_length() else {
            let reason = if probe.content_length == Some(0) {
                SingleStreamReason::EmptyResource
            } else {
                SingleStreamReason::UnknownLength
            };
            return Ok(Attempt::Skipped(reason));
        };

        let ranges = segmenter::split_range(total, self.opts.connections);
        tracing::debug!(job = job.index, total, segments = ranges.len(), "segmented fetch");
        let bytes =
            segmented::fetch_segmented(&job.url, &job.destination, total, &ranges, &self.opts)?;
        Ok(Attempt::Done(FetchOutcome {
            bytes,
            strategy: Strategy::Segmented {
                segments: ranges.len(),
            },
        }))
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, job: &Job) -> Result<FetchOutcome, FetchError> {
        let reason = if self.opts.segmented_enabled() {
            match self.try_segmented(job) {
                Ok(Attempt::Done(outcome)) => return Ok(outcome),
                Ok(Attempt::Skipped(reason)) => reason,
                Err(e) => {
                    tracing::warn!(
                        job = job.index,
                        url = %job.url,
                        error = %e,
                        "segmented fetch failed, falling back to single stream"
                    );
                    SingleStreamReason::SegmentedFailed(e.to_string())
                }
            }
        } else {
            SingleStreamReason::Disabled
        };

        let bytes = single::fetch_single(&job.url, &job.destination, &self.opts)?;
        Ok(FetchOutcome {
            bytes,
            strategy: Strategy::SingleStream(reason),
        })
    }
}

/// Finish a transfer: on success sync and rename the temp file onto `destination`;
/// on failure remove the temp file and return the transfer error.
fn commit<T>(
    writer: StorageWriter,
    destination: &Path,
    outcome: Result<T, FetchError>,
) -> Result<T, FetchError> {
    match outcome {
        Ok(value) => {
            writer
                .sync()
                .map_err(|e| FetchError::storage(writer.temp_path(), e))?;
            let temp = writer.temp_path().to_path_buf();
            writer
                .finalize(destination)
                .map_err(|e| FetchError::storage(&temp, e))?;
            Ok(value)
        }
        Err(e) => {
            let temp = writer.temp_path().to_path_buf();
            if let Err(rm) = writer.discard() {
                tracing::debug!(path = %temp.display(), error = %rm, "could not remove temp file");
            }
            Err(e)
        }
    }
}
