//! Per-job transfer errors.

use std::path::PathBuf;
use thiserror::Error;

/// Error from fetching one job. Always recorded in that job's result; never fatal to the run.
#[derive(Debug, Error)]
pub enum FetchError {
    /// libcurl reported a failure (connect, DNS, timeout, reset).
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),

    /// The server answered with a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),

    /// A range request was answered with a success status other than 206.
    #[error("range request answered with HTTP {0} instead of 206")]
    RangeNotHonored(u32),

    /// The Content-Range of a range response does not match the requested range and total.
    #[error("Content-Range mismatch: requested {requested}, got {}", .received.as_deref().unwrap_or("none"))]
    RangeMismatch {
        requested: String,
        received: Option<String>,
    },

    /// Transfer ended with fewer bytes than expected.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },

    /// The body was longer than the requested range.
    #[error("response body exceeds the expected {expected} bytes")]
    Oversized { expected: u64 },

    /// Creating, writing, syncing, or renaming the destination failed.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// One sub-range of a segmented fetch failed.
    #[error("segment {index} ({range}): {source}")]
    Segment {
        index: usize,
        range: String,
        #[source]
        source: Box<FetchError>,
    },

    /// The sub-range was stopped because a sibling range already failed.
    #[error("abandoned after another segment failed")]
    Abandoned,

    /// The blocking fetch task panicked or was cancelled by the runtime.
    #[error("fetch task failed: {0}")]
    Task(String),
}

impl FetchError {
    pub(crate) fn storage(path: &std::path::Path, source: std::io::Error) -> Self {
        FetchError::Storage {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True if libcurl gave up because the request timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        match self {
            FetchError::Curl(e) => e.is_operation_timedout(),
            FetchError::Segment { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
