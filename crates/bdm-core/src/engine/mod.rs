//! Concurrent dispatch/completion engine.
//!
//! Dispatcher → per-worker queue → Worker → Fetch → shared result stream → Collector.
//! Jobs are routed round-robin by `index % workers`; the Collector finishes once it has
//! as many results as the Dispatcher reports having submitted. A run-wide cancellation
//! token releases idle workers at shutdown or on a fatal input error.

mod collector;
mod control;
mod dispatcher;
mod job;
mod progress;
mod runner;
mod worker;

pub use collector::{BatchReport, Collector};
pub use control::RunControl;
pub use dispatcher::{route, Dispatcher};
pub use job::{Job, JobResult};
pub use progress::BatchProgress;
pub use runner::BatchRunner;
pub use worker::Worker;

#[cfg(test)]
pub(crate) mod test_support {
    use super::Job;
    use crate::fetch::{FetchError, FetchOutcome, SingleStreamReason, Strategy};

    pub(crate) fn job(index: usize) -> Job {
        Job {
            index,
            url: format!("http://example.invalid/{}.bin", index),
            destination: format!("/tmp/out/{}.bin", index).into(),
        }
    }

    pub(crate) fn ok(bytes: u64) -> Result<FetchOutcome, FetchError> {
        Ok(FetchOutcome {
            bytes,
            strategy: Strategy::SingleStream(SingleStreamReason::Disabled),
        })
    }
}
