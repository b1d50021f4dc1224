//! Run-wide cancellation.
//!
//! One token per run, shared by every worker. Cancelling releases idle workers; a
//! worker in the middle of a fetch finishes (or times out) before it notices.

use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct RunControl {
    token: CancellationToken,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle observed by a worker.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Assert the signal. Idempotent; never reset within a run.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            tracing::debug!("cancelling run");
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
