//! Run progress snapshots sent by the collector.

/// Snapshot after each collected result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// Results collected so far.
    pub finished: usize,
    /// Collected results that carry an error.
    pub failed: usize,
    /// Jobs submitted; `None` until the dispatcher has read all input.
    pub total: Option<usize>,
}

impl BatchProgress {
    /// Fraction complete in [0.0, 1.0], once the total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.total.map(|total| {
            if total == 0 {
                1.0
            } else {
                (self.finished as f64 / total as f64).min(1.0)
            }
        })
    }
}
