//! Byte range splitting for segmented fetches.

use std::fmt;

/// A byte range [start, end) (half-open) of a remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Range in the form libcurl expects: `start-end` with an inclusive end, no `bytes=` prefix.
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end.saturating_sub(1))
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bytes={}-{}", self.start, self.end.saturating_sub(1))
    }
}

/// Splits `[0, total)` into `parts` contiguous, non-overlapping ranges of near-equal size.
///
/// The first `total % parts` ranges are one byte longer than the rest. Never returns
/// an empty range: when `total < parts` only `total` one-byte ranges are produced.
/// Returns an empty vec if `total` or `parts` is 0.
pub fn split_range(total: u64, parts: usize) -> Vec<ByteRange> {
    if total == 0 || parts == 0 {
        return Vec::new();
    }

    let parts = (parts as u64).min(total);
    let base = total / parts;
    let remainder = total % parts;

    let mut out = Vec::with_capacity(parts as usize);
    let mut offset = 0u64;
    for i in 0..parts {
        let len = base + u64::from(i < remainder);
        out.push(ByteRange {
            start: offset,
            end: offset + len,
        });
        offset += len;
    }
    out
}
