//! Segmented fetch: concurrent Range GETs written at their offsets of one preallocated file.

use std::cell::RefCell;
use std::path::Path;
use std::str;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::segmenter::ByteRange;
use crate::storage::{self, StorageWriter};

use super::easy;
use super::{commit, FetchError, FetchOptions};

/// Fetches every range concurrently (one connection each) into `<destination>.part`,
/// then renames it onto `destination`. Any range failure stops the remaining ranges,
/// removes the temp file, and returns the first real failure.
pub(super) fn fetch_segmented(
    url: &str,
    destination: &Path,
    total: u64,
    ranges: &[ByteRange],
    opts: &FetchOptions,
) -> Result<u64, FetchError> {
    let temp = storage::temp_path(destination);
    let writer =
        StorageWriter::create(&temp, Some(total)).map_err(|e| FetchError::storage(&temp, e))?;
    let abandon = AtomicBool::new(false);

    let outcome = std::thread::scope(|scope| {
        let handles: Vec<_> = ranges
            .iter()
            .enumerate()
            .map(|(index, range)| {
                let writer = &writer;
                let abandon = &abandon;
                let handle = scope.spawn(move || {
                    let res = fetch_range(url, range, total, writer, opts, abandon);
                    if res.is_err() {
                        abandon.store(true, Ordering::Relaxed);
                    }
                    res
                });
                (index, range, handle)
            })
            .collect();

        let mut first_error: Option<FetchError> = None;
        for (index, range, handle) in handles {
            let res = handle
                .join()
                .unwrap_or_else(|_| Err(FetchError::Task("segment thread panicked".into())));
            let Err(e) = res else { continue };
            let replace = match &first_error {
                None => true,
                Some(FetchError::Segment { source, .. }) => {
                    matches!(**source, FetchError::Abandoned) && !matches!(e, FetchError::Abandoned)
                }
                Some(_) => false,
            };
            if replace {
                first_error = Some(FetchError::Segment {
                    index,
                    range: range.to_string(),
                    source: Box::new(e),
                });
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    });

    commit(writer, destination, outcome)
}

/// One Range GET. The response must carry `Content-Range: bytes S-E/T` matching
/// the requested range and the probed total before any byte is written. The write
/// callback refuses bytes beyond the range and stops early once a sibling range has
/// failed.
fn fetch_range(
    url: &str,
    range: &ByteRange,
    total: u64,
    writer: &StorageWriter,
    opts: &FetchOptions,
    abandon: &AtomicBool,
) -> Result<(), FetchError> {
    let mut easy = easy::configured(url, opts)?;
    easy.range(&range.curl_range())?;

    let expected = range.len();
    let mut received = 0u64;
    let mut overflow = false;
    let mut storage_error: Option<std::io::Error> = None;
    // Content-Range of the latest response; reset at each status line.
    let content_range: RefCell<Option<String>> = RefCell::new(None);
    let mut range_ok: Option<bool> = None;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(line) = str::from_utf8(data) {
                let line = line.trim();
                if line.starts_with("HTTP/") {
                    *content_range.borrow_mut() = None;
                } else if let Some((name, value)) = line.split_once(':') {
                    if name.trim().eq_ignore_ascii_case("content-range") {
                        *content_range.borrow_mut() = Some(value.trim().to_string());
                    }
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            if abandon.load(Ordering::Relaxed) {
                return Ok(0);
            }
            let ok = *range_ok.get_or_insert_with(|| {
                content_range_matches(content_range.borrow().as_deref(), range, total)
            });
            if !ok {
                return Ok(0);
            }
            let len = data.len() as u64;
            if received + len > expected {
                overflow = true;
                return Ok(0);
            }
            match writer.write_at(range.start + received, data) {
                Ok(()) => {
                    received += len;
                    Ok(data.len())
                }
                Err(e) => {
                    storage_error = Some(e);
                    Ok(0)
                }
            }
        })?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if e.is_write_error() {
            if let Some(io_err) = storage_error {
                return Err(FetchError::storage(writer.temp_path(), io_err));
            }
            if overflow {
                return Err(FetchError::Oversized { expected });
            }
            if range_ok == Some(false) {
                return Err(FetchError::RangeMismatch {
                    requested: format!("{}/{}", range.curl_range(), total),
                    received: content_range.into_inner(),
                });
            }
            if abandon.load(Ordering::Relaxed) {
                return Err(FetchError::Abandoned);
            }
        }
        return Err(easy::transfer_error(&mut easy, e));
    }

    let code = easy::ensure_success(&mut easy)?;
    if code != 206 {
        return Err(FetchError::RangeNotHonored(code));
    }
    if received != expected {
        return Err(FetchError::PartialTransfer { expected, received });
    }
    Ok(())
}

/// Parses a `Content-Range` value of the form `bytes S-E/T` into (S, E, T).
/// `T` is `None` for an unknown length (`*`).
fn parse_content_range(value: &str) -> Option<(u64, u64, Option<u64>)> {
    let spec = value.trim().strip_prefix("bytes")?.trim_start();
    let (span, total) = spec.split_once('/')?;
    let (start, end) = span.trim().split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = end.trim().parse().ok()?;
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse().ok()?),
    };
    Some((start, end, total))
}

/// True when `value` describes exactly `range` of a resource of `total` bytes.
fn content_range_matches(value: Option<&str>, range: &ByteRange, total: u64) -> bool {
    match value.and_then(parse_content_range) {
        Some((start, end, Some(t))) => {
            start == range.start && end == range.end.saturating_sub(1) && t == total
        }
        _ => false,
    }
}
