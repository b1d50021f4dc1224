//! Range capability probe.
//!
//! A HEAD request tells us whether the resource can be fetched in segments:
//! the server must send `Accept-Ranges: bytes` and a `Content-Length`.

use std::str;

use super::easy;
use super::{FetchError, FetchOptions};

/// What the HEAD response says about partial retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
}

impl ProbeResult {
    /// Total length when the resource can be split; `None` when it cannot.
    pub fn segmentable_length(&self) -> Option<u64> {
        match self.content_length {
            Some(n) if self.accept_ranges && n > 0 => Some(n),
            _ => None,
        }
    }
}

/// Performs a HEAD request (following redirects) and parses the final response's headers.
/// Runs on the current thread.
pub fn probe(url: &str, opts: &FetchOptions) -> Result<ProbeResult, FetchError> {
    let mut lines: Vec<String> = Vec::new();

    let mut easy = easy::configured(url, opts)?;
    easy.nobody(true)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                lines.push(s.trim_end().to_string());
            }
            true
        })?;
        transfer.perform()
    };
    if let Err(e) = performed {
        return Err(easy::transfer_error(&mut easy, e));
    }
    easy::ensure_success(&mut easy)?;

    Ok(parse_headers(&lines))
}

/// Parse header lines. A status line (`HTTP/...`) starts a new response, so only the
/// headers of the last hop in a redirect chain count.
pub(crate) fn parse_headers(lines: &[String]) -> ProbeResult {
    let mut result = ProbeResult::default();

    for line in lines {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            result = ProbeResult::default();
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            result.content_length = value.parse::<u64>().ok();
        } else if name.eq_ignore_ascii_case("accept-ranges") {
            result.accept_ranges = value
                .split(',')
                .any(|unit| unit.trim().eq_ignore_ascii_case("bytes"));
        }
    }

    result
}
