//! Shared libcurl handle setup.

use curl::easy::Easy;

use super::{FetchError, FetchOptions};

/// Easy handle for `url` with redirects, both timeouts, and HTTP errors reported as failures.
pub(super) fn configured(url: &str, opts: &FetchOptions) -> Result<Easy, FetchError> {
    let mut easy = Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.timeout(opts.request_timeout)?;
    // >= 400 fails before the body is handed to the write callback.
    easy.fail_on_error(true)?;
    Ok(easy)
}

/// Maps a failed `perform` to the HTTP status when curl stopped on one.
pub(super) fn transfer_error(easy: &mut Easy, e: curl::Error) -> FetchError {
    if e.is_http_returned_error() {
        if let Ok(code) = easy.response_code() {
            return FetchError::Http(code);
        }
    }
    FetchError::Curl(e)
}

/// Status check for a completed `perform`.
pub(super) fn ensure_success(easy: &mut Easy) -> Result<u32, FetchError> {
    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    Ok(code)
}
