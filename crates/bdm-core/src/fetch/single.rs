//! Single-stream HTTP GET (no Range): the body is written sequentially from offset 0.

use std::path::Path;

use crate::storage::{self, StorageWriter};

use super::easy;
use super::{commit, FetchError, FetchOptions};

/// Downloads `url` with one GET into a freshly truncated `<destination>.part`, then renames
/// it onto `destination`. Returns the number of bytes written.
pub(super) fn fetch_single(
    url: &str,
    destination: &Path,
    opts: &FetchOptions,
) -> Result<u64, FetchError> {
    let temp = storage::temp_path(destination);
    let writer = StorageWriter::create(&temp, None).map_err(|e| FetchError::storage(&temp, e))?;
    let outcome = stream_body(url, &writer, opts);
    commit(writer, destination, outcome)
}

fn stream_body(url: &str, writer: &StorageWriter, opts: &FetchOptions) -> Result<u64, FetchError> {
    let mut easy = easy::configured(url, opts)?;

    let mut written = 0u64;
    let mut storage_error: Option<std::io::Error> = None;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| match writer.write_at(written, data) {
            Ok(()) => {
                written += data.len() as u64;
                Ok(data.len())
            }
            Err(e) => {
                storage_error = Some(e);
                Ok(0) // abort transfer
            }
        })?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if e.is_write_error() {
            if let Some(io_err) = storage_error {
                return Err(FetchError::storage(writer.temp_path(), io_err));
            }
        }
        return Err(easy::transfer_error(&mut easy, e));
    }
    easy::ensure_success(&mut easy)?;

    // libcurl already fails with a partial-file error when the body is shorter than
    // the advertised Content-Length.
    Ok(written)
}
