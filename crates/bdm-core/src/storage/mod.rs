//! Disk I/O and file lifecycle.
//!
//! Every fetch writes into `<destination>.part`. The temp file is preallocated for
//! segmented fetches, accepts concurrent positional writes, and is renamed onto the
//! destination only after a complete transfer. Failed transfers remove it, so the
//! destination never holds a partial or mixed body.

mod writer;

pub use writer::StorageWriter;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the destination (e.g. `file.iso` → `file.iso.part`).
pub fn temp_path(destination: &std::path::Path) -> std::path::PathBuf {
    let mut o = destination.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}
