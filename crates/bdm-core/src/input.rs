//! URL list input.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Opens the URL list at `path` for line-by-line reading.
///
/// Failing to open is reported before any job is dispatched. Lines are yielded
/// lazily, so read errors surface during dispatch.
pub fn open_lines(path: &Path) -> Result<Lines<BufReader<File>>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.display()))?;
    Ok(BufReader::new(file).lines())
}
