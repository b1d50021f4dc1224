//! Batch run with a one-line status per finished download.

use anyhow::Result;
use bdm_core::config::RunOptions;
use bdm_core::engine::{BatchProgress, BatchReport, BatchRunner};
use bdm_core::naming::NamingPolicy;
use std::io;
use std::path::PathBuf;

pub async fn run_batch<I>(
    options: RunOptions,
    naming: NamingPolicy,
    output_dir: PathBuf,
    lines: I,
) -> Result<BatchReport>
where
    I: IntoIterator<Item = io::Result<String>> + Send + 'static,
{
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<BatchProgress>(64);
    let progress_handle = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            println!("  {}", status_line(&progress));
        }
    });

    let outcome = BatchRunner::http(options, naming, output_dir)
        .progress(progress_tx)
        .run(lines)
        .await;
    // The runner owned the sender, so the printer drains and stops.
    let _ = progress_handle.await;

    let report = outcome?;
    println!(
        "Finished. {} downloaded, {} failed.",
        report.succeeded(),
        report.failed()
    );
    Ok(report)
}

pub(crate) fn status_line(progress: &BatchProgress) -> String {
    let total = progress
        .total
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());
    if progress.failed > 0 {
        format!("{} / {} done ({} failed)", progress.finished, total, progress.failed)
    } else {
        format!("{} / {} done", progress.finished, total)
    }
}
