//! CLI for the BDM bulk download dispatcher.

mod run;

use anyhow::{Context, Result};
use bdm_core::config::{self, BdmConfig, RunOptions};
use bdm_core::input;
use bdm_core::naming::NamingPolicy;
use clap::Parser;
use std::fs;
use std::path::PathBuf;

/// Download every URL listed in a file, one URL per line.
#[derive(Debug, Parser)]
#[command(name = "bdm")]
#[command(about = "BDM: bulk download dispatcher", long_about = None)]
pub struct Cli {
    /// File with one URL per line (blank lines are skipped).
    #[arg(short = 'u', long = "input", value_name = "FILE")]
    pub input: PathBuf,

    /// Directory downloads are written to.
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = ".")]
    pub output: PathBuf,

    /// Number of parallel workers; also the connections per segmented download.
    #[arg(short = 'p', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Name files by their position in the input (`0.jpg`, `1.png`, ...).
    #[arg(short = 'i', long = "index")]
    pub index: bool,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Always use a single connection per file.
    #[arg(long)]
    pub no_segmented: bool,

    /// Capacity of each worker queue.
    #[arg(long, value_name = "N")]
    pub queue_capacity: Option<usize>,
}

impl Cli {
    /// Apply command-line overrides on top of the config file values.
    pub fn apply(&self, cfg: &mut BdmConfig) {
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
        if let Some(secs) = self.timeout {
            cfg.request_timeout_secs = secs;
        }
        if self.no_segmented {
            cfg.segmented = false;
        }
        if let Some(capacity) = self.queue_capacity {
            cfg.queue_capacity = capacity;
        }
    }

    pub fn naming(&self) -> NamingPolicy {
        if self.index {
            NamingPolicy::Index
        } else {
            NamingPolicy::Basename
        }
    }

    /// Parse arguments and run the batch. Returns whether every download succeeded.
    pub async fn run_from_args() -> Result<bool> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        cli.apply(&mut cfg);
        let options = RunOptions::from_config(&cfg)?;

        let lines = input::open_lines(&cli.input)?;
        fs::create_dir_all(&cli.output)
            .with_context(|| format!("failed to create output directory {}", cli.output.display()))?;

        let report = run::run_batch(options, cli.naming(), cli.output.clone(), lines).await?;
        for (result, err) in report.failures() {
            eprintln!("failed [{}] {}: {}", result.job.index, result.job.url, err);
        }
        Ok(report.all_succeeded())
    }
}
