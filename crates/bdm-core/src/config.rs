use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::FetchOptions;

/// Global configuration loaded from `~/.config/bdm/config.toml`.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BdmConfig {
    /// Number of workers (and connections per segmented fetch).
    pub workers: usize,
    /// Upper bound for a single HTTP request, in seconds.
    pub request_timeout_secs: u64,
    /// Upper bound for establishing a connection, in seconds.
    pub connect_timeout_secs: u64,
    /// Try a multi-connection Range download before the single-stream GET.
    pub segmented: bool,
    /// Capacity of each worker queue and of the result stream.
    pub queue_capacity: usize,
}

impl Default for BdmConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            request_timeout_secs: 30,
            connect_timeout_secs: 15,
            segmented: true,
            queue_capacity: 1024,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// Validated run parameters handed to the engine at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub workers: usize,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub segmented: bool,
    pub queue_capacity: usize,
}

impl RunOptions {
    pub fn from_config(cfg: &BdmConfig) -> Result<Self> {
        let options = Self {
            workers: cfg.workers,
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs.max(1)),
            segmented: cfg.segmented,
            queue_capacity: cfg.queue_capacity,
        };
        options.validate()?;
        Ok(options)
    }

    /// Rejects parameters no run can start with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            anyhow::bail!("worker count must be at least 1");
        }
        if self.request_timeout.is_zero() {
            anyhow::bail!("request timeout must be greater than zero");
        }
        if self.queue_capacity == 0 {
            anyhow::bail!("queue capacity must be at least 1");
        }
        Ok(())
    }

    /// Fetch parameters; segmented fetches split into one range per worker.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            segmented: self.segmented,
            connections: self.workers,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        // Built from the default config, which always validates.
        let cfg = BdmConfig::default();
        Self {
            workers: cfg.workers,
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            segmented: cfg.segmented,
            queue_capacity: cfg.queue_capacity,
        }
    }
}
