use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::scoring::ScoringProfile;

/// Default cooldown after a completed processing job, in seconds.
pub const DEFAULT_COOLDOWN_SECS: u64 = 300;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of rename attempts per file (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
    /// Upper bound on processing attempts before `retry` refuses to requeue a failed job.
    #[serde(default = "default_max_job_attempts")]
    pub max_job_attempts: u32,
}

fn default_max_job_attempts() -> u32 {
    3
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 10,
            max_job_attempts: default_max_job_attempts(),
        }
    }
}

/// What to do with the files of a completed download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletedFileAction {
    Copy,
    #[default]
    Move,
}

/// `[naming]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Pattern for imported files, relative to `output_path`.
    pub file_pattern: String,
    /// Author used when no tag, download field or title split yields one.
    pub unknown_author: String,
    /// Title used when neither tags nor the download carry one.
    pub unknown_title: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            file_pattern: crate::naming::DEFAULT_PATTERN.to_string(),
            unknown_author: "Unknown Author".to_string(),
            unknown_title: "Unknown Title".to_string(),
        }
    }
}

/// `[workers]` section: background supervisor sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Jobs finalized concurrently.
    pub count: usize,
    /// Sleep between queue polls when idle, in milliseconds.
    pub poll_interval_ms: u64,
    /// A `processing` job whose heartbeat is older than this many seconds
    /// is treated as abandoned and requeued on recovery.
    pub stale_after_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            count: 2,
            poll_interval_ms: 1000,
            stale_after_secs: 600,
        }
    }
}

impl WorkerConfig {
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}

/// Global configuration loaded from `~/.config/shelver/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelverConfig {
    /// Library root. Finalization refuses to run without it.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Copy or move completed files into the library.
    #[serde(default)]
    pub completed_file_action: CompletedFileAction,
    /// Seconds a completed processing job suppresses a new one for the same download.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Hash-compare each fallback copy before its source is deleted.
    #[serde(default = "default_verify_copies")]
    pub verify_copies: bool,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub scoring: ScoringProfile,
    #[serde(default)]
    pub workers: WorkerConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN_SECS
}

fn default_verify_copies() -> bool {
    true
}

impl Default for ShelverConfig {
    fn default() -> Self {
        Self {
            output_path: None,
            completed_file_action: CompletedFileAction::default(),
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            verify_copies: true,
            naming: NamingConfig::default(),
            scoring: ScoringProfile::default(),
            workers: WorkerConfig::default(),
            retry: None,
        }
    }
}

impl ShelverConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("shelver")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ShelverConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as `load_or_init` for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<ShelverConfig> {
    if !path.exists() {
        let default_cfg = ShelverConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("write {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ShelverConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
