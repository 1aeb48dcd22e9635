use crate::error::{ReorderError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // OAuth client registration
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    #[serde(default = "default_playlist")]
    pub default_playlist: String,
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    // Remote API limits
    #[serde(default = "default_page_concurrency")]
    pub page_concurrency: usize,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    // Retry behavior for moves and append batches
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Tracks copied into the backup on a dry run. `0` copies everything.
    #[serde(default = "default_dry_run_track_limit")]
    pub dry_run_track_limit: usize,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_redirect_uri() -> String { "http://localhost:8888/callback".into() }
fn default_playlist() -> String { "Starred".into() }
fn default_backup_suffix() -> String { crate::backup::DEFAULT_BACKUP_SUFFIX.into() }
fn default_page_concurrency() -> usize { 4 }
fn default_max_batch_size() -> usize { crate::backup::MAX_APPEND_BATCH }
fn default_request_timeout() -> u64 { 30 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_base_delay_ms() -> u64 { 1000 }
fn default_dry_run_track_limit() -> usize { 10 }
fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("reorderify").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            default_playlist: default_playlist(),
            backup_suffix: default_backup_suffix(),
            page_concurrency: default_page_concurrency(),
            max_batch_size: default_max_batch_size(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            dry_run_track_limit: default_dry_run_track_limit(),
            log_dir: default_log_dir(),
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Explicit path, else the per-user config file, else built-in defaults.
    /// Client credentials from `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET`
    /// take precedence over the file.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match explicit {
            Some(p) => Self::from_path(p)?,
            None => match Self::user_config_path().filter(|p| p.exists()) {
                Some(p) => Self::from_path(&p)?,
                None => Self::default(),
            },
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("reorderify").join("config.toml"))
    }

    fn apply_env(&mut self) {
        if let Ok(id) = std::env::var("SPOTIFY_CLIENT_ID") {
            if !id.is_empty() {
                self.client_id = id;
            }
        }
        if let Ok(secret) = std::env::var("SPOTIFY_CLIENT_SECRET") {
            if !secret.is_empty() {
                self.client_secret = secret;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 || self.max_batch_size > 100 {
            return Err(ReorderError::Config(format!(
                "max_batch_size must be within 1..=100, got {}",
                self.max_batch_size
            )));
        }
        if self.max_retries == 0 {
            return Err(ReorderError::Config("max_retries must be at least 1".into()));
        }
        if self.page_concurrency == 0 {
            return Err(ReorderError::Config("page_concurrency must be at least 1".into()));
        }
        Ok(())
    }

    pub fn has_client_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    pub fn retry_policy(&self) -> crate::retry::RetryPolicy {
        crate::retry::RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn dry_run_limit(&self) -> Option<usize> {
        Some(self.dry_run_track_limit).filter(|n| *n > 0)
    }
}
