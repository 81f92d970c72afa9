use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Size of one read/write chunk while streaming a response body (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Minimum spacing between two forwarded progress updates.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 500;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;

/// Idle timeout between two reads of a response body.
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

/// Engine configuration, loadable from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreloadConfig {
    /// Flat directory holding committed downloads.
    pub cache_dir: PathBuf,
    pub chunk_size: usize,
    pub progress_interval_ms: u64,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("preload-cache"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl PreloadConfig {
    /// Load from `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let data = std::fs::read(path)?;
                serde_json::from_slice::<PreloadConfig>(&data)?
            }
            None => PreloadConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be > 0".into()));
        }
        Ok(())
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
