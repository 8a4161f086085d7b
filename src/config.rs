use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::errors::NetrandError;
use crate::sweep::SweepPlan;

pub const DEFAULT_URL: &str = "https://unpkg.com/react-dom@18/umd/react-dom.production.min.js";
pub const DEFAULT_TRIALS: usize = 100;
pub const DEFAULT_DB_NAME: &str = "netrand.db";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub target: TargetConfig,
    pub sweep: SweepConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    pub url: String,
    pub trials: usize,
    /// Per-request deadline. Absent means requests may take as long as they take.
    pub request_timeout_ms: Option<u64>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            trials: DEFAULT_TRIALS,
            request_timeout_ms: None,
        }
    }
}

impl TargetConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub min_batch: usize,
    pub max_batch: usize,
    pub repeats: usize,
    pub on_error: OnError,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_batch: 1,
            max_batch: 32,
            repeats: 10,
            on_error: OnError::Abort,
        }
    }
}

/// What a sweep does when a single data point fails with a transport error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub database: Option<PathBuf>,
}

impl Config {
    /// Load from `explicit` if given (it must exist), otherwise from the user
    /// config directory when a file is there, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        let text = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_toml(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reject settings that would fail before the first request anyway.
    pub fn validate(&self) -> Result<(), NetrandError> {
        self.validate_target()?;
        SweepPlan::from(&self.sweep).validate()
    }

    pub fn validate_target(&self) -> Result<(), NetrandError> {
        crate::engine::validate_url(&self.target.url)?;
        if self.target.trials == 0 {
            return Err(NetrandError::InvalidTrialCount);
        }
        Ok(())
    }

    /// The configured database file, else `netrand.db` beside the running
    /// executable, else under the user's local data directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.storage.database {
            return path.clone();
        }
        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            return dir.join(DEFAULT_DB_NAME);
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("netrand"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_DB_NAME)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("netrand").join("config.toml"))
}
