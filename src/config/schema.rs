use crate::error::{Result, ShareStateError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::state::FileStateTable;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileStateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweep_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_timeout_ms: Option<u64>,
}

impl FileStateConfig {
    pub fn get_sweep_interval_ms(&self) -> u64 {
        self.sweep_interval_ms
            .unwrap_or_else(super::default_sweep_interval_ms)
    }

    pub fn get_default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
            .unwrap_or_else(super::default_timeout_ms)
    }

    pub fn get_rename_timeout_ms(&self) -> u64 {
        self.rename_timeout_ms
            .unwrap_or_else(super::default_rename_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.get_sweep_interval_ms())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.get_default_timeout_ms())
    }

    pub fn rename_timeout(&self) -> Duration {
        Duration::from_millis(self.get_rename_timeout_ms())
    }

    /// Overlay per-share timeouts on top of these settings.
    pub fn merged_with(&self, share: &ShareConfig) -> FileStateConfig {
        FileStateConfig {
            sweep_interval_ms: self.sweep_interval_ms,
            default_timeout_ms: share.default_timeout_ms.or(self.default_timeout_ms),
            rename_timeout_ms: share.rename_timeout_ms.or(self.rename_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_timeout_ms: Option<u64>,
}

impl ShareConfig {
    pub fn new(name: impl Into<String>) -> Self {
        ShareConfig {
            name: name.into(),
            default_timeout_ms: None,
            rename_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub file_state: FileStateConfig,
    #[serde(default = "super::default_shares")]
    pub shares: Vec<ShareConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_state: FileStateConfig::default(),
            shares: super::default_shares(),
        }
    }
}

impl Config {
    pub fn share(&self, name: &str) -> Option<&ShareConfig> {
        self.shares
            .iter()
            .find(|share| share.name.eq_ignore_ascii_case(name))
    }

    /// Effective file state settings for a share.
    pub fn file_state_for(&self, name: &str) -> FileStateConfig {
        match self.share(name) {
            Some(share) => self.file_state.merged_with(share),
            None => self.file_state.clone(),
        }
    }

    /// Build the file state table for a share using its effective timeouts.
    pub fn build_table(&self, name: &str) -> Arc<FileStateTable> {
        let settings = self.file_state_for(name);
        Arc::new(FileStateTable::with_timeouts(
            name,
            settings.default_timeout(),
            settings.rename_timeout(),
        ))
    }
}

pub fn validate_config(config: &Config) -> Result<()> {
    let interval = config.file_state.get_sweep_interval_ms();
    if interval == 0 {
        return Err(ShareStateError::Config(
            "sweep_interval_ms must be greater than zero".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for share in &config.shares {
        if share.name.trim().is_empty() {
            return Err(ShareStateError::Config(
                "Share names must not be empty".to_string(),
            ));
        }
        if !seen.insert(share.name.to_uppercase()) {
            return Err(ShareStateError::Config(format!(
                "Duplicate share name '{}'",
                share.name
            )));
        }

        let settings = config.file_state.merged_with(share);
        if settings.get_default_timeout_ms() < interval {
            tracing::warn!(
                "default_timeout_ms ({}) for share {} is shorter than sweep_interval_ms ({}); \
                 states will linger up to one sweep interval past expiry",
                settings.get_default_timeout_ms(),
                share.name,
                interval
            );
        }
        if settings.get_rename_timeout_ms() < interval {
            tracing::warn!(
                "rename_timeout_ms ({}) for share {} is shorter than sweep_interval_ms ({})",
                settings.get_rename_timeout_ms(),
                share.name,
                interval
            );
        }
    }

    Ok(())
}
