use crate::error::{Result, ShareStateError};
use std::path::Path;

use crate::config::paths::*;
use crate::config::schema::*;

/// Load the configuration, writing the defaults if no file exists yet.
pub fn load_config() -> Result<Config> {
    let config_path = get_config_path()?;

    if !config_path.exists() {
        let config = Config::default();
        write_config(&config_path, &config)?;
        tracing::info!("Created default config at {}", config_path.display());
        return Ok(config);
    }

    load_config_from(&config_path)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let toml_content = std::fs::read_to_string(path).map_err(|e| {
        ShareStateError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: Config = toml::from_str(&toml_content)
        .map_err(|e| ShareStateError::Config(format!("Failed to parse config: {}", e)))?;

    validate_config(&config)?;
    Ok(config)
}

pub fn save_config(config: &Config) -> Result<()> {
    write_config(&get_config_path()?, config)
}

pub fn write_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ShareStateError::Config(format!("Failed to create config directory: {}", e))
        })?;
    }
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ShareStateError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, toml_str)
        .map_err(|e| ShareStateError::Config(format!("Failed to write config file: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.file_state.sweep_interval_ms = Some(1000);
        write_config(&path, &config).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.file_state.get_sweep_interval_ms(), 1000);
        assert_eq!(loaded.shares.len(), 1);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "file_state = [").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ShareStateError::Config(_)));
    }
}
