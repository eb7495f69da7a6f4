use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sharestate::{FileStateTable, LocalTransactionService, SrvSession};
use tempfile::TempDir;

/// Get the path to the sharestate binary for testing.
#[allow(dead_code)]
pub fn get_sharestate_path() -> PathBuf {
    assert_cmd::cargo::cargo_bin!("sharestate").to_path_buf()
}

/// A share table with the default timeouts.
#[allow(dead_code)]
pub fn test_table() -> Arc<FileStateTable> {
    Arc::new(FileStateTable::new("test-share"))
}

/// A point in time past the expiry of anything the table created so far.
#[allow(dead_code)]
pub fn after_expiry(table: &FileStateTable) -> Instant {
    Instant::now() + table.default_timeout() + Duration::from_millis(1)
}

#[allow(dead_code)]
pub fn test_session(id: u32, service: &Arc<LocalTransactionService>) -> SrvSession {
    SrvSession::new(id, format!("client-{}", id), service.clone())
}

/// Isolated config directory handed to the binary via SHARESTATE_CONFIG_DIR.
#[allow(dead_code)]
pub struct TestConfigDir {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
}

#[allow(dead_code)]
impl TestConfigDir {
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join("config");
        TestConfigDir {
            temp_dir,
            config_dir,
        }
    }

    pub fn write_config(&self, content: &str) {
        std::fs::create_dir_all(&self.config_dir).expect("Failed to create config dir");
        std::fs::write(self.config_dir.join("config.toml"), content)
            .expect("Failed to write config");
    }
}
