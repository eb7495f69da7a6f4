use std::time::Duration;

use sharestate::{load_config_from, Config, ShareStateError};

fn write_and_load(content: &str) -> sharestate::Result<Config> {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).expect("Failed to write config");
    load_config_from(&path)
}

#[test]
fn test_config_default_values() {
    let config = Config::default();

    assert_eq!(config.file_state.get_sweep_interval_ms(), 15_000);
    assert_eq!(config.file_state.get_default_timeout_ms(), 300_000);
    assert_eq!(config.file_state.get_rename_timeout_ms(), 60_000);
    assert_eq!(config.shares.len(), 1);
    assert_eq!(config.shares[0].name, "default");
}

#[test]
fn test_empty_file_uses_defaults() {
    let config = write_and_load("").expect("Failed to load config");
    assert_eq!(config.file_state.sweep_interval(), Duration::from_secs(15));
    assert_eq!(config.shares[0].name, "default");
}

#[test]
fn test_share_overrides_merge_over_file_state() {
    let config = write_and_load(
        r#"
[file_state]
sweep_interval_ms = 1000
default_timeout_ms = 20000

[[shares]]
name = "docs"
default_timeout_ms = 5000

[[shares]]
name = "media"
rename_timeout_ms = 2000
"#,
    )
    .expect("Failed to load config");

    let docs = config.file_state_for("DOCS");
    assert_eq!(docs.get_default_timeout_ms(), 5000);
    assert_eq!(docs.get_rename_timeout_ms(), 60_000);

    let media = config.file_state_for("media");
    assert_eq!(media.get_default_timeout_ms(), 20_000);
    assert_eq!(media.get_rename_timeout_ms(), 2000);

    let table = config.build_table("docs");
    assert_eq!(table.default_timeout(), Duration::from_millis(5000));
    assert_eq!(table.name(), "docs");
}

#[test]
fn test_unknown_share_uses_global_settings() {
    let config = write_and_load("[file_state]\ndefault_timeout_ms = 1234\n").unwrap();
    assert_eq!(config.file_state_for("other").get_default_timeout_ms(), 1234);
}

#[test]
fn test_zero_sweep_interval_rejected() {
    let err = write_and_load("[file_state]\nsweep_interval_ms = 0\n").unwrap_err();
    assert!(matches!(err, ShareStateError::Config(_)));
}

#[test]
fn test_duplicate_share_names_rejected() {
    let err = write_and_load(
        r#"
[[shares]]
name = "docs"

[[shares]]
name = "Docs"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("Duplicate share name"));
}
