pub mod paths;
pub mod persistence;
pub mod schema;

pub use paths::*;
pub use persistence::*;
pub use schema::*;

fn default_sweep_interval_ms() -> u64 {
    15_000
}

fn default_timeout_ms() -> u64 {
    300_000
}

fn default_rename_timeout_ms() -> u64 {
    60_000
}

fn default_shares() -> Vec<ShareConfig> {
    vec![ShareConfig::new("default")]
}
