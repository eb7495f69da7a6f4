pub mod config;
pub mod simulate;
pub mod soak;

pub use config::handle_config_command;
pub use simulate::run_simulation;
pub use soak::run_soak;
