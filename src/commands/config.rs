use crate::cli::ConfigAction;
use crate::config::{get_config_path, load_config};
use crate::error::Result;

pub fn handle_config_command(action: Option<ConfigAction>) -> Result<()> {
    match action {
        Some(ConfigAction::Path) => {
            let config_path = get_config_path()?;
            println!("Config location: {}", config_path.display());
        }
        None | Some(ConfigAction::Show) => {
            let config_path = get_config_path()?;
            let config = load_config()?;
            println!("Config file: {}", config_path.display());
            println!();
            println!("Current configuration:");
            println!("  File state:");
            println!(
                "    sweep_interval_ms: {}",
                config.file_state.get_sweep_interval_ms()
            );
            println!(
                "    default_timeout_ms: {}",
                config.file_state.get_default_timeout_ms()
            );
            println!(
                "    rename_timeout_ms: {}",
                config.file_state.get_rename_timeout_ms()
            );
            println!("  Shares:");
            for share in &config.shares {
                let settings = config.file_state.merged_with(share);
                println!(
                    "    {} (default_timeout_ms: {}, rename_timeout_ms: {})",
                    share.name,
                    settings.get_default_timeout_ms(),
                    settings.get_rename_timeout_ms()
                );
            }
        }
    }
    Ok(())
}
