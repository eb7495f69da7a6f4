use clap::Parser;

mod cli;
mod commands;
mod config;
mod error;
mod session;
mod state;

use cli::{Args, Commands};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => {
            std::process::exit(code);
        }
        Err(e) => {
            eprintln!("Error: {} [{}]", e, e.status());
            std::process::exit(1);
        }
    }
}

async fn run() -> error::Result<i32> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("SHARESTATE_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Config { action } => {
            commands::handle_config_command(action)?;
            Ok(0)
        }
        Commands::Simulate { share } => {
            commands::run_simulation(&share)?;
            Ok(0)
        }
        Commands::Soak {
            sessions,
            seconds,
            paths,
            share,
            json,
        } => {
            commands::run_soak(&share, sessions, seconds, paths, json).await?;
            Ok(0)
        }
    }
}
