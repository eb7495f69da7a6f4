use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sharestate")]
#[command(
    about = "Track open files, sharing modes and byte-range locks for network file shares"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Manage configuration")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
    #[command(about = "Run the two-session open/lock/close scenario and report each step")]
    Simulate {
        #[arg(long, default_value = "default", help = "Share to run the scenario against")]
        share: String,
    },
    #[command(about = "Churn opens, locks and closes from concurrent sessions")]
    Soak {
        #[arg(long, default_value_t = 4, help = "Number of concurrent client sessions")]
        sessions: u32,

        #[arg(long, default_value_t = 10, help = "How long to run, in seconds")]
        seconds: u64,

        #[arg(long, default_value_t = 64, help = "Number of distinct paths to open")]
        paths: u32,

        #[arg(long, default_value = "default", help = "Share to run against")]
        share: String,

        #[arg(long, help = "Print the results as JSON")]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    #[command(about = "Show current configuration values")]
    Show,
    #[command(about = "Show config file path")]
    Path,
}
