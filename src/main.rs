//! asset-gc command-line entry point.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use asset_gc::commands;
use asset_gc::config::Config;

#[derive(Parser)]
#[command(name = "asset-gc", version, about = "Delete unreferenced images from object storage")]
struct Cli {
    /// Config file (default: ./asset-gc.toml when present)
    #[arg(long, global = true, env = "ASSET_GC_CONFIG")]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one cleanup now and print the report
    Run {
        /// Report candidates without deleting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Run on the configured schedule and serve the trigger endpoint
    Serve {
        /// Override [server].port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Validate the configuration and print the effective policy
    CheckConfig,
    /// Print recent runs
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    commands::init_logging(cli.log_json);

    let config = Config::discover(cli.config.as_deref())?;

    match cli.command {
        Command::Run { dry_run } => commands::run::execute(&config, dry_run).await,
        Command::Serve { port } => commands::serve::execute(&config, port).await,
        Command::CheckConfig => commands::check_config::execute(&config),
        Command::History { limit } => commands::history::execute(&config, limit),
    }
}
