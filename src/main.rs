use clap::Parser;

use devreload::cli::commands::{init, map, watch};
use devreload::cli::{Cli, Commands};
use devreload::config::Settings;
use devreload::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => init::run_config(&config),
        Commands::Watch {
            dirs,
            backend,
            interval,
        } => watch::run_watch(&config, dirs, backend, interval).await,
        Commands::Map {
            generated,
            line,
            offset,
        } => map::run_map(&config, generated, line, offset),
    }
}
