//! pagecap CLI entry point.

use anyhow::Result;
use clap::Parser;

use pagecap::cli::{handle_error, Cli, Commands};
use pagecap::domain::models::Config;
use pagecap::infrastructure::config::ConfigLoader;
use pagecap::infrastructure::logging::{LogConfig, LoggerImpl};

fn load_config(cli: &Cli) -> Result<Config> {
    match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    match cli.command {
        Commands::Scan(args) => pagecap::cli::commands::scan::execute(args, &config, cli.json).await,
        Commands::Manifest(args) => pagecap::cli::commands::manifest::execute(args, &config, cli.json).await,
        Commands::Cache(args) => pagecap::cli::commands::cache::execute(args, &config, cli.json).await,
        Commands::Pattern(args) => pagecap::cli::commands::pattern::execute(args, cli.json),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}
