//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::cache::CacheArgs;
use commands::manifest::ManifestArgs;
use commands::pattern::PatternArgs;
use commands::scan::ScanArgs;

/// Top-level command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "pagecap")]
#[command(about = "Discover, cache, and export page capabilities", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .pagecap/config.yaml)
    #[arg(short, long, global = true, env = "PAGECAP_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover the capabilities of a page
    Scan(ScanArgs),
    /// Inspect the per-origin capability manifest
    Manifest(ManifestArgs),
    /// Inspect or invalidate the capability cache
    Cache(CacheArgs),
    /// Print the normalized pattern and site for a URL
    Pattern(PatternArgs),
}

/// Report a command failure and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let body = serde_json::json!({
            "success": false,
            "error": format!("{err:#}"),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
