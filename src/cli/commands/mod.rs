//! CLI parser and dispatch.

mod collect;
mod config_cmd;
mod extract;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "storefeed")]
#[command(about = "Collect product URLs from a storefront sitemap and extract a product feed")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the sitemap index and write the product URL list
    Collect,

    /// Render every listed product page and write the deduplicated feed
    Extract,

    /// Collect, then extract
    Run,

    /// Print the resolved settings as JSON
    Config,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let (settings, config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Collect => collect::cmd_collect(&settings).await.map(|_| ()),
        Commands::Extract => extract::cmd_extract(&settings).await.map(|_| ()),
        Commands::Run => {
            collect::cmd_collect(&settings).await?;
            extract::cmd_extract(&settings).await.map(|_| ())
        }
        Commands::Config => config_cmd::cmd_config_show(&settings, &config),
    }
}
