//! `storefeed config`.

use crate::cli::icons::dim_arrow;
use crate::config::{Config, Settings};

/// Print the resolved settings as JSON on stdout.
pub fn cmd_config_show(settings: &Settings, config: &Config) -> anyhow::Result<()> {
    match config.source_path {
        Some(ref path) => eprintln!("{} config file: {}", dim_arrow(), path.display()),
        None => eprintln!("{} no config file found; using defaults", dim_arrow()),
    }
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}
