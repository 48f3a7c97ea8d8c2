//! Validate command - check a config file without touching the network

use crate::cli::style::{Stylize, check};
use anstream::println;
use regex_updater::config::Config;
use regex_updater::error::Result;
use std::path::Path;

/// Load and validate the config at `config_path`
pub fn run_validate(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    println!(
        "{} {} is valid: {} feeds, {} updates",
        check(),
        config_path.display().accent(),
        config.feeds.len(),
        config.updates.len()
    );
    Ok(())
}
