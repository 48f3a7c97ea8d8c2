//! Current-versions command - show the version each update tracks

use crate::cli::style::{Stylize, cross};
use anstream::{eprintln, println};
use regex_updater::config::Config;
use regex_updater::error::Result;
use regex_updater::update::Updater;
use std::path::Path;
use tracing::info;

/// Print the current version of every update, returning the number of failures
pub async fn run_current_versions(config_path: &Path) -> Result<usize> {
    let config = Config::load(config_path)?;
    let updates = config.compile_updates()?;
    let updater = Updater::from_config(&config, true).await?;

    let mut failures = 0;
    for update in &updates {
        match updater.current_version(update).await {
            Ok(version) => {
                info!(update = %update.name, "current version: {} ({version})", version.as_raw());
                println!(
                    "{}: {} {}",
                    update.name.emphasis(),
                    version.as_raw().accent(),
                    format!("({version})").muted()
                );
            }
            Err(e) => {
                eprintln!("{} {}", cross(), e.to_string().error());
                failures += 1;
            }
        }
    }
    Ok(failures)
}
