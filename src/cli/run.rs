//! Run command - process every configured update

use crate::cli::progress::CliProgress;
use anstream::println;
use regex_updater::config::Config;
use regex_updater::error::Result;
use regex_updater::update::Updater;
use std::path::Path;
use tracing::{debug, warn};

/// Process every update, returning the number that failed
///
/// A failing update does not stop the others.
pub async fn run_updates(config_path: &Path, dry_run: bool, verbose: bool) -> Result<usize> {
    let config = Config::load(config_path)?;
    let updates = config.compile_updates()?;
    let updater = Updater::from_config(&config, dry_run).await?;
    let progress = if verbose {
        CliProgress::verbose()
    } else {
        CliProgress::compact()
    };

    if dry_run {
        println!("Dry run - no changes will be made");
    }

    let mut failures = 0;
    for update in &updates {
        match updater.process(update, &progress).await {
            Ok(report) => progress.report(&report),
            Err(e) => {
                debug!(update = %update.name, error = ?e, "Update failed");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        warn!(failures, total = updates.len(), "Some updates failed");
    }
    Ok(failures)
}
