//! Delete-pr-branch command

use crate::cli::style::{Stylize, check};
use anstream::println;
use regex_updater::config::Config;
use regex_updater::error::Result;
use regex_updater::update::Updater;
use std::path::Path;

/// Delete the head branch of the PR with id `pr_id`
pub async fn run_delete_pr_branch(config_path: &Path, pr_id: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let updater = Updater::from_config(&config, false).await?;
    let branch = updater.delete_pr_branch(pr_id).await?;
    println!("{} Deleted branch {} of PR {}", check(), branch.accent(), pr_id.emphasis());
    Ok(())
}
