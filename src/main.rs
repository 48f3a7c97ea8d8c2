//! regex-updater - keep versions pinned in files up to date
//!
//! CLI binary that opens pull requests when new releases appear.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use regex_updater::config::DEFAULT_CONFIG_PATH;
use regex_updater::types::Platform;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod cli;

/// Exit codes above this are reserved by shells
const MAX_EXIT_CODE: usize = 125;

#[derive(Parser)]
#[command(name = "regex-updater")]
#[command(about = "Open pull requests for new versions of dependencies pinned in files")]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Show debug logs and every update phase
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every update and open PRs for new versions
    Run {
        /// Dry run - log what would be done without making changes
        #[arg(long, alias = "dry")]
        dry_run: bool,
    },

    /// Print the version each update currently tracks
    CurrentVersions,

    /// Validate the config file
    Validate,

    /// Delete the head branch of a PR
    DeletePrBranch {
        /// PR id, e.g. 12, #12 or !12
        #[arg(env = "REGEX_UPDATER_PR_ID")]
        pr_id: String,
    },

    /// Authentication management
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand)]
enum AuthAction {
    /// Test the configured repository credentials
    Test,
    /// Show authentication setup instructions
    Setup {
        /// Platform to explain
        #[arg(value_enum, default_value = "github")]
        platform: PlatformArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PlatformArg {
    Github,
    Gitea,
}

impl From<PlatformArg> for Platform {
    fn from(arg: PlatformArg) -> Self {
        match arg {
            PlatformArg::Github => Self::GitHub,
            PlatformArg::Gitea => Self::Gitea,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn failure_code(failures: usize) -> u8 {
    u8::try_from(failures.min(MAX_EXIT_CODE)).unwrap_or(1)
}

async fn real_main(cli: Cli) -> Result<u8> {
    let code = match cli.command {
        Commands::Run { dry_run } => {
            failure_code(cli::run_updates(&cli.config, dry_run, cli.verbose).await?)
        }
        Commands::CurrentVersions => {
            failure_code(cli::run_current_versions(&cli.config).await?)
        }
        Commands::Validate => {
            cli::run_validate(&cli.config)?;
            0
        }
        Commands::DeletePrBranch { pr_id } => {
            cli::run_delete_pr_branch(&cli.config, &pr_id).await?;
            0
        }
        Commands::Auth { action } => {
            match action {
                AuthAction::Test => cli::run_auth_test(&cli.config).await?,
                AuthAction::Setup { platform } => cli::run_auth_setup(platform.into()),
            }
            0
        }
    };
    Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match real_main(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
