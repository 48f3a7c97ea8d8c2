//! CLI commands
//!
//! Command implementations for the `regex-updater` binary.

mod auth;
mod current_versions;
mod delete_branch;
mod progress;
mod run;
pub mod style;
mod validate;

pub use auth::{run_auth_setup, run_auth_test};
pub use current_versions::run_current_versions;
pub use delete_branch::run_delete_pr_branch;
pub use run::run_updates;
pub use validate::run_validate;
