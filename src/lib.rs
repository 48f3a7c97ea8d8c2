//! regex-updater - keep versions embedded in repository files up to date
//!
//! Each configured update points a regex with one capture group at a file in
//! a hosted repository. The current version is read from that file, newer
//! versions are streamed from a release feed, and a pull request rewriting
//! the captured span is opened and reconciled over time.

pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod platform;
pub mod types;
pub mod update;
pub mod version;

pub use error::{Error, Result};
