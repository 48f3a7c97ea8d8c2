//! Shared test utilities

pub mod fixtures;
pub mod mock_feed;
pub mod mock_platform;
