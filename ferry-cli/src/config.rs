//! Configuration module
//!
//! Resolved CLI settings plus the session credentials shared by every client.

use anyhow::{Context, Result};
use ferry_client::{Credentials, ImportClient};
use ferry_watcher::WatchConfig;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API location, token and polling cadence
    pub watch: WatchConfig,
    /// Session token, shared so an auth failure clears it everywhere
    pub credentials: Credentials,
}

impl Config {
    /// Build an API client for these settings
    pub fn client(&self) -> Result<ImportClient> {
        ImportClient::with_timeout(
            self.watch.api_url.clone(),
            self.credentials.clone(),
            self.watch.request_timeout,
        )
        .context("Failed to build HTTP client")
    }
}
