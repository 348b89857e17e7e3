//! Shared HTTP client with a consistent User-Agent header.

use crate::error::Result;
use anyhow::Context;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Returns the User-Agent sent with every request: `stddoc-mcp/{version}`.
pub fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Client builder with the standard User-Agent. Use this to customize further.
pub fn builder() -> ClientBuilder {
    Client::builder().user_agent(user_agent())
}

/// Client with the standard User-Agent and an overall request timeout.
///
/// Individual requests may override the timeout (the resolver's probes do).
pub fn new_client(timeout: Duration) -> Result<Client> {
    builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}
