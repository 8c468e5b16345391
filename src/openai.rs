//! OpenAI client configuration.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;
use tracing::warn;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Client<OpenAIConfig> {
    create_client_with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(timeout: Duration) -> Client<OpenAIConfig> {
    let http_client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!("Could not build HTTP client with timeout, using defaults: {}", e);
            reqwest::Client::default()
        }
    };

    Client::with_config(OpenAIConfig::default()).with_http_client(http_client)
}
