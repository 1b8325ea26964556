//! # Page Fetching
//!
//! Network access for the two pages the logger reads. Everything goes through
//! the [`PageSource`] trait so the driver can run against canned pages in tests.
//!
//! ## Error Handling
//!
//! - **Network failures**: DNS, TLS, timeouts surface as [`FetchError::Http`]
//! - **Server errors**: any non-2xx status is an error, not an empty page
//!
//! Nothing is cached here. The driver asks for each page exactly once per cycle
//! and drops the body when the cycle ends.

use crate::config::SourcesConfig;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while downloading a page.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request failed (network, server, or protocol error)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Something that can hand back the body of a page.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Live HTTP source backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(config: &SourcesConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(HttpSource { client })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl PageSource for HttpSource {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_client_builds_from_default_config() {
        let config = Config::default();
        assert!(HttpSource::new(&config.sources).is_ok());
    }
}
