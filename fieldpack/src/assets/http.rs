//! HTTP client abstraction for testability

use std::time::Duration;

use super::AssetError;

/// Trait for HTTP client operations.
///
/// Lets the disk stores be tested with a scripted client instead of the
/// network.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>, AssetError>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with a 30 second timeout.
    pub fn new() -> Result<Self, AssetError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, AssetError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fieldpack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssetError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AssetError::Network(format!("request failed: {}", e.without_url())))?;

        if !response.status().is_success() {
            return Err(AssetError::Network(format!(
                "HTTP {} from {}",
                response.status(),
                redact(url)
            )));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| AssetError::Network(format!("failed to read response: {}", e.without_url())))
    }
}

/// Drop the query string so access tokens never reach logs or records.
pub(crate) fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
