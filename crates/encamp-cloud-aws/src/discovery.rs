//! Caller address discovery
//!
//! The public security group admits SSH only from the address the
//! operator is currently behind. That address is read from a plain-text
//! echo service; a failure here is an operator-fixable environment
//! problem, so it is fatal and never retried.

use async_trait::async_trait;
use encamp_cloud::error::{CloudError, Result};
use encamp_cloud::gateway::AddressDiscovery;
use tracing::debug;

const CHECK_ADDRESS_URL: &str = "https://checkip.amazonaws.com/";

/// Address discovery against the checkip echo service.
pub struct CheckIp {
    url: String,
}

impl CheckIp {
    pub fn new() -> Self {
        Self {
            url: CHECK_ADDRESS_URL.to_string(),
        }
    }

    /// Point at a different echo service (used by tests).
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for CheckIp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AddressDiscovery for CheckIp {
    async fn public_address(&self) -> Result<String> {
        let response = reqwest::get(&self.url)
            .await
            .map_err(|error| CloudError::AddressDiscovery(error.to_string()))?
            .error_for_status()
            .map_err(|error| CloudError::AddressDiscovery(error.to_string()))?;
        let body = response
            .text()
            .await
            .map_err(|error| CloudError::AddressDiscovery(error.to_string()))?;
        let address = body.trim().to_string();
        if address.is_empty() {
            return Err(CloudError::AddressDiscovery(format!(
                "{} returned an empty body",
                self.url
            )));
        }
        debug!(%address, "discovered caller address");
        Ok(address)
    }
}
