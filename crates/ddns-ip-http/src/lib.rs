// # HTTP Address Resolver
//
// Resolves the current address of a family by fetching the family's `url`
// and taking the first valid literal from the response body.
//
// ## Endpoints
//
// Any endpoint that prints the caller's address works, plain text or not:
//
// - `https://api.ipify.org` / `https://api64.ipify.org`
// - `https://myip.ipip.net` ("当前 IP：203.0.113.5 来自于：...")
// - `https://ifconfig.me/ip`
//
// The body is matched strictly: `999.1.1.1` or `1.2.3` are never returned.

use async_trait::async_trait;
use ddns_core::address::{extract_ipv4, extract_ipv6};
use ddns_core::config::{AddressSource, FamilyConfig};
use ddns_core::traits::AddressResolver;
use ddns_core::{Error, ProviderRegistry, RecordType, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Timeout of one lookup request
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Resolver for the `url` address source
pub struct HttpAddressResolver {
    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressResolver {
    /// Create a resolver with the default 10 s timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a resolver with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::resolution(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::resolution(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::resolution(format!(
                "{} answered HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::resolution(format!("Failed to read response of {}: {}", url, e)))
    }
}

/// First address of the requested family in `body`
pub fn extract(record_type: RecordType, body: &str) -> Option<String> {
    match record_type {
        RecordType::A => extract_ipv4(body),
        RecordType::Aaaa => extract_ipv6(body),
    }
}

#[async_trait]
impl AddressResolver for HttpAddressResolver {
    async fn lookup(&self, record_type: RecordType, family: &FamilyConfig) -> Result<String> {
        let url = family.url.trim();
        if url.is_empty() {
            return Err(Error::resolution(format!(
                "No URL configured for {} lookup",
                record_type
            )));
        }

        let body = self.fetch(url).await?;
        let addr = extract(record_type, &body).ok_or_else(|| {
            Error::resolution(format!("No {} address in response of {}", record_type, url))
        })?;

        debug!("Resolved {} address {} via {}", record_type, addr, url);
        Ok(addr)
    }

    fn resolver_name(&self) -> &'static str {
        "url"
    }
}

/// Register the HTTP resolver for [`AddressSource::Url`]
///
/// # Returns
///
/// `Err` only when the HTTP client cannot be built
pub fn register(registry: &ProviderRegistry) -> Result<()> {
    registry.register_resolver(AddressSource::Url, Arc::new(HttpAddressResolver::new()?));
    Ok(())
}
