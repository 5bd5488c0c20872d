// # DNS Provider Traits
//
// Defines the interface between the scheduler and provider drivers.
//
// ## Implementations
//
// - AliDNS, DNSPod, Cloudflare, Huawei Cloud, Baidu Cloud, Porkbun, GoDaddy,
//   Google Domains, Callback: `ddns-providers` crate
//
// ## Two Levels
//
// - [`DnsProvider`]: what the scheduler calls, once per entry per cycle
// - [`RecordApi`]: the find/create/modify wire calls of a driver whose API
//   follows the list-then-write shape. Such drivers implement `RecordApi`
//   and get `DnsProvider` for free from [`crate::reconcile`].
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{DnsProvider, Domains};
//
// let provider = registry.create_provider(&entry)?;
// let mut domains = Domains::from_entry(&entry);
// domains.set_address(RecordType::A, "203.0.113.5".into(), true);
// provider.add_update_domain_records(&mut domains).await;
// ```

use crate::config::DnsEntry;
use crate::domains::{Domain, Domains, RecordType};
use crate::error::Result;
use async_trait::async_trait;

/// An existing remote record, as far as the reconciliation needs it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordMetadata {
    /// The record ID (provider-specific)
    pub id: String,
    /// The record name as the provider spells it
    pub name: String,
    /// The current value
    pub value: String,
    /// Time-to-live for the record
    pub ttl: Option<u32>,
    /// Zone the record lives in, when the provider needs it for writes
    pub zone_id: Option<String>,
    /// Any additional provider-specific metadata
    pub extra: serde_json::Value,
}

impl RecordMetadata {
    /// Create metadata with id, name and value
    pub fn new(id: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

/// Trait for DNS provider implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Contract
///
/// - Only `UpdateStatus` on the individual domains is written
/// - Families without a pending address are left untouched
/// - Errors are contained: every failure ends up as `UpdateStatus::Failed`
///   and a log line with provider and domain, never as a panic
/// - No retries within a call; the next cycle is the retry
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Add or update the A and AAAA records of every pending domain
    ///
    /// # Parameters
    ///
    /// - `domains`: Domain Set of one entry; statuses are written in place
    async fn add_update_domain_records(&self, domains: &mut Domains);

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create (initialise) a driver for one configuration entry
    ///
    /// # Parameters
    ///
    /// - `entry`: Credentials and TTL of the entry
    ///
    /// # Returns
    ///
    /// A boxed DnsProvider trait object, or an error when the entry's
    /// credentials are unusable for this provider
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>>;
}

/// Wire calls of a list-then-write provider API
///
/// # Contract
///
/// - `find_record` filters client-side for an exact name match
/// - `create_record` / `modify_record` return `Ok` only when the provider
///   confirmed the write; a mismatching echo is `Error::ProviderLogic`
#[async_trait]
pub trait RecordApi: Send + Sync {
    /// Provider name for logs and errors
    fn provider_name(&self) -> &'static str;

    /// Find the record with exactly this domain's name and type
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: An exact match
    /// - `Ok(None)`: No record with this exact name
    async fn find_record(
        &self,
        domain: &Domain,
        record_type: RecordType,
    ) -> Result<Option<RecordMetadata>>;

    /// Create a record
    async fn create_record(&self, domain: &Domain, record_type: RecordType, addr: &str)
    -> Result<()>;

    /// Point an existing record at a new value
    async fn modify_record(
        &self,
        record: &RecordMetadata,
        domain: &Domain,
        record_type: RecordType,
        addr: &str,
    ) -> Result<()>;
}
