// # Address Resolver Trait
//
// Defines the interface for obtaining the current IPv4/IPv6 address.
//
// ## Implementations
//
// - HTTP endpoint (`url`): `ddns-ip-http` crate
// - Local interface table (`netInterface`): `ddns-ip-local` crate

use crate::config::FamilyConfig;
use crate::domains::RecordType;
use crate::error::Result;
use async_trait::async_trait;
use tracing::warn;

/// Trait for address resolver implementations
///
/// Resolvers are stateless: each call performs one lookup. They never retry
/// and never cache; the scheduler owns both concerns.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Look up the current address of a family
    ///
    /// # Parameters
    ///
    /// - `record_type`: `A` for IPv4, `AAAA` for IPv6
    /// - `family`: Settings of that family (URL, interface name)
    ///
    /// # Returns
    ///
    /// - `Ok(addr)`: A validated address literal
    /// - `Err(Error::Resolution)`: Request failed or nothing matched
    async fn lookup(&self, record_type: RecordType, family: &FamilyConfig) -> Result<String>;

    /// Resolve without failing
    ///
    /// # Returns
    ///
    /// The address, or an empty string (logged as a warning) when the
    /// family is disabled or the lookup failed
    async fn resolve(&self, record_type: RecordType, family: &FamilyConfig) -> String {
        if !family.enable {
            return String::new();
        }
        match self.lookup(record_type, family).await {
            Ok(addr) => addr,
            Err(e) => {
                warn!(
                    "Failed to resolve {} address via {}: {}",
                    record_type,
                    family.get_type.as_str(),
                    e
                );
                String::new()
            }
        }
    }

    /// Get the resolver name (for logging/debugging)
    fn resolver_name(&self) -> &'static str;
}
