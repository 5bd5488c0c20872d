//! Plugin-based provider registry
//!
//! The registry maps provider names to driver factories and address sources
//! to resolvers, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ddns_core::registry::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! ddns_providers::register(&registry, transport);
//! ddns_ip_http::register(&registry);
//!
//! let provider = registry.create_provider(&entry)?;
//! ```
//!
//! ## Unknown Names
//!
//! An entry naming a provider that is not registered falls back to the
//! default provider ("alidns" unless changed), with a warning.

use crate::config::{AddressSource, DnsEntry};
use crate::error::{Error, Result};
use crate::traits::{AddressResolver, DnsProvider, DnsProviderFactory};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// Provider used for unrecognised names
pub const DEFAULT_PROVIDER: &str = "alidns";

/// Provider registry for plugin-based driver creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
pub struct ProviderRegistry {
    /// Registered driver factories
    providers: RwLock<HashMap<String, Box<dyn DnsProviderFactory>>>,

    /// Registered address resolvers
    resolvers: RwLock<HashMap<AddressSource, Arc<dyn AddressResolver>>>,

    /// Fallback provider name
    default_provider: RwLock<String>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            resolvers: RwLock::new(HashMap::new()),
            default_provider: RwLock::new(DEFAULT_PROVIDER.to_string()),
        }
    }
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider name as written in configuration (e.g., "alidns", "cloudflare")
    /// - `factory`: Factory object for creating driver instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn DnsProviderFactory>) {
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        providers.insert(name.into(), factory);
    }

    /// Register the resolver for an address source
    ///
    /// # Parameters
    ///
    /// - `source`: Strategy the resolver implements
    /// - `resolver`: Shared resolver instance
    pub fn register_resolver(&self, source: AddressSource, resolver: Arc<dyn AddressResolver>) {
        let mut resolvers = self.resolvers.write().unwrap_or_else(PoisonError::into_inner);
        resolvers.insert(source, resolver);
    }

    /// Change the fallback provider
    pub fn set_default_provider(&self, name: impl Into<String>) {
        *self
            .default_provider
            .write()
            .unwrap_or_else(PoisonError::into_inner) = name.into();
    }

    /// Current fallback provider name
    pub fn default_provider(&self) -> String {
        self.default_provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Create (initialise) the driver for a configuration entry
    ///
    /// # Parameters
    ///
    /// - `entry`: Configuration entry naming the provider
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsProvider>)`: Driver for the named or default provider
    /// - `Err(Error)`: Neither is registered, or the factory rejected the entry
    pub fn create_provider(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);

        let name = entry.dns.name.as_str();
        let factory = match providers.get(name) {
            Some(factory) => factory,
            None => {
                let fallback = self.default_provider();
                warn!("Unknown provider '{}', falling back to '{}'", name, fallback);
                providers.get(&fallback).ok_or_else(|| {
                    Error::config(format!("Default provider '{}' is not registered", fallback))
                })?
            }
        };

        factory.create(entry)
    }

    /// Resolver for an address source
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn AddressResolver>)`: The registered resolver
    /// - `Err(Error::Config)`: No resolver for this source
    pub fn resolver(&self, source: AddressSource) -> Result<Arc<dyn AddressResolver>> {
        let resolvers = self.resolvers.read().unwrap_or_else(PoisonError::into_inner);
        resolvers.get(&source).cloned().ok_or_else(|| {
            Error::config(format!("No address resolver registered for '{}'", source.as_str()))
        })
    }

    /// List all registered provider names
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider name is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        providers.contains_key(name)
    }
}
