//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`HttpTransport`]: Send provider API requests
//! - [`DnsProvider`]: Reconcile one entry's domains with a provider
//! - [`RecordApi`]: Find/create/modify calls of a list-then-write provider
//! - [`AddressResolver`]: Obtain the current IPv4/IPv6 address
//! - [`Notifier`]: Report the outcome of a cycle

pub mod address_resolver;
pub mod dns_provider;
pub mod notifier;
pub mod transport;

pub use address_resolver::AddressResolver;
pub use dns_provider::{DnsProvider, DnsProviderFactory, RecordApi, RecordMetadata};
pub use notifier::{NoopNotifier, Notifier};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, expect_success, fetch_json, fetch_text};
