// # ddns-core
//
// Core library for the multi-provider DDNS reconciliation system.
//
// ## Architecture Overview
//
// This library owns everything that is provider-agnostic:
// - **Config / ConfigStore**: The persisted configuration and its lazily cached handle
// - **Domains**: The per-cycle Domain Set with per-domain update status
// - **IpCacheArena**: Last submitted address per entry and family
// - **HttpTransport**: The HTTP contract drivers talk through
// - **RecordApi / reconcile**: The shared find/compare/create/modify algorithm
// - **ProviderRegistry**: Plugin-based registry for drivers and address resolvers
// - **Scheduler**: Runs the reconciliation cycle immediately and then on an interval
//
// ## Design Principles
//
// 1. **Core-first**: No HTTP client or signing code lives here
// 2. **Plugin-based**: Drivers are registered by name, no hard-coded if-else
// 3. **Contained failures**: One provider entry never aborts another
// 4. **Idempotency**: An already-published address never produces a write

pub mod address;
pub mod cache;
pub mod config;
pub mod domains;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod registry;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use cache::{EntryKey, IpCache, IpCacheArena};
pub use config::{AddressSource, Config, DnsCredentials, DnsEntry, FamilyConfig, WebhookConfig};
pub use domains::{Domain, Domains, RecordType, UpdateStatus};
pub use engine::{CycleReport, EntryReport, Scheduler, SchedulerEvent, SchedulerSettings};
pub use error::{Error, Result, TransportErrorKind};
pub use registry::ProviderRegistry;
pub use store::ConfigStore;
pub use traits::{
    AddressResolver, DnsProvider, DnsProviderFactory, HttpRequest,
    HttpResponse, HttpTransport, Method, Notifier, RecordApi, RecordMetadata,
};
