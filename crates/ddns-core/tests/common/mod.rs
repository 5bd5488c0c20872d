//! Test doubles and common utilities for scheduler contract tests
//!
//! The doubles keep their counters behind `Arc`s so a test can hand one
//! instance to the registry and keep a twin for assertions.

#![allow(dead_code)]

use async_trait::async_trait;
use ddns_core::config::{AddressSource, Config, DnsEntry, FamilyConfig};
use ddns_core::error::{Error, Result};
use ddns_core::reconcile::Reconciler;
use ddns_core::traits::{
    AddressResolver, DnsProvider, DnsProviderFactory, Notifier, RecordApi, RecordMetadata,
};
use ddns_core::{ConfigStore, Domain, Domains, ProviderRegistry, RecordType};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// A resolver whose answers the test controls
#[derive(Clone)]
pub struct ScriptedResolver {
    /// Address per record type; missing means "resolution failed"
    answers: Arc<Mutex<HashMap<RecordType, String>>>,
    /// Call counter for lookup()
    lookup_count: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn new() -> Self {
        Self {
            answers: Arc::new(Mutex::new(HashMap::new())),
            lookup_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer `addr` for a record type from now on
    pub fn answer(&self, record_type: RecordType, addr: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(record_type, addr.to_string());
    }

    /// Fail every lookup for a record type from now on
    pub fn fail(&self, record_type: RecordType) {
        self.answers.lock().unwrap().remove(&record_type);
    }

    /// Get the number of times lookup() was called
    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressResolver for ScriptedResolver {
    async fn lookup(&self, record_type: RecordType, _family: &FamilyConfig) -> Result<String> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .get(&record_type)
            .cloned()
            .ok_or_else(|| Error::resolution("scripted failure"))
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// An in-memory provider account shared by every driver the factory creates
#[derive(Clone)]
pub struct MemoryZone {
    /// Published records, keyed by "fqdn/TYPE"
    records: Arc<Mutex<HashMap<String, String>>>,
    /// Call counter for find_record()
    find_count: Arc<AtomicUsize>,
    /// Call counter for create_record()
    create_count: Arc<AtomicUsize>,
    /// Call counter for modify_record()
    modify_count: Arc<AtomicUsize>,
    /// Name reported by the drivers
    pub name: &'static str,
}

impl MemoryZone {
    pub fn new(name: &'static str) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            find_count: Arc::new(AtomicUsize::new(0)),
            create_count: Arc::new(AtomicUsize::new(0)),
            modify_count: Arc::new(AtomicUsize::new(0)),
            name,
        }
    }

    /// Publish a record as if it already existed remotely
    pub fn publish(&self, fqdn: &str, record_type: RecordType, value: &str) {
        self.records
            .lock()
            .unwrap()
            .insert(format!("{}/{}", fqdn, record_type), value.to_string());
    }

    /// Currently published value
    pub fn value(&self, fqdn: &str, record_type: RecordType) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(&format!("{}/{}", fqdn, record_type))
            .cloned()
    }

    pub fn find_count(&self) -> usize {
        self.find_count.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.create_count.load(Ordering::SeqCst)
    }

    pub fn modify_count(&self) -> usize {
        self.modify_count.load(Ordering::SeqCst)
    }

    /// Total number of write calls
    pub fn write_count(&self) -> usize {
        self.create_count() + self.modify_count()
    }
}

#[async_trait]
impl RecordApi for MemoryZone {
    fn provider_name(&self) -> &'static str {
        self.name
    }

    async fn find_record(
        &self,
        domain: &Domain,
        record_type: RecordType,
    ) -> Result<Option<RecordMetadata>> {
        self.find_count.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .value(&domain.fqdn(), record_type)
            .map(|value| RecordMetadata::new("mem", domain.fqdn(), value)))
    }

    async fn create_record(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Result<()> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        self.publish(&domain.fqdn(), record_type, addr);
        Ok(())
    }

    async fn modify_record(
        &self,
        _record: &RecordMetadata,
        domain: &Domain,
        record_type: RecordType,
        addr: &str,
    ) -> Result<()> {
        self.modify_count.fetch_add(1, Ordering::SeqCst);
        self.publish(&domain.fqdn(), record_type, addr);
        Ok(())
    }
}

/// Factory creating drivers over a shared [`MemoryZone`]
pub struct MemoryZoneFactory {
    zone: MemoryZone,
    /// Call counter for create()
    init_count: Arc<AtomicUsize>,
}

impl MemoryZoneFactory {
    pub fn new(zone: &MemoryZone) -> Self {
        Self {
            zone: zone.clone(),
            init_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl DnsProviderFactory for MemoryZoneFactory {
    fn create(&self, _entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        self.init_count.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Reconciler::new(self.zone.clone())))
    }
}

/// Factory whose drivers can never be created
pub struct BrokenFactory;

impl DnsProviderFactory for BrokenFactory {
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        Err(Error::config(format!("{} has no credentials", entry.dns.name)))
    }
}

/// A notifier that records every Domain Set it receives
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    received: Arc<Mutex<Vec<Domains>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Domain Sets received so far
    pub fn received(&self) -> Vec<Domains> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, domains: &Domains, _config: &Config) {
        self.received.lock().unwrap().push(domains.clone());
    }
}

/// An entry managing IPv4 for the given domains
pub fn ipv4_entry(provider: &str, domains: &[&str]) -> DnsEntry {
    DnsEntry {
        ipv4: FamilyConfig {
            enable: true,
            get_type: AddressSource::Url,
            url: "https://ip.example.test".to_string(),
            domains: domains.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        },
        dns: ddns_core::DnsCredentials {
            name: provider.to_string(),
            id: "id".to_string(),
            secret: "secret".to_string(),
        },
        ..Default::default()
    }
}

/// Persist a configuration into a fresh temporary directory
///
/// The returned `TempDir` must outlive the store.
pub async fn config_store(entries: Vec<DnsEntry>) -> (TempDir, Arc<ConfigStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ConfigStore::new(dir.path().join("ddns_config.json")));
    store
        .save(&Config {
            dns_conf: entries,
            ..Default::default()
        })
        .await
        .unwrap();
    (dir, store)
}

/// Registry with one in-memory provider registered as "memory" and as the default
pub fn registry_with(zone: &MemoryZone, resolver: &ScriptedResolver) -> Arc<ProviderRegistry> {
    let registry = ProviderRegistry::new();
    registry.register_provider("memory", Box::new(MemoryZoneFactory::new(zone)));
    registry.set_default_provider("memory");
    registry.register_resolver(AddressSource::Url, Arc::new(resolver.clone()));
    Arc::new(registry)
}
