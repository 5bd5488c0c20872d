//! Architectural Contract Test: IP Cache Invalidation
//!
//! Constraints verified:
//! - Changing the number of configured entries rebuilds the IP cache
//!   wholesale before the next cycle runs
//! - The rebuilt cache tracks exactly the new entries
//! - Saving an unchanged number of entries keeps the history of the
//!   entries that survived
//!
//! If this test fails, per-entry cache state can leak across config edits.

mod common;

use common::*;
use ddns_core::config::Config;
use ddns_core::{RecordType, Scheduler, SchedulerEvent, SchedulerSettings};
use std::sync::Arc;

#[tokio::test]
async fn entry_count_change_rebuilds_cache() {
    let zone = MemoryZone::new("memory");
    let resolver = ScriptedResolver::new();
    resolver.answer(RecordType::A, "203.0.113.5");
    let (_dir, store) = config_store(vec![ipv4_entry("memory", &["a.example.com"])]).await;
    let (scheduler, mut event_rx) = Scheduler::new(
        Arc::clone(&store),
        registry_with(&zone, &resolver),
        Arc::new(RecordingNotifier::new()),
        SchedulerSettings::default(),
    );

    let first = scheduler.run_once().await.unwrap();
    assert!(first.cache_rebuilt);
    assert_eq!(scheduler.cached_entries().await, 1);

    let second = scheduler.run_once().await.unwrap();
    assert!(!second.cache_rebuilt);
    assert_eq!(zone.find_count(), 1);

    // Add an entry through the store, as a config editor would
    store
        .save(&Config {
            dns_conf: vec![
                ipv4_entry("memory", &["a.example.com"]),
                ipv4_entry("memory", &["b.example.com"]),
            ],
            ..Default::default()
        })
        .await
        .unwrap();

    let third = scheduler.run_once().await.unwrap();
    assert!(third.cache_rebuilt);
    assert_eq!(third.entries.len(), 2);
    assert_eq!(scheduler.cached_entries().await, 2);
    // The surviving entry lost its history too, so it was compared again
    assert_eq!(zone.find_count(), 3);
    assert_eq!(zone.create_count(), 2);

    let mut rebuilt_sizes = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        if let SchedulerEvent::CacheRebuilt { entries } = event {
            rebuilt_sizes.push(entries);
        }
    }
    assert_eq!(rebuilt_sizes, vec![1, 2]);
}

#[tokio::test]
async fn replacing_an_entry_keeps_other_history() {
    let zone = MemoryZone::new("memory");
    let resolver = ScriptedResolver::new();
    resolver.answer(RecordType::A, "203.0.113.5");
    let (_dir, store) = config_store(vec![
        ipv4_entry("memory", &["a.example.com"]),
        ipv4_entry("memory", &["b.example.com"]),
    ])
    .await;
    let (scheduler, _event_rx) = Scheduler::new(
        Arc::clone(&store),
        registry_with(&zone, &resolver),
        Arc::new(RecordingNotifier::new()),
        SchedulerSettings::default(),
    );
    scheduler.run_once().await.unwrap();
    assert_eq!(zone.find_count(), 2);

    // Same count, reordered, one entry swapped for another
    store
        .save(&Config {
            dns_conf: vec![
                ipv4_entry("memory", &["c.example.com"]),
                ipv4_entry("memory", &["a.example.com"]),
            ],
            ..Default::default()
        })
        .await
        .unwrap();

    let report = scheduler.run_once().await.unwrap();
    assert!(!report.cache_rebuilt);
    assert_eq!(scheduler.cached_entries().await, 2);
    // Only the new entry reached the provider
    assert_eq!(zone.find_count(), 3);
    assert_eq!(
        zone.value("c.example.com", RecordType::A).as_deref(),
        Some("203.0.113.5")
    );
}
