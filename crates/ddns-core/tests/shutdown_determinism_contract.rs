//! Architectural Contract Test: Shutdown Determinism
//!
//! Constraints verified:
//! - The scheduler terminates on the shutdown signal, whether it is waiting
//!   for the first cycle or sleeping between cycles
//! - Dropping the shutdown sender also terminates it
//! - The first cycle runs right after the first delay
//! - Started and Stopped events bracket the run
//!
//! If this test fails, someone has added:
//! - Detached background tasks
//! - Sleeps that ignore cancellation

mod common;

use common::*;
use ddns_core::{RecordType, Scheduler, SchedulerEvent, SchedulerSettings};
use std::sync::Arc;
use std::time::Duration;

fn long_sleeps() -> SchedulerSettings {
    SchedulerSettings {
        first_delay: Duration::ZERO,
        interval: Duration::from_secs(3600),
        ..Default::default()
    }
}

#[tokio::test]
async fn shutdown_signal_terminates_scheduler() {
    let zone = MemoryZone::new("memory");
    let resolver = ScriptedResolver::new();
    resolver.answer(RecordType::A, "203.0.113.5");
    let (_dir, store) = config_store(vec![ipv4_entry("memory", &["home.example.com"])]).await;
    let (scheduler, mut event_rx) = Scheduler::new(
        store,
        registry_with(&zone, &resolver),
        Arc::new(RecordingNotifier::new()),
        long_sleeps(),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { scheduler.run_with_shutdown(Some(shutdown_rx)).await });

    // Wait for the first cycle to finish
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while zone.create_count() == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(zone.create_count(), 1, "first cycle runs immediately");

    // Now sleeping for an hour
    shutdown_tx.send(()).expect("shutdown signal send succeeds");

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "Scheduler should terminate within 5 seconds");
    let run_result = result.unwrap().unwrap();
    assert!(run_result.is_ok(), "Scheduler should shut down cleanly: {:?}", run_result);

    let mut events = Vec::new();
    while let Ok(event) = event_rx.try_recv() {
        events.push(event);
    }
    assert_eq!(
        events.first(),
        Some(&SchedulerEvent::Started {
            first_delay_secs: 0
        })
    );
    assert!(matches!(events.last(), Some(SchedulerEvent::Stopped { .. })));
}

#[tokio::test]
async fn shutdown_during_first_delay() {
    let zone = MemoryZone::new("memory");
    let resolver = ScriptedResolver::new();
    resolver.answer(RecordType::A, "203.0.113.5");
    let (_dir, store) = config_store(vec![ipv4_entry("memory", &["home.example.com"])]).await;
    let (scheduler, _event_rx) = Scheduler::new(
        store,
        registry_with(&zone, &resolver),
        Arc::new(RecordingNotifier::new()),
        SchedulerSettings {
            first_delay: Duration::from_secs(3600),
            ..Default::default()
        },
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move { scheduler.run_with_shutdown(Some(shutdown_rx)).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "Scheduler should terminate within 5 seconds");
    assert_eq!(resolver.lookup_count(), 0, "no cycle ran");
}

#[tokio::test]
async fn dropped_sender_terminates_scheduler() {
    let zone = MemoryZone::new("memory");
    let resolver = ScriptedResolver::new();
    let (_dir, store) = config_store(vec![]).await;
    let (scheduler, _event_rx) = Scheduler::new(
        store,
        registry_with(&zone, &resolver),
        Arc::new(RecordingNotifier::new()),
        long_sleeps(),
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(async move { scheduler.run_with_shutdown(Some(shutdown_rx)).await });

    drop(shutdown_tx);

    let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
    assert!(result.is_ok(), "Scheduler should terminate within 5 seconds");
    assert!(result.unwrap().unwrap().is_ok());
}
