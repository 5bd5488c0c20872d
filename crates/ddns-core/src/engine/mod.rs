//! Reconciliation scheduler
//!
//! The Scheduler is responsible for:
//! - Loading the (cached) configuration each cycle
//! - Keeping the IP cache aligned with the configured entries
//! - Leaving out entries that fail validation
//! - Resolving addresses and deciding which families need a comparison
//! - Running each entry's driver, then the notifier, strictly in sequence
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!                  │  Scheduler   │◄── force_compare()
//!                  └──────────────┘
//!                         │ per entry, sequentially
//!     ┌───────────────────┼────────────────────┬──────────────────┐
//!     ▼                   ▼                    ▼                  ▼
//! ┌──────────┐     ┌──────────────┐     ┌─────────────┐     ┌──────────┐
//! │ Address  │     │ IpCacheArena │     │ DnsProvider │     │ Notifier │
//! │ Resolver │     │ (compare?)   │     │ (reconcile) │     │ (report) │
//! └──────────┘     └──────────────┘     └─────────────┘     └──────────┘
//! ```
//!
//! ## State Machine
//!
//! `Idle -> Waiting(first_delay) -> {RunCycle -> Sleep(interval)}*`, left only
//! through the shutdown channel (or SIGINT when none is given).

use crate::cache::{DEFAULT_REFRESH_TIMES, IpCacheArena};
use crate::domains::{Domains, RecordType, UpdateStatus};
use crate::error::Result;
use crate::registry::ProviderRegistry;
use crate::store::ConfigStore;
use crate::traits::Notifier;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Events emitted by the Scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Scheduler started, waiting for the first cycle
    Started { first_delay_secs: u64 },

    /// A cycle began
    CycleStarted { entries: usize },

    /// The IP cache was rebuilt wholesale
    CacheRebuilt { entries: usize },

    /// An entry failed validation and was left out of the cycle
    EntrySkipped { provider: String, reason: String },

    /// One entry was reconciled and notified
    EntryCompleted {
        provider: String,
        succeeded: usize,
        failed: usize,
    },

    /// No configuration could be loaded; the cycle did nothing
    CycleSkipped { reason: String },

    /// No address could be resolved for any entry
    NetworkLost,

    /// An address resolved again after a network loss
    NetworkRestored,

    /// Scheduler stopped
    Stopped { reason: String },
}

/// Timing and cache settings
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Delay before the first cycle
    pub first_delay: Duration,

    /// Delay between cycles
    pub interval: Duration,

    /// Unchanged cycles allowed before the provider is consulted anyway
    pub ip_cache_times: u32,

    /// Capacity of the event channel; events are dropped (with a warning) when full
    pub event_channel_capacity: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            first_delay: Duration::ZERO,
            interval: Duration::from_secs(300),
            ip_cache_times: DEFAULT_REFRESH_TIMES,
            event_channel_capacity: 1000,
        }
    }
}

/// Outcome of one entry in one cycle
#[derive(Debug, Clone)]
pub struct EntryReport {
    /// Provider name as configured
    pub provider: String,
    /// Domain Set with final statuses
    pub domains: Domains,
}

impl EntryReport {
    fn count(&self, status: UpdateStatus) -> usize {
        self.domains
            .iter()
            .filter(|d| d.update_status == status)
            .count()
    }
}

/// Outcome of one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// One report per valid entry, in configuration order
    pub entries: Vec<EntryReport>,
    /// Whether the IP cache was rebuilt before this cycle
    pub cache_rebuilt: bool,
}

/// Core reconciliation scheduler
///
/// ## Lifecycle
///
/// 1. Create with [`Scheduler::new()`]
/// 2. Start with [`Scheduler::run()`] or [`Scheduler::run_with_shutdown()`]
/// 3. Or drive cycles yourself with [`Scheduler::run_once()`]
///
/// ## Concurrency
///
/// Cycles never overlap: the IP cache lock is held for a whole cycle, and
/// entries are processed one after the other.
pub struct Scheduler {
    /// Cached configuration handle
    store: Arc<ConfigStore>,

    /// Drivers and resolvers
    registry: Arc<ProviderRegistry>,

    /// Post-entry notification
    notifier: Arc<dyn Notifier>,

    /// Last submitted address per entry and family
    cache: Mutex<IpCacheArena>,

    /// Rebuild the cache (compare everything) on the next cycle
    force: AtomicBool,

    /// Last cycle could not resolve any address
    offline: AtomicBool,

    /// Timing settings
    settings: SchedulerSettings,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SchedulerEvent>,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// # Parameters
    ///
    /// - `store`: Configuration handle shared with any config editor
    /// - `registry`: Registered drivers and resolvers
    /// - `notifier`: Invoked after every entry
    /// - `settings`: Timing and cache settings
    ///
    /// # Returns
    ///
    /// A tuple of (scheduler, event_receiver) where event_receiver yields scheduler events
    pub fn new(
        store: Arc<ConfigStore>,
        registry: Arc<ProviderRegistry>,
        notifier: Arc<dyn Notifier>,
        settings: SchedulerSettings,
    ) -> (Self, mpsc::Receiver<SchedulerEvent>) {
        let (tx, rx) = mpsc::channel(settings.event_channel_capacity.max(1));

        let scheduler = Self {
            store,
            registry,
            notifier,
            cache: Mutex::new(IpCacheArena::new(settings.ip_cache_times)),
            force: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            settings,
            event_tx: tx,
        };

        (scheduler, rx)
    }

    /// Compare every family with its provider on the next cycle,
    /// regardless of the IP cache
    pub fn force_compare(&self) {
        self.force.store(true, Ordering::SeqCst);
    }

    /// Whether the last cycle failed to resolve any address
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Number of entries the IP cache currently tracks
    pub async fn cached_entries(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Run the scheduler until SIGINT
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    pub async fn run(&self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run the scheduler until the shutdown channel fires
    ///
    /// # Parameters
    ///
    /// - `shutdown_rx`: Stops the loop at the next await point when a value is
    ///   sent or the sender is dropped; `None` waits for SIGINT instead
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for SIGINT: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        info!(
            "First cycle in {}s, then every {}s",
            self.settings.first_delay.as_secs(),
            self.settings.interval.as_secs()
        );
        self.emit_event(SchedulerEvent::Started {
            first_delay_secs: self.settings.first_delay.as_secs(),
        });

        tokio::select! {
            _ = tokio::time::sleep(self.settings.first_delay) => {}
            _ = &mut shutdown => {
                self.stopped();
                return Ok(());
            }
        }

        loop {
            tokio::select! {
                result = self.run_once() => {
                    if let Err(e) = result {
                        warn!("Cycle skipped: {}", e);
                        self.emit_event(SchedulerEvent::CycleSkipped {
                            reason: e.to_string(),
                        });
                    }
                }
                _ = &mut shutdown => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                _ = &mut shutdown => break,
            }
        }

        self.stopped();
        Ok(())
    }

    fn stopped(&self) {
        info!("Shutdown signal received, scheduler stopped");
        self.emit_event(SchedulerEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });
    }

    /// Run one reconciliation cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleReport)`: Every entry was processed (individual domains may have failed)
    /// - `Err(Error::Config)`: No configuration could be loaded; nothing was done
    pub async fn run_once(&self) -> Result<CycleReport> {
        let config = self.store.get().await?;
        let force = self.force.swap(false, Ordering::SeqCst);

        let mut cache = self.cache.lock().await;
        let (keys, rebuilt) = cache.sync(&config.dns_conf, force);

        self.emit_event(SchedulerEvent::CycleStarted {
            entries: config.dns_conf.len(),
        });
        if rebuilt {
            self.emit_event(SchedulerEvent::CacheRebuilt {
                entries: keys.len(),
            });
        }

        let mut report = CycleReport {
            entries: Vec::with_capacity(config.dns_conf.len()),
            cache_rebuilt: rebuilt,
        };
        let mut attempted = 0usize;
        let mut resolved = 0usize;
        let mut compare_all = false;

        for (entry, key) in config.dns_conf.iter().zip(keys.iter()) {
            let provider_name = entry.dns.name.clone();
            if let Err(reason) = entry.validate() {
                warn!("[{}] Skipping invalid entry: {}", provider_name, reason);
                self.emit_event(SchedulerEvent::EntrySkipped {
                    provider: provider_name,
                    reason,
                });
                continue;
            }
            let mut domains = Domains::from_entry(entry);

            for record_type in RecordType::ALL {
                let family = match record_type {
                    RecordType::A => &entry.ipv4,
                    RecordType::Aaaa => &entry.ipv6,
                };
                if !family.enable || domains.family(record_type).domains.is_empty() {
                    continue;
                }
                attempted += 1;

                let addr = match self.registry.resolver(family.get_type) {
                    Ok(resolver) => resolver.resolve(record_type, family).await,
                    Err(e) => {
                        warn!("[{}] {}", provider_name, e);
                        String::new()
                    }
                };
                if addr.is_empty() {
                    continue;
                }
                resolved += 1;

                if self.offline.swap(false, Ordering::SeqCst) {
                    info!("Network is back, comparing every record this cycle");
                    self.emit_event(SchedulerEvent::NetworkRestored);
                    compare_all = true;
                }

                let changed = cache.check(key, record_type, &addr);
                if !changed && !compare_all {
                    debug!(
                        "[{}] {} address {} unchanged, skipping",
                        provider_name, record_type, addr
                    );
                }
                domains.set_address(record_type, addr, changed || compare_all);
            }

            match self.registry.create_provider(entry) {
                Ok(provider) => provider.add_update_domain_records(&mut domains).await,
                Err(e) => {
                    error!("[{}] Failed to initialise provider: {}", provider_name, e);
                    domains.fail_pending();
                }
            }

            // A family the provider did not fully accept is compared again next cycle
            for record_type in RecordType::ALL {
                if domains.pending_addr(record_type).is_some()
                    && domains.family(record_type).result() == UpdateStatus::Failed
                {
                    debug!(
                        "[{}] {} update failed, clearing cached address",
                        provider_name, record_type
                    );
                    cache.forget(key, record_type);
                }
            }

            self.notifier.notify(&domains, &config).await;

            let entry_report = EntryReport {
                provider: provider_name,
                domains,
            };
            self.emit_event(SchedulerEvent::EntryCompleted {
                provider: entry_report.provider.clone(),
                succeeded: entry_report.count(UpdateStatus::Success),
                failed: entry_report.count(UpdateStatus::Failed),
            });
            report.entries.push(entry_report);
        }

        if attempted > 0 && resolved == 0 && !self.offline.swap(true, Ordering::SeqCst) {
            warn!("No address could be resolved, assuming the network is down");
            self.emit_event(SchedulerEvent::NetworkLost);
        }

        Ok(report)
    }

    /// Emit a scheduler event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: SchedulerEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_event_clone_eq() {
        let event = SchedulerEvent::EntryCompleted {
            provider: "alidns".to_string(),
            succeeded: 1,
            failed: 0,
        };
        assert_eq!(event.clone(), event);
    }

    #[test]
    fn test_default_settings() {
        let settings = SchedulerSettings::default();
        assert_eq!(settings.interval, Duration::from_secs(300));
        assert_eq!(settings.ip_cache_times, 5);
        assert_eq!(settings.first_delay, Duration::ZERO);
    }
}
