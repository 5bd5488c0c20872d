// # Notifier Trait
//
// Invoked after each provider entry has been reconciled, with the finished
// Domain Set and the configuration that produced it.

use crate::config::Config;
use crate::domains::Domains;
use async_trait::async_trait;

/// Trait for post-cycle notification
///
/// Delivery failures are the notifier's own business: they are logged and
/// never reach the scheduler.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report the outcome of one entry
    ///
    /// # Parameters
    ///
    /// - `domains`: Domain Set with final `UpdateStatus` values
    /// - `config`: The active configuration
    async fn notify(&self, domains: &Domains, config: &Config);
}

/// Notifier that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _domains: &Domains, _config: &Config) {}
}
