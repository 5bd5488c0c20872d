//! Loop for drivers that push an address without looking anything up
//!
//! Dynamic-DNS style endpoints accept "set this name to this address" and
//! decide themselves whether anything changed.

use async_trait::async_trait;
use ddns_core::reconcile::{RecordAction, apply_pending};
use ddns_core::{Domain, Domains, RecordType, Result};

/// One-shot write capability
///
/// `push` answers [`RecordAction::Modified`] when the endpoint wrote the
/// address and [`RecordAction::Unchanged`] when it already had it.
#[async_trait]
pub(crate) trait PushApi: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn push(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Result<RecordAction>;
}

/// Push every pending family of a Domain Set
pub(crate) async fn push_domain_records<A: PushApi + ?Sized>(api: &A, domains: &mut Domains) {
    apply_pending(api.provider_name(), domains, move |domain, record_type, addr| async move {
        api.push(&domain, record_type, &addr).await
    })
    .await;
}
