//! Shared reconciliation algorithm
//!
//! For each record type with a pending address, for each domain:
//!
//! ```text
//! find_record ──► exact match, same value ──► Success (no write)
//!             ├─► exact match, other value ──► modify_record ──► Success / Failed
//!             └─► no match ──────────────────► create_record ──► Success / Failed
//! ```
//!
//! ## Failure Containment
//!
//! - Auth or signing failure: every still-unset pending domain of the entry
//!   is marked failed and the entry stops
//! - Transport failure (network, timeout, decode, 429, 5xx): this domain and
//!   the remaining unset domains of the record type are marked failed; the
//!   next record type still runs
//! - Anything else: this domain is marked failed and the loop continues

use crate::domains::{Domain, Domains, RecordType, UpdateStatus};
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, RecordApi};
use async_trait::async_trait;
use std::future::Future;
use std::net::IpAddr;
use tracing::{debug, error, info};

/// What happened to one domain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    /// Remote value already equal, nothing written
    Unchanged,
    /// New record created
    Created,
    /// Existing record updated
    Modified,
}

/// How a record-type loop ended
enum Flow {
    Continue,
    StopEntry,
}

/// Adapter turning a [`RecordApi`] into a [`DnsProvider`]
pub struct Reconciler<A> {
    api: A,
}

impl<A: RecordApi> Reconciler<A> {
    /// Wrap a driver's wire calls
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// The wrapped driver
    pub fn api(&self) -> &A {
        &self.api
    }
}

#[async_trait]
impl<A: RecordApi> DnsProvider for Reconciler<A> {
    async fn add_update_domain_records(&self, domains: &mut Domains) {
        add_update_domain_records(&self.api, domains).await;
    }

    fn provider_name(&self) -> &'static str {
        self.api.provider_name()
    }
}

/// Reconcile every pending family of a Domain Set
///
/// # Parameters
///
/// - `api`: Driver wire calls
/// - `domains`: Domain Set; statuses are written in place
pub async fn add_update_domain_records<A: RecordApi + ?Sized>(api: &A, domains: &mut Domains) {
    apply_pending(api.provider_name(), domains, move |domain, record_type, addr| async move {
        reconcile_domain(api, &domain, record_type, &addr).await
    })
    .await;
}

/// Run `attempt` for every domain of every pending family
///
/// Outcomes are written into the Domain Set under the failure containment
/// rules of this module, so drivers that do not fit the find/compare/write
/// loop still share them.
///
/// # Parameters
///
/// - `provider`: Provider name for logging
/// - `domains`: Domain Set; statuses are written in place
/// - `attempt`: Called with the domain, record type and address to publish
pub async fn apply_pending<F, Fut>(provider: &str, domains: &mut Domains, mut attempt: F)
where
    F: FnMut(Domain, RecordType, String) -> Fut,
    Fut: Future<Output = Result<RecordAction>>,
{
    for record_type in RecordType::ALL {
        let Some(addr) = domains.pending_addr(record_type).map(str::to_owned) else {
            continue;
        };
        let list = domains.domains_mut(record_type);
        let flow = apply_family(provider, list, record_type, &addr, &mut attempt).await;
        if let Flow::StopEntry = flow {
            domains.fail_pending();
            return;
        }
    }
}

async fn apply_family<F, Fut>(
    provider: &str,
    list: &mut [Domain],
    record_type: RecordType,
    addr: &str,
    attempt: &mut F,
) -> Flow
where
    F: FnMut(Domain, RecordType, String) -> Fut,
    Fut: Future<Output = Result<RecordAction>>,
{
    for index in 0..list.len() {
        let result = attempt(list[index].clone(), record_type, addr.to_string()).await;
        let domain = &list[index];
        match result {
            Ok(action) => {
                match action {
                    RecordAction::Unchanged => {
                        debug!("[{}] {} {} already points at {}", provider, domain, record_type, addr)
                    }
                    RecordAction::Created => {
                        info!("[{}] Created {} {} -> {}", provider, domain, record_type, addr)
                    }
                    RecordAction::Modified => {
                        info!("[{}] Updated {} {} -> {}", provider, domain, record_type, addr)
                    }
                }
                list[index].update_status = UpdateStatus::Success;
            }
            Err(e) if e.is_auth_failure() => {
                error!("[{}] Authentication failed for {}: {}", provider, domain, e);
                list[index].update_status = UpdateStatus::Failed;
                return Flow::StopEntry;
            }
            Err(e) if e.aborts_record_loop() => {
                error!(
                    "[{}] Giving up on remaining {} records after {}: {}",
                    provider, record_type, domain, e
                );
                for remaining in &mut list[index..] {
                    if remaining.update_status == UpdateStatus::Unset {
                        remaining.update_status = UpdateStatus::Failed;
                    }
                }
                return Flow::Continue;
            }
            Err(e) => {
                error!("[{}] Failed to update {} {}: {}", provider, domain, record_type, e);
                list[index].update_status = UpdateStatus::Failed;
            }
        }
    }

    Flow::Continue
}

/// Reconcile a single domain
///
/// The matching record is resolved before any comparison happens.
pub async fn reconcile_domain<A: RecordApi + ?Sized>(
    api: &A,
    domain: &Domain,
    record_type: RecordType,
    addr: &str,
) -> Result<RecordAction> {
    match api.find_record(domain, record_type).await? {
        Some(record) if same_address(&record.value, addr) => Ok(RecordAction::Unchanged),
        Some(record) => {
            api.modify_record(&record, domain, record_type, addr).await?;
            Ok(RecordAction::Modified)
        }
        None => {
            api.create_record(domain, record_type, addr).await?;
            Ok(RecordAction::Created)
        }
    }
}

/// Compare two address literals, ignoring IPv6 spelling differences
pub fn same_address(a: &str, b: &str) -> bool {
    match (a.trim().parse::<IpAddr>(), b.trim().parse::<IpAddr>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}

/// Check that the provider echoed the submitted value
///
/// # Parameters
///
/// - `provider`: Provider name for the error
/// - `domain`: Domain being written
/// - `submitted`: Value sent
/// - `echoed`: Value in the provider's response, if any
///
/// # Returns
///
/// `Err(Error::ProviderLogic)` when the echo is missing or differs
pub fn confirm_echo(
    provider: &str,
    domain: &Domain,
    submitted: &str,
    echoed: Option<&str>,
) -> Result<()> {
    match echoed {
        Some(value) if same_address(value, submitted) => Ok(()),
        Some(value) => Err(Error::provider_logic(
            provider,
            format!("{} echoed {} instead of {}", domain, value, submitted),
        )),
        None => Err(Error::provider_logic(
            provider,
            format!("{} write returned no value", domain),
        )),
    }
}
