//! Domain Set
//!
//! A [`Domains`] value is built fresh for every provider entry in every cycle.
//! The scheduler writes the resolved address of each family exactly once; drivers
//! read it and write back nothing but [`UpdateStatus`] on the individual domains.

use crate::config::{DnsEntry, FamilyConfig};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Second-level suffixes under which registrations happen one label deeper
const REGISTRABLE_SUFFIXES: &[&str] = &["com.cn", "org.cn", "net.cn", "ac.cn", "eu.org"];

/// DNS record type managed by this system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
}

impl RecordType {
    /// Both record types in processing order
    pub const ALL: [RecordType; 2] = [RecordType::A, RecordType::Aaaa];

    /// Wire name ("A" / "AAAA")
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Slot index used by the IP cache (0 for A, 1 for AAAA)
    pub fn index(&self) -> usize {
        match self {
            RecordType::A => 0,
            RecordType::Aaaa => 1,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the current cycle for one domain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpdateStatus {
    /// Not attempted (address unchanged or family skipped)
    #[default]
    Unset,
    /// Provider confirmed the published value
    Success,
    /// Provider rejected or could not be reached
    Failed,
}

impl UpdateStatus {
    /// Name used in logs and webhook templates
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Unset => "unchanged",
            UpdateStatus::Success => "success",
            UpdateStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One managed name, split into sub domain and root zone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Domain {
    /// Root zone, e.g. "example.com"
    pub domain_name: String,
    /// Label(s) left of the root, empty for the apex
    pub sub_domain: String,
    /// Per-domain provider parameters from a `?k=v` suffix
    pub custom_params: BTreeMap<String, String>,
    /// Result of the current cycle
    pub update_status: UpdateStatus,
}

impl Domain {
    /// Create a domain from an explicit split
    pub fn new(sub_domain: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self {
            domain_name: domain_name.into(),
            sub_domain: sub_domain.into(),
            ..Default::default()
        }
    }

    /// Parse a configured domain string
    ///
    /// Accepted forms:
    /// - `www.example.com` (last two labels are the root)
    /// - `www.example.com.cn` (last three labels when the tail is a registrable suffix)
    /// - `www.sub:example.com` (explicit split)
    /// - any of the above followed by `?Line=telecom&k=v`
    ///
    /// # Returns
    ///
    /// `None` when the string has fewer than two labels
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (name, query) = match raw.split_once('?') {
            Some((name, query)) => (name.trim(), Some(query)),
            None => (raw, None),
        };

        let mut domain = if let Some((sub, root)) = name.split_once(':') {
            let root = root.trim().trim_end_matches('.');
            if !root.contains('.') {
                return None;
            }
            Domain::new(sub.trim(), root)
        } else {
            let name = name.trim_end_matches('.');
            let labels: Vec<&str> = name.split('.').filter(|l| !l.is_empty()).collect();
            if labels.len() < 2 {
                return None;
            }
            let tail = labels[labels.len() - 2..].join(".");
            let root_len = if labels.len() > 2 && REGISTRABLE_SUFFIXES.contains(&tail.as_str()) {
                3
            } else {
                2
            };
            let split = labels.len() - root_len;
            Domain::new(labels[..split].join("."), labels[split..].join("."))
        };

        if let Some(query) = query {
            domain.custom_params = parse_params(query);
        }
        Some(domain)
    }

    /// Fully qualified name without trailing dot, e.g. "www.example.com"
    pub fn fqdn(&self) -> String {
        if self.sub_domain.is_empty() {
            self.domain_name.clone()
        } else {
            format!("{}.{}", self.sub_domain, self.domain_name)
        }
    }

    /// Sub domain as most provider APIs want it, "@" for the apex
    pub fn sub_domain_or_apex(&self) -> &str {
        if self.sub_domain.is_empty() {
            "@"
        } else {
            &self.sub_domain
        }
    }

    /// Look up a custom parameter
    pub fn param(&self, key: &str) -> Option<&str> {
        self.custom_params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqdn())
    }
}

fn parse_params(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let value = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            Some((key.to_string(), value))
        })
        .collect()
}

/// Domains and resolved address of one family
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FamilyDomains {
    /// Resolved address, empty when disabled or resolution failed
    pub addr: String,
    /// Whether the address must be compared with the provider this cycle
    pub compare: bool,
    /// Parsed domains in configured order
    pub domains: Vec<Domain>,
}

impl FamilyDomains {
    fn from_config(cfg: &FamilyConfig) -> Self {
        let domains = if cfg.enable {
            cfg.domains
                .iter()
                .filter(|d| !d.trim().is_empty())
                .filter_map(|d| {
                    let parsed = Domain::parse(d);
                    if parsed.is_none() {
                        warn!("Skipping malformed domain '{}'", d);
                    }
                    parsed
                })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            domains,
            ..Default::default()
        }
    }

    /// Aggregate result: failed if any failed, success if any succeeded
    pub fn result(&self) -> UpdateStatus {
        let statuses = self.domains.iter().map(|d| d.update_status);
        if statuses.clone().any(|s| s == UpdateStatus::Failed) {
            UpdateStatus::Failed
        } else if statuses.clone().any(|s| s == UpdateStatus::Success) {
            UpdateStatus::Success
        } else {
            UpdateStatus::Unset
        }
    }
}

/// The Domain Set for one provider entry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domains {
    /// A records
    pub ipv4: FamilyDomains,
    /// AAAA records
    pub ipv6: FamilyDomains,
}

impl Domains {
    /// Parse the domains of every enabled family of an entry
    pub fn from_entry(entry: &DnsEntry) -> Self {
        Self {
            ipv4: FamilyDomains::from_config(&entry.ipv4),
            ipv6: FamilyDomains::from_config(&entry.ipv6),
        }
    }

    /// Family for a record type
    pub fn family(&self, record_type: RecordType) -> &FamilyDomains {
        match record_type {
            RecordType::A => &self.ipv4,
            RecordType::Aaaa => &self.ipv6,
        }
    }

    /// Mutable family for a record type
    pub fn family_mut(&mut self, record_type: RecordType) -> &mut FamilyDomains {
        match record_type {
            RecordType::A => &mut self.ipv4,
            RecordType::Aaaa => &mut self.ipv6,
        }
    }

    /// Mutable domains for a record type
    pub fn domains_mut(&mut self, record_type: RecordType) -> &mut [Domain] {
        &mut self.family_mut(record_type).domains
    }

    /// Record the resolution result of one family
    ///
    /// # Parameters
    ///
    /// - `record_type`: Family the address belongs to
    /// - `addr`: Resolved address, empty on failure
    /// - `compare`: Whether the provider must be consulted this cycle
    pub fn set_address(&mut self, record_type: RecordType, addr: String, compare: bool) {
        let family = self.family_mut(record_type);
        family.addr = addr;
        family.compare = compare;
    }

    /// Address to reconcile for a record type
    ///
    /// # Returns
    ///
    /// `Some(addr)` only when an address was resolved, the cache asked for a
    /// comparison and there is at least one domain to reconcile
    pub fn pending_addr(&self, record_type: RecordType) -> Option<&str> {
        let family = self.family(record_type);
        if family.addr.is_empty() || !family.compare || family.domains.is_empty() {
            None
        } else {
            Some(&family.addr)
        }
    }

    /// Mark every still-unset domain of every pending family as failed
    pub fn fail_pending(&mut self) {
        for record_type in RecordType::ALL {
            if self.pending_addr(record_type).is_none() {
                continue;
            }
            for domain in self.domains_mut(record_type) {
                if domain.update_status == UpdateStatus::Unset {
                    domain.update_status = UpdateStatus::Failed;
                }
            }
        }
    }

    /// Whether any domain was attempted this cycle
    pub fn has_changes(&self) -> bool {
        self.iter().any(|d| d.update_status != UpdateStatus::Unset)
    }

    /// All domains, A first
    pub fn iter(&self) -> impl Iterator<Item = &Domain> {
        self.ipv4.domains.iter().chain(self.ipv6.domains.iter())
    }
}
