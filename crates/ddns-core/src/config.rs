//! Configuration types for the DDNS system
//!
//! The configuration is persisted as JSON by [`crate::store::ConfigStore`].
//! Field names are camelCase on disk.

use serde::{Deserialize, Serialize};

/// Main DDNS configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// One entry per provider account
    #[serde(default)]
    pub dns_conf: Vec<DnsEntry>,

    /// Notification sent after each cycle
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Every entry is usable
    /// - `Err(Error::Config)`: The first problem found, with the entry index
    pub fn validate(&self) -> Result<(), crate::Error> {
        for (index, entry) in self.dns_conf.iter().enumerate() {
            entry
                .validate()
                .map_err(|e| crate::Error::config(format!("dnsConf[{}]: {}", index, e)))?;
        }
        Ok(())
    }
}

/// One provider account and the domains it manages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsEntry {
    /// IPv4 (A record) settings
    #[serde(default)]
    pub ipv4: FamilyConfig,

    /// IPv6 (AAAA record) settings
    #[serde(default)]
    pub ipv6: FamilyConfig,

    /// Provider name and credentials
    pub dns: DnsCredentials,

    /// Record TTL; each provider applies its own default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
}

impl DnsEntry {
    /// Validate a single entry
    pub fn validate(&self) -> Result<(), String> {
        if self.dns.name.trim().is_empty() {
            return Err("provider name cannot be empty".to_string());
        }
        for (family, cfg) in [("ipv4", &self.ipv4), ("ipv6", &self.ipv6)] {
            if !cfg.enable {
                continue;
            }
            if cfg.domains.iter().all(|d| d.trim().is_empty()) {
                return Err(format!("{} is enabled but has no domains", family));
            }
            if cfg.get_type == AddressSource::Url && cfg.url.trim().is_empty() {
                return Err(format!("{} resolves by url but the url is empty", family));
            }
        }
        Ok(())
    }

    /// TTL to submit, falling back to the provider's default
    pub fn ttl_or(&self, default: u32) -> u32 {
        self.ttl.filter(|ttl| *ttl > 0).unwrap_or(default)
    }
}

/// Settings for one address family
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyConfig {
    /// Whether this family is managed at all
    #[serde(default)]
    pub enable: bool,

    /// How the current address is obtained
    #[serde(default)]
    pub get_type: AddressSource,

    /// Endpoint returning the address (for [`AddressSource::Url`])
    #[serde(default)]
    pub url: String,

    /// Interface name filter (for [`AddressSource::NetInterface`])
    #[serde(default)]
    pub net_interface: String,

    /// Configured domain strings
    #[serde(default)]
    pub domains: Vec<String>,
}

/// Address resolution strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressSource {
    /// HTTP GET against a "what is my IP" endpoint
    #[default]
    #[serde(rename = "url")]
    Url,
    /// Local network interface table
    #[serde(rename = "netInterface")]
    NetInterface,
}

impl AddressSource {
    /// Name used in configuration and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressSource::Url => "url",
            AddressSource::NetInterface => "netInterface",
        }
    }
}

/// Provider selection and credentials
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsCredentials {
    /// Provider name (e.g. "alidns", "cloudflare")
    pub name: String,

    /// Access key / key id / username
    #[serde(default)]
    pub id: String,

    /// Secret / token / password
    #[serde(default)]
    pub secret: String,
}

// Custom Debug to redact the secret
impl std::fmt::Debug for DnsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsCredentials")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

/// Webhook notification settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Target URL template; empty disables the webhook
    #[serde(default)]
    pub url: String,

    /// Body template; empty means GET
    #[serde(default)]
    pub request_body: String,

    /// Extra headers in "Key: Value" form
    #[serde(default)]
    pub headers: Vec<String>,
}
