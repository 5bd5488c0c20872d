// # Local Interface Address Resolver
//
// Resolves the IPv6 address of this host from the kernel's interface table
// instead of asking a remote service.
//
// ## Implementation
//
// On Linux the table is `/proc/net/if_inet6`, one address per line:
//
// ```text
// 20010db8000000000000000000000001 02 40 00 80     eth0
// fe800000000000000000000000000001 02 40 20 80     eth0
// ```
//
// Columns are address, interface index, prefix length, scope, flags and
// interface name. Only global-scope addresses that are neither deprecated
// nor tentative are candidates; the first one (optionally restricted to
// `netInterface`) wins after the same strict pattern match the HTTP
// resolver applies.
//
// ## Platform Support
//
// IPv4 lookups and non-Linux hosts fail with a resolution error, so the
// family is skipped for the cycle.

use async_trait::async_trait;
use ddns_core::address::extract_ipv6;
use ddns_core::config::{AddressSource, FamilyConfig};
use ddns_core::traits::AddressResolver;
use ddns_core::{Error, ProviderRegistry, RecordType, Result};
use std::net::Ipv6Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Kernel interface address table
pub const IF_INET6_PATH: &str = "/proc/net/if_inet6";

const SCOPE_GLOBAL: u8 = 0x00;
const IFA_F_DEPRECATED: u8 = 0x20;
const IFA_F_TENTATIVE: u8 = 0x40;

/// Resolver for the `netInterface` address source
pub struct InterfaceAddressResolver {
    /// Location of the interface table
    table: PathBuf,
}

impl Default for InterfaceAddressResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl InterfaceAddressResolver {
    pub fn new() -> Self {
        Self::with_table(IF_INET6_PATH)
    }

    /// Read the interface table from another location
    pub fn with_table<P: AsRef<Path>>(table: P) -> Self {
        Self {
            table: table.as_ref().to_path_buf(),
        }
    }

    async fn read_table(&self) -> Result<String> {
        if !cfg!(target_os = "linux") {
            return Err(Error::resolution(
                "Interface addresses can only be read on Linux",
            ));
        }
        tokio::fs::read_to_string(&self.table).await.map_err(|e| {
            Error::resolution(format!("Failed to read {}: {}", self.table.display(), e))
        })
    }
}

/// Usable addresses in an `if_inet6` table, in table order
///
/// # Parameters
///
/// - `table`: Contents of the table
/// - `interface`: Interface name to keep; empty keeps every interface
pub fn global_addresses(table: &str, interface: &str) -> Vec<String> {
    table
        .lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [hex, _index, _prefix, scope, flags, name] = fields.as_slice() else {
                return None;
            };
            if !interface.is_empty() && *name != interface {
                return None;
            }
            let scope = u8::from_str_radix(scope, 16).ok()?;
            let flags = u8::from_str_radix(flags, 16).ok()?;
            if scope != SCOPE_GLOBAL || flags & (IFA_F_DEPRECATED | IFA_F_TENTATIVE) != 0 {
                return None;
            }
            parse_hex_address(hex).map(|addr| addr.to_string())
        })
        .collect()
}

fn parse_hex_address(hex: &str) -> Option<Ipv6Addr> {
    if hex.len() != 32 {
        return None;
    }
    u128::from_str_radix(hex, 16).ok().map(Ipv6Addr::from)
}

#[async_trait]
impl AddressResolver for InterfaceAddressResolver {
    async fn lookup(&self, record_type: RecordType, family: &FamilyConfig) -> Result<String> {
        if record_type != RecordType::Aaaa {
            return Err(Error::resolution(
                "Interface lookup only supports IPv6 addresses",
            ));
        }

        let table = self.read_table().await?;
        let interface = family.net_interface.trim();
        let candidates = global_addresses(&table, interface);
        let addr = extract_ipv6(&candidates.join("\n")).ok_or_else(|| {
            if interface.is_empty() {
                Error::resolution("No global IPv6 address on any interface")
            } else {
                Error::resolution(format!("No global IPv6 address on {}", interface))
            }
        })?;

        debug!("Resolved AAAA address {} from interface table", addr);
        Ok(addr)
    }

    fn resolver_name(&self) -> &'static str {
        "netInterface"
    }
}

/// Register the interface resolver for [`AddressSource::NetInterface`]
pub fn register(registry: &ProviderRegistry) {
    registry.register_resolver(
        AddressSource::NetInterface,
        Arc::new(InterfaceAddressResolver::new()),
    );
}
