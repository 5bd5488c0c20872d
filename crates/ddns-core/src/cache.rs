//! IP cache
//!
//! Remembers the last address submitted for each provider entry and family so
//! an unchanged address does not reach the provider every cycle. Cells are keyed
//! by a stable [`EntryKey`] rather than by position, so reordering entries in the
//! configuration does not hand one entry another entry's history.

use crate::config::DnsEntry;
use crate::domains::RecordType;
use std::collections::HashMap;
use tracing::debug;

/// Default number of unchanged cycles before the provider is consulted anyway
pub const DEFAULT_REFRESH_TIMES: u32 = 5;

/// Last submitted address of one entry and family
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpCache {
    /// Last address seen
    pub addr: String,
    /// Cycles left until a forced comparison
    pub times: u32,
}

impl IpCache {
    /// Decide whether the provider has to be consulted for this address
    ///
    /// # Parameters
    ///
    /// - `new_addr`: Address resolved this cycle
    /// - `refresh_times`: Unchanged cycles allowed between comparisons
    ///
    /// # Returns
    ///
    /// `true` when the address changed or the countdown ran out; the countdown
    /// is then reset to `refresh_times + 1`
    pub fn check(&mut self, new_addr: &str, refresh_times: u32) -> bool {
        if new_addr.is_empty() {
            return true;
        }
        if self.addr != new_addr || self.times <= 1 {
            self.addr = new_addr.to_string();
            self.times = refresh_times + 1;
            return true;
        }
        self.times -= 1;
        false
    }
}

/// Stable identity of a configuration entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    fingerprint: String,
    occurrence: usize,
}

impl EntryKey {
    /// Keys for a list of entries, in the same order
    ///
    /// Identical entries are told apart by how many times the same
    /// fingerprint has been seen before them.
    pub fn for_entries(entries: &[DnsEntry]) -> Vec<EntryKey> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        entries
            .iter()
            .map(|entry| {
                let fingerprint = Self::fingerprint(entry);
                let count = seen.entry(fingerprint.clone()).or_insert(0);
                let key = EntryKey {
                    fingerprint,
                    occurrence: *count,
                };
                *count += 1;
                key
            })
            .collect()
    }

    fn fingerprint(entry: &DnsEntry) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}",
            entry.dns.name,
            entry.dns.id,
            entry.ipv4.domains.join(","),
            entry.ipv6.domains.join(",")
        )
    }
}

/// All cache cells, two per entry
#[derive(Debug, Default)]
pub struct IpCacheArena {
    cells: HashMap<EntryKey, [IpCache; 2]>,
    refresh_times: u32,
}

impl IpCacheArena {
    /// Create an empty arena
    ///
    /// # Parameters
    ///
    /// - `refresh_times`: Unchanged cycles allowed between comparisons
    pub fn new(refresh_times: u32) -> Self {
        Self {
            cells: HashMap::new(),
            refresh_times,
        }
    }

    /// Align the arena with the current configuration
    ///
    /// The arena is rebuilt wholesale when `force` is set or the number of
    /// entries changed. Otherwise cells of entries that disappeared are dropped
    /// and new entries start empty.
    ///
    /// # Returns
    ///
    /// The entry keys in configuration order, and whether a rebuild happened
    pub fn sync(&mut self, entries: &[DnsEntry], force: bool) -> (Vec<EntryKey>, bool) {
        let keys = EntryKey::for_entries(entries);
        let rebuild = force || self.cells.len() != keys.len();

        if rebuild {
            debug!(
                "Rebuilding IP cache: {} -> {} entries (force: {})",
                self.cells.len(),
                keys.len(),
                force
            );
            self.cells = keys.iter().map(|k| (k.clone(), Default::default())).collect();
        } else {
            self.cells.retain(|k, _| keys.contains(k));
            for key in &keys {
                self.cells.entry(key.clone()).or_default();
            }
        }

        (keys, rebuild)
    }

    /// Check an address against the cell of an entry and family
    ///
    /// Unknown keys get a fresh cell, so they always compare.
    pub fn check(&mut self, key: &EntryKey, record_type: RecordType, addr: &str) -> bool {
        let refresh_times = self.refresh_times;
        let cells = self.cells.entry(key.clone()).or_default();
        cells[record_type.index()].check(addr, refresh_times)
    }

    /// Drop the remembered address of an entry and family
    ///
    /// Used when the provider did not accept the last submitted address, so
    /// the next cycle compares again instead of waiting for the countdown.
    pub fn forget(&mut self, key: &EntryKey, record_type: RecordType) {
        if let Some(cells) = self.cells.get_mut(key) {
            cells[record_type.index()] = IpCache::default();
        }
    }

    /// Cell of an entry and family
    pub fn slot(&self, key: &EntryKey, record_type: RecordType) -> Option<&IpCache> {
        self.cells.get(key).map(|cells| &cells[record_type.index()])
    }

    /// Number of entries tracked
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the arena tracks no entries
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, domain: &str) -> DnsEntry {
        let mut entry = DnsEntry::default();
        entry.dns.name = name.to_string();
        entry.ipv4.enable = true;
        entry.ipv4.domains = vec![domain.to_string()];
        entry
    }

    #[test]
    fn test_check_countdown() {
        let mut cache = IpCache::default();

        // First sighting compares
        assert!(cache.check("203.0.113.5", 2));
        assert_eq!(cache.times, 3);

        // Unchanged: suppressed until the countdown runs out
        assert!(!cache.check("203.0.113.5", 2));
        assert!(!cache.check("203.0.113.5", 2));
        assert!(cache.check("203.0.113.5", 2));
        assert_eq!(cache.times, 3);

        // Changed compares immediately
        assert!(cache.check("203.0.113.6", 2));
        assert_eq!(cache.addr, "203.0.113.6");
    }

    #[test]
    fn test_check_empty_address_always_compares() {
        let mut cache = IpCache::default();
        assert!(cache.check("", 5));
        assert_eq!(cache.addr, "");
    }

    #[test]
    fn test_entry_keys_are_stable_and_distinct() {
        let a = entry("alidns", "a.example.com");
        let b = entry("cloudflare", "b.example.com");

        let forward = EntryKey::for_entries(&[a.clone(), b.clone()]);
        let reversed = EntryKey::for_entries(&[b.clone(), a.clone()]);
        assert_eq!(forward[0], reversed[1]);
        assert_eq!(forward[1], reversed[0]);

        let dupes = EntryKey::for_entries(&[a.clone(), a.clone()]);
        assert_ne!(dupes[0], dupes[1]);
    }

    #[test]
    fn test_sync_rebuilds_on_count_change() {
        let mut arena = IpCacheArena::new(5);
        let entries = vec![entry("alidns", "a.example.com")];
        let (keys, rebuilt) = arena.sync(&entries, false);
        assert!(rebuilt);
        assert!(arena.check(&keys[0], RecordType::A, "203.0.113.5"));
        assert!(!arena.check(&keys[0], RecordType::A, "203.0.113.5"));

        // Same entries: history kept
        let (keys, rebuilt) = arena.sync(&entries, false);
        assert!(!rebuilt);
        assert!(!arena.check(&keys[0], RecordType::A, "203.0.113.5"));

        // One more entry: everything starts over
        let mut grown = entries.clone();
        grown.push(entry("dnspod", "b.example.com"));
        let (keys, rebuilt) = arena.sync(&grown, false);
        assert!(rebuilt);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.slot(&keys[0], RecordType::A), Some(&IpCache::default()));
    }

    #[test]
    fn test_sync_force_rebuilds() {
        let mut arena = IpCacheArena::new(5);
        let entries = vec![entry("alidns", "a.example.com")];
        let (keys, _) = arena.sync(&entries, false);
        arena.check(&keys[0], RecordType::A, "203.0.113.5");

        let (keys, rebuilt) = arena.sync(&entries, true);
        assert!(rebuilt);
        assert!(arena.check(&keys[0], RecordType::A, "203.0.113.5"));
    }

    #[test]
    fn test_sync_reorder_keeps_history() {
        let mut arena = IpCacheArena::new(5);
        let a = entry("alidns", "a.example.com");
        let b = entry("cloudflare", "b.example.com");

        let (keys, _) = arena.sync(&[a.clone(), b.clone()], false);
        arena.check(&keys[0], RecordType::A, "203.0.113.5");
        arena.check(&keys[1], RecordType::A, "198.51.100.7");

        let (keys, rebuilt) = arena.sync(&[b, a], false);
        assert!(!rebuilt);
        assert!(!arena.check(&keys[0], RecordType::A, "198.51.100.7"));
        assert!(!arena.check(&keys[1], RecordType::A, "203.0.113.5"));
    }

    #[test]
    fn test_forget_compares_again() {
        let mut arena = IpCacheArena::new(5);
        let (keys, _) = arena.sync(&[entry("alidns", "a.example.com")], false);
        assert!(arena.check(&keys[0], RecordType::A, "203.0.113.5"));
        assert!(!arena.check(&keys[0], RecordType::A, "203.0.113.5"));

        arena.forget(&keys[0], RecordType::A);
        assert_eq!(arena.slot(&keys[0], RecordType::A), Some(&IpCache::default()));
        assert!(arena.check(&keys[0], RecordType::A, "203.0.113.5"));
    }

    #[test]
    fn test_sync_replaced_entry_starts_fresh() {
        let mut arena = IpCacheArena::new(5);
        let (keys, _) = arena.sync(&[entry("alidns", "a.example.com")], false);
        arena.check(&keys[0], RecordType::A, "203.0.113.5");

        let (keys, rebuilt) = arena.sync(&[entry("alidns", "c.example.com")], false);
        assert!(!rebuilt);
        assert_eq!(arena.len(), 1);
        assert!(arena.check(&keys[0], RecordType::A, "203.0.113.5"));
    }
}
