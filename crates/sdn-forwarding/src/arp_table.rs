//! Per-session address-resolution cache.
//!
//! Maps a network address to the link address and switch port it was last
//! observed from. Owned exclusively by one session; no locking, no
//! cross-session visibility. Most recent observation wins.

use sdn_common::types::{MacAddr, PortNo};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// One learned mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpEntry {
    /// Link address the network address was last seen with.
    pub mac: MacAddr,
    /// Port the frame carrying it arrived on.
    pub port: PortNo,
    /// When the entry was last observed.
    pub learned_at: Instant,
}

/// Address-resolution table.
///
/// Entries are never explicitly deleted; a table built with
/// [`with_ttl`](Self::with_ttl) lazily drops entries older than the TTL on
/// lookup, reading them as misses. A miss is not an error — the caller
/// falls back to flooding.
#[derive(Debug, Default)]
pub struct ArpTable {
    entries: HashMap<Ipv4Addr, ArpEntry>,
    ttl: Option<Duration>,
}

impl ArpTable {
    /// A table that keeps entries for the life of the session.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table whose entries expire `ttl` after their last observation.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Some(ttl),
        }
    }

    /// Unconditional upsert. Called for every observed source address; the
    /// latest observation always wins.
    pub fn learn(&mut self, ip: Ipv4Addr, mac: MacAddr, port: PortNo) {
        self.entries.insert(
            ip,
            ArpEntry {
                mac,
                port,
                learned_at: Instant::now(),
            },
        );
    }

    /// Look up a mapping. An expired entry reads as a miss and is dropped.
    pub fn lookup(&mut self, ip: Ipv4Addr) -> Option<ArpEntry> {
        let entry = *self.entries.get(&ip)?;
        if let Some(ttl) = self.ttl {
            if entry.learned_at.elapsed() > ttl {
                self.entries.remove(&ip);
                return None;
            }
        }
        Some(entry)
    }

    /// Number of live entries (expired ones linger until looked up).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread::sleep;

    fn mac(last: u8) -> MacAddr {
        MacAddr([0, 0, 0, 0, 0, last])
    }

    fn ip(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(192, 168, 1, last)
    }

    #[test]
    fn test_learn_then_lookup() {
        let mut table = ArpTable::new();
        table.learn(ip(1), mac(1), PortNo(3));
        let entry = table.lookup(ip(1)).unwrap();
        assert_eq!(entry.mac, mac(1));
        assert_eq!(entry.port, PortNo(3));
    }

    #[test]
    fn test_lookup_miss() {
        let mut table = ArpTable::new();
        assert!(table.lookup(ip(9)).is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let mut table = ArpTable::new();
        table.learn(ip(1), mac(1), PortNo(3));
        table.learn(ip(1), mac(2), PortNo(7));
        let entry = table.lookup(ip(1)).unwrap();
        assert_eq!(entry.mac, mac(2));
        assert_eq!(entry.port, PortNo(7));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_ttl_expiry_reads_as_miss() {
        let mut table = ArpTable::with_ttl(Duration::from_millis(20));
        table.learn(ip(1), mac(1), PortNo(3));
        assert!(table.lookup(ip(1)).is_some());
        sleep(Duration::from_millis(40));
        assert!(table.lookup(ip(1)).is_none());
        // The expired entry was dropped, not just hidden.
        assert!(table.is_empty());
    }

    #[test]
    fn test_relearn_refreshes_ttl() {
        let mut table = ArpTable::with_ttl(Duration::from_millis(50));
        table.learn(ip(1), mac(1), PortNo(3));
        sleep(Duration::from_millis(30));
        table.learn(ip(1), mac(1), PortNo(3));
        sleep(Duration::from_millis(30));
        assert!(table.lookup(ip(1)).is_some());
    }

    proptest! {
        // Whatever the interleaving of learns, each key resolves to the
        // last (mac, port) written for it.
        #[test]
        fn prop_last_write_wins(writes in proptest::collection::vec(
            (0u8..8, 0u8..=255, 0u32..48), 1..64)
        ) {
            let mut table = ArpTable::new();
            let mut expected: std::collections::HashMap<u8, (u8, u32)> =
                std::collections::HashMap::new();
            for (key, mac_last, port) in writes {
                table.learn(ip(key), mac(mac_last), PortNo(port));
                expected.insert(key, (mac_last, port));
            }
            for (key, (mac_last, port)) in expected {
                let entry = table.lookup(ip(key)).unwrap();
                prop_assert_eq!(entry.mac, mac(mac_last));
                prop_assert_eq!(entry.port, PortNo(port));
            }
        }
    }
}
