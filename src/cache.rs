//! Resolved-address cache with TTL-based expiration.

use rustc_hash::FxHashMap;
use std::net::IpAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Default maximum number of cached names.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

struct CacheEntry {
    addr: IpAddr,
    expires_at: Instant,
}

/// TTL-based cache of name -> address mappings.
///
/// Reads take the shared lock only; expired entries are treated as missing
/// but are never removed by a read. Stale entries are overwritten by the
/// next store for the same name, or swept when a store runs out of room.
/// Names are used exactly as supplied, with no normalization.
pub struct AddrCache {
    entries: RwLock<FxHashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl AddrCache {
    /// Create an empty cache holding at most `max_entries` names.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up a cached address (shared lock, no mutation).
    ///
    /// Returns `Some` only if an entry exists and its expiry is strictly
    /// in the future.
    pub fn lookup(&self, name: &str) -> Option<IpAddr> {
        let now = Instant::now();
        let Ok(entries) = self.entries.read() else {
            return None;
        };
        let entry = entries.get(name)?;
        if now < entry.expires_at {
            Some(entry.addr)
        } else {
            None
        }
    }

    /// Store an address, unconditionally replacing any existing entry.
    pub fn store(&self, name: &str, addr: IpAddr, ttl: Duration) {
        let now = Instant::now();
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        if entries.len() >= self.max_entries && !entries.contains_key(name) {
            entries.retain(|_, entry| now < entry.expires_at);
            if entries.len() >= self.max_entries {
                // Still full of live entries: drop the one closest to expiry.
                let victim = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(name, _)| name.clone());
                if let Some(victim) = victim {
                    entries.remove(&victim);
                }
            }
        }

        entries.insert(
            name.to_string(),
            CacheEntry {
                addr,
                expires_at: now + ttl,
            },
        );
    }

    /// Discard all entries.
    pub fn clear(&self) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        entries.clear();
    }

    /// Number of entries currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AddrCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
