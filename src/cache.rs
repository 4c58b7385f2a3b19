//! Per-validator cache of the latest observed announce.
//!
//! The cache is the single source of truth for "what is the newest announce
//! we have seen from validator A?". It stores the already-signed wire payload
//! so pull replies can re-emit it verbatim, and it enforces the monotonic
//! timestamp rule: for any address the stored timestamp only ever grows.

use {
    crate::{
        message::AnnounceVersion,
        types::{Address, Timestamp},
    },
    std::{
        collections::{HashMap, HashSet},
        sync::RwLock,
    },
};

/// Outcome of an [`AnnounceCache::admit`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The entry was inserted or replaced an older one.
    Inserted,
    /// An entry with an equal or newer timestamp already exists.
    RejectedStale,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    timestamp: Timestamp,
    payload: Vec<u8>,
}

/// Map from validator address to its latest `(timestamp, signed payload)`.
///
/// Readers and writers are serialized by an internal reader-writer lock;
/// every public operation is atomic.
#[derive(Debug, Default)]
pub struct AnnounceCache {
    entries: RwLock<HashMap<Address, CacheEntry>>,
}

impl AnnounceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached announce timestamp for `address`, if any.
    pub fn version(&self, address: &Address) -> Option<Timestamp> {
        self.entries
            .read()
            .expect("announce cache lock poisoned")
            .get(address)
            .map(|e| e.timestamp)
    }

    /// The cached signed wire payload for `address`, if any.
    pub fn payload(&self, address: &Address) -> Option<Vec<u8>> {
        self.entries
            .read()
            .expect("announce cache lock poisoned")
            .get(address)
            .map(|e| e.payload.clone())
    }

    /// Insert `payload` under `address` iff `timestamp` is strictly newer
    /// than the cached entry (or no entry exists).
    pub fn admit(
        &self,
        address: Address,
        timestamp: Timestamp,
        payload: Vec<u8>,
    ) -> Admission {
        let mut entries = self.entries.write().expect("announce cache lock poisoned");
        let stale = entries
            .get(&address)
            .map_or(false, |existing| existing.timestamp >= timestamp);
        if stale {
            return Admission::RejectedStale;
        }
        entries.insert(address, CacheEntry { timestamp, payload });
        Admission::Inserted
    }

    /// Drop every entry whose address is not in `valid`.
    pub fn prune_not_in(&self, valid: &HashSet<Address>) {
        self.entries
            .write()
            .expect("announce cache lock poisoned")
            .retain(|address, _| valid.contains(address));
    }

    /// One version record per cache entry, for version-exchange replies.
    pub fn snapshot(&self) -> Vec<AnnounceVersion> {
        self.entries
            .read()
            .expect("announce cache lock poisoned")
            .iter()
            .map(|(address, entry)| AnnounceVersion {
                val_address: *address,
                timestamp: entry.timestamp,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("announce cache lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
