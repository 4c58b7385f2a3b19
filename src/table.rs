//! The validator-endpoint table.
//!
//! Maps validator addresses to the transport endpoint they last announced,
//! versioned by announce timestamp. The table owns its own synchronization
//! and supports a bincode snapshot so a restarting node does not have to
//! wait a full gossip round to re-learn its peers' endpoints.

use {
    crate::{
        error::Result,
        types::{Address, EnodeUrl, Timestamp},
    },
    serde::{Deserialize, Serialize},
    std::{
        collections::{HashMap, HashSet},
        path::Path,
        sync::RwLock,
    },
};

/// The endpoint a validator last announced, with the announce timestamp that
/// versions it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointEntry {
    pub enode: EnodeUrl,
    pub timestamp: Timestamp,
}

/// On-disk form of one table entry.
#[derive(Serialize, Deserialize)]
struct SnapshotRecord {
    address: [u8; 20],
    enode: String,
    timestamp: Timestamp,
}

/// Address → endpoint table shared between the gossip engine and the peer
/// maintenance layer.
#[derive(Debug, Default)]
pub struct ValEnodeTable {
    entries: RwLock<HashMap<Address, EndpointEntry>>,
}

impl ValEnodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch of updates. An update is applied only when its
    /// timestamp is strictly newer than the stored entry for that address.
    /// Returns the number of entries applied.
    pub fn upsert(&self, updates: HashMap<Address, EndpointEntry>) -> usize {
        let mut entries = self.entries.write().expect("endpoint table lock poisoned");
        let mut applied = 0;
        for (address, update) in updates {
            let stale = entries
                .get(&address)
                .map_or(false, |existing| existing.timestamp >= update.timestamp);
            if !stale {
                entries.insert(address, update);
                applied += 1;
            }
        }
        applied
    }

    pub fn get(&self, address: &Address) -> Option<EndpointEntry> {
        self.entries
            .read()
            .expect("endpoint table lock poisoned")
            .get(address)
            .cloned()
    }

    /// Drop every entry whose address is not in `valid`.
    pub fn prune_entries(&self, valid: &HashSet<Address>) {
        self.entries
            .write()
            .expect("endpoint table lock poisoned")
            .retain(|address, _| valid.contains(address));
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("endpoint table lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write a snapshot of the table to `path`.
    pub fn save_snapshot(&self, path: &Path) -> Result<()> {
        let records: Vec<SnapshotRecord> = self
            .entries
            .read()
            .expect("endpoint table lock poisoned")
            .iter()
            .map(|(address, entry)| SnapshotRecord {
                address: *address.as_bytes(),
                enode: entry.enode.as_str().to_string(),
                timestamp: entry.timestamp,
            })
            .collect();
        std::fs::write(path, bincode::serialize(&records)?)?;
        Ok(())
    }

    /// Rebuild a table from a snapshot written by [`Self::save_snapshot`].
    /// Entries whose enode no longer parses are dropped.
    pub fn load_snapshot(path: &Path) -> Result<Self> {
        let records: Vec<SnapshotRecord> = bincode::deserialize(&std::fs::read(path)?)?;
        let mut entries = HashMap::with_capacity(records.len());
        for record in records {
            let Ok(enode) = EnodeUrl::parse(&record.enode) else {
                continue;
            };
            entries.insert(
                Address::from_bytes(record.address),
                EndpointEntry {
                    enode,
                    timestamp: record.timestamp,
                },
            );
        }
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }
}
