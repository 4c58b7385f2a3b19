//! Duplicate-suppression for regossiped announces.
//!
//! A freshly received announce is forwarded to all peers, but forwarding the
//! same `(enode hash, recipient-set hash)` for the same validator more than
//! once per cooldown window only wastes bandwidth. The throttle remembers
//! when each validator's announce was last forwarded and with which hashes.

use {
    crate::types::{keccak256, Address, Hash},
    rlp::RlpStream,
    std::{
        collections::{HashMap, HashSet},
        sync::RwLock,
        time::Duration,
    },
    tokio::time::Instant,
};

#[derive(Debug, Clone)]
struct GossipRecord {
    enode_url_hash: Hash,
    dest_addresses_hash: Hash,
    at: Instant,
}

/// Per-validator record of the last outgoing regossip.
#[derive(Debug)]
pub struct RegossipThrottle {
    cooldown: Duration,
    entries: RwLock<HashMap<Address, GossipRecord>>,
}

impl RegossipThrottle {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns false when an identical regossip for `address` happened
    /// within the cooldown window.
    pub fn should_regossip(
        &self,
        address: &Address,
        enode_url_hash: &Hash,
        dest_addresses_hash: &Hash,
    ) -> bool {
        let entries = self.entries.read().expect("throttle lock poisoned");
        match entries.get(address) {
            Some(record) => {
                record.enode_url_hash != *enode_url_hash
                    || record.dest_addresses_hash != *dest_addresses_hash
                    || record.at.elapsed() >= self.cooldown
            }
            None => true,
        }
    }

    /// Record an outgoing regossip for `address` at the current wall clock.
    pub fn record(&self, address: Address, enode_url_hash: Hash, dest_addresses_hash: Hash) {
        self.entries.write().expect("throttle lock poisoned").insert(
            address,
            GossipRecord {
                enode_url_hash,
                dest_addresses_hash,
                at: Instant::now(),
            },
        );
    }

    /// Drop every entry whose address is not in `valid`.
    pub fn prune_not_in(&self, valid: &HashSet<Address>) {
        self.entries
            .write()
            .expect("throttle lock poisoned")
            .retain(|address, _| valid.contains(address));
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entries
            .read()
            .expect("throttle lock poisoned")
            .contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("throttle lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hash identifying a recipient set: Keccak of the RLP list of the sorted
/// lowercase hex representations of the recipient addresses.
///
/// Sorting on the hex strings keeps the hash stable across announces that
/// encode the same recipients in a different order.
pub fn dest_addresses_hash(addresses: &[Address]) -> Hash {
    let mut hexes: Vec<String> = addresses.iter().map(|a| a.to_hex()).collect();
    hexes.sort();
    let mut s = RlpStream::new_list(hexes.len());
    for hex in hexes {
        s.append(&hex.into_bytes());
    }
    keccak256(s.out().as_ref())
}
