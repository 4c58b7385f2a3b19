//! The announce gossip engine.
//!
//! Validators advertise their transport endpoint to the rest of the
//! validator set through a push/pull anti-entropy protocol:
//!
//! - **Push**: a validator periodically signs and multicasts an announce;
//!   receiving peers cache the newest version per validator and forward it,
//!   throttled so the same announce is not flooded repeatedly.
//! - **Pull**: peers lazily exchange `(validator, timestamp)` version sets
//!   and request the announces they are missing, so nodes that were offline
//!   converge without waiting for the next push.
//!
//! [`Gossip`] owns the announce cache, the regossip throttle, and the
//! endpoint table, and consumes everything else through collaborator traits.
//! It has no ambient state; the owning [`crate::service::AnnounceService`]
//! drives its emission cadence.

use {
    crate::{
        broadcaster::{Broadcaster, Peer},
        cache::{Admission, AnnounceCache},
        config::AnnounceConfig,
        error::{AnnounceError, Result},
        message::{
            code_name, codes, decode_address_list, decode_version_list, encode_address_list,
            encode_version_list, EncryptedEnode, Message, ValEncryptedEnodes,
        },
        signer::Signer,
        table::{EndpointEntry, ValEnodeTable},
        throttle::{dest_addresses_hash, RegossipThrottle},
        types::{rlp_hash, Address, EnodeUrl, Timestamp},
    },
    log::{debug, trace, warn},
    rand::Rng,
    std::{
        collections::{HashMap, HashSet},
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::{SystemTime, UNIX_EPOCH},
    },
};

/// Authoritative source for the registered-or-elected validator set.
pub trait ValidatorReader: Send + Sync {
    fn active_and_registered(&self) -> Result<HashSet<Address>>;
}

/// Where this node's advertised endpoint comes from.
pub trait EndpointSource: Send + Sync {
    /// The local p2p server's self endpoint.
    fn local_enode(&self) -> EnodeUrl;

    /// The external endpoint of the attached proxy, when one is connected.
    fn proxy_enode(&self) -> Option<EnodeUrl>;
}

/// The announce gossip engine.
///
/// Handlers may run concurrently across peers; the cache, throttle, and
/// endpoint table each own their synchronization, and all outbound sends are
/// fire-and-forget, so no handler ever blocks on the network while holding a
/// lock.
pub struct Gossip {
    config: AnnounceConfig,
    signer: Arc<dyn Signer>,
    broadcaster: Arc<dyn Broadcaster>,
    validators: Arc<dyn ValidatorReader>,
    endpoints: Arc<dyn EndpointSource>,
    table: Arc<ValEnodeTable>,
    cache: AnnounceCache,
    throttle: RegossipThrottle,
    core_started: AtomicBool,
}

impl Gossip {
    pub fn new(
        config: AnnounceConfig,
        signer: Arc<dyn Signer>,
        broadcaster: Arc<dyn Broadcaster>,
        validators: Arc<dyn ValidatorReader>,
        endpoints: Arc<dyn EndpointSource>,
        table: Arc<ValEnodeTable>,
    ) -> Self {
        let throttle = RegossipThrottle::new(config.regossip_cooldown());
        Self {
            config,
            signer,
            broadcaster,
            validators,
            endpoints,
            table,
            cache: AnnounceCache::new(),
            throttle,
            core_started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &AnnounceConfig {
        &self.config
    }

    pub fn cache(&self) -> &AnnounceCache {
        &self.cache
    }

    pub fn endpoint_table(&self) -> &ValEnodeTable {
        &self.table
    }

    /// Whether this node is currently validating. Set by the announce loop
    /// on core start/stop; gates self-targeted ciphertext processing.
    pub fn core_started(&self) -> bool {
        self.core_started.load(Ordering::Relaxed)
    }

    pub fn set_core_started(&self, started: bool) {
        self.core_started.store(started, Ordering::Relaxed);
    }

    pub fn connected_peer_count(&self) -> usize {
        self.broadcaster.find_peers().len()
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    /// Route an inbound `(code, payload)` to the matching handler. Unknown
    /// codes are ignored.
    pub fn handle_message(&self, peer: &dyn Peer, code: u64, payload: &[u8]) -> Result<()> {
        trace!("handling {} message from {}", code_name(code), peer.id());
        match code {
            codes::ANNOUNCE => self.handle_announce(peer, payload),
            codes::GET_ANNOUNCES => self.handle_get_announces(peer, payload),
            codes::GET_ANNOUNCE_VERSIONS => self.handle_get_announce_versions(peer, payload),
            codes::ANNOUNCE_VERSIONS => self.handle_announce_versions(peer, payload),
            _ => {
                debug!("ignoring unknown message code {code} from {}", peer.id());
                Ok(())
            }
        }
    }

    // ── Announce handling ───────────────────────────────────────────────

    /// Handle a pushed (or pulled) announce: authenticate, version-check,
    /// learn our own endpoint entry if addressed to us, cache, prune, and
    /// forward.
    pub fn handle_announce(&self, peer: &dyn Peer, payload: &[u8]) -> Result<()> {
        let message = Message::from_payload(payload).map_err(|e| {
            warn!("failed to decode announce from {}: {e}", peer.id());
            e
        })?;

        let validators = self.validators.active_and_registered()?;
        if !validators.contains(&message.address) {
            debug!(
                "dropping announce from non registered/elected validator {}",
                message.address
            );
            return Err(AnnounceError::UnauthorizedAnnounce(message.address));
        }

        let announce = ValEncryptedEnodes::from_rlp(&message.msg).map_err(|e| {
            warn!("failed to decode announce record from {}: {e}", message.address);
            e
        })?;

        if let Some(cached) = self.cache.version(&message.address) {
            if cached >= announce.timestamp {
                trace!(
                    "announce from {} is not newer than cached ({cached} >= {})",
                    message.address,
                    announce.timestamp
                );
                return Err(AnnounceError::OldAnnounce {
                    cached,
                    received: announce.timestamp,
                });
            }
        }

        let self_address = self.signer.address();
        let process_self = self.core_started() && validators.contains(&self_address);
        let mut dest_addresses = Vec::with_capacity(announce.encrypted_enodes.len());
        let mut seen: HashSet<Address> = HashSet::with_capacity(announce.encrypted_enodes.len());
        let mut has_dups_or_irrelevant = false;
        let mut own_enode = None;

        for encrypted in &announce.encrypted_enodes {
            if !validators.contains(&encrypted.decrypter_address)
                || seen.contains(&encrypted.decrypter_address)
            {
                has_dups_or_irrelevant = true;
                continue;
            }
            if process_self && encrypted.decrypter_address == self_address {
                // Placeholder decryption: the ciphertext is the plaintext URL.
                let url = std::str::from_utf8(&encrypted.encrypted_enode_url)
                    .map_err(|e| AnnounceError::EnodeParse(format!("ciphertext is not utf-8: {e}")))?;
                own_enode = Some(EnodeUrl::parse(url)?);
            }
            seen.insert(encrypted.decrypter_address);
            dest_addresses.push(encrypted.decrypter_address);
        }

        if let Some(enode) = own_enode {
            let applied = self.table.upsert(HashMap::from([(
                message.address,
                EndpointEntry {
                    enode,
                    timestamp: announce.timestamp,
                },
            )]));
            trace!(
                "learned endpoint for {} at timestamp {} ({applied} applied)",
                message.address,
                announce.timestamp
            );
        }

        if has_dups_or_irrelevant {
            debug!(
                "announce from {} has duplicate or irrelevant recipients, not caching",
                message.address
            );
            return Ok(());
        }

        if self.cache.admit(message.address, announce.timestamp, payload.to_vec())
            == Admission::RejectedStale
        {
            let cached = self
                .cache
                .version(&message.address)
                .unwrap_or(announce.timestamp);
            return Err(AnnounceError::OldAnnounce {
                cached,
                received: announce.timestamp,
            });
        }
        self.cache.prune_not_in(&validators);
        self.regossip_announce(&message.address, &announce, payload, &validators, &dest_addresses);
        Ok(())
    }

    /// Forward a freshly admitted announce to all peers, unless an identical
    /// forward happened within the cooldown window. Each invocation also
    /// prunes the throttle and endpoint tables with probability
    /// `1 / prune_denominator`.
    fn regossip_announce(
        &self,
        sender: &Address,
        announce: &ValEncryptedEnodes,
        payload: &[u8],
        validators: &HashSet<Address>,
        dest_addresses: &[Address],
    ) {
        let dest_hash = dest_addresses_hash(dest_addresses);
        if self
            .throttle
            .should_regossip(sender, &announce.enode_url_hash, &dest_hash)
        {
            trace!(
                "regossiping announce from {sender} (timestamp {})",
                announce.timestamp
            );
            self.broadcaster.multicast(codes::ANNOUNCE, payload.to_vec());
            self.throttle
                .record(*sender, announce.enode_url_hash, dest_hash);
        } else {
            trace!("already regossiped announce from {sender} within the cooldown window");
        }

        if rand::thread_rng().gen_ratio(1, self.config.prune_denominator) {
            self.throttle.prune_not_in(validators);
            self.table.prune_entries(validators);
        }
    }

    // ── Pull protocol ───────────────────────────────────────────────────

    /// Reply to a GetAnnounces request with the cached signed payload of
    /// every requested validator we know about. Unknown addresses are
    /// silently omitted.
    pub fn handle_get_announces(&self, peer: &dyn Peer, payload: &[u8]) -> Result<()> {
        let addresses = decode_address_list(payload).map_err(|e| {
            warn!("failed to decode get-announces request from {}: {e}", peer.id());
            e
        })?;

        for address in addresses {
            if let Some(cached) = self.cache.payload(&address) {
                trace!("sending cached announce for {address} to {}", peer.id());
                peer.send(codes::ANNOUNCE, cached);
            }
        }
        Ok(())
    }

    /// Reply to a GetAnnounceVersions request with one version record per
    /// cache entry.
    pub fn handle_get_announce_versions(&self, peer: &dyn Peer, _payload: &[u8]) -> Result<()> {
        let versions = self.cache.snapshot();
        trace!("sending {} announce versions to {}", versions.len(), peer.id());
        peer.send(codes::ANNOUNCE_VERSIONS, encode_version_list(&versions));
        Ok(())
    }

    /// Compare a peer's version set with the cache and request every
    /// announce the peer knows a strictly newer version of.
    pub fn handle_announce_versions(&self, peer: &dyn Peer, payload: &[u8]) -> Result<()> {
        let versions = decode_version_list(payload).map_err(|e| {
            warn!("failed to decode announce versions from {}: {e}", peer.id());
            e
        })?;

        let validators = self.validators.active_and_registered()?;
        let mut to_request = Vec::new();
        for version in versions {
            if !validators.contains(&version.val_address) {
                trace!(
                    "ignoring announce version for {} outside the validator set",
                    version.val_address
                );
                continue;
            }
            match self.cache.version(&version.val_address) {
                Some(cached) if cached >= version.timestamp => {}
                _ => to_request.push(version.val_address),
            }
        }

        if !to_request.is_empty() {
            debug!("requesting {} announces from {}", to_request.len(), peer.id());
            self.send_get_announces(peer, &to_request);
        }
        Ok(())
    }

    /// Request the announces of `addresses` from a peer.
    pub fn send_get_announces(&self, peer: &dyn Peer, addresses: &[Address]) {
        peer.send(codes::GET_ANNOUNCES, encode_address_list(addresses));
    }

    /// Ask a peer for its announce version set.
    pub fn send_get_announce_versions(&self, peer: &dyn Peer) {
        peer.send(codes::GET_ANNOUNCE_VERSIONS, Vec::new());
    }

    /// Ask every connected peer for its announce version set.
    pub fn check_peers_announce_versions(&self) {
        for peer in self.broadcaster.find_peers() {
            trace!("requesting announce versions from {}", peer.id());
            self.send_get_announce_versions(peer.as_ref());
        }
    }

    // ── Generation ──────────────────────────────────────────────────────

    /// Build and sign this node's current announce. Returns the signed
    /// envelope together with its timestamp.
    pub fn generate_announce(&self) -> Result<(Message, Timestamp)> {
        let enode = if self.config.proxied {
            match self.endpoints.proxy_enode() {
                Some(enode) => enode,
                None => {
                    warn!("proxied validator has no proxy connection, cannot announce");
                    return Err(AnnounceError::NoProxyConnection);
                }
            }
        } else {
            self.endpoints.local_enode()
        };

        let validators = self.validators.active_and_registered()?;
        let mut recipients: Vec<Address> = validators.into_iter().collect();
        recipients.sort();

        let encrypted_enodes = recipients
            .into_iter()
            .map(|decrypter_address| EncryptedEnode {
                decrypter_address,
                // Placeholder encryption: the ciphertext is the plaintext URL.
                encrypted_enode_url: enode.as_str().as_bytes().to_vec(),
            })
            .collect();

        let timestamp = unix_now();
        let record = ValEncryptedEnodes {
            val_address: self.signer.address(),
            encrypted_enodes,
            enode_url_hash: rlp_hash(&enode),
            timestamp,
        };

        let mut message = Message::new(codes::ANNOUNCE, record.to_rlp(), self.signer.address());
        message.sign(self.signer.as_ref())?;
        debug!("generated announce with timestamp {timestamp}");
        Ok((message, timestamp))
    }

    /// Generate this node's announce, cache it, and multicast it if this
    /// node is a registered or elected validator.
    pub fn gossip_announce(&self) -> Result<()> {
        let (message, timestamp) = self.generate_announce()?;
        let payload = message.payload();
        self.cache.admit(message.address, timestamp, payload.clone());

        let validators = self.validators.active_and_registered()?;
        if validators.contains(&message.address) {
            trace!("multicasting own announce (timestamp {timestamp})");
            self.broadcaster.multicast(codes::ANNOUNCE, payload);
        }
        Ok(())
    }
}

fn unix_now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ── Tests ───────────────────────────────────────────────────────────────────
