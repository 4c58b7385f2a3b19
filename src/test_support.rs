//! Shared fixtures for unit tests: recording peers/broadcasters and a
//! fully wired gossip engine over mock collaborators.

use {
    crate::{
        broadcaster::{Broadcaster, Peer},
        config::AnnounceConfig,
        error::Result,
        gossip::{EndpointSource, Gossip, ValidatorReader},
        message::{codes, EncryptedEnode, Message, ValEncryptedEnodes},
        signer::{EcdsaSigner, Signer},
        table::ValEnodeTable,
        types::{rlp_hash, Address, EnodeUrl, Timestamp},
    },
    std::{
        collections::HashSet,
        sync::{Arc, Mutex},
    },
};

pub(crate) fn addr(byte: u8) -> Address {
    Address::from_bytes([byte; 20])
}

pub(crate) fn enode_url(byte: u8) -> String {
    format!("enode://{}@10.0.0.{byte}:30303", hex::encode([byte; 64]))
}

pub(crate) fn test_signer(seed: u8) -> EcdsaSigner {
    EcdsaSigner::from_secret_bytes(&[seed; 32]).expect("valid test secret")
}

/// A peer that records everything sent to it.
pub(crate) struct MockPeer {
    id: String,
    sent: Mutex<Vec<(u64, Vec<u8>)>>,
}

impl MockPeer {
    pub(crate) fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn sent(&self) -> Vec<(u64, Vec<u8>)> {
        self.sent.lock().expect("mock peer lock").clone()
    }

    pub(crate) fn sent_with_code(&self, code: u64) -> Vec<Vec<u8>> {
        self.sent()
            .into_iter()
            .filter(|(c, _)| *c == code)
            .map(|(_, payload)| payload)
            .collect()
    }
}

impl Peer for MockPeer {
    fn send(&self, code: u64, payload: Vec<u8>) {
        self.sent.lock().expect("mock peer lock").push((code, payload));
    }

    fn id(&self) -> String {
        self.id.clone()
    }
}

/// A broadcaster that records multicasts and serves a configurable peer set.
#[derive(Default)]
pub(crate) struct MockBroadcaster {
    peers: Mutex<Vec<Arc<MockPeer>>>,
    multicasts: Mutex<Vec<(u64, Vec<u8>)>>,
}

impl MockBroadcaster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_peer(&self, peer: Arc<MockPeer>) {
        self.peers.lock().expect("mock broadcaster lock").push(peer);
    }

    pub(crate) fn multicasts(&self) -> Vec<(u64, Vec<u8>)> {
        self.multicasts.lock().expect("mock broadcaster lock").clone()
    }

    pub(crate) fn multicast_count(&self) -> usize {
        self.multicasts.lock().expect("mock broadcaster lock").len()
    }
}

impl Broadcaster for MockBroadcaster {
    fn find_peers(&self) -> Vec<Arc<dyn Peer>> {
        self.peers
            .lock()
            .expect("mock broadcaster lock")
            .iter()
            .map(|p| p.clone() as Arc<dyn Peer>)
            .collect()
    }

    fn multicast(&self, code: u64, payload: Vec<u8>) {
        self.multicasts
            .lock()
            .expect("mock broadcaster lock")
            .push((code, payload));
    }
}

/// A validator-set source backed by a mutable in-memory set.
pub(crate) struct FixedValidators {
    set: Mutex<HashSet<Address>>,
}

impl FixedValidators {
    pub(crate) fn new(addresses: &[Address]) -> Self {
        Self {
            set: Mutex::new(addresses.iter().copied().collect()),
        }
    }

    pub(crate) fn replace(&self, addresses: &[Address]) {
        *self.set.lock().expect("mock validators lock") = addresses.iter().copied().collect();
    }
}

impl ValidatorReader for FixedValidators {
    fn active_and_registered(&self) -> Result<HashSet<Address>> {
        Ok(self.set.lock().expect("mock validators lock").clone())
    }
}

/// An endpoint source with a fixed local enode and optional proxy enode.
pub(crate) struct FixedEndpoints {
    local: EnodeUrl,
    proxy: Option<EnodeUrl>,
}

impl FixedEndpoints {
    pub(crate) fn new(local: EnodeUrl, proxy: Option<EnodeUrl>) -> Self {
        Self { local, proxy }
    }
}

impl EndpointSource for FixedEndpoints {
    fn local_enode(&self) -> EnodeUrl {
        self.local.clone()
    }

    fn proxy_enode(&self) -> Option<EnodeUrl> {
        self.proxy.clone()
    }
}

/// A gossip engine wired to recording mocks.
pub(crate) struct TestNode {
    pub(crate) gossip: Arc<Gossip>,
    pub(crate) broadcaster: Arc<MockBroadcaster>,
    pub(crate) validators: Arc<FixedValidators>,
    pub(crate) table: Arc<ValEnodeTable>,
    pub(crate) address: Address,
}

/// Build a node whose own address is always part of the validator set, plus
/// the given extra validators.
pub(crate) fn test_node(seed: u8, config: AnnounceConfig, extra_validators: &[Address]) -> TestNode {
    let signer = Arc::new(test_signer(seed));
    let address = signer.address();
    let mut set = extra_validators.to_vec();
    set.push(address);

    let broadcaster = Arc::new(MockBroadcaster::new());
    let validators = Arc::new(FixedValidators::new(&set));
    let endpoints = Arc::new(FixedEndpoints::new(
        EnodeUrl::parse(&enode_url(seed)).expect("valid test enode"),
        None,
    ));
    let table = Arc::new(ValEnodeTable::new());

    let gossip = Arc::new(Gossip::new(
        config,
        signer,
        broadcaster.clone(),
        validators.clone(),
        endpoints,
        table.clone(),
    ));

    TestNode {
        gossip,
        broadcaster,
        validators,
        table,
        address,
    }
}

/// Build a signed announce wire payload on behalf of `signer`, with one
/// encrypted-enode entry per `(recipient, ciphertext)` pair.
pub(crate) fn build_signed_announce(
    signer: &EcdsaSigner,
    recipients: &[(Address, Vec<u8>)],
    url: &str,
    timestamp: Timestamp,
) -> Vec<u8> {
    let encrypted_enodes = recipients
        .iter()
        .map(|(decrypter_address, ciphertext)| EncryptedEnode {
            decrypter_address: *decrypter_address,
            encrypted_enode_url: ciphertext.clone(),
        })
        .collect();
    let record = ValEncryptedEnodes {
        val_address: signer.address(),
        encrypted_enodes,
        enode_url_hash: rlp_hash(&EnodeUrl::parse(url).expect("valid test enode")),
        timestamp,
    };
    let mut message = Message::new(codes::ANNOUNCE, record.to_rlp(), signer.address());
    message.sign(signer).expect("test signing");
    message.payload()
}
