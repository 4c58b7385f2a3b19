//! Wire types for the announce protocol.
//!
//! Four code points are exchanged as opaque payloads on the consensus p2p
//! channel:
//!
//! | Code | Payload (RLP) |
//! |------|---------------|
//! | [`codes::ANNOUNCE`] | signed [`Message`] envelope wrapping [`ValEncryptedEnodes`] |
//! | [`codes::GET_ANNOUNCES`] | sequence of [`Address`] |
//! | [`codes::GET_ANNOUNCE_VERSIONS`] | empty bytes |
//! | [`codes::ANNOUNCE_VERSIONS`] | sequence of [`AnnounceVersion`] |
//!
//! All records serialize as fixed-arity RLP lists. Decoders enforce the
//! arity and reject trailing garbage, since these encodings must stay
//! bit-exact for existing network participants.

use {
    crate::{
        error::{AnnounceError, Result},
        signer::{recover_address, Signer},
        types::{Address, Hash, Timestamp},
    },
    rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream},
};

/// Message codes on the announce channel.
pub mod codes {
    pub const ANNOUNCE: u64 = 0x12;
    pub const GET_ANNOUNCES: u64 = 0x13;
    pub const GET_ANNOUNCE_VERSIONS: u64 = 0x14;
    pub const ANNOUNCE_VERSIONS: u64 = 0x15;
}

/// Human-readable tag for logging.
pub fn code_name(code: u64) -> &'static str {
    match code {
        codes::ANNOUNCE => "announce",
        codes::GET_ANNOUNCES => "get_announces",
        codes::GET_ANNOUNCE_VERSIONS => "get_announce_versions",
        codes::ANNOUNCE_VERSIONS => "announce_versions",
        _ => "unknown",
    }
}

/// Decode a single RLP value and reject any trailing bytes.
fn decode_exact<T: Decodable>(payload: &[u8]) -> std::result::Result<T, DecoderError> {
    let rlp = Rlp::new(payload);
    let info = rlp.payload_info()?;
    if info.header_len + info.value_len != payload.len() {
        return Err(DecoderError::RlpInconsistentLengthAndData);
    }
    rlp.as_val()
}

/// Decode a top-level RLP list of values, rejecting trailing bytes.
fn decode_exact_list<T: Decodable>(payload: &[u8]) -> std::result::Result<Vec<T>, DecoderError> {
    let rlp = Rlp::new(payload);
    if !rlp.is_list() {
        return Err(DecoderError::RlpExpectedToBeList);
    }
    let info = rlp.payload_info()?;
    if info.header_len + info.value_len != payload.len() {
        return Err(DecoderError::RlpInconsistentLengthAndData);
    }
    rlp.as_list()
}

// ── Encrypted enode records ─────────────────────────────────────────────────

/// One recipient's copy of the emitter's enode URL, encrypted with the key
/// held by `decrypter_address`.
///
/// The ciphertext currently equals the plaintext URL bytes; the record shape
/// already gives every recipient a distinct blob so introducing real
/// per-recipient encryption needs no wire change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnode {
    pub decrypter_address: Address,
    pub encrypted_enode_url: Vec<u8>,
}

impl Encodable for EncryptedEnode {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.decrypter_address);
        s.append(&self.encrypted_enode_url);
    }
}

impl Decodable for EncryptedEnode {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            decrypter_address: rlp.val_at(0)?,
            encrypted_enode_url: rlp.val_at(1)?,
        })
    }
}

/// The announced record of one validator: an encrypted enode per recipient,
/// the Keccak hash of the plaintext URL, and the emission timestamp that
/// versions this validator's announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValEncryptedEnodes {
    pub val_address: Address,
    pub encrypted_enodes: Vec<EncryptedEnode>,
    pub enode_url_hash: Hash,
    pub timestamp: Timestamp,
}

impl ValEncryptedEnodes {
    pub fn to_rlp(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    pub fn from_rlp(payload: &[u8]) -> Result<Self> {
        Ok(decode_exact(payload)?)
    }
}

impl Encodable for ValEncryptedEnodes {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.val_address);
        s.append_list(&self.encrypted_enodes);
        s.append(&self.enode_url_hash);
        s.append(&self.timestamp);
    }
}

impl Decodable for ValEncryptedEnodes {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            val_address: rlp.val_at(0)?,
            encrypted_enodes: rlp.list_at(1)?,
            enode_url_hash: rlp.val_at(2)?,
            timestamp: rlp.val_at(3)?,
        })
    }
}

// ── Version records ─────────────────────────────────────────────────────────

/// A validator address paired with the timestamp of its latest known
/// announce. Exchanged during version reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnounceVersion {
    pub val_address: Address,
    pub timestamp: Timestamp,
}

impl Encodable for AnnounceVersion {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(2);
        s.append(&self.val_address);
        s.append(&self.timestamp);
    }
}

impl Decodable for AnnounceVersion {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 2 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            val_address: rlp.val_at(0)?,
            timestamp: rlp.val_at(1)?,
        })
    }
}

// ── List payload helpers ────────────────────────────────────────────────────

/// Encode the payload of a GetAnnounces request.
pub fn encode_address_list(addresses: &[Address]) -> Vec<u8> {
    let mut s = RlpStream::new_list(addresses.len());
    for address in addresses {
        s.append(address);
    }
    s.out().to_vec()
}

/// Decode the payload of a GetAnnounces request.
pub fn decode_address_list(payload: &[u8]) -> Result<Vec<Address>> {
    Ok(decode_exact_list(payload)?)
}

/// Encode the payload of an AnnounceVersions reply.
pub fn encode_version_list(versions: &[AnnounceVersion]) -> Vec<u8> {
    let mut s = RlpStream::new_list(versions.len());
    for version in versions {
        s.append(version);
    }
    s.out().to_vec()
}

/// Decode the payload of an AnnounceVersions reply.
pub fn decode_version_list(payload: &[u8]) -> Result<Vec<AnnounceVersion>> {
    Ok(decode_exact_list(payload)?)
}

// ── Signed envelope ─────────────────────────────────────────────────────────

/// The signed envelope carried under [`codes::ANNOUNCE`].
///
/// The signature is a recoverable signature over the RLP of
/// `(code, msg, address)`; [`Message::from_payload`] recovers the signer and
/// rejects envelopes whose declared address does not match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub code: u64,
    pub msg: Vec<u8>,
    pub address: Address,
    pub signature: Vec<u8>,
}

impl Message {
    /// Build an unsigned envelope.
    pub fn new(code: u64, msg: Vec<u8>, address: Address) -> Self {
        Self {
            code,
            msg,
            address,
            signature: Vec::new(),
        }
    }

    /// The bytes covered by the signature.
    fn signature_input(&self) -> Vec<u8> {
        let mut s = RlpStream::new_list(3);
        s.append(&self.code);
        s.append(&self.msg);
        s.append(&self.address);
        s.out().to_vec()
    }

    /// Populate the signature using the node's signer.
    pub fn sign(&mut self, signer: &dyn Signer) -> Result<()> {
        self.signature = signer.sign(&self.signature_input())?;
        Ok(())
    }

    /// Canonical wire form: the RLP of `(code, msg, address, signature)`.
    pub fn payload(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decode a wire payload and authenticate it: recover the signer from
    /// the signature and require it to match the declared address.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        let message: Message = decode_exact(payload)?;
        let recovered = recover_address(&message.signature_input(), &message.signature)?;
        if recovered != message.address {
            return Err(AnnounceError::SignerMismatch {
                declared: message.address,
                recovered,
            });
        }
        Ok(message)
    }
}

impl Encodable for Message {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.code);
        s.append(&self.msg);
        s.append(&self.address);
        s.append(&self.signature);
    }
}

impl Decodable for Message {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        if rlp.item_count()? != 4 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            code: rlp.val_at(0)?,
            msg: rlp.val_at(1)?,
            address: rlp.val_at(2)?,
            signature: rlp.val_at(3)?,
        })
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
