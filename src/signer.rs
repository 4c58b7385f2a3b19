//! Message signing and signature recovery.
//!
//! Announce envelopes carry a 65-byte recoverable secp256k1 signature
//! (`r || s || v`) over the Keccak-256 digest of the signed bytes. The
//! [`Signer`] trait is the seam between the gossip engine and the node's key
//! management; [`EcdsaSigner`] is the stock implementation.

use {
    crate::{
        error::{AnnounceError, Result},
        types::{keccak256, Address},
    },
    k256::{
        ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey},
        elliptic_curve::sec1::ToEncodedPoint,
    },
};

/// Length of a recoverable signature: 64 bytes of `r || s` plus one recovery
/// byte.
pub const SIGNATURE_LEN: usize = 65;

/// Signs announce payloads on behalf of this validator.
pub trait Signer: Send + Sync {
    /// The validator address corresponding to the signing key.
    fn address(&self) -> Address;

    /// Produce a 65-byte recoverable signature over `data`.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// secp256k1 signer backed by a [`k256::ecdsa::SigningKey`].
pub struct EcdsaSigner {
    key: SigningKey,
    address: Address,
}

impl EcdsaSigner {
    pub fn new(key: SigningKey) -> Self {
        let address = address_from_verifying_key(key.verifying_key());
        Self { key, address }
    }

    /// Build a signer from a raw 32-byte secret scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let key = SigningKey::from_slice(bytes)
            .map_err(|e| AnnounceError::Signer(e.to_string()))?;
        Ok(Self::new(key))
    }
}

impl Signer for EcdsaSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let digest = keccak256(data);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest.as_bytes())
            .map_err(|e| AnnounceError::Signer(e.to_string()))?;
        let mut out = signature.to_vec();
        out.push(recovery_id.to_byte());
        Ok(out)
    }
}

/// Recover the signer address from a 65-byte recoverable signature over
/// `data`.
pub fn recover_address(data: &[u8], signature: &[u8]) -> Result<Address> {
    if signature.len() != SIGNATURE_LEN {
        return Err(AnnounceError::Signature(format!(
            "expected {SIGNATURE_LEN}-byte signature, got {}",
            signature.len()
        )));
    }
    let recovery_id = RecoveryId::from_byte(signature[64])
        .ok_or_else(|| AnnounceError::Signature("invalid recovery id".into()))?;
    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| AnnounceError::Signature(e.to_string()))?;
    let digest = keccak256(data);
    let verifying_key =
        VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id)
            .map_err(|e| AnnounceError::Signature(e.to_string()))?;
    Ok(address_from_verifying_key(&verifying_key))
}

/// Ethereum-style address: the last 20 bytes of the Keccak-256 hash of the
/// uncompressed public key (minus its 0x04 prefix byte).
fn address_from_verifying_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest.as_bytes()[12..]);
    Address::from_bytes(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer(seed: u8) -> EcdsaSigner {
        EcdsaSigner::from_secret_bytes(&[seed; 32]).unwrap()
    }

    #[test]
    fn test_sign_and_recover() {
        let signer = test_signer(1);
        let data = b"announce payload";
        let signature = signer.sign(data).unwrap();
        assert_eq!(signature.len(), SIGNATURE_LEN);
        let recovered = recover_address(data, &signature).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn test_recover_rejects_bad_length() {
        assert!(recover_address(b"data", &[0u8; 64]).is_err());
    }

    #[test]
    fn test_tampered_data_recovers_different_address() {
        let signer = test_signer(2);
        let signature = signer.sign(b"original").unwrap();
        match recover_address(b"tampered", &signature) {
            Ok(addr) => assert_ne!(addr, signer.address()),
            Err(_) => {} // recovery may also fail outright
        }
    }

    #[test]
    fn test_distinct_keys_distinct_addresses() {
        assert_ne!(test_signer(3).address(), test_signer(4).address());
    }

    #[test]
    fn test_zero_secret_rejected() {
        assert!(EcdsaSigner::from_secret_bytes(&[0u8; 32]).is_err());
    }
}
