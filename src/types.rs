//! Core identity and digest types for the announce protocol.
//!
//! Validators are identified by a 20-byte Ethereum-style address; digests are
//! Keccak-256 over RLP encodings throughout. Enode URLs are carried as opaque
//! strings and only validated syntactically.

use {
    crate::error::{AnnounceError, Result},
    rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream},
    sha3::{Digest, Keccak256},
    std::fmt,
};

/// Announce timestamps are seconds since the Unix epoch and double as a
/// per-validator version number. RLP integer encoding is minimal big-endian,
/// so values below 2^32 keep the historical wire form.
pub type Timestamp = u64;

/// A 20-byte validator identity.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Hex form with a `0x` prefix, lowercase.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse from hex, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)
            .map_err(|e| AnnounceError::InvalidAddress(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(AnnounceError::InvalidAddress(format!(
                "expected 20 bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Encodable for Address {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.encoder().encode_value(&self.0);
    }
}

impl Decodable for Address {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        rlp.decoder().decode_value(|bytes| match bytes.len().cmp(&20) {
            std::cmp::Ordering::Less => Err(DecoderError::RlpIsTooShort),
            std::cmp::Ordering::Greater => Err(DecoderError::RlpIsTooBig),
            std::cmp::Ordering::Equal => {
                let mut out = [0u8; 20];
                out.copy_from_slice(bytes);
                Ok(Address(out))
            }
        })
    }
}

/// A 32-byte Keccak-256 digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Hash([u8; 32]);

impl Hash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Encodable for Hash {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.encoder().encode_value(&self.0);
    }
}

impl Decodable for Hash {
    fn decode(rlp: &Rlp) -> std::result::Result<Self, DecoderError> {
        rlp.decoder().decode_value(|bytes| match bytes.len().cmp(&32) {
            std::cmp::Ordering::Less => Err(DecoderError::RlpIsTooShort),
            std::cmp::Ordering::Greater => Err(DecoderError::RlpIsTooBig),
            std::cmp::Ordering::Equal => {
                let mut out = [0u8; 32];
                out.copy_from_slice(bytes);
                Ok(Hash(out))
            }
        })
    }
}

/// Keccak-256 of raw bytes.
pub fn keccak256(data: &[u8]) -> Hash {
    let digest = Keccak256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Hash(out)
}

/// Keccak-256 of the RLP encoding of a value.
pub fn rlp_hash<E: Encodable>(value: &E) -> Hash {
    keccak256(rlp::encode(value).as_ref())
}

/// A transport endpoint of a peer, e.g.
/// `enode://<128 hex chars>@10.0.0.1:30303`.
///
/// The URL is treated as opaque by the protocol; parsing only checks the
/// shape so that garbage ciphertext is rejected before it reaches the
/// endpoint table.
#[derive(Clone, PartialEq, Eq)]
pub struct EnodeUrl(String);

impl EnodeUrl {
    /// Validate the `enode://<id>@<host>:<port>` shape.
    ///
    /// An optional query suffix (e.g. `?discport=0`) is tolerated after the
    /// port.
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s.strip_prefix("enode://").ok_or_else(|| {
            AnnounceError::EnodeParse(format!("missing enode:// scheme in {s:?}"))
        })?;
        let (id, endpoint) = rest.split_once('@').ok_or_else(|| {
            AnnounceError::EnodeParse(format!("missing @host:port in {s:?}"))
        })?;
        if id.len() != 128 || !id.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AnnounceError::EnodeParse(format!(
                "node id must be 128 hex chars in {s:?}"
            )));
        }
        let (host, port) = endpoint.rsplit_once(':').ok_or_else(|| {
            AnnounceError::EnodeParse(format!("missing port in {s:?}"))
        })?;
        if host.is_empty() {
            return Err(AnnounceError::EnodeParse(format!("empty host in {s:?}")));
        }
        let port = port.split('?').next().unwrap_or(port);
        port.parse::<u16>().map_err(|_| {
            AnnounceError::EnodeParse(format!("invalid port in {s:?}"))
        })?;
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnodeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for EnodeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl Encodable for EnodeUrl {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.encoder().encode_value(self.0.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_enode() -> String {
        format!("enode://{}@127.0.0.1:30303", "ab".repeat(64))
    }

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::from_bytes([0x42u8; 20]);
        let hex = addr.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 42);
        assert_eq!(Address::from_hex(&hex).unwrap(), addr);
        assert_eq!(Address::from_hex(&hex[2..]).unwrap(), addr);
    }

    #[test]
    fn test_address_hex_rejects_bad_length() {
        assert!(Address::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_address_rlp_roundtrip() {
        let addr = Address::from_bytes([7u8; 20]);
        let bytes = rlp::encode(&addr);
        let decoded: Address = rlp::decode(&bytes).unwrap();
        assert_eq!(decoded, addr);
    }

    #[test]
    fn test_hash_rlp_rejects_wrong_length() {
        // A 20-byte value must not decode as a 32-byte hash.
        let addr = Address::from_bytes([1u8; 20]);
        let bytes = rlp::encode(&addr);
        assert!(rlp::decode::<Hash>(&bytes).is_err());
    }

    #[test]
    fn test_keccak_known_vector() {
        // keccak256("") from the reference implementation.
        let empty = keccak256(b"");
        assert_eq!(
            empty.to_hex(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_enode_parse_accepts_well_formed() {
        assert!(EnodeUrl::parse(&sample_enode()).is_ok());
        let with_query = format!("enode://{}@10.0.0.5:30303?discport=0", "cd".repeat(64));
        assert!(EnodeUrl::parse(&with_query).is_ok());
    }

    #[test]
    fn test_enode_parse_rejects_malformed() {
        assert!(EnodeUrl::parse("http://example.com").is_err());
        assert!(EnodeUrl::parse("enode://abcd@1.2.3.4:30303").is_err());
        let no_port = format!("enode://{}@127.0.0.1", "ab".repeat(64));
        assert!(EnodeUrl::parse(&no_port).is_err());
        let bad_port = format!("enode://{}@127.0.0.1:99999", "ab".repeat(64));
        assert!(EnodeUrl::parse(&bad_port).is_err());
    }
}
