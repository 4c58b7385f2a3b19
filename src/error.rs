//! Error types for the announce gossip subsystem.

use {
    crate::types::{Address, Timestamp},
    thiserror::Error,
};

/// Errors that can occur while generating, handling, or persisting announces.
#[derive(Error, Debug)]
pub enum AnnounceError {
    /// Malformed RLP on the wire.
    #[error("rlp decode error: {0}")]
    Decode(#[from] rlp::DecoderError),

    /// Signature recovery failed or the signature is malformed.
    #[error("signature error: {0}")]
    Signature(String),

    /// The recovered signer does not match the address declared in the
    /// message envelope.
    #[error("recovered signer {recovered} does not match declared address {declared}")]
    SignerMismatch {
        declared: Address,
        recovered: Address,
    },

    /// The announce was signed by a validator outside the registered or
    /// elected set.
    #[error("announce from non registered/elected validator {0}")]
    UnauthorizedAnnounce(Address),

    /// The announce carries a timestamp at or below the cached version.
    #[error("stale announce (cached timestamp {cached}, received {received})")]
    OldAnnounce {
        cached: Timestamp,
        received: Timestamp,
    },

    /// A self-targeted ciphertext did not parse as an enode URL.
    #[error("enode parse error: {0}")]
    EnodeParse(String),

    /// Not a valid 20-byte address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Proxied mode is configured but no proxy is attached.
    #[error("proxied validator has no proxy connection")]
    NoProxyConnection,

    /// The validator-set lookup collaborator failed.
    #[error("validator set unavailable: {0}")]
    ValidatorSet(String),

    /// The signing collaborator failed.
    #[error("signer error: {0}")]
    Signer(String),

    /// I/O error while persisting or loading the endpoint table snapshot.
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding error in the endpoint table snapshot.
    #[error("snapshot encoding error: {0}")]
    Snapshot(#[from] bincode::Error),
}

/// Convenience result type for announce operations.
pub type Result<T> = std::result::Result<T, AnnounceError>;
