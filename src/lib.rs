//! Validator enode announce gossip.
//!
//! Validators in a BFT network need each other's transport endpoints (enode
//! URLs) without publishing them to the world. Each validator periodically
//! signs an announce carrying one encrypted copy of its enode URL per
//! recipient validator, and multicasts it on the consensus p2p channel.
//! Peers cache the newest announce per validator, forward fresh ones
//! (throttled), and lazily reconcile `(validator, timestamp)` version sets
//! so caches converge even across restarts and partitions.
//!
//! ## Architecture
//!
//! ```text
//!  ┌───────────────────────────────────────────────────────┐
//!  │  AnnounceService (single owning loop task)            │
//!  │  • core start/stop, epoch, quit signals               │
//!  │  • gossip ticker + frequency state machine            │
//!  │  • version-reconciliation ticker                      │
//!  └──────────────────────────┬────────────────────────────┘
//!                             │ drives
//!  ┌──────────────────────────▼────────────────────────────┐
//!  │  Gossip                                               │
//!  │  • generate + sign own announce                       │
//!  │  • 4 handlers: Announce / GetAnnounces /              │
//!  │    GetAnnounceVersions / AnnounceVersions             │
//!  │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐   │
//!  │  │ AnnounceCache│ │ Regossip     │ │ ValEnodeTable│   │
//!  │  │ (newest per  │ │ Throttle     │ │ (learned     │   │
//!  │  │  validator)  │ │ (60s window) │ │  endpoints)  │   │
//!  │  └──────────────┘ └──────────────┘ └──────────────┘   │
//!  └──────┬──────────────────┬─────────────────┬───────────┘
//!         │ Broadcaster      │ ValidatorReader │ Signer
//!         ▼                  ▼                 ▼
//!   p2p transport      validator registry   node key
//! ```
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`]      | `AnnounceConfig` periods and defaults |
//! | [`types`]       | `Address`, `Hash`, `EnodeUrl`, Keccak helpers |
//! | [`message`]     | RLP wire types and the signed envelope |
//! | [`signer`]      | recoverable ECDSA signing seam |
//! | [`cache`]       | newest-announce-per-validator cache |
//! | [`throttle`]    | duplicate-forwarding suppression |
//! | [`table`]       | validator-endpoint table (+ snapshot) |
//! | [`broadcaster`] | p2p collaborator traits |
//! | [`gossip`]      | the handlers and the announce generator |
//! | [`service`]     | the announce loop and frequency machine |
//! | [`error`]       | crate-wide error enum |
//!
//! ## Key properties
//!
//! - **Monotonicity**: for any validator the cached announce timestamp only
//!   grows; stale deliveries never clobber newer state.
//! - **Authorization**: only announces whose recovered signer is in the
//!   registered-or-elected validator set are admitted or forwarded.
//! - **Bounded staleness**: cache, throttle, and endpoint table are pruned
//!   to the current validator set (explicitly on admission, probabilistically
//!   on regossip).
//! - **Convergence**: connected peers exchanging version sets converge on
//!   the max-timestamp announce for every validator.

pub mod broadcaster;
pub mod cache;
pub mod config;
pub mod error;
pub mod gossip;
pub mod message;
pub mod service;
pub mod signer;
pub mod table;
pub mod throttle;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub use broadcaster::{Broadcaster, Peer};
pub use cache::{Admission, AnnounceCache};
pub use config::AnnounceConfig;
pub use error::{AnnounceError, Result};
pub use gossip::{EndpointSource, Gossip, ValidatorReader};
pub use message::{
    codes, AnnounceVersion, EncryptedEnode, Message, ValEncryptedEnodes,
};
pub use service::{AnnounceService, CadenceState, GossipCadence};
pub use signer::{recover_address, EcdsaSigner, Signer};
pub use table::{EndpointEntry, ValEnodeTable};
pub use throttle::{dest_addresses_hash, RegossipThrottle};
pub use types::{keccak256, rlp_hash, Address, EnodeUrl, Hash, Timestamp};
