//! Traits abstracting the p2p layer from the gossip engine.
//!
//! The gossip engine never talks to sockets. It sees peers through [`Peer`]
//! and the connected set through [`Broadcaster`]; the node's networking
//! stack provides the implementations. Sends are fire-and-forget: an
//! implementation must not block the caller on the network, so a handler
//! holding a cache lock never stalls on a slow peer.

use std::sync::Arc;

/// A connected peer able to receive announce-channel messages.
pub trait Peer: Send + Sync {
    /// Queue `payload` for delivery to this peer under `code`. Must not
    /// block; delivery is best-effort.
    fn send(&self, code: u64, payload: Vec<u8>);

    /// Stable identifier for log lines.
    fn id(&self) -> String;
}

/// The node's view of its connected peer set.
pub trait Broadcaster: Send + Sync {
    /// All currently connected peers.
    fn find_peers(&self) -> Vec<Arc<dyn Peer>>;

    /// Best-effort fan-out of `payload` to every connected peer under
    /// `code`. Must not block.
    fn multicast(&self, code: u64, payload: Vec<u8>);
}
