//! Per-forwarder link session state

use std::net::SocketAddr;
use std::time::Instant;

/// Lifecycle state of one forwarder link
///
/// `Connecting → Synced → Disconnected`, one way. A link relays traffic
/// only while `Synced`; a reconnecting forwarder gets a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// TCP accepted, waiting for the forwarder's `Hello`
    Connecting,
    /// Session established; receives every rebroadcast
    Synced,
    /// Link ended; removed from the broadcast set
    Disconnected,
}

/// Session bookkeeping for one forwarder link
#[derive(Debug)]
pub struct LinkSession {
    /// Director-assigned link id
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Node name from the forwarder's `Hello` (logging only)
    pub node: Option<String>,

    /// Current state
    pub state: LinkState,

    /// When the link was accepted
    pub connected_at: Instant,
}

impl LinkSession {
    /// Create a session in the `Connecting` state
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            node: None,
            state: LinkState::Connecting,
            connected_at: Instant::now(),
        }
    }

    /// Record the `Hello` and promote to `Synced`
    pub fn sync(&mut self, node: String) {
        if self.state == LinkState::Connecting {
            self.node = Some(node);
            self.state = LinkState::Synced;
        }
    }

    /// Mark the link disconnected
    pub fn disconnect(&mut self) {
        self.state = LinkState::Disconnected;
    }

    /// Whether the link participates in rebroadcast
    pub fn is_synced(&self) -> bool {
        self.state == LinkState::Synced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 4243)
    }

    #[test]
    fn test_link_lifecycle() {
        let mut session = LinkSession::new(1, addr());
        assert_eq!(session.state, LinkState::Connecting);
        assert!(!session.is_synced());

        session.sync("node-a".into());
        assert!(session.is_synced());
        assert_eq!(session.node.as_deref(), Some("node-a"));

        session.disconnect();
        assert_eq!(session.state, LinkState::Disconnected);

        // No way back to Synced
        session.sync("node-b".into());
        assert_eq!(session.state, LinkState::Disconnected);
        assert_eq!(session.node.as_deref(), Some("node-a"));
    }
}
