//! Forwarder configuration

use std::net::SocketAddr;
use std::time::Duration;

use crate::wire::DEFAULT_MAX_FRAME;

/// Forwarder configuration options
#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Director address to link to
    pub director_addr: SocketAddr,

    /// Name this node identifies itself with in the `Hello` frame
    pub node: String,

    /// Outbound buffer between the engine and the link task. Messages
    /// queued here only while the link is up; the buffer is discarded on
    /// reconnect.
    pub outbound_capacity: usize,

    /// First reconnect delay
    pub backoff_base: Duration,

    /// Reconnect delay cap
    pub backoff_max: Duration,

    /// Maximum wire frame body length
    pub max_frame: usize,

    /// Send a `Ping` after this much outbound silence
    pub ping_interval: Duration,
}

impl ForwarderConfig {
    /// Create a config for the given director address
    pub fn new(director_addr: SocketAddr) -> Self {
        Self {
            director_addr,
            node: "forwarder".to_string(),
            outbound_capacity: 1024,
            backoff_base: Duration::from_millis(200),
            backoff_max: Duration::from_secs(10),
            max_frame: DEFAULT_MAX_FRAME,
            ping_interval: Duration::from_secs(30),
        }
    }

    /// Set the node name
    pub fn node(mut self, node: impl Into<String>) -> Self {
        self.node = node.into();
        self
    }

    /// Set the outbound buffer capacity
    pub fn outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }

    /// Set the reconnect backoff range
    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Set the maximum frame body length
    pub fn max_frame(mut self, max: usize) -> Self {
        self.max_frame = max;
        self
    }

    /// Set the idle ping interval
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ForwarderConfig::new("127.0.0.1:4243".parse().unwrap());

        assert_eq!(config.node, "forwarder");
        assert_eq!(config.outbound_capacity, 1024);
        assert_eq!(config.backoff_base, Duration::from_millis(200));
        assert_eq!(config.backoff_max, Duration::from_secs(10));
        assert_eq!(config.max_frame, DEFAULT_MAX_FRAME);
        assert_eq!(config.ping_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_chaining() {
        let config = ForwarderConfig::new("127.0.0.1:4243".parse().unwrap())
            .node("node-7")
            .outbound_capacity(16)
            .backoff(Duration::from_millis(10), Duration::from_millis(100));

        assert_eq!(config.node, "node-7");
        assert_eq!(config.outbound_capacity, 16);
        assert_eq!(config.backoff_max, Duration::from_millis(100));
    }
}
