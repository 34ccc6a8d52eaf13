//! Director configuration

use std::net::SocketAddr;

use crate::wire::DEFAULT_MAX_FRAME;

/// Director configuration options
#[derive(Debug, Clone)]
pub struct DirectorConfig {
    /// Address to accept forwarder links on
    pub bind_addr: SocketAddr,

    /// Maximum wire frame body length
    pub max_frame: usize,

    /// Outbound frame buffer per link; a link that falls this far behind
    /// is dropped from the broadcast set
    pub link_capacity: usize,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:4243".parse().unwrap(),
            max_frame: DEFAULT_MAX_FRAME,
            link_capacity: 1024,
        }
    }
}

impl DirectorConfig {
    /// Create a config with a custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the maximum frame body length
    pub fn max_frame(mut self, max: usize) -> Self {
        self.max_frame = max;
        self
    }

    /// Set the per-link outbound buffer size
    pub fn link_capacity(mut self, capacity: usize) -> Self {
        self.link_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DirectorConfig::default();

        assert_eq!(config.bind_addr.port(), 4243);
        assert_eq!(config.max_frame, DEFAULT_MAX_FRAME);
        assert_eq!(config.link_capacity, 1024);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "0.0.0.0:9000".parse().unwrap();
        let config = DirectorConfig::default()
            .bind(addr)
            .max_frame(4096)
            .link_capacity(8);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_frame, 4096);
        assert_eq!(config.link_capacity, 8);
    }
}
