//! Connection configuration

/// What to do when a connection's outbound queue is full
///
/// A full queue means the client is not draining messages as fast as they
/// are published. The policy bounds memory per connection; none of the
/// variants ever block the publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Force-close the connection (protects global memory)
    Disconnect,
    /// Drop the incoming message, keep the queued backlog
    DropNewest,
    /// Drop the oldest queued message to make room
    DropOldest,
}

/// Per-connection configuration
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Maximum number of queued outbound messages
    pub queue_bound: usize,

    /// Policy applied when the queue is full
    pub overflow_policy: OverflowPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            queue_bound: 256,
            overflow_policy: OverflowPolicy::Disconnect,
        }
    }
}

impl ConnectionConfig {
    /// Set the queue bound
    pub fn queue_bound(mut self, bound: usize) -> Self {
        self.queue_bound = bound;
        self
    }

    /// Set the overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();

        assert_eq!(config.queue_bound, 256);
        assert_eq!(config.overflow_policy, OverflowPolicy::Disconnect);
    }

    #[test]
    fn test_builder_chaining() {
        let config = ConnectionConfig::default()
            .queue_bound(10)
            .overflow_policy(OverflowPolicy::DropOldest);

        assert_eq!(config.queue_bound, 10);
        assert_eq!(config.overflow_policy, OverflowPolicy::DropOldest);
    }
}
