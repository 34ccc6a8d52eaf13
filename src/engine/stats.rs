//! Engine-level counters
//!
//! Delivery failures and drops are counted here, never surfaced as errors
//! to the publisher.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters maintained by the engine
#[derive(Debug, Default)]
pub struct EngineStats {
    /// `publish` calls accepted
    pub published: AtomicU64,
    /// Messages placed on a subscriber queue
    pub delivered: AtomicU64,
    /// Per-subscriber deliveries lost to overflow policy or closed connections
    pub delivery_dropped: AtomicU64,
}

impl EngineStats {
    /// Take a point-in-time snapshot
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            delivery_dropped: self.delivery_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`EngineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStatsSnapshot {
    pub published: u64,
    pub delivered: u64,
    pub delivery_dropped: u64,
}
