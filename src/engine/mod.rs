//! PubSub engine
//!
//! The engine orchestrates the channel registry and the connection set:
//! it assigns sequence numbers, fans published messages out to subscriber
//! queues, enforces identity checks on subscribe/unsubscribe, and cleans
//! up closed connections. Director and forwarder are optional roles
//! activated on an engine; a single-process deployment runs with purely
//! local fan-out and no network hop.

pub mod core;
pub mod stats;

pub use core::Engine;
pub use stats::{EngineStats, EngineStatsSnapshot};
