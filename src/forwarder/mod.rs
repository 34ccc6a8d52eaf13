//! Forwarder role
//!
//! A forwarder bridges one process's engine to the fleet's director: local
//! publishes are relayed to the director for sequencing, and the
//! director's `Deliver` frames are applied to the local channel registry
//! (never re-forwarded, so there is no echo loop).
//!
//! Delivery across the link is best-effort by contract: while the link is
//! down, forwarded publishes are dropped and counted, never buffered, so
//! a partition cannot grow memory without bound. The link reconnects
//! with exponential backoff, capped and jittered to avoid thundering-herd
//! reconnects when a director restarts.

pub mod config;
pub mod connector;
pub mod link;

pub use config::ForwarderConfig;
pub use connector::{Forwarder, ForwarderHandle};
pub use link::{ForwarderLink, ForwarderStatsSnapshot};

pub(crate) use link::ForwarderStats;
