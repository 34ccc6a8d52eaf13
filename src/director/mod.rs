//! Director node
//!
//! The director is the single coordinating relay of a multi-process
//! deployment. Forwarders connect to it over TCP; every `Forward` frame
//! any of them sends is assigned the next sequence number for its channel
//! and rebroadcast as a `Deliver` frame to every synced link, including
//! the originator. That gives the fleet a single total order per channel
//! without vector clocks.
//!
//! The director holds no per-channel subscriber state and never replays
//! missed messages: a dropped link is simply removed from the broadcast
//! set, and a reconnecting forwarder starts a fresh session.

pub mod config;
pub mod link;
pub mod node;

pub use config::DirectorConfig;
pub use link::{LinkSession, LinkState};
pub use node::{Director, DirectorHandle, DirectorStatsSnapshot};
