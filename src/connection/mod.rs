//! Client connections
//!
//! A [`Connection`] represents one authenticated client. It owns the
//! client's bounded outbound message queue and its subscription set; the
//! transport layer owns the byte-level socket and drains the queue through
//! [`Connection::next_outbound`].

pub mod config;
pub mod handle;
pub mod state;

pub use config::{ConnectionConfig, OverflowPolicy};
pub use handle::{Connection, EnqueueOutcome};
pub use state::{CloseReason, ConnectionState};

/// Process-unique connection identifier
pub type ConnectionId = u64;
