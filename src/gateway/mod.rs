//! Transport ⇄ core seam
//!
//! A [`Gateway`] is what a transport layer (WebSocket server, TCP
//! listener, in-process test harness) talks to: it opens connections
//! through the configured [`Authenticator`](crate::auth::Authenticator)
//! and hands back a [`ClientHandle`] that accepts parsed client intents
//! and yields outbound messages for the write side.
//!
//! The gateway never parses bytes; transports decode their own framing
//! into [`ClientIntent`] values first.

mod handler;

pub use handler::{ClientHandle, Gateway};

use bytes::Bytes;

/// A client request, already parsed by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIntent {
    /// Join a channel
    Subscribe { channel: String },

    /// Leave a channel
    Unsubscribe { channel: String },

    /// Publish a payload on a channel
    Publish { channel: String, payload: Bytes },
}
