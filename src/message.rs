//! Published message type
//!
//! A `Message` is what flows from a publisher to every subscriber of a
//! channel. It is designed to be cheap to clone during fan-out: the channel
//! name is a shared `Arc<str>` and the payload is reference-counted `Bytes`,
//! so cloning never copies payload data.

use std::sync::Arc;

use bytes::Bytes;

/// A message published on a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Channel the message was published on
    pub channel: Arc<str>,

    /// Per-channel sequence number, assigned by whichever node owns
    /// ordering for the channel (the director in distributed mode, the
    /// local engine standalone). Monotonic within one ordering session;
    /// discontinuities across reconnects are expected.
    pub sequence: u64,

    /// Opaque payload (zero-copy via reference counting)
    pub payload: Bytes,
}

impl Message {
    /// Create a new message
    pub fn new(channel: impl Into<Arc<str>>, sequence: u64, payload: Bytes) -> Self {
        Self {
            channel: channel.into(),
            sequence,
            payload,
        }
    }
}
