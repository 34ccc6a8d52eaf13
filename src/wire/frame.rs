//! Frame types for the director/forwarder link

use bytes::Bytes;

/// Frame kind discriminant (first body byte on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Hello = 0x01,
    Welcome = 0x02,
    Forward = 0x03,
    Deliver = 0x04,
    Ping = 0x05,
    Pong = 0x06,
}

impl FrameKind {
    /// Parse a kind byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(FrameKind::Hello),
            0x02 => Some(FrameKind::Welcome),
            0x03 => Some(FrameKind::Forward),
            0x04 => Some(FrameKind::Deliver),
            0x05 => Some(FrameKind::Ping),
            0x06 => Some(FrameKind::Pong),
            _ => None,
        }
    }
}

/// A frame on the director/forwarder link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Session establishment, forwarder → director
    Hello {
        /// Name the forwarder identifies itself with (logging only)
        node: String,
    },

    /// Session accepted, director → forwarder
    Welcome,

    /// A local publish relayed to the director for sequencing
    Forward { channel: String, payload: Bytes },

    /// A sequenced message rebroadcast by the director to every synced link
    Deliver {
        channel: String,
        sequence: u64,
        payload: Bytes,
    },

    /// Liveness probe
    Ping,

    /// Liveness reply
    Pong,
}

impl Frame {
    /// Kind discriminant of this frame
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Hello { .. } => FrameKind::Hello,
            Frame::Welcome => FrameKind::Welcome,
            Frame::Forward { .. } => FrameKind::Forward,
            Frame::Deliver { .. } => FrameKind::Deliver,
            Frame::Ping => FrameKind::Ping,
            Frame::Pong => FrameKind::Pong,
        }
    }
}
