//! Director/forwarder wire protocol
//!
//! A small duplex protocol carrying publish traffic and session control
//! between forwarders and the director. Frames are self-delimiting
//! (length-prefixed) because payloads are opaque and may contain arbitrary
//! bytes.
//!
//! # Framing
//!
//! ```text
//! +----------------+------+------------------------------------+
//! | body len (u32) | kind |              fields                |
//! +----------------+------+------------------------------------+
//!
//! Hello    kind=0x01  node:    u16 len + UTF-8
//! Welcome  kind=0x02  (empty)
//! Forward  kind=0x03  channel: u16 len + UTF-8, payload: rest of frame
//! Deliver  kind=0x04  channel: u16 len + UTF-8, sequence: u64,
//!                     payload: rest of frame
//! Ping     kind=0x05  (empty)
//! Pong     kind=0x06  (empty)
//! ```
//!
//! All integers are big-endian. Names are capped at 65,535 bytes by the
//! u16 prefix; encoding rejects longer names rather than truncating. A
//! hard maximum body length bounds memory, checked on both sides: readers
//! treat an oversize frame as a protocol violation that tears the link
//! down, writers refuse to send one in the first place.

pub mod codec;
pub mod error;
pub mod frame;

pub use codec::{decode, encode, read_frame, write_frame, DEFAULT_MAX_FRAME};
pub use error::WireError;
pub use frame::{Frame, FrameKind};
