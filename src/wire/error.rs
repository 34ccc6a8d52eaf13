//! Wire protocol error types

use std::io;

/// Error type for the director/forwarder wire protocol
#[derive(Debug)]
pub enum WireError {
    /// Underlying socket error
    Io(io::Error),

    /// Frame body exceeds the configured maximum
    FrameTooLarge { len: usize, max: usize },

    /// Channel or node name exceeds the u16 length prefix
    NameTooLong(usize),

    /// Unknown frame kind byte
    UnknownKind(u8),

    /// Frame body ended before all fields were read
    Truncated,

    /// Channel or node name was not valid UTF-8
    InvalidName,
}

impl std::fmt::Display for WireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireError::Io(e) => write!(f, "I/O error: {}", e),
            WireError::FrameTooLarge { len, max } => {
                write!(f, "Frame too large: {} bytes (max {})", len, max)
            }
            WireError::NameTooLong(len) => {
                write!(f, "Name too long: {} bytes (max {})", len, u16::MAX)
            }
            WireError::UnknownKind(kind) => write!(f, "Unknown frame kind: {:#04x}", kind),
            WireError::Truncated => write!(f, "Truncated frame"),
            WireError::InvalidName => write!(f, "Name is not valid UTF-8"),
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WireError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WireError {
    fn from(e: io::Error) -> Self {
        WireError::Io(e)
    }
}
