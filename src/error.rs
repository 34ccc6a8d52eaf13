//! Crate error types
//!
//! Errors are grouped by the subsystem that produces them. The crate-wide
//! `Error` wraps the module-level enums so callers can use a single
//! `Result` alias and `?` across subsystem boundaries.

use std::io;

use crate::auth::AuthError;
use crate::wire::WireError;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error (sockets, listener binding)
    Io(io::Error),

    /// Authentication rejected or failed
    Auth(AuthError),

    /// Wire protocol violation on a director/forwarder link
    Wire(WireError),

    /// Operation referenced a connection the engine does not know about
    UnknownConnection(u64),

    /// Operation requires an `Active` connection
    ConnectionNotActive(u64),

    /// Engine role already initialized (e.g. second `init_forwarder`)
    RoleAlreadyActive(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Auth(e) => write!(f, "Authentication error: {}", e),
            Error::Wire(e) => write!(f, "Wire protocol error: {}", e),
            Error::UnknownConnection(id) => write!(f, "Unknown connection: {}", id),
            Error::ConnectionNotActive(id) => write!(f, "Connection not active: {}", id),
            Error::RoleAlreadyActive(role) => write!(f, "Role already active: {}", role),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Auth(e) => Some(e),
            Error::Wire(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<AuthError> for Error {
    fn from(e: AuthError) -> Self {
        Error::Auth(e)
    }
}

impl From<WireError> for Error {
    fn from(e: WireError) -> Self {
        Error::Wire(e)
    }
}
