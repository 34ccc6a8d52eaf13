//! Authentication capability
//!
//! The gateway never decides who may connect; it delegates to a pluggable
//! [`Authenticator`] supplied at construction time. An authenticator sees
//! only the transport-extracted [`ConnectRequest`] and either returns an
//! [`Identity`] or rejects the connection.

mod authenticator;

pub use authenticator::{AllowAll, Authenticator, StaticTokens};

use std::collections::HashMap;
use std::net::SocketAddr;

/// Credentials and metadata extracted from an incoming connection
///
/// Built by the transport layer (e.g. from WebSocket upgrade headers or
/// query parameters) before the core ever sees the connection.
#[derive(Debug, Clone, Default)]
pub struct ConnectRequest {
    /// Remote peer address, if the transport knows it
    pub peer_addr: Option<SocketAddr>,

    /// Opaque bearer token, if one was presented
    pub token: Option<String>,

    /// Additional transport-extracted parameters
    pub params: HashMap<String, String>,
}

impl ConnectRequest {
    /// Create an empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the peer address
    pub fn peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Set the bearer token
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Add a parameter
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Authenticated identity of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Subject name (user id, service name, ...)
    pub subject: String,

    /// Attributes the authenticator chose to attach
    pub attributes: HashMap<String, String>,
}

impl Identity {
    /// Create an identity with no attributes
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            attributes: HashMap::new(),
        }
    }
}

/// Error type for authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Credentials were checked and rejected
    Rejected(String),

    /// No credentials were presented but some are required
    MissingCredentials,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Rejected(reason) => write!(f, "Rejected: {}", reason),
            AuthError::MissingCredentials => write!(f, "Missing credentials"),
        }
    }
}

impl std::error::Error for AuthError {}
