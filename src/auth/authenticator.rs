//! Authenticator trait and bundled implementations

use std::collections::HashMap;
use std::future::Future;

use super::{AuthError, ConnectRequest, Identity};

/// Capability that validates incoming connections
///
/// Invoked exactly once per connection, before any subscription is
/// permitted. Implementations may await external services (token
/// introspection, database lookups); the connection stays in the
/// `Authenticating` state until the future resolves.
pub trait Authenticator: Send + Sync {
    /// Validate a connection request, returning the identity on success
    fn authenticate(
        &self,
        request: &ConnectRequest,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;
}

/// Accepts every connection
///
/// Development and testing only: assigns the subject `"anonymous"` unless
/// the request carries a `subject` parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authenticator for AllowAll {
    async fn authenticate(&self, request: &ConnectRequest) -> Result<Identity, AuthError> {
        let subject = request
            .params
            .get("subject")
            .cloned()
            .unwrap_or_else(|| "anonymous".to_string());
        Ok(Identity::new(subject))
    }
}

/// Shared-secret authenticator
///
/// Maps bearer tokens to subjects. Connections without a token, or with an
/// unknown token, are rejected.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: HashMap<String, String>,
}

impl StaticTokens {
    /// Create an empty token map (rejects everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a subject
    pub fn with_token(mut self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), subject.into());
        self
    }
}

impl Authenticator for StaticTokens {
    async fn authenticate(&self, request: &ConnectRequest) -> Result<Identity, AuthError> {
        let token = request
            .token
            .as_deref()
            .ok_or(AuthError::MissingCredentials)?;

        match self.tokens.get(token) {
            Some(subject) => Ok(Identity::new(subject.clone())),
            None => Err(AuthError::Rejected("unknown token".into())),
        }
    }
}
