//! Connection lifecycle states

/// Lifecycle state of a connection
///
/// Transitions are one-way: `Authenticating → Active → Closed`, or
/// `Authenticating → Closed` when the authenticator rejects. There is no
/// transition out of `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the authenticator capability to resolve
    Authenticating,
    /// Authenticated; may subscribe, unsubscribe and receive messages
    Active,
    /// Terminal state; queue released, no further enqueues
    Closed,
}

/// Why a connection was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The authenticator rejected the connection
    AuthRejected,
    /// Outbound queue overflowed under the `Disconnect` policy
    Overflow,
    /// The transport reported the socket closed
    TransportClosed,
    /// The process is shutting down
    ServerShutdown,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::AuthRejected => write!(f, "authentication rejected"),
            CloseReason::Overflow => write!(f, "outbound queue overflow"),
            CloseReason::TransportClosed => write!(f, "transport closed"),
            CloseReason::ServerShutdown => write!(f, "server shutdown"),
        }
    }
}
