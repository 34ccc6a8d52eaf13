//! Gateway and per-client handle

use std::sync::Arc;

use crate::auth::{AuthError, Authenticator, ConnectRequest};
use crate::connection::{CloseReason, Connection, ConnectionId, ConnectionState};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::message::Message;

use super::ClientIntent;

/// Entry point for transports
///
/// Owns the authenticator; shares the engine with whatever else runs in
/// the process (other gateways, the forwarder link).
pub struct Gateway<A> {
    engine: Arc<Engine>,
    authenticator: A,
}

impl<A: Authenticator> Gateway<A> {
    /// Create a gateway over an engine
    pub fn new(engine: Arc<Engine>, authenticator: A) -> Self {
        Self {
            engine,
            authenticator,
        }
    }

    /// The engine this gateway feeds
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Admit one incoming connection
    ///
    /// Registers the connection, runs the authenticator, and activates on
    /// success. A rejected connection is closed and untracked before this
    /// returns, so rejection leaves no registry state behind.
    pub async fn open(&self, request: ConnectRequest) -> std::result::Result<ClientHandle, AuthError> {
        let connection = self.engine.register_connection();

        match self.authenticator.authenticate(&request).await {
            Ok(identity) => {
                if !connection.activate(identity.clone()) {
                    // Transport closed it while authentication was in flight
                    self.engine.on_connection_closed(&connection);
                    return Err(AuthError::Rejected(
                        "connection closed during authentication".into(),
                    ));
                }
                tracing::info!(
                    connection_id = connection.id(),
                    subject = %identity.subject,
                    peer = ?request.peer_addr,
                    "Connection accepted"
                );
                Ok(ClientHandle {
                    engine: Arc::clone(&self.engine),
                    connection,
                })
            }
            Err(e) => {
                tracing::info!(
                    connection_id = connection.id(),
                    peer = ?request.peer_addr,
                    error = %e,
                    "Connection rejected"
                );
                connection.close(CloseReason::AuthRejected);
                self.engine.on_connection_closed(&connection);
                Err(e)
            }
        }
    }
}

/// One admitted client, as seen by its transport task
///
/// The read side feeds [`handle`](ClientHandle::handle) with parsed
/// intents; the write side drains
/// [`next_outbound`](ClientHandle::next_outbound) until it returns `None`.
pub struct ClientHandle {
    engine: Arc<Engine>,
    connection: Arc<Connection>,
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("connection", &self.connection)
            .finish()
    }
}

impl ClientHandle {
    /// Connection identifier
    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    /// The underlying connection
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Apply one client intent
    pub fn handle(&self, intent: ClientIntent) -> Result<()> {
        match intent {
            ClientIntent::Subscribe { channel } => self.engine.subscribe(&self.connection, &channel),
            ClientIntent::Unsubscribe { channel } => {
                self.engine.unsubscribe(&self.connection, &channel)
            }
            ClientIntent::Publish { channel, payload } => {
                if self.connection.state() != ConnectionState::Active {
                    return Err(Error::ConnectionNotActive(self.connection.id()));
                }
                self.engine.publish(&channel, payload);
                Ok(())
            }
        }
    }

    /// Wait for the next message queued for this client
    ///
    /// Returns `None` once the connection is closed.
    pub async fn next_outbound(&self) -> Option<Message> {
        self.connection.next_outbound().await
    }

    /// Close the connection and purge its registry state
    pub fn close(&self) {
        self.engine.on_connection_closed(&self.connection);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::auth::{AllowAll, StaticTokens};

    use super::*;

    fn subscribe(channel: &str) -> ClientIntent {
        ClientIntent::Subscribe {
            channel: channel.to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_accepts_and_activates() {
        let gateway = Gateway::new(Arc::new(Engine::new()), AllowAll);
        let request = ConnectRequest::new().param("subject", "alice");

        let client = gateway.open(request).await.unwrap();
        assert_eq!(client.connection().state(), ConnectionState::Active);
        assert_eq!(client.connection().identity().unwrap().subject, "alice");
        assert_eq!(gateway.engine().connection_count(), 1);
    }

    #[tokio::test]
    async fn test_open_rejection_leaves_no_state() {
        let auth = StaticTokens::new().with_token("s3cret", "bob");
        let gateway = Gateway::new(Arc::new(Engine::new()), auth);

        let result = gateway.open(ConnectRequest::new().token("wrong")).await;
        assert!(matches!(result, Err(AuthError::Rejected(_))));
        assert_eq!(gateway.engine().connection_count(), 0);
        assert_eq!(gateway.engine().registry().channel_count(), 0);
    }

    #[tokio::test]
    async fn test_intents_flow_through_engine() {
        let gateway = Gateway::new(Arc::new(Engine::new()), AllowAll);
        let client = gateway.open(ConnectRequest::new()).await.unwrap();

        client.handle(subscribe("news")).unwrap();
        client
            .handle(ClientIntent::Publish {
                channel: "news".to_string(),
                payload: Bytes::from_static(b"hi"),
            })
            .unwrap();

        let msg = client.next_outbound().await.unwrap();
        assert_eq!(&*msg.channel, "news");
        assert_eq!(msg.payload, Bytes::from_static(b"hi"));
        assert_eq!(msg.sequence, 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let gateway = Gateway::new(Arc::new(Engine::new()), AllowAll);
        let client = gateway.open(ConnectRequest::new()).await.unwrap();

        client.handle(subscribe("news")).unwrap();
        client
            .handle(ClientIntent::Unsubscribe {
                channel: "news".to_string(),
            })
            .unwrap();
        client
            .handle(ClientIntent::Publish {
                channel: "news".to_string(),
                payload: Bytes::from_static(b"hi"),
            })
            .unwrap();

        assert_eq!(client.connection().queue_len(), 0);
        assert_eq!(gateway.engine().registry().channel_count(), 0);
    }

    #[tokio::test]
    async fn test_close_purges_everything() {
        let gateway = Gateway::new(Arc::new(Engine::new()), AllowAll);
        let client = gateway.open(ConnectRequest::new()).await.unwrap();
        client.handle(subscribe("a")).unwrap();
        client.handle(subscribe("b")).unwrap();

        client.close();
        assert_eq!(client.connection().state(), ConnectionState::Closed);
        assert_eq!(gateway.engine().connection_count(), 0);
        assert_eq!(gateway.engine().registry().channel_count(), 0);

        // Intents after close surface an error
        let result = client.handle(subscribe("c"));
        assert!(result.is_err());
        assert!(client.next_outbound().await.is_none());
    }
}
