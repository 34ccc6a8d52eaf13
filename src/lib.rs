//! Real-time publish/subscribe gateway
//!
//! The crate is organized around one [`Engine`] per process: it owns the
//! channel registry and the live connections, sequences publishes per
//! channel, and fans them out to bounded per-connection queues without
//! ever blocking a publisher.
//!
//! Transports sit behind a [`Gateway`], which authenticates incoming
//! connections through a pluggable [`Authenticator`](auth::Authenticator)
//! and exposes a [`ClientHandle`] per admitted client.
//!
//! For multi-process deployments, one node activates the director role
//! ([`Engine::init_director`]) and every node (the director's included)
//! activates a forwarder ([`Engine::init_forwarder`]): publishes are
//! sequenced centrally and echoed back so every node delivers each
//! channel's messages in the same order.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use pubsub_rs::auth::{AllowAll, ConnectRequest};
//! use pubsub_rs::gateway::ClientIntent;
//! use pubsub_rs::{Engine, Gateway};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Arc::new(Engine::new());
//!     let gateway = Gateway::new(Arc::clone(&engine), AllowAll);
//!
//!     let client = gateway.open(ConnectRequest::new()).await.unwrap();
//!     client
//!         .handle(ClientIntent::Subscribe { channel: "news".into() })
//!         .unwrap();
//!
//!     engine.publish("news", Bytes::from_static(b"hello"));
//!     let message = client.next_outbound().await.unwrap();
//!     assert_eq!(message.payload, Bytes::from_static(b"hello"));
//! }
//! ```

pub mod auth;
pub mod connection;
pub mod director;
pub mod engine;
pub mod error;
pub mod forwarder;
pub mod gateway;
pub mod message;
pub mod registry;
pub mod wire;

pub use connection::{Connection, ConnectionConfig, ConnectionState, OverflowPolicy};
pub use director::{DirectorConfig, DirectorHandle};
pub use engine::{Engine, EngineStatsSnapshot};
pub use error::{Error, Result};
pub use forwarder::{ForwarderConfig, ForwarderHandle};
pub use gateway::{ClientHandle, Gateway};
pub use message::Message;
pub use registry::ChannelRegistry;
