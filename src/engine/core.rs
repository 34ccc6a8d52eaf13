//! Engine implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use bytes::Bytes;

use crate::connection::{
    CloseReason, Connection, ConnectionConfig, ConnectionId, ConnectionState, EnqueueOutcome,
};
use crate::director::{Director, DirectorConfig, DirectorHandle};
use crate::error::{Error, Result};
use crate::forwarder::{Forwarder, ForwarderConfig, ForwarderHandle, ForwarderLink};
use crate::message::Message;
use crate::registry::ChannelRegistry;

use super::stats::{EngineStats, EngineStatsSnapshot};

/// The pub/sub engine for one process
///
/// One engine owns one [`ChannelRegistry`] and the set of live connections.
/// Multiple isolated engines can coexist in one process (useful in tests).
pub struct Engine {
    registry: ChannelRegistry,
    connections: RwLock<HashMap<ConnectionId, Arc<Connection>>>,
    connection_config: ConnectionConfig,

    /// Per-channel sequence counters for standalone ordering. The lock is
    /// also held across local fan-out so same-channel publishes reach every
    /// subscriber queue in one order; it never covers socket I/O.
    sequences: Mutex<HashMap<String, u64>>,

    next_connection_id: AtomicU64,
    forwarder: RwLock<Option<ForwarderLink>>,
    director_active: AtomicBool,
    stats: EngineStats,
}

impl Engine {
    /// Create an engine with default connection settings
    pub fn new() -> Self {
        Self::with_connection_config(ConnectionConfig::default())
    }

    /// Create an engine whose connections use the given settings
    pub fn with_connection_config(connection_config: ConnectionConfig) -> Self {
        Self {
            registry: ChannelRegistry::new(),
            connections: RwLock::new(HashMap::new()),
            connection_config,
            sequences: Mutex::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
            forwarder: RwLock::new(None),
            director_active: AtomicBool::new(false),
            stats: EngineStats::default(),
        }
    }

    /// The engine's channel registry
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Engine counters
    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Create and track a connection in the `Authenticating` state
    pub fn register_connection(&self) -> Arc<Connection> {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let connection = Arc::new(Connection::new(id, self.connection_config.clone()));
        self.connections
            .write()
            .unwrap()
            .insert(id, Arc::clone(&connection));

        tracing::debug!(connection_id = id, "Connection registered");
        connection
    }

    /// Look up a tracked connection by id
    pub fn connection(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.read().unwrap().get(&id).cloned()
    }

    /// Number of tracked connections
    pub fn connection_count(&self) -> usize {
        self.connections.read().unwrap().len()
    }

    /// Subscribe a connection to a channel
    ///
    /// A connection may only modify its own subscriptions: the handle must
    /// be one this engine registered, and it must be `Active`. Idempotent.
    pub fn subscribe(&self, connection: &Arc<Connection>, channel: &str) -> Result<()> {
        self.check_active(connection)?;

        if connection.add_subscription(channel) {
            self.registry.subscribe(channel, connection);

            // A concurrent close may have run its purge between the state
            // check and the registry insert, before there was anything to
            // remove. Undo the insert it could not see.
            if connection.state() == ConnectionState::Closed {
                connection.remove_subscription(channel);
                self.registry.unsubscribe(channel, connection.id());
                return Err(Error::ConnectionNotActive(connection.id()));
            }

            tracing::debug!(
                connection_id = connection.id(),
                channel = %channel,
                "Subscribed"
            );
        }
        Ok(())
    }

    /// Unsubscribe a connection from a channel
    ///
    /// Unsubscribing from a channel the connection is not in is a no-op.
    pub fn unsubscribe(&self, connection: &Arc<Connection>, channel: &str) -> Result<()> {
        self.check_active(connection)?;

        if connection.remove_subscription(channel) {
            self.registry.unsubscribe(channel, connection.id());
            tracing::debug!(
                connection_id = connection.id(),
                channel = %channel,
                "Unsubscribed"
            );
        }
        Ok(())
    }

    /// Publish a payload on a channel
    ///
    /// Standalone, the engine assigns the next per-channel sequence and
    /// fans out to local subscribers. With a forwarder active, the payload
    /// goes to the director instead; local delivery happens when the
    /// director's sequenced echo comes back, so local and remote
    /// subscribers see one order. Returns once fan-out is queued; it never
    /// waits for socket writes. Publishing to a channel with zero
    /// subscribers succeeds silently.
    pub fn publish(&self, channel: &str, payload: Bytes) {
        self.stats.published.fetch_add(1, Ordering::Relaxed);

        if let Some(link) = self.forwarder.read().unwrap().as_ref() {
            link.forward(channel, payload);
            return;
        }

        let mut sequences = self.sequences.lock().unwrap();
        let sequence = sequences
            .entry(channel.to_string())
            .and_modify(|s| *s += 1)
            .or_insert(1);
        let message = Message::new(channel, *sequence, payload);
        self.fan_out(&message);
    }

    /// Apply a director-sequenced message to the local registry
    ///
    /// Called by the forwarder for `Deliver` frames; never re-forwarded.
    pub(crate) fn apply_remote(&self, channel: &str, sequence: u64, payload: Bytes) {
        // Same ordering discipline as local publishes
        let _order = self.sequences.lock().unwrap();
        let message = Message::new(channel, sequence, payload);
        self.fan_out(&message);
    }

    /// Enqueue a message to every current subscriber of its channel
    ///
    /// Failures are isolated per subscriber: a full or closed connection
    /// never aborts delivery to the rest of the snapshot.
    fn fan_out(&self, message: &Message) {
        let snapshot = self.registry.publish_local(&message.channel);

        for connection in snapshot {
            match connection.enqueue(message.clone()) {
                EnqueueOutcome::Queued => {
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                }
                EnqueueOutcome::DroppedOldest => {
                    // Current message queued, an older one was sacrificed
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                    self.stats.delivery_dropped.fetch_add(1, Ordering::Relaxed);
                }
                EnqueueOutcome::DroppedNewest => {
                    self.stats.delivery_dropped.fetch_add(1, Ordering::Relaxed);
                }
                EnqueueOutcome::OverflowClosed => {
                    self.stats.delivery_dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(
                        connection_id = connection.id(),
                        channel = %message.channel,
                        "Slow connection force-closed on overflow"
                    );
                    self.purge(&connection);
                }
                EnqueueOutcome::NotActive => {
                    // Closed under us; finish the cleanup
                    self.stats.delivery_dropped.fetch_add(1, Ordering::Relaxed);
                    self.purge(&connection);
                }
            }
        }
    }

    /// Cleanup after a connection has closed
    ///
    /// Closes the connection if the caller has not already, then removes
    /// every registry reference to it. Idempotent.
    pub fn on_connection_closed(&self, connection: &Arc<Connection>) {
        connection.close(CloseReason::TransportClosed);
        self.purge(connection);
    }

    fn purge(&self, connection: &Arc<Connection>) {
        self.registry.remove_connection(connection);
        self.connections.write().unwrap().remove(&connection.id());
    }

    /// Activate the forwarder role: relay local publishes through a director
    ///
    /// At most one forwarder per engine. The returned handle owns the link
    /// task; dropping it does not stop the task, call
    /// [`ForwarderHandle::shutdown`].
    pub fn init_forwarder(self: &Arc<Self>, config: ForwarderConfig) -> Result<ForwarderHandle> {
        let mut slot = self.forwarder.write().unwrap();
        if slot.is_some() {
            return Err(Error::RoleAlreadyActive("forwarder"));
        }

        tracing::info!(director = %config.director_addr, "Starting forwarder");
        let (link, handle) = Forwarder::spawn(Arc::clone(self), config);
        *slot = Some(link);
        Ok(handle)
    }

    /// Activate the director role: accept forwarder links and sequence
    /// their traffic
    ///
    /// The director is independent of this engine's registry: a node that
    /// wants its own subscribers to receive fleet traffic also runs a
    /// forwarder pointed at this director.
    pub async fn init_director(&self, config: DirectorConfig) -> Result<DirectorHandle> {
        if self.director_active.swap(true, Ordering::SeqCst) {
            return Err(Error::RoleAlreadyActive("director"));
        }

        tracing::info!(addr = %config.bind_addr, "Starting director");
        let director = Director::bind(config).await?;
        Ok(director.spawn())
    }

    fn check_active(&self, connection: &Arc<Connection>) -> Result<()> {
        let known = self
            .connections
            .read()
            .unwrap()
            .get(&connection.id())
            .is_some_and(|tracked| Arc::ptr_eq(tracked, connection));

        if !known {
            return Err(Error::UnknownConnection(connection.id()));
        }
        if connection.state() != ConnectionState::Active {
            return Err(Error::ConnectionNotActive(connection.id()));
        }
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
