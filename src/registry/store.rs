//! Channel registry implementation

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::connection::{Connection, ConnectionId};

/// Central registry mapping channels to subscriber handles
///
/// All mutations go through one `RwLock`, giving the single-writer
/// discipline the engine relies on. Reads (snapshots for fan-out) take the
/// shared lock. No method performs I/O or awaits while holding the lock.
pub struct ChannelRegistry {
    channels: RwLock<HashMap<Arc<str>, HashMap<ConnectionId, Arc<Connection>>>>,
}

impl ChannelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to a channel's subscriber set
    ///
    /// Creates the channel on first subscription. Idempotent: re-subscribing
    /// returns `false` and changes nothing.
    pub fn subscribe(&self, channel: &str, connection: &Arc<Connection>) -> bool {
        let mut channels = self.channels.write().unwrap();

        let subscribers = channels
            .entry(Arc::from(channel))
            .or_insert_with(HashMap::new);

        let added = subscribers
            .insert(connection.id(), Arc::clone(connection))
            .is_none();

        if added {
            tracing::debug!(
                channel = %channel,
                connection_id = connection.id(),
                subscribers = subscribers.len(),
                "Subscriber added"
            );
        }

        added
    }

    /// Remove a connection from a channel's subscriber set
    ///
    /// Deletes the channel entry immediately when the set becomes empty.
    /// Unsubscribing a non-member returns `false` and changes nothing.
    pub fn unsubscribe(&self, channel: &str, connection_id: ConnectionId) -> bool {
        let mut channels = self.channels.write().unwrap();

        let Some(subscribers) = channels.get_mut(channel) else {
            return false;
        };

        let removed = subscribers.remove(&connection_id).is_some();

        if subscribers.is_empty() {
            channels.remove(channel);
            tracing::debug!(channel = %channel, "Channel removed (no subscribers)");
        }

        removed
    }

    /// Snapshot the current subscriber set of a channel for delivery
    ///
    /// Does not mutate subscriber state. The caller performs per-subscriber
    /// enqueue outside the registry lock; delivery failures are per-subscriber
    /// and never abort delivery to the rest of the snapshot. A channel with
    /// no subscribers yields an empty snapshot, not an error.
    pub fn publish_local(&self, channel: &str) -> Vec<Arc<Connection>> {
        let channels = self.channels.read().unwrap();

        match channels.get(channel) {
            Some(subscribers) => subscribers.values().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Remove a connection from every channel it was subscribed to
    ///
    /// Used on disconnect. Safe to call for a connection that was never
    /// subscribed to anything, and safe to call twice.
    pub fn remove_connection(&self, connection: &Connection) {
        let subscribed = connection.take_subscriptions();
        if subscribed.is_empty() {
            return;
        }

        let mut channels = self.channels.write().unwrap();
        for channel in &subscribed {
            if let Some(subscribers) = channels.get_mut(channel.as_str()) {
                subscribers.remove(&connection.id());
                if subscribers.is_empty() {
                    channels.remove(channel.as_str());
                }
            }
        }

        tracing::debug!(
            connection_id = connection.id(),
            channels = subscribed.len(),
            "Connection removed from registry"
        );
    }

    /// Whether a connection is currently in a channel's subscriber set
    pub fn is_subscribed(&self, channel: &str, connection_id: ConnectionId) -> bool {
        self.channels
            .read()
            .unwrap()
            .get(channel)
            .is_some_and(|subscribers| subscribers.contains_key(&connection_id))
    }

    /// Number of channels with at least one subscriber
    pub fn channel_count(&self) -> usize {
        self.channels.read().unwrap().len()
    }

    /// Number of subscribers on a channel (0 if the channel does not exist)
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .unwrap()
            .get(channel)
            .map_or(0, |subscribers| subscribers.len())
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
