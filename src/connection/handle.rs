//! Connection handle
//!
//! The connection owns a bounded outbound queue drained by the transport's
//! write task. Enqueue never blocks: a full queue triggers the configured
//! overflow policy immediately. All mutable state sits behind one mutex
//! that is never held across an await point.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::Notify;

use crate::auth::Identity;
use crate::message::Message;

use super::config::{ConnectionConfig, OverflowPolicy};
use super::state::{CloseReason, ConnectionState};
use super::ConnectionId;

/// Result of an enqueue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Message queued for delivery
    Queued,
    /// Queue was full; the incoming message was dropped
    DroppedNewest,
    /// Queue was full; the oldest queued message was dropped to make room
    DroppedOldest,
    /// Queue was full; the connection was force-closed (`Disconnect` policy)
    OverflowClosed,
    /// Connection is not active; the message was discarded
    NotActive,
}

impl EnqueueOutcome {
    /// Whether the message will reach the client
    pub fn delivered(&self) -> bool {
        matches!(self, EnqueueOutcome::Queued | EnqueueOutcome::DroppedOldest)
    }
}

struct Inner {
    state: ConnectionState,
    identity: Option<Identity>,
    close_reason: Option<CloseReason>,
    queue: VecDeque<Message>,
    subscriptions: HashSet<String>,
}

/// One authenticated client connection
pub struct Connection {
    id: ConnectionId,
    config: ConnectionConfig,
    inner: Mutex<Inner>,
    notify: Notify,

    /// Messages accepted into the queue
    pub enqueued_count: AtomicU64,
    /// Messages dropped by the overflow policy
    pub dropped_count: AtomicU64,
}

impl Connection {
    /// Create a connection in the `Authenticating` state
    pub fn new(id: ConnectionId, config: ConnectionConfig) -> Self {
        Self {
            id,
            config,
            inner: Mutex::new(Inner {
                state: ConnectionState::Authenticating,
                identity: None,
                close_reason: None,
                queue: VecDeque::new(),
                subscriptions: HashSet::new(),
            }),
            notify: Notify::new(),
            enqueued_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
        }
    }

    /// Connection identifier
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().unwrap().state
    }

    /// Authenticated identity, once active
    pub fn identity(&self) -> Option<Identity> {
        self.inner.lock().unwrap().identity.clone()
    }

    /// Why the connection closed, once closed
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.inner.lock().unwrap().close_reason
    }

    /// Promote to `Active` after successful authentication
    ///
    /// Returns `false` if the connection is not in `Authenticating`
    /// (e.g. the transport already closed it).
    pub fn activate(&self, identity: Identity) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != ConnectionState::Authenticating {
            return false;
        }
        inner.state = ConnectionState::Active;
        inner.identity = Some(identity);
        true
    }

    /// Append a message to the outbound queue
    ///
    /// Never blocks. A full queue triggers the configured overflow policy;
    /// a non-active connection discards the message silently.
    pub fn enqueue(&self, message: Message) -> EnqueueOutcome {
        let mut inner = self.inner.lock().unwrap();

        if inner.state != ConnectionState::Active {
            return EnqueueOutcome::NotActive;
        }

        if inner.queue.len() >= self.config.queue_bound {
            match self.config.overflow_policy {
                OverflowPolicy::Disconnect => {
                    self.dropped_count.fetch_add(1, Ordering::Relaxed);
                    self.close_locked(&mut inner, CloseReason::Overflow);
                    drop(inner);
                    self.notify.notify_waiters();
                    return EnqueueOutcome::OverflowClosed;
                }
                OverflowPolicy::DropNewest => {
                    self.dropped_count.fetch_add(1, Ordering::Relaxed);
                    return EnqueueOutcome::DroppedNewest;
                }
                OverflowPolicy::DropOldest => {
                    inner.queue.pop_front();
                    inner.queue.push_back(message);
                    self.dropped_count.fetch_add(1, Ordering::Relaxed);
                    self.enqueued_count.fetch_add(1, Ordering::Relaxed);
                    drop(inner);
                    self.notify.notify_one();
                    return EnqueueOutcome::DroppedOldest;
                }
            }
        }

        inner.queue.push_back(message);
        self.enqueued_count.fetch_add(1, Ordering::Relaxed);
        drop(inner);
        self.notify.notify_one();
        EnqueueOutcome::Queued
    }

    /// Wait for the next outbound message
    ///
    /// Used by the transport's write task. Returns `None` once the
    /// connection is closed and the queue is drained; closing discards
    /// any queued messages, so `None` follows a close immediately.
    pub async fn next_outbound(&self) -> Option<Message> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before the queue check: `notify_waiters` (the close
            // path) stores no permit, so a waiter that only registers on
            // first poll would miss a close landing between the check and
            // the await.
            notified.as_mut().enable();
            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(message) = inner.queue.pop_front() {
                    return Some(message);
                }
                if inner.state == ConnectionState::Closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Transition to `Closed`
    ///
    /// Idempotent: only the first call records a reason and clears the
    /// queue. Returns `true` on the transition. The engine must follow up
    /// with `on_connection_closed` to purge registry references.
    pub fn close(&self, reason: CloseReason) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == ConnectionState::Closed {
            return false;
        }
        self.close_locked(&mut inner, reason);
        drop(inner);
        self.notify.notify_waiters();
        true
    }

    fn close_locked(&self, inner: &mut Inner, reason: CloseReason) {
        inner.state = ConnectionState::Closed;
        inner.close_reason = Some(reason);
        inner.queue.clear();
        inner.queue.shrink_to_fit();
        tracing::debug!(connection_id = self.id, reason = %reason, "Connection closed");
    }

    /// Record a subscription; returns `false` if already subscribed
    pub(crate) fn add_subscription(&self, channel: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(channel.to_string())
    }

    /// Forget a subscription; returns `false` if not subscribed
    pub(crate) fn remove_subscription(&self, channel: &str) -> bool {
        self.inner.lock().unwrap().subscriptions.remove(channel)
    }

    /// Drain the subscription set (used on disconnect cleanup)
    pub(crate) fn take_subscriptions(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .drain()
            .collect()
    }

    /// Channels this connection is subscribed to
    pub fn subscriptions(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.subscriptions.iter().cloned().collect()
    }

    /// Number of messages currently queued
    pub fn queue_len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
