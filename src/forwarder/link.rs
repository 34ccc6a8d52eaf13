//! Engine-facing side of the forwarder

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Forwarder counters
#[derive(Debug, Default)]
pub(crate) struct ForwarderStats {
    /// Publishes handed to the link
    pub forwarded: AtomicU64,
    /// Publishes dropped because the link was down (or its buffer full)
    pub dropped_link_down: AtomicU64,
    /// Publishes dropped because they failed pre-send frame validation
    pub dropped_oversize: AtomicU64,
    /// Director `Deliver` frames applied to the local registry
    pub applied: AtomicU64,
    /// Successful session establishments (1 initially, +1 per reconnect)
    pub links_established: AtomicU64,
}

impl ForwarderStats {
    pub(crate) fn snapshot(&self) -> ForwarderStatsSnapshot {
        ForwarderStatsSnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            dropped_link_down: self.dropped_link_down.load(Ordering::Relaxed),
            dropped_oversize: self.dropped_oversize.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            links_established: self.links_established.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the forwarder's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwarderStatsSnapshot {
    pub forwarded: u64,
    pub dropped_link_down: u64,
    pub dropped_oversize: u64,
    pub applied: u64,
    pub links_established: u64,
}

/// What the engine holds once the forwarder role is active
///
/// `forward` is non-blocking and best-effort: a down link means the
/// message is dropped and counted, by contract.
pub struct ForwarderLink {
    pub(crate) tx: mpsc::Sender<(String, Bytes)>,
    pub(crate) up: Arc<AtomicBool>,
    pub(crate) stats: Arc<ForwarderStats>,
}

impl ForwarderLink {
    /// Send a local publish toward the director
    ///
    /// Returns `true` if the message was handed to the link task.
    pub(crate) fn forward(&self, channel: &str, payload: Bytes) -> bool {
        if !self.up.load(Ordering::Acquire) {
            self.stats.dropped_link_down.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        match self.tx.try_send((channel.to_string(), payload)) {
            Ok(()) => {
                self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                self.stats.dropped_link_down.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(up: bool, capacity: usize) -> (ForwarderLink, mpsc::Receiver<(String, Bytes)>) {
        let (tx, rx) = mpsc::channel(capacity);
        let link = ForwarderLink {
            tx,
            up: Arc::new(AtomicBool::new(up)),
            stats: Arc::new(ForwarderStats::default()),
        };
        (link, rx)
    }

    #[tokio::test]
    async fn test_forward_while_up() {
        let (link, mut rx) = link(true, 4);

        assert!(link.forward("x", Bytes::from_static(b"m")));
        assert_eq!(link.stats.snapshot().forwarded, 1);

        let (channel, payload) = rx.recv().await.unwrap();
        assert_eq!(channel, "x");
        assert_eq!(payload, Bytes::from_static(b"m"));
    }

    #[tokio::test]
    async fn test_forward_while_down_drops() {
        let (link, mut rx) = link(false, 4);

        assert!(!link.forward("x", Bytes::from_static(b"m")));
        assert_eq!(link.stats.snapshot().dropped_link_down, 1);
        assert!(rx.try_recv().is_err()); // nothing buffered
    }

    #[tokio::test]
    async fn test_forward_full_buffer_drops() {
        let (link, _rx) = link(true, 1);

        assert!(link.forward("x", Bytes::from_static(b"1")));
        assert!(!link.forward("x", Bytes::from_static(b"2")));

        let stats = link.stats.snapshot();
        assert_eq!(stats.forwarded, 1);
        assert_eq!(stats.dropped_link_down, 1);
    }
}
