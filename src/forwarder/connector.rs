//! Director link maintenance
//!
//! One background task owns the TCP link to the director: it establishes
//! the session (`Hello`/`Welcome`), relays outbound publishes, applies
//! inbound `Deliver` frames to the local engine, and reconnects with
//! capped, jittered exponential backoff when the link fails.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::engine::Engine;
use crate::wire::{read_frame, write_frame, Frame, WireError};

use super::config::ForwarderConfig;
use super::link::{ForwarderLink, ForwarderStats, ForwarderStatsSnapshot};

/// Why a link session ended
enum LinkEnd {
    /// Director closed the link or the session never established
    Closed,
    /// Shutdown was requested
    Shutdown,
}

/// The forwarder's link task
pub struct Forwarder {
    engine: Arc<Engine>,
    config: ForwarderConfig,
    rx: mpsc::Receiver<(String, Bytes)>,
    up: Arc<AtomicBool>,
    stats: Arc<ForwarderStats>,
    shutdown: watch::Receiver<bool>,
}

impl Forwarder {
    /// Start the link task for an engine
    ///
    /// Returns the engine-facing [`ForwarderLink`] and the owner's
    /// [`ForwarderHandle`].
    pub(crate) fn spawn(
        engine: Arc<Engine>,
        config: ForwarderConfig,
    ) -> (ForwarderLink, ForwarderHandle) {
        let (tx, rx) = mpsc::channel(config.outbound_capacity);
        let up = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(ForwarderStats::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let forwarder = Forwarder {
            engine,
            config,
            rx,
            up: Arc::clone(&up),
            stats: Arc::clone(&stats),
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(forwarder.run());

        (
            ForwarderLink {
                tx,
                up: Arc::clone(&up),
                stats: Arc::clone(&stats),
            },
            ForwarderHandle {
                shutdown: shutdown_tx,
                task,
                up,
                stats,
            },
        )
    }

    async fn run(mut self) {
        let mut attempt: u32 = 0;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            match TcpStream::connect(self.config.director_addr).await {
                Ok(stream) => {
                    let _ = stream.set_nodelay(true);
                    match self.run_link(stream).await {
                        Ok(LinkEnd::Shutdown) => break,
                        Ok(LinkEnd::Closed) => {
                            attempt = 0;
                            tracing::info!(
                                director = %self.config.director_addr,
                                "Director link closed"
                            );
                        }
                        Err(e) => {
                            attempt = attempt.saturating_add(1);
                            tracing::warn!(
                                director = %self.config.director_addr,
                                error = %e,
                                "Director link failed"
                            );
                        }
                    }
                }
                Err(e) => {
                    attempt = attempt.saturating_add(1);
                    tracing::debug!(
                        director = %self.config.director_addr,
                        error = %e,
                        "Director connect failed"
                    );
                }
            }

            self.up.store(false, Ordering::Release);

            let delay = backoff_delay(&self.config, attempt);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.shutdown.changed() => break,
            }
        }

        self.up.store(false, Ordering::Release);
        tracing::debug!("Forwarder stopped");
    }

    /// Drive one established TCP link until it ends
    async fn run_link(&mut self, stream: TcpStream) -> Result<LinkEnd, WireError> {
        let (mut reader, mut writer) = stream.into_split();
        let max_frame = self.config.max_frame;

        write_frame(
            &mut writer,
            &Frame::Hello {
                node: self.config.node.clone(),
            },
            max_frame,
        )
        .await?;

        match read_frame(&mut reader, max_frame).await? {
            Some(Frame::Welcome) => {}
            Some(frame) => {
                tracing::warn!(frame = ?frame.kind(), "Expected welcome, got something else");
                return Ok(LinkEnd::Closed);
            }
            None => return Ok(LinkEnd::Closed),
        }

        // Anything queued while the link was down is outage traffic:
        // dropped by contract, it must not reappear after reconnection.
        while self.rx.try_recv().is_ok() {
            self.stats.dropped_link_down.fetch_add(1, Ordering::Relaxed);
        }

        self.up.store(true, Ordering::Release);
        self.stats.links_established.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            director = %self.config.director_addr,
            node = %self.config.node,
            "Director link synced"
        );

        // The writer task owns the outbound half and the buffer receiver
        // for the lifetime of this link; it hands the receiver back when
        // the link ends. Keeping reads and writes in separate tasks means
        // a frame read is never cancelled halfway by outbound traffic.
        let mut rx = std::mem::replace(&mut self.rx, mpsc::channel(1).1);
        let (closed_tx, mut closed_rx) = watch::channel(false);
        let mut writer_shutdown = self.shutdown.clone();
        let ping_interval = self.config.ping_interval;
        let writer_stats = Arc::clone(&self.stats);

        let writer_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    item = rx.recv() => match item {
                        Some((channel, payload)) => {
                            let frame = Frame::Forward { channel, payload };
                            match write_frame(&mut writer, &frame, max_frame).await {
                                Ok(()) => {}
                                Err(WireError::Io(_)) => break,
                                Err(e) => {
                                    // Failed pre-send validation; the link
                                    // itself is healthy
                                    writer_stats
                                        .dropped_oversize
                                        .fetch_add(1, Ordering::Relaxed);
                                    tracing::warn!(error = %e, "Dropping unsendable publish");
                                }
                            }
                        }
                        // Engine side gone; nothing left to relay
                        None => break,
                    },
                    _ = tokio::time::sleep(ping_interval) => {
                        if write_frame(&mut writer, &Frame::Ping, max_frame).await.is_err() {
                            break;
                        }
                    }
                    _ = closed_rx.changed() => break,
                    _ = writer_shutdown.changed() => break,
                }
            }
            rx
        });

        let end = loop {
            tokio::select! {
                frame = read_frame(&mut reader, max_frame) => match frame {
                    Ok(Some(Frame::Deliver { channel, sequence, payload })) => {
                        self.stats.applied.fetch_add(1, Ordering::Relaxed);
                        self.engine.apply_remote(&channel, sequence, payload);
                    }
                    Ok(Some(Frame::Pong)) => {}
                    Ok(Some(frame)) => {
                        tracing::debug!(frame = ?frame.kind(), "Ignoring unexpected frame");
                    }
                    Ok(None) => break Ok(LinkEnd::Closed),
                    Err(e) => break Err(e),
                },
                _ = self.shutdown.changed() => break Ok(LinkEnd::Shutdown),
            }
        };

        self.up.store(false, Ordering::Release);
        let _ = closed_tx.send(true);
        if let Ok(rx) = writer_task.await {
            self.rx = rx;
        }

        end
    }
}

/// Exponential backoff with a cap and 50% jitter
fn backoff_delay(config: &ForwarderConfig, attempt: u32) -> Duration {
    let exp = config
        .backoff_base
        .saturating_mul(2u32.saturating_pow(attempt.min(16)));
    let capped = exp.min(config.backoff_max).max(config.backoff_base);

    let millis = capped.as_millis() as u64;
    let jittered = millis / 2 + rand::thread_rng().gen_range(0..=millis.div_ceil(2));
    Duration::from_millis(jittered)
}

/// Handle owned by whoever activated the forwarder role
pub struct ForwarderHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    up: Arc<AtomicBool>,
    stats: Arc<ForwarderStats>,
}

impl ForwarderHandle {
    /// Whether the director link is currently synced
    pub fn is_linked(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    /// Forwarder counters
    pub fn stats(&self) -> ForwarderStatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop the link task and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ForwarderConfig {
        ForwarderConfig::new("127.0.0.1:4243".parse().unwrap())
            .backoff(Duration::from_millis(100), Duration::from_secs(2))
    }

    #[test]
    fn test_backoff_growth_is_capped() {
        let config = config();

        for attempt in 0..32 {
            let delay = backoff_delay(&config, attempt);
            assert!(delay >= Duration::from_millis(50), "attempt {}", attempt);
            assert!(delay <= Duration::from_secs(2), "attempt {}", attempt);
        }
    }

    #[test]
    fn test_backoff_jitter_varies() {
        let config = config();

        // At the cap, jitter spans [1s, 2s]; a run of identical samples
        // would mean jitter is broken.
        let samples: Vec<_> = (0..64).map(|_| backoff_delay(&config, 10)).collect();
        assert!(samples.iter().any(|d| *d != samples[0]));
    }
}
