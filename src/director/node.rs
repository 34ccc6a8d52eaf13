//! Director implementation
//!
//! Accept loop plus one reader task and one writer task per forwarder
//! link. Sequencing and rebroadcast happen under a single lock so every
//! link's outbound buffer sees the same per-channel order; the lock never
//! covers socket I/O (writer tasks drain the buffers independently).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::wire::{read_frame, write_frame, Frame, WireError};

use super::config::DirectorConfig;
use super::link::LinkSession;

/// Director counters
#[derive(Debug, Default)]
struct DirectorStats {
    links_accepted: AtomicU64,
    links_dropped: AtomicU64,
    frames_relayed: AtomicU64,
}

/// Point-in-time view of the director's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectorStatsSnapshot {
    pub links_accepted: u64,
    pub links_dropped: u64,
    pub frames_relayed: u64,
}

/// Rebroadcast state: synced links and per-channel sequence counters.
/// One lock for both so sequencing and buffer handoff are atomic.
struct RelayState {
    links: HashMap<u64, mpsc::Sender<Frame>>,
    sequences: HashMap<String, u64>,
}

struct Shared {
    config: DirectorConfig,
    state: Mutex<RelayState>,
    next_link_id: AtomicU64,
    stats: DirectorStats,
}

impl Shared {
    /// Sequence a forwarded publish and rebroadcast it to every synced
    /// link, including the one it came from
    fn relay(&self, channel: &str, payload: Bytes) {
        let mut state = self.state.lock().unwrap();

        let sequence = state
            .sequences
            .entry(channel.to_string())
            .and_modify(|s| *s += 1)
            .or_insert(1);
        let frame = Frame::Deliver {
            channel: channel.to_string(),
            sequence: *sequence,
            payload,
        };

        let mut lagging = Vec::new();
        for (id, tx) in &state.links {
            if tx.try_send(frame.clone()).is_err() {
                lagging.push(*id);
            }
        }

        // A link that cannot keep up is dropped from the broadcast set;
        // the rest are unaffected.
        for id in lagging {
            state.links.remove(&id);
            self.stats.links_dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(link_id = id, "Forwarder link dropped (outbound buffer full)");
        }

        self.stats.frames_relayed.fetch_add(1, Ordering::Relaxed);
    }

    fn remove_link(&self, link_id: u64) -> bool {
        self.state.lock().unwrap().links.remove(&link_id).is_some()
    }

    /// Push a control frame to one link's outbound buffer
    fn send_to_link(&self, link_id: u64, frame: Frame) {
        if let Some(tx) = self.state.lock().unwrap().links.get(&link_id) {
            let _ = tx.try_send(frame);
        }
    }

    fn snapshot(&self) -> DirectorStatsSnapshot {
        DirectorStatsSnapshot {
            links_accepted: self.stats.links_accepted.load(Ordering::Relaxed),
            links_dropped: self.stats.links_dropped.load(Ordering::Relaxed),
            frames_relayed: self.stats.frames_relayed.load(Ordering::Relaxed),
        }
    }
}

/// The fleet's ordering authority
pub struct Director {
    listener: TcpListener,
    local_addr: SocketAddr,
    shared: Arc<Shared>,
}

impl Director {
    /// Bind the director's listener
    pub async fn bind(config: DirectorConfig) -> Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Director listening");

        Ok(Self {
            listener,
            local_addr,
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(RelayState {
                    links: HashMap::new(),
                    sequences: HashMap::new(),
                }),
                next_link_id: AtomicU64::new(1),
                stats: DirectorStats::default(),
            }),
        })
    }

    /// Actual bound address (useful with an ephemeral port)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Director counters
    pub fn stats(&self) -> DirectorStatsSnapshot {
        self.shared.snapshot()
    }

    /// Run the accept loop until the process stops
    pub async fn run(self) -> Result<()> {
        self.accept_loop().await
    }

    /// Run the accept loop with graceful shutdown
    ///
    /// On shutdown the broadcast set is cleared, which closes every link's
    /// write half; forwarders observe EOF and enter backoff-reconnect.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Director shutdown signal received");
                Ok(())
            }
            result = self.accept_loop() => result,
        };

        self.shared.state.lock().unwrap().links.clear();
        result
    }

    /// Start the director on a background task
    pub fn spawn(self) -> DirectorHandle {
        let local_addr = self.local_addr;
        let shared = Arc::clone(&self.shared);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            self.run_until(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
        });

        DirectorHandle {
            local_addr,
            shared,
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn accept_loop(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, peer_addr)) => {
                    let link_id = self.shared.next_link_id.fetch_add(1, Ordering::Relaxed);
                    let shared = Arc::clone(&self.shared);

                    tokio::spawn(async move {
                        run_link(shared, socket, LinkSession::new(link_id, peer_addr)).await;
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept forwarder link");
                }
            }
        }
    }
}

/// Reader side of one forwarder link
async fn run_link(shared: Arc<Shared>, socket: TcpStream, mut session: LinkSession) {
    if let Err(e) = socket.set_nodelay(true) {
        tracing::debug!(link_id = session.id, error = %e, "Failed to set TCP_NODELAY");
    }
    let (mut reader, mut writer) = socket.into_split();
    let max_frame = shared.config.max_frame;

    // Session establishment: the first frame must be Hello
    let node = match read_frame(&mut reader, max_frame).await {
        Ok(Some(Frame::Hello { node })) => node,
        Ok(Some(frame)) => {
            tracing::warn!(
                link_id = session.id,
                peer = %session.peer_addr,
                frame = ?frame.kind(),
                "Link sent non-hello frame while connecting"
            );
            return;
        }
        Ok(None) => return,
        Err(e) => {
            tracing::debug!(link_id = session.id, error = %e, "Link failed before hello");
            return;
        }
    };

    let (tx, mut rx) = mpsc::channel::<Frame>(shared.config.link_capacity);

    // Writer task: drains the link's outbound buffer. Lives until the
    // buffer's senders are dropped (link removal or director shutdown).
    let writer_task: JoinHandle<()> = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match write_frame(&mut writer, &frame, max_frame).await {
                Ok(()) => {}
                Err(WireError::Io(_)) => break,
                Err(e) => {
                    // Local validation failure; the link itself is healthy
                    tracing::warn!(error = %e, "Dropping unsendable frame");
                }
            }
        }
    });

    // Welcome must precede any Deliver, so it goes through the same
    // buffer inside the state lock. The map owns the only sender: once
    // the link is removed (or the director shuts down), the writer task
    // drains out and the socket's write half closes.
    {
        let mut state = shared.state.lock().unwrap();
        let _ = tx.try_send(Frame::Welcome);
        state.links.insert(session.id, tx);
    }
    session.sync(node);
    shared.stats.links_accepted.fetch_add(1, Ordering::Relaxed);
    tracing::info!(
        link_id = session.id,
        node = session.node.as_deref().unwrap_or(""),
        peer = %session.peer_addr,
        "Forwarder link synced"
    );

    loop {
        match read_frame(&mut reader, max_frame).await {
            Ok(Some(Frame::Forward { channel, payload })) => {
                shared.relay(&channel, payload);
            }
            Ok(Some(Frame::Ping)) => {
                shared.send_to_link(session.id, Frame::Pong);
            }
            Ok(Some(Frame::Pong)) => {}
            Ok(Some(frame)) => {
                tracing::warn!(
                    link_id = session.id,
                    frame = ?frame.kind(),
                    "Unexpected frame on synced link"
                );
                break;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(link_id = session.id, error = %e, "Link read failed");
                break;
            }
        }
    }

    session.disconnect();
    // May already be gone if relay() dropped the link for lagging
    if shared.remove_link(session.id) {
        shared.stats.links_dropped.fetch_add(1, Ordering::Relaxed);
    }
    let _ = writer_task.await;
    tracing::info!(link_id = session.id, "Forwarder link disconnected");
}

/// Handle to a director running on a background task
pub struct DirectorHandle {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

impl DirectorHandle {
    /// Address the director is accepting links on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Director counters
    pub fn stats(&self) -> DirectorStatsSnapshot {
        self.shared.snapshot()
    }

    /// Stop the accept loop and drop every link
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
