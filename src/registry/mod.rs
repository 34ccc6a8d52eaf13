//! Channel registry for pub/sub routing
//!
//! The registry owns the mapping from channel name to subscriber handles.
//! It has no network or process awareness: the engine asks it for a
//! snapshot of a channel's subscribers and performs delivery itself, so
//! the registry lock is never held across I/O.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<Engine>
//!                   ┌──────────────────────────┐
//!                   │ ChannelRegistry {        │
//!                   │   channels: HashMap<     │
//!                   │     Arc<str>,            │
//!                   │     {id -> Connection}   │
//!                   │   >                      │
//!                   │ }                        │
//!                   └────────────┬─────────────┘
//!                                │ publish_local() -> snapshot
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!       [Connection]        [Connection]        [Connection]
//!       enqueue()           enqueue()           enqueue()
//! ```
//!
//! Channels exist implicitly: created on first subscription, removed the
//! moment their subscriber set becomes empty.

pub mod store;

pub use store::ChannelRegistry;
