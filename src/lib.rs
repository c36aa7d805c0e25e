//! Piano World networking client
//!
//! Connects a local player to a shared piano room over TCP, relays head
//! movement and key presses, and hands everyone else's events to the game
//! once per frame.
//!
//! ## Architecture
//!
//! ```text
//! Client  (client.rs)                      ← facade held by the game
//!   ├── Session  (session.rs)              ← connect, handshake, recv thread
//!   │     ├── Transport / Link (transport.rs)
//!   │     ├── RetryPolicy      (retry.rs)
//!   │     └── EventQueue       (queue.rs)  ← recv thread → tick thread
//!   └── Dispatcher  (dispatch.rs)          ← per-tick routing policy
//!         └── impl EventHandler            ← e.g. RoomCache (cache.rs)
//! ```
//!
//! Frames are fixed-size little-endian records, see [`protocol`].
//! Logging goes through the `log` facade; the host picks the backend.

pub mod cache;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod retry;
pub mod session;
pub mod transport;
pub mod types;

pub use cache::{CachedPlayer, RoomCache, RoomStats};
pub use client::Client;
pub use config::NetworkConfig;
pub use dispatch::{DispatchStats, Dispatcher, EventHandler};
pub use error::{ProtocolError, SessionError};
pub use queue::EventQueue;
pub use retry::{Backoff, RetryPolicy};
pub use session::{PauseFlag, Session, SessionOptions, SessionState};
pub use transport::{Link, TcpTransport, Transport};
pub use types::{Event, EventKind, InboundEvent, Key, KeyEvent, MoveEvent, UserId, Vec3};
