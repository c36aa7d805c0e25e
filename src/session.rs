//! Session – connection lifecycle, receive loop and outbound send.
//!
//! ## State machine
//!
//! ```text
//! Disconnected ─start()─▶ Connecting ──(retry policy)──▶ Failed
//!                             │
//!                             ▼
//!                        Handshaking ──(EOF / timeout)──▶ Failed
//!                             │ 4-byte user id
//!                             ▼
//!                           Ready ──(EOF / io error / close())──▶ Closed
//! ```
//!
//! Only the initial connect is retried. Once the receive loop ends the
//! session stays `Closed`; nothing reconnects it.
//!
//! ## Threads
//!
//! `start()` runs on the caller's thread. On success it spawns one receive
//! thread that owns the read half of the link and feeds [`EventQueue`].
//! `send()` writes on the caller's thread through the write half, so sends
//! and receives never wait on each other.

use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::error::SessionError;
use crate::protocol::{self, INBOUND_FRAME_SIZE, USER_ID_SIZE};
use crate::queue::EventQueue;
use crate::retry::{retry_blocking, RetryPolicy};
use crate::transport::{Link, Transport};
use crate::types::{Event, UserId};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Disconnected,
    Connecting,
    Handshaking,
    Ready,
    Failed,
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Handshaking => "handshaking",
            SessionState::Ready => "ready",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Attempts and delays for the initial connect.
    pub retry: RetryPolicy,
    /// How often to check whether a fresh link is usable.
    pub ready_poll_interval: Duration,
    /// Give up on the handshake if the link is not usable by then.
    pub ready_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            ready_poll_interval: Duration::from_millis(10),
            ready_timeout: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------
// Pause
// ---------------------------------------------------------------------------

/// Session-wide pause switch.
///
/// While set, inbound Move/Key events are not applied and `send` does
/// nothing. The receive loop keeps draining the socket regardless.
#[derive(Debug, Clone, Default)]
pub struct PauseFlag(Arc<AtomicBool>);

impl PauseFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, paused: bool) {
        self.0.store(paused, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct Session<T: Transport> {
    transport: T,
    options: SessionOptions,
    queue: EventQueue,
    pause: PauseFlag,
    state: Arc<RwLock<SessionState>>,
    self_id: Option<UserId>,
    writer: Option<Mutex<T::Link>>,
    receiver: Option<JoinHandle<()>>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, options: SessionOptions) -> Self {
        Self {
            transport,
            options,
            queue: EventQueue::new(),
            pause: PauseFlag::new(),
            state: Arc::new(RwLock::new(SessionState::Disconnected)),
            self_id: None,
            writer: None,
            receiver: None,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// The id the server assigned at handshake, if it got that far.
    pub fn self_id(&self) -> Option<UserId> {
        self.self_id
    }

    /// Inbound events land here.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn pause_flag(&self) -> PauseFlag {
        self.pause.clone()
    }

    /// True while the receive thread is still running.
    pub fn is_receiving(&self) -> bool {
        self.receiver
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    fn set_state(&self, next: SessionState) {
        let mut state = self.state.write();
        debug!("session state {} -> {}", *state, next);
        *state = next;
    }

    // -----------------------------------------------------------------------
    // Connect + handshake
    // -----------------------------------------------------------------------

    /// Connect, read the assigned user id and start the receive thread.
    ///
    /// Blocks for up to the whole retry schedule. Whatever the outcome, the
    /// session ends in `Ready` or `Failed`; the error is returned only so the
    /// caller can report it.
    pub fn start(&mut self) -> Result<UserId, SessionError> {
        let current = self.state();
        if current != SessionState::Disconnected {
            return Err(SessionError::AlreadyStarted(current));
        }

        self.set_state(SessionState::Connecting);
        info!("Connecting to {}", self.transport.describe());

        let transport = &self.transport;
        let connected = retry_blocking(&self.options.retry, |attempt| {
            debug!("connect attempt {}", attempt);
            transport.connect()
        });

        let mut link = match connected {
            Ok(link) => link,
            Err((attempts, source)) => {
                error!(
                    "Connection to {} failed after {} attempts: {}",
                    self.transport.describe(),
                    attempts,
                    source
                );
                self.set_state(SessionState::Failed);
                return Err(SessionError::ConnectFailure { attempts, source });
            }
        };

        info!("Connected to {}", self.transport.describe());
        self.set_state(SessionState::Handshaking);

        let user_id = match handshake(&mut link, &self.options) {
            Ok(id) => id,
            Err(e) => {
                warn!("Handshake failed: {}", e);
                let _ = link.shutdown_link();
                self.set_state(SessionState::Failed);
                return Err(e);
            }
        };

        let reader = match link.try_clone_link() {
            Ok(r) => r,
            Err(e) => {
                warn!("Could not split link: {}", e);
                let _ = link.shutdown_link();
                self.set_state(SessionState::Failed);
                return Err(SessionError::Handshake(e));
            }
        };

        self.self_id = Some(user_id);
        info!("Assigned {}", user_id);

        // Ready before the thread exists, so an immediate EOF lands on Closed.
        self.set_state(SessionState::Ready);

        let queue = self.queue.clone();
        let state = self.state.clone();
        let spawned = std::thread::Builder::new()
            .name("piano-world-recv".into())
            .spawn(move || receive_loop(reader, queue, state));

        match spawned {
            Ok(handle) => {
                self.receiver = Some(handle);
                self.writer = Some(Mutex::new(link));
                Ok(user_id)
            }
            Err(e) => {
                error!("Failed to spawn receive thread: {}", e);
                let _ = link.shutdown_link();
                self.set_state(SessionState::Failed);
                Err(SessionError::Spawn(e))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Best-effort send of one 25-byte frame.
    ///
    /// Does nothing unless the session is `Ready` and not paused. Returns
    /// whether the frame was written in full.
    pub fn send(&self, event: &Event) -> bool {
        if !self.is_ready() {
            debug!("send skipped: session {}", self.state());
            return false;
        }
        if self.pause.is_paused() {
            return false;
        }
        let Some(writer) = &self.writer else {
            return false;
        };

        let frame = protocol::encode(event);
        match writer.lock().write_all(&frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send {} frame: {}", event.kind(), e);
                false
            }
        }
    }

    pub fn pause(&self) {
        if !self.pause.is_paused() {
            info!("Session paused");
        }
        self.pause.set(true);
    }

    pub fn resume(&self) {
        if self.pause.is_paused() {
            info!("Session resumed");
        }
        self.pause.set(false);
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Release the link. The blocked read fails and the receive thread exits.
    pub fn close(&mut self) {
        {
            let mut state = self.state.write();
            if matches!(*state, SessionState::Ready | SessionState::Disconnected) {
                *state = SessionState::Closed;
            }
        }

        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.lock().shutdown_link() {
                debug!("shutdown: {}", e);
            }
        }

        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                error!("Receive thread panicked");
            }
        }
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Helpers (run on the connecting thread / receive thread)
// ---------------------------------------------------------------------------

fn handshake<L: Link>(link: &mut L, options: &SessionOptions) -> Result<UserId, SessionError> {
    let started = Instant::now();
    while !link.is_ready() {
        if started.elapsed() >= options.ready_timeout {
            return Err(SessionError::HandshakeTimeout(options.ready_timeout));
        }
        std::thread::sleep(options.ready_poll_interval);
    }

    let mut id = [0u8; USER_ID_SIZE];
    read_full(link, &mut id)?;
    Ok(protocol::decode_user_id(id))
}

/// Fill `buf` completely, accumulating short reads. A zero-byte read means
/// the peer closed and is reported as `UnexpectedEof`.
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed before buffer was filled",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn receive_loop<L: Link>(mut reader: L, queue: EventQueue, state: Arc<RwLock<SessionState>>) {
    let mut frame = [0u8; INBOUND_FRAME_SIZE];
    let mut received: u64 = 0;

    loop {
        if let Err(e) = read_full(&mut reader, &mut frame) {
            // Closing locally also lands here; only report unexpected ends.
            if *state.read() != SessionState::Ready {
                debug!("Receive loop stopped after {} frames: {}", received, e);
            } else if e.kind() == ErrorKind::UnexpectedEof {
                warn!("Server closed the connection after {} frames", received);
            } else {
                warn!("Receive loop error after {} frames: {}", received, e);
            }
            break;
        }

        match protocol::decode(&frame) {
            Ok(event) => {
                received += 1;
                queue.enqueue(event);
            }
            Err(e) => warn!("Dropping undecodable frame: {}", e),
        }
    }

    let mut state = state.write();
    if *state == SessionState::Ready {
        *state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `chunk` bytes per read.
    struct Trickle {
        data: Cursor<Vec<u8>>,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.chunk);
            self.data.read(&mut buf[..n])
        }
    }

    #[test]
    fn read_full_accumulates_partial_reads() {
        let mut r = Trickle {
            data: Cursor::new((0u8..29).collect()),
            chunk: 3,
        };
        let mut buf = [0u8; 29];
        read_full(&mut r, &mut buf).unwrap();
        assert_eq!(buf[0], 0);
        assert_eq!(buf[28], 28);
    }

    #[test]
    fn read_full_reports_eof_on_short_stream() {
        let mut r = Cursor::new(vec![1u8, 2]);
        let mut buf = [0u8; 4];
        let err = read_full(&mut r, &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }

    #[test]
    fn pause_flag_is_shared_between_clones() {
        let a = PauseFlag::new();
        let b = a.clone();
        assert!(!b.is_paused());
        a.set(true);
        assert!(b.is_paused());
        a.set(false);
        assert!(!b.is_paused());
    }

    #[test]
    fn default_options_match_protocol_timing() {
        let opts = SessionOptions::default();
        assert_eq!(opts.retry.max_attempts, 5);
        assert_eq!(opts.ready_poll_interval, Duration::from_millis(10));
    }
}
