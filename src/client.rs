//! `Client` – the one object an application holds.
//!
//! ## Usage
//!
//! ```no_run
//! use piano_world::{Client, RoomCache, SessionOptions, TcpTransport};
//!
//! let mut client = Client::new(TcpTransport::new("127.0.0.1", 8000), SessionOptions::default());
//! let mut room = RoomCache::new();
//!
//! if client.connect().is_ok() {
//!     // In your frame loop:
//!     client.tick(&mut room);
//! }
//! ```

use crate::dispatch::{DispatchStats, Dispatcher, EventHandler};
use crate::error::{ProtocolError, SessionError};
use crate::session::{Session, SessionOptions, SessionState};
use crate::transport::Transport;
use crate::types::{Event, KeyEvent, MoveEvent, UserId, Vec3};

/// Owns a [`Session`] and the [`Dispatcher`] that drains it.
pub struct Client<T: Transport> {
    session: Session<T>,
    dispatcher: Dispatcher,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, options: SessionOptions) -> Self {
        let session = Session::new(transport, options);
        let dispatcher = Dispatcher::new(session.queue().clone(), session.pause_flag());
        Self {
            session,
            dispatcher,
        }
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    /// Blocking connect + handshake. See [`Session::start`].
    pub fn connect(&mut self) -> Result<UserId, SessionError> {
        self.session.start()
    }

    pub fn close(&mut self) {
        self.session.close();
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn self_id(&self) -> Option<UserId> {
        self.session.self_id()
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    // -----------------------------------------------------------------------
    // tick(), once per frame
    // -----------------------------------------------------------------------

    /// Drain inbound events into `handler`.
    pub fn tick<H: EventHandler + ?Sized>(&self, handler: &mut H) -> DispatchStats {
        self.dispatcher.tick(self.session.self_id(), handler)
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    pub fn send(&self, event: &Event) -> bool {
        self.session.send(event)
    }

    /// Send the local head pose (orientation in degrees).
    pub fn send_move(&self, position: Vec3, orientation: Vec3) -> bool {
        self.send(&Event::Move(MoveEvent::new(position, orientation)))
    }

    /// Send a press (`velocity > 0`) or release (`velocity == 0`).
    pub fn send_key(&self, note: u16, velocity: u16) -> Result<bool, ProtocolError> {
        let event = KeyEvent::from_raw(note, velocity)?;
        Ok(self.send(&Event::Key(event)))
    }

    // -----------------------------------------------------------------------
    // Pause
    // -----------------------------------------------------------------------

    pub fn pause<H: EventHandler + ?Sized>(&self, handler: &mut H) {
        self.session.pause();
        handler.on_pause();
    }

    pub fn resume<H: EventHandler + ?Sized>(&self, handler: &mut H) {
        self.session.resume();
        handler.on_resume();
    }

    pub fn is_paused(&self) -> bool {
        self.session.is_paused()
    }
}
