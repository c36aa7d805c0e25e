//! Dispatcher – per-tick drain of the inbound queue.
//!
//! ## Routing policy
//!
//! | Kind       | While paused | `sender == self_id`  |
//! |------------|--------------|----------------------|
//! | Join       | delivered    | delivered            |
//! | Disconnect | delivered    | delivered            |
//! | Move       | dropped      | dropped (own echo)   |
//! | Key        | dropped      | delivered            |
//!
//! Key events from ourselves are intentionally not filtered, unlike Move.
//! The local piano plays its own notes from the server echo.

use log::trace;
use serde::Serialize;

use crate::queue::EventQueue;
use crate::session::PauseFlag;
use crate::types::{Event, InboundEvent, KeyEvent, MoveEvent, UserId};

// ---------------------------------------------------------------------------
// Collaborator boundary
// ---------------------------------------------------------------------------

/// Receives routed events on the tick thread.
///
/// Every method has an empty default so collaborators implement only what
/// they consume.
pub trait EventHandler {
    fn on_join(&mut self, _sender: UserId) {}
    fn on_disconnect(&mut self, _sender: UserId) {}
    fn on_move(&mut self, _event: &MoveEvent, _sender: UserId) {}
    fn on_key(&mut self, _event: &KeyEvent, _sender: UserId) {}

    /// The session was paused; silence anything in progress.
    fn on_pause(&mut self) {}
    fn on_resume(&mut self) {}
}

// ---------------------------------------------------------------------------
// Tick result
// ---------------------------------------------------------------------------

/// What happened during one [`Dispatcher::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Events handed to the handler.
    pub delivered: usize,
    /// Move/Key events discarded because the session was paused.
    pub dropped_paused: usize,
    /// Move events discarded as the echo of our own movement.
    pub dropped_self: usize,
}

impl DispatchStats {
    pub fn total(&self) -> usize {
        self.delivered + self.dropped_paused + self.dropped_self
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    queue: EventQueue,
    pause: PauseFlag,
}

impl Dispatcher {
    pub fn new(queue: EventQueue, pause: PauseFlag) -> Self {
        Self { queue, pause }
    }

    /// Drain everything queued and route it in arrival order.
    ///
    /// The queue is released before any handler runs.
    pub fn tick<H: EventHandler + ?Sized>(
        &self,
        self_id: Option<UserId>,
        handler: &mut H,
    ) -> DispatchStats {
        let mut stats = DispatchStats::default();
        for inbound in self.queue.drain_all() {
            self.route(inbound, self_id, handler, &mut stats);
        }
        stats
    }

    fn route<H: EventHandler + ?Sized>(
        &self,
        inbound: InboundEvent,
        self_id: Option<UserId>,
        handler: &mut H,
        stats: &mut DispatchStats,
    ) {
        let InboundEvent { sender, event } = inbound;
        let from_self = self_id == Some(sender);

        match event {
            Event::Join => {
                handler.on_join(sender);
                stats.delivered += 1;
            }
            Event::Disconnect => {
                handler.on_disconnect(sender);
                stats.delivered += 1;
            }
            Event::Move(m) => {
                if self.pause.is_paused() {
                    stats.dropped_paused += 1;
                } else if from_self {
                    stats.dropped_self += 1;
                } else {
                    handler.on_move(&m, sender);
                    stats.delivered += 1;
                }
            }
            Event::Key(k) => {
                if self.pause.is_paused() {
                    stats.dropped_paused += 1;
                } else {
                    handler.on_key(&k, sender);
                    stats.delivered += 1;
                }
            }
        }
        trace!("routed {} from {}", event.kind(), sender);
    }
}
