//! Hand-off queue between the receive thread and the tick thread.
//!
//! ```text
//! receive thread            │  tick thread
//! ───────────────────────── │ ─────────────────────────
//! read 29 bytes → decode    │  Dispatcher::tick
//!   → queue.enqueue(ev)     │    → queue.drain_all()
//!                           │    → route each event
//! ```
//!
//! The queue is unbounded: if the tick thread stalls, memory grows with the
//! inbound rate. The receive loop must never block on a full queue or the
//! peer would stall, so that risk is accepted.

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::types::InboundEvent;

/// FIFO of decoded inbound events. Cloning yields another handle to the same
/// queue.
#[derive(Debug, Clone)]
pub struct EventQueue {
    tx: Sender<InboundEvent>,
    rx: Receiver<InboundEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Append one event. Called from the receive loop only.
    pub fn enqueue(&self, event: InboundEvent) {
        // Both ends live in `self`, so the channel cannot be disconnected.
        let _ = self.tx.send(event);
    }

    /// Remove and return everything queued right now, oldest first.
    /// Never blocks.
    pub fn drain_all(&self) -> Vec<InboundEvent> {
        let mut out = Vec::with_capacity(self.rx.len());
        loop {
            match self.rx.try_recv() {
                Ok(ev) => out.push(ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
