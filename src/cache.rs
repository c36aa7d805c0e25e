//! `RoomCache` – local mirror of the shared room.
//!
//! Answers questions like:
//! - "Who else is in the room, and where are they looking?"
//! - "Which keys are sounding right now, and who is holding them?"
//!
//! The cache is an [`EventHandler`]; feed it from `Dispatcher::tick` on the
//! tick thread. It is NOT thread-safe by itself.

use std::collections::HashMap;

use log::debug;
use serde::Serialize;

use crate::dispatch::EventHandler;
use crate::types::{Key, KeyEvent, MoveEvent, UserId};

// ---------------------------------------------------------------------------
// Sub-records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CachedPlayer {
    pub user: UserId,
    /// Last pose received, `None` until the first Move arrives.
    pub pose: Option<MoveEvent>,
    /// Number of Move events applied.
    pub moves: u64,
}

impl CachedPlayer {
    fn new(user: UserId) -> Self {
        Self {
            user,
            pose: None,
            moves: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomStats {
    pub players: usize,
    pub sounding_keys: usize,
    pub sounding_notes: usize,
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct RoomCache {
    players: HashMap<UserId, CachedPlayer>,
    /// Key → (who is holding it → velocity).
    keys: HashMap<Key, HashMap<UserId, u16>>,
}

impl RoomCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    pub fn player(&self, user: UserId) -> Option<&CachedPlayer> {
        self.players.get(&user)
    }

    pub fn players(&self) -> impl Iterator<Item = &CachedPlayer> {
        self.players.values()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// Who is holding `key`, with their press velocity.
    pub fn sounding(&self, key: Key) -> Vec<(UserId, u16)> {
        let mut holders: Vec<(UserId, u16)> = self
            .keys
            .get(&key)
            .map(|m| m.iter().map(|(u, v)| (*u, *v)).collect())
            .unwrap_or_default();
        holders.sort();
        holders
    }

    /// Number of keys with at least one holder.
    pub fn sounding_count(&self) -> usize {
        self.keys.values().filter(|m| !m.is_empty()).count()
    }

    /// Highlight intensity in `[0, 1)`, growing with the number of holders.
    pub fn loudness(&self, key: Key) -> f32 {
        let holders = self.keys.get(&key).map(|m| m.len()).unwrap_or(0) as f32;
        1.0 - (-holders * 0.5).exp()
    }

    /// Release every key (pause, or reset after a drop).
    pub fn silence(&mut self) {
        self.keys.clear();
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    pub fn stats(&self) -> RoomStats {
        RoomStats {
            players: self.players.len(),
            sounding_keys: self.sounding_count(),
            sounding_notes: self.keys.values().map(|m| m.len()).sum(),
        }
    }

    /// Clear all state (e.g. after disconnect).
    pub fn clear(&mut self) {
        self.players.clear();
        self.keys.clear();
    }
}

impl EventHandler for RoomCache {
    fn on_join(&mut self, sender: UserId) {
        if self.players.contains_key(&sender) {
            debug!("{} joined twice", sender);
            return;
        }
        self.players.insert(sender, CachedPlayer::new(sender));
    }

    fn on_disconnect(&mut self, sender: UserId) {
        if self.players.remove(&sender).is_none() {
            debug!("disconnect from unknown {}", sender);
        }
        // Notes held by a departed player would otherwise ring forever.
        for holders in self.keys.values_mut() {
            holders.remove(&sender);
        }
        self.keys.retain(|_, holders| !holders.is_empty());
    }

    fn on_move(&mut self, event: &MoveEvent, sender: UserId) {
        // Players already in the room before we joined never send a Join.
        let player = self
            .players
            .entry(sender)
            .or_insert_with(|| CachedPlayer::new(sender));
        player.pose = Some(*event);
        player.moves += 1;
    }

    fn on_key(&mut self, event: &KeyEvent, sender: UserId) {
        if event.is_release() {
            if let Some(holders) = self.keys.get_mut(&event.key()) {
                holders.remove(&sender);
                if holders.is_empty() {
                    self.keys.remove(&event.key());
                }
            }
        } else {
            self.keys
                .entry(event.key())
                .or_default()
                .insert(sender, event.velocity());
        }
    }

    fn on_pause(&mut self) {
        self.silence();
    }
}
