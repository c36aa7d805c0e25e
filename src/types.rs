//! Core room types shared across all modules.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Participant identifier assigned by the room server at connect time.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

const PITCH_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One key of an 88-key keyboard, `0` = C-1, `69` = A4 (440 Hz), `87` = D#6.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Key(u16);

impl Key {
    /// Highest valid note index.
    pub const MAX_NOTE: u16 = 87;

    pub fn new(note: u16) -> Result<Self, ProtocolError> {
        if note > Self::MAX_NOTE {
            return Err(ProtocolError::InvalidArgument {
                field: "note",
                value: note,
                limit: Self::MAX_NOTE + 1,
            });
        }
        Ok(Self(note))
    }

    pub fn note(self) -> u16 {
        self.0
    }

    /// Octave number; note 0 sits in octave -1.
    pub fn octave(self) -> i32 {
        i32::from(self.0 / 12) - 1
    }

    pub fn pitch_class(self) -> &'static str {
        PITCH_NAMES[usize::from(self.0 % 12)]
    }

    /// Canonical name used by scene objects and input bindings, e.g. `NoteA4`.
    pub fn name(self) -> String {
        self.to_string()
    }

    /// Every valid key in ascending order.
    pub fn all() -> impl Iterator<Item = Key> {
        (0..=Self::MAX_NOTE).map(Key)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Note{}{}", self.pitch_class(), self.octave())
    }
}

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// A key press (`velocity > 0`) or release (`velocity == 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyEvent {
    key: Key,
    velocity: u16,
}

impl KeyEvent {
    /// Exclusive upper bound for velocity (MIDI range).
    pub const VELOCITY_LIMIT: u16 = 128;

    pub fn new(key: Key, velocity: u16) -> Result<Self, ProtocolError> {
        if velocity >= Self::VELOCITY_LIMIT {
            return Err(ProtocolError::InvalidArgument {
                field: "velocity",
                value: velocity,
                limit: Self::VELOCITY_LIMIT,
            });
        }
        Ok(Self { key, velocity })
    }

    /// Build from raw wire values, validating both fields.
    pub fn from_raw(note: u16, velocity: u16) -> Result<Self, ProtocolError> {
        Self::new(Key::new(note)?, velocity)
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn velocity(&self) -> u16 {
        self.velocity
    }

    pub fn is_release(&self) -> bool {
        self.velocity == 0
    }
}

/// Head pose of a participant. Orientation is Euler angles in degrees
/// (pitch about X, yaw about Y, roll about Z, Y up). Engines holding a
/// quaternion go through [`MoveEvent::from_rotation`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveEvent {
    pub position: Vec3,
    pub orientation: Vec3,
}

impl MoveEvent {
    pub fn new(position: Vec3, orientation: Vec3) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Build from a unit quaternion `[x, y, z, w]`, applied Z then X then Y.
    /// Angles come out in `(-180, 180]`.
    pub fn from_rotation(position: Vec3, rotation: [f32; 4]) -> Self {
        let [x, y, z, w] = rotation;
        let pitch = (2.0 * (w * x - y * z)).clamp(-1.0, 1.0).asin();
        let yaw = (2.0 * (w * y + x * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        let roll = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (x * x + z * z));
        Self::new(
            position,
            Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees()),
        )
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Wire tag of each event variant. Tag `1` is intentionally unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EventKind {
    Join = 0,
    Move = 2,
    Key = 3,
    Disconnect = 255,
}

impl EventKind {
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for EventKind {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(EventKind::Join),
            2 => Ok(EventKind::Move),
            3 => Ok(EventKind::Key),
            255 => Ok(EventKind::Disconnect),
            other => Err(ProtocolError::InvalidEventKind(other)),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Join => "join",
            EventKind::Move => "move",
            EventKind::Key => "key",
            EventKind::Disconnect => "disconnect",
        };
        f.write_str(name)
    }
}

/// One logical room event with exactly one active payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Join,
    Move(MoveEvent),
    Key(KeyEvent),
    Disconnect,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Join => EventKind::Join,
            Event::Move(_) => EventKind::Move,
            Event::Key(_) => EventKind::Key,
            Event::Disconnect => EventKind::Disconnect,
        }
    }
}

impl From<MoveEvent> for Event {
    fn from(m: MoveEvent) -> Self {
        Event::Move(m)
    }
}

impl From<KeyEvent> for Event {
    fn from(k: KeyEvent) -> Self {
        Event::Key(k)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Move(m) => write!(f, "[Move] pos={} ori={}", m.position, m.orientation),
            Event::Key(k) => write!(f, "[Key] {} vel={}", k.key(), k.velocity()),
            Event::Join => f.write_str("[Join]"),
            Event::Disconnect => f.write_str("[Disconnect]"),
        }
    }
}

/// An event decoded from one inbound frame, tagged with its sender.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InboundEvent {
    pub sender: UserId,
    pub event: Event,
}

impl InboundEvent {
    pub fn new(sender: UserId, event: Event) -> Self {
        Self { sender, event }
    }
}
