//! Fixed-size binary wire protocol.
//!
//! Every frame on the connection has the same length, so the receive loop
//! reads whole frames without a length prefix.
//!
//! ## Frame layout (little-endian)
//!
//! ```text
//! outbound (client → server), 25 bytes:
//!   [tag:u8][payload:24]
//!
//! inbound (server → client), 29 bytes:
//!   [sender:u32][tag:u8][payload:24]
//!
//! handshake (server → client, once, unsolicited), 4 bytes:
//!   [user_id:u32]
//! ```
//!
//! ## Payloads
//!
//! | Tag | Kind       | Payload                                             |
//! |-----|------------|-----------------------------------------------------|
//! | 0   | Join       | 24 zero bytes                                       |
//! | 2   | Move       | pos x,y,z + ori x,y,z as f32 (24 bytes)             |
//! | 3   | Key        | note:u16, velocity:u16, then 20 zero bytes          |
//! | 255 | Disconnect | 24 zero bytes                                       |
//!
//! Tag `1` is unassigned. Bytes past the active payload are written as zero
//! and never interpreted on decode.

use bytes::{Buf, BufMut};

use crate::error::ProtocolError;
use crate::types::{Event, EventKind, InboundEvent, KeyEvent, MoveEvent, UserId, Vec3};

/// Size of a serialized [`MoveEvent`].
pub const MOVE_EVENT_SIZE: usize = 6 * 4;
/// Size of a serialized [`KeyEvent`].
pub const KEY_EVENT_SIZE: usize = 2 + 2;
/// Payload slot shared by every event kind.
pub const PAYLOAD_SIZE: usize = if MOVE_EVENT_SIZE > KEY_EVENT_SIZE {
    MOVE_EVENT_SIZE
} else {
    KEY_EVENT_SIZE
};
/// Tag byte plus payload slot; the whole outbound frame.
pub const EVENT_FRAME_SIZE: usize = 1 + PAYLOAD_SIZE;
/// Size of a serialized [`UserId`].
pub const USER_ID_SIZE: usize = 4;
/// Sender prefix plus event frame; the whole inbound frame.
pub const INBOUND_FRAME_SIZE: usize = USER_ID_SIZE + EVENT_FRAME_SIZE;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode one outbound event frame.
pub fn encode(event: &Event) -> [u8; EVENT_FRAME_SIZE] {
    let mut frame = [0u8; EVENT_FRAME_SIZE];
    let mut w = &mut frame[..];
    w.put_u8(event.kind().tag());
    put_payload(&mut w, event);
    frame
}

/// Encode a full inbound frame as the server would send it.
///
/// Clients never send these; peers and test servers do.
pub fn encode_inbound(inbound: &InboundEvent) -> [u8; INBOUND_FRAME_SIZE] {
    let mut frame = [0u8; INBOUND_FRAME_SIZE];
    let mut w = &mut frame[..];
    w.put_u32_le(inbound.sender.0);
    w.put_u8(inbound.event.kind().tag());
    put_payload(&mut w, &inbound.event);
    frame
}

fn put_payload(w: &mut &mut [u8], event: &Event) {
    match event {
        Event::Move(m) => {
            w.put_f32_le(m.position.x);
            w.put_f32_le(m.position.y);
            w.put_f32_le(m.position.z);
            w.put_f32_le(m.orientation.x);
            w.put_f32_le(m.orientation.y);
            w.put_f32_le(m.orientation.z);
        }
        Event::Key(k) => {
            w.put_u16_le(k.key().note());
            w.put_u16_le(k.velocity());
        }
        Event::Join | Event::Disconnect => {}
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode one inbound frame. Only the first [`INBOUND_FRAME_SIZE`] bytes are
/// looked at.
pub fn decode(data: &[u8]) -> Result<InboundEvent, ProtocolError> {
    ensure_len(data, INBOUND_FRAME_SIZE)?;
    let mut r = &data[..INBOUND_FRAME_SIZE];
    let sender = UserId(r.get_u32_le());
    let event = get_event(&mut r)?;
    Ok(InboundEvent::new(sender, event))
}

/// Decode a sender-less outbound frame, as the server sees it.
pub fn decode_event(data: &[u8]) -> Result<Event, ProtocolError> {
    ensure_len(data, EVENT_FRAME_SIZE)?;
    let mut r = &data[..EVENT_FRAME_SIZE];
    get_event(&mut r)
}

/// Decode the 4-byte handshake that assigns the local user id.
pub fn decode_user_id(data: [u8; USER_ID_SIZE]) -> UserId {
    UserId(u32::from_le_bytes(data))
}

fn ensure_len(data: &[u8], needed: usize) -> Result<(), ProtocolError> {
    if data.len() < needed {
        return Err(ProtocolError::BufferTooShort {
            needed,
            got: data.len(),
        });
    }
    Ok(())
}

fn get_event(r: &mut &[u8]) -> Result<Event, ProtocolError> {
    let tag = r.get_u8();
    let kind = EventKind::try_from(tag).map_err(|_| ProtocolError::UnknownEventKind(tag))?;

    let event = match kind {
        EventKind::Join => Event::Join,
        EventKind::Disconnect => Event::Disconnect,
        EventKind::Move => {
            let position = Vec3::new(r.get_f32_le(), r.get_f32_le(), r.get_f32_le());
            let orientation = Vec3::new(r.get_f32_le(), r.get_f32_le(), r.get_f32_le());
            Event::Move(MoveEvent::new(position, orientation))
        }
        EventKind::Key => {
            let note = r.get_u16_le();
            let velocity = r.get_u16_le();
            Event::Key(KeyEvent::from_raw(note, velocity)?)
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_sizes() {
        assert_eq!(PAYLOAD_SIZE, 24);
        assert_eq!(EVENT_FRAME_SIZE, 25);
        assert_eq!(INBOUND_FRAME_SIZE, 29);
    }

    #[test]
    fn key_frame_layout() {
        let ev = Event::Key(KeyEvent::from_raw(60, 100).unwrap());
        let frame = encode(&ev);
        assert_eq!(&frame[..5], &[3, 60, 0, 100, 0]);
        assert!(frame[5..].iter().all(|b| *b == 0));
    }

    #[test]
    fn join_and_disconnect_are_zero_padded() {
        let join = encode(&Event::Join);
        assert_eq!(join[0], 0);
        assert!(join[1..].iter().all(|b| *b == 0));

        let bye = encode(&Event::Disconnect);
        assert_eq!(bye[0], 255);
        assert!(bye[1..].iter().all(|b| *b == 0));
    }

    #[test]
    fn move_frame_is_little_endian_floats() {
        let ev = Event::Move(MoveEvent::new(
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -2.5),
        ));
        let frame = encode(&ev);
        assert_eq!(frame[0], 2);
        assert_eq!(&frame[1..5], &1.0f32.to_le_bytes());
        assert_eq!(&frame[21..25], &(-2.5f32).to_le_bytes());
    }

    #[test]
    fn decode_reads_sender_prefix() {
        let mut data = [0u8; INBOUND_FRAME_SIZE];
        data[..4].copy_from_slice(&7u32.to_le_bytes());
        data[4] = 0;
        let ev = decode(&data).unwrap();
        assert_eq!(ev.sender, UserId(7));
        assert_eq!(ev.event, Event::Join);
    }

    #[test]
    fn decode_ignores_trailing_payload_bytes() {
        let mut data = [0xAAu8; INBOUND_FRAME_SIZE];
        data[..4].copy_from_slice(&1u32.to_le_bytes());
        data[4] = 3;
        data[5..7].copy_from_slice(&10u16.to_le_bytes());
        data[7..9].copy_from_slice(&0u16.to_le_bytes());
        let ev = decode(&data).unwrap();
        assert_eq!(ev.event, Event::Key(KeyEvent::from_raw(10, 0).unwrap()));
    }

    #[test]
    fn decode_rejects_invalid_key_payload() {
        let mut data = [0u8; INBOUND_FRAME_SIZE];
        data[4] = 3;
        data[5..7].copy_from_slice(&88u16.to_le_bytes());
        assert!(matches!(
            decode(&data),
            Err(ProtocolError::InvalidArgument { field: "note", .. })
        ));
    }

    #[test]
    fn handshake_id_is_little_endian() {
        assert_eq!(decode_user_id([0x2A, 0, 0, 0]), UserId(42));
        assert_eq!(decode_user_id([0, 1, 0, 0]), UserId(256));
    }
}
