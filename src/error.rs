//! Error types for the wire codec and the session lifecycle.

use thiserror::Error;

/// Failures produced while building or decoding protocol values.
///
/// These are local to the operation that raised them: a bad frame or a bad
/// key never gets replaced with default data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer bytes than a full frame were supplied.
    #[error("buffer too short: need {needed} bytes, got {got}")]
    BufferTooShort { needed: usize, got: usize },

    /// A decoded frame carried a tag outside `{0, 2, 3, 255}`.
    #[error("unknown event kind tag {0}")]
    UnknownEventKind(u8),

    /// A raw tag handed in for encoding is not a defined event kind.
    #[error("invalid event kind tag {0}")]
    InvalidEventKind(u8),

    /// A key event field is outside its valid range.
    #[error("invalid {field}: {value} (must be below {limit})")]
    InvalidArgument {
        field: &'static str,
        value: u16,
        limit: u16,
    },
}

/// Connection lifecycle failures.
///
/// The session absorbs every one of these into its state machine; they are
/// returned from [`Session::start`](crate::session::Session::start) only so
/// the caller can log or report them.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Every connect attempt allowed by the retry policy failed.
    #[error("connect failed after {attempts} attempts: {source}")]
    ConnectFailure {
        attempts: usize,
        #[source]
        source: std::io::Error,
    },

    /// The peer closed the stream before sending the 4-byte user id.
    #[error("connection closed before the user id arrived")]
    ConnectionClosed,

    /// The link never became usable after connecting.
    #[error("link not ready after {0:?}")]
    HandshakeTimeout(std::time::Duration),

    /// Transport error while reading the user id.
    #[error("handshake read failed: {0}")]
    Handshake(#[source] std::io::Error),

    /// The receive thread could not be spawned.
    #[error("failed to spawn receive thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// `start` was called on a session that already left `Disconnected`.
    #[error("session already started (state: {0})")]
    AlreadyStarted(crate::session::SessionState),
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            SessionError::ConnectionClosed
        } else {
            SessionError::Handshake(e)
        }
    }
}
