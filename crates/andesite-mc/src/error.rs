//! Protocol error types.

use std::io;

use thiserror::Error;

/// Errors that can occur when reading or writing wire protocol data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An I/O error occurred. The stream ending mid-frame surfaces here as
    /// `UnexpectedEof`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A varint continuation sequence exceeded the maximum encodable width
    /// (10 bytes).
    #[error("varint too long")]
    VarIntTooLong,

    /// A payload ended before a declared field was complete.
    #[error("truncated payload: field extends past end of packet")]
    Truncated,

    /// A string exceeded the maximum length.
    #[error("string too long: {len} bytes (max {max})")]
    StringTooLong {
        /// The declared length of the string.
        len: usize,
        /// The maximum allowed length.
        max: usize,
    },

    /// A packet exceeded the maximum frame length.
    #[error("packet too long: {len} bytes (max {max})")]
    PacketTooLong {
        /// The declared length of the packet.
        len: usize,
        /// The maximum allowed length.
        max: usize,
    },

    /// A specific packet id was required but a different one arrived.
    #[error("expected packet id {expected}, but got: {actual}")]
    UnexpectedPacket {
        /// The packet id that was required here.
        expected: i32,
        /// The packet id that actually arrived.
        actual: i32,
    },

    /// An invalid next state was supplied for a handshake.
    #[error("invalid next state: {0}")]
    InvalidNextState(i32),
}

/// Result type alias using [`ProtocolError`].
pub type Result<T> = std::result::Result<T, ProtocolError>;
