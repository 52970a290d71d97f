//! Handshake packet definitions.
//!
//! The handshake is the first packet sent by the client on every connection
//! and determines whether this is a status ping or a login attempt.

use bytes::{BufMut, BytesMut};

use crate::codec::{RawPacket, read_string, read_u16, write_string};
use crate::error::{ProtocolError, Result};
use crate::packets::traits::{ConnectionState, Packet};
use crate::varint::{read_varint_buf, write_varint_buf};

/// Maximum server address length.
const MAX_SERVER_ADDRESS: usize = 255;

/// The next state after handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    /// Status request (server list ping).
    Status = 1,
    /// Login request.
    Login = 2,
}

impl TryFrom<i32> for NextState {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(Self::Status),
            2 => Ok(Self::Login),
            _ => Err(ProtocolError::InvalidNextState(value)),
        }
    }
}

/// Handshake packet sent by the client.
///
/// This is always the first packet in a connection; no other packet is
/// valid before it.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// The protocol version the client speaks.
    pub protocol_version: i32,
    /// The server address the client connected to.
    pub server_address: String,
    /// The server port the client connected to.
    pub server_port: u16,
    /// The next state: Status (1) or Login (2).
    pub next_state: NextState,
}

impl Packet for Handshake {
    const ID: i32 = 0x00;
    const STATE: ConnectionState = ConnectionState::Handshaking;
}

impl Handshake {
    /// Parse a handshake from a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet id is wrong or the payload is
    /// malformed.
    pub fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != Self::ID {
            return Err(ProtocolError::UnexpectedPacket {
                expected: Self::ID,
                actual: packet.id,
            });
        }

        let mut buf = packet.payload.clone().freeze();

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let protocol_version = read_varint_buf(&mut buf)? as i32;
        let server_address = read_string(&mut buf, MAX_SERVER_ADDRESS)?;
        let server_port = read_u16(&mut buf)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let next_state = NextState::try_from(read_varint_buf(&mut buf)? as i32)?;

        Ok(Self {
            protocol_version,
            server_address,
            server_port,
            next_state,
        })
    }

    /// Encode the handshake to a raw packet.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        let mut payload = BytesMut::new();

        #[allow(clippy::cast_sign_loss)]
        write_varint_buf(&mut payload, self.protocol_version as u64);
        write_string(&mut payload, &self.server_address);
        payload.put_u16(self.server_port);
        write_varint_buf(&mut payload, self.next_state as u64);

        RawPacket::new(Self::ID, payload)
    }
}
