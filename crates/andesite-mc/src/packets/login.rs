//! Login protocol packets.
//!
//! The login protocol authenticates the player. Protocol version 4 has no
//! encryption negotiation in offline mode: the client sends Login Start and
//! the server replies with Login Success, after which the connection is in
//! the play state.

use bytes::BytesMut;

use crate::codec::{RawPacket, read_string, write_string};
use crate::error::{ProtocolError, Result};
use crate::packets::traits::{ConnectionState, Packet};

/// Maximum username length (16 characters).
const MAX_USERNAME_LENGTH: usize = 16;

/// Maximum session id length (a hyphenated uuid is 36 characters).
const MAX_SESSION_ID_LENGTH: usize = 36;

/// Login Start packet (client -> server).
///
/// Sent by the client to begin the login process.
#[derive(Debug, Clone)]
pub struct LoginStart {
    /// The player's username.
    pub username: String,
}

impl Packet for LoginStart {
    const ID: i32 = 0x00;
    const STATE: ConnectionState = ConnectionState::Login;
}

impl LoginStart {
    /// Create a new login start packet.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Parse from a raw packet.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet is malformed.
    pub fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != Self::ID {
            return Err(ProtocolError::UnexpectedPacket {
                expected: Self::ID,
                actual: packet.id,
            });
        }

        let mut buf = packet.payload.clone().freeze();
        let username = read_string(&mut buf, MAX_USERNAME_LENGTH)?;

        Ok(Self { username })
    }

    /// Encode to a raw packet.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        let mut payload = BytesMut::new();
        write_string(&mut payload, &self.username);
        RawPacket::new(Self::ID, payload)
    }
}

/// Login Success packet (server -> client).
///
/// Sent when login is complete; the connection transitions to the play
/// state. The session id and display name arrive as two length-prefixed
/// strings, in that fixed order.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    /// The session id assigned by the server (uuid in text form).
    pub session_id: String,
    /// The player's display name.
    pub username: String,
}

impl Packet for LoginSuccess {
    const ID: i32 = 0x02;
    const STATE: ConnectionState = ConnectionState::Login;
}

impl LoginSuccess {
    /// Create a new login success packet.
    #[must_use]
    pub fn new(session_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            username: username.into(),
        }
    }

    /// Parse from a raw packet.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnexpectedPacket`] naming the offending id
    /// if the packet is not a Login Success, or a decode error if the
    /// payload is malformed.
    pub fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != Self::ID {
            return Err(ProtocolError::UnexpectedPacket {
                expected: Self::ID,
                actual: packet.id,
            });
        }

        let mut buf = packet.payload.clone().freeze();
        let session_id = read_string(&mut buf, MAX_SESSION_ID_LENGTH)?;
        let username = read_string(&mut buf, MAX_USERNAME_LENGTH)?;

        Ok(Self {
            session_id,
            username,
        })
    }

    /// Encode to a raw packet.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        let mut payload = BytesMut::new();
        write_string(&mut payload, &self.session_id);
        write_string(&mut payload, &self.username);
        RawPacket::new(Self::ID, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_start_roundtrip() {
        let original = LoginStart::new("TestPlayer");
        let raw = original.to_raw();
        let parsed = LoginStart::from_raw(&raw).unwrap();

        assert_eq!(parsed.username, "TestPlayer");
    }

    #[test]
    fn test_login_success_roundtrip() {
        let original = LoginSuccess::new("069a79f4-44e9-4726-a5be-fca90e38aaf5", "TestPlayer");
        let raw = original.to_raw();
        let parsed = LoginSuccess::from_raw(&raw).unwrap();

        assert_eq!(parsed.session_id, "069a79f4-44e9-4726-a5be-fca90e38aaf5");
        assert_eq!(parsed.username, "TestPlayer");
    }

    #[test]
    fn test_login_success_requires_id_2() {
        let raw = RawPacket::empty(0x01);
        let result = LoginSuccess::from_raw(&raw);
        assert!(matches!(
            result,
            Err(ProtocolError::UnexpectedPacket {
                expected: 0x02,
                actual: 0x01
            })
        ));
    }

    #[test]
    fn test_field_order_is_session_id_then_name() {
        let raw = LoginSuccess::new("session", "name").to_raw();
        // First string in the payload must be the session id.
        let mut buf = raw.payload.clone().freeze();
        let first = read_string(&mut buf, 36).unwrap();
        assert_eq!(first, "session");
    }
}
