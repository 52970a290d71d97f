//! Packet metadata traits.

/// The wire-protocol phase a packet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Handshaking state (initial connection).
    Handshaking,
    /// Status state (server list ping).
    Status,
    /// Login state (authentication).
    Login,
    /// Play state (in-game).
    Play,
}

/// A typed protocol packet.
///
/// This trait provides metadata about a packet type, including its id
/// and the connection state it belongs to. Packet ids are only unique
/// within a state.
pub trait Packet: Sized {
    /// The packet id.
    const ID: i32;

    /// The connection state this packet belongs to.
    const STATE: ConnectionState;
}
