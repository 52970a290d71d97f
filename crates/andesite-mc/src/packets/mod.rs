//! Protocol packets.
//!
//! Packets are organized by connection state:
//! - Handshake: initial connection, selects the post-handshake mode
//! - Status: server list ping
//! - Login: authentication
//! - Play: in-game

pub mod handshake;
pub mod login;
pub mod play;
pub mod status;
pub mod traits;

pub use handshake::{Handshake, NextState};
pub use login::{LoginStart, LoginSuccess};
pub use play::{
    JoinGame, KeepAlive, MapChunkBulk, PlayerAbilities, PlayerPositionAndLook, TimeUpdate,
};
pub use status::{Ping, Pong, StatusRequest, StatusResponse};
pub use traits::{ConnectionState, Packet};
