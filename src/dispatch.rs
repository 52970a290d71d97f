//! Inbound packet dispatch.
//!
//! Maps a decoded packet's id to its parser and returns the resulting
//! [`GameEvent`]. The play protocol is open-ended, so ids without a
//! registered parser are tolerated: they surface as [`GameEvent::Unknown`]
//! and are skipped, never treated as fatal.
//!
//! Keep-alive is the one inbound packet that triggers an outbound write:
//! the token is echoed back through the supplied writer before the event is
//! returned, so the server sees the echo even if the consumer ignores the
//! event.

use andesite_mc::codec::{RawPacket, write_packet};
use andesite_mc::error::Result;
use andesite_mc::packets::{
    JoinGame, KeepAlive, MapChunkBulk, Packet, PlayerAbilities, PlayerPositionAndLook, TimeUpdate,
};
use tokio::io::AsyncWrite;
use tracing::debug;

/// A parsed inbound play-mode packet.
#[derive(Debug)]
pub enum GameEvent {
    /// Keep-alive received (and already echoed).
    KeepAlive(KeepAlive),
    /// World description on entering the game.
    JoinGame(JoinGame),
    /// World age / time of day update.
    TimeUpdate(TimeUpdate),
    /// Absolute position/camera teleport.
    PlayerPositionAndLook(PlayerPositionAndLook),
    /// Ability flags and movement speeds.
    PlayerAbilities(PlayerAbilities),
    /// A batch of chunk columns, already inflated.
    MapChunkBulk(MapChunkBulk),
    /// A packet id with no registered parser; skipped.
    Unknown {
        /// The unrecognized packet id.
        id: i32,
    },
}

/// Parse one inbound packet and react to it.
///
/// # Errors
///
/// Returns a decode error if a known packet's payload is malformed (the
/// packet should then be discarded), or an I/O error if the keep-alive echo
/// cannot be written (the session should then be considered dead).
pub async fn dispatch<W>(writer: &mut W, packet: &RawPacket) -> Result<GameEvent>
where
    W: AsyncWrite + Unpin,
{
    match packet.id {
        id if id == KeepAlive::ID => {
            let keep_alive = KeepAlive::from_raw(packet)?;
            // Liveness echo: same token, straight back.
            write_packet(writer, &keep_alive.to_raw()).await?;
            debug!(token = keep_alive.token, "echoed keep-alive");
            Ok(GameEvent::KeepAlive(keep_alive))
        }
        id if id == JoinGame::ID => Ok(GameEvent::JoinGame(JoinGame::from_raw(packet)?)),
        id if id == TimeUpdate::ID => Ok(GameEvent::TimeUpdate(TimeUpdate::from_raw(packet)?)),
        id if id == PlayerPositionAndLook::ID => Ok(GameEvent::PlayerPositionAndLook(
            PlayerPositionAndLook::from_raw(packet)?,
        )),
        id if id == MapChunkBulk::ID => {
            Ok(GameEvent::MapChunkBulk(MapChunkBulk::from_raw(packet)?))
        }
        id if id == PlayerAbilities::ID => {
            Ok(GameEvent::PlayerAbilities(PlayerAbilities::from_raw(packet)?))
        }
        id => {
            debug!(id, len = packet.payload.len(), "unknown packet id, skipping");
            Ok(GameEvent::Unknown { id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[tokio::test]
    async fn test_keep_alive_is_echoed_verbatim() {
        let inbound = RawPacket::new(0x00, BytesMut::from(&[0x00, 0x00, 0x00, 0x2A][..]));

        let mut outbound = Vec::new();
        let event = dispatch(&mut outbound, &inbound).await.unwrap();

        assert!(matches!(event, GameEvent::KeepAlive(k) if k.token == 0x2A));
        // Frame: length 5, id 0, then the identical 4-byte token.
        assert_eq!(outbound, vec![0x05, 0x00, 0x00, 0x00, 0x00, 0x2A]);
    }

    #[tokio::test]
    async fn test_unknown_id_is_skipped_without_writing() {
        let inbound = RawPacket::new(0x7F, BytesMut::from(&b"whatever"[..]));

        let mut outbound = Vec::new();
        let event = dispatch(&mut outbound, &inbound).await.unwrap();

        assert!(matches!(event, GameEvent::Unknown { id: 0x7F }));
        assert!(outbound.is_empty());
    }

    #[tokio::test]
    async fn test_join_game_is_parsed() {
        let join = JoinGame {
            entity_id: 99,
            game_mode: 0,
            dimension: 0,
            difficulty: 1,
            max_players: 8,
            level_type: "flat".to_string(),
        };

        let mut outbound = Vec::new();
        let event = dispatch(&mut outbound, &join.to_raw()).await.unwrap();

        match event {
            GameEvent::JoinGame(parsed) => {
                assert_eq!(parsed.entity_id, 99);
                assert_eq!(parsed.level_type, "flat");
            }
            other => panic!("expected JoinGame, got {other:?}"),
        }
        assert!(outbound.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_known_packet_is_an_error() {
        // Time update declares 16 bytes of payload but carries 2.
        let inbound = RawPacket::new(0x03, BytesMut::from(&[0x01, 0x02][..]));

        let mut outbound = Vec::new();
        let result = dispatch(&mut outbound, &inbound).await;

        assert!(result.is_err());
        assert!(outbound.is_empty());
    }
}
