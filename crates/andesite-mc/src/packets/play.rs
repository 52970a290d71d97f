//! Play protocol packets.
//!
//! The play state is open-ended: servers send many packet types and new
//! ids appear as the protocol evolves, so consumers must tolerate ids they
//! do not recognize. The types here cover the packets the client engine
//! reacts to; ids are for protocol version 4.

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::{Buf, BufMut, BytesMut};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

use crate::codec::{
    RawPacket, read_bool, read_f32, read_f64, read_i8, read_i16, read_i32, read_i64, read_string,
    read_u8, write_string,
};
use crate::error::{ProtocolError, Result};
use crate::packets::traits::{ConnectionState, Packet};

/// Maximum level type string length.
const MAX_LEVEL_TYPE_LENGTH: usize = 16;

/// Maximum decompressed chunk data size (16 MiB).
const MAX_CHUNK_DATA: usize = 16 * 1024 * 1024;

/// Keep-Alive packet (both directions).
///
/// The server sends a token periodically; the client must echo it back
/// promptly or the server will drop the connection for timing out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    /// The liveness token to echo.
    pub token: i32,
}

impl Packet for KeepAlive {
    const ID: i32 = 0x00;
    const STATE: ConnectionState = ConnectionState::Play;
}

impl KeepAlive {
    /// Create a new keep-alive with the given token.
    #[must_use]
    pub const fn new(token: i32) -> Self {
        Self { token }
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

        let mut cursor = std::io::Cursor::new(&packet.payload[..]);
        let token = cursor.read_i32::<BigEndian>()?;

        Ok(Self { token })
    }

    /// Encode to a raw packet.
    ///
    /// # Panics
    ///
    /// This function will not panic - the unwrap is infallible when writing
    /// to a `Vec`.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        let mut payload = BytesMut::with_capacity(4);
        let mut cursor = std::io::Cursor::new(Vec::with_capacity(4));
        // Writing to a Vec<u8> cursor never fails
        cursor.write_i32::<BigEndian>(self.token).unwrap();
        payload.extend_from_slice(cursor.get_ref());
        RawPacket::new(Self::ID, payload)
    }
}

/// Join Game packet (server -> client).
///
/// The first play-state packet after login success; describes the world
/// the player is entering.
#[derive(Debug, Clone)]
pub struct JoinGame {
    /// The player's entity id.
    pub entity_id: i32,
    /// Game mode (0 survival, 1 creative, 2 adventure).
    pub game_mode: u8,
    /// Dimension (-1 nether, 0 overworld, 1 end).
    pub dimension: i8,
    /// Difficulty (0 peaceful through 3 hard).
    pub difficulty: u8,
    /// Maximum players, used for drawing the player list.
    pub max_players: u8,
    /// Level type (e.g. "default", "flat").
    pub level_type: String,
}

impl Packet for JoinGame {
    const ID: i32 = 0x01;
    const STATE: ConnectionState = ConnectionState::Play;
}

impl JoinGame {
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

        let entity_id = read_i32(&mut buf)?;
        let game_mode = read_u8(&mut buf)?;
        let dimension = read_i8(&mut buf)?;
        let difficulty = read_u8(&mut buf)?;
        let max_players = read_u8(&mut buf)?;
        let level_type = read_string(&mut buf, MAX_LEVEL_TYPE_LENGTH)?;

        Ok(Self {
            entity_id,
            game_mode,
            dimension,
            difficulty,
            max_players,
            level_type,
        })
    }

    /// Encode to a raw packet.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        let mut payload = BytesMut::new();

        payload.put_i32(self.entity_id);
        payload.put_u8(self.game_mode);
        payload.put_i8(self.dimension);
        payload.put_u8(self.difficulty);
        payload.put_u8(self.max_players);
        write_string(&mut payload, &self.level_type);

        RawPacket::new(Self::ID, payload)
    }
}

/// Time Update packet (server -> client).
#[derive(Debug, Clone, Copy)]
pub struct TimeUpdate {
    /// World age in ticks; not affected by commands.
    pub world_age: i64,
    /// Time of day in ticks.
    pub time_of_day: i64,
}

impl Packet for TimeUpdate {
    const ID: i32 = 0x03;
    const STATE: ConnectionState = ConnectionState::Play;
}

impl TimeUpdate {
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
        let world_age = read_i64(&mut buf)?;
        let time_of_day = read_i64(&mut buf)?;

        Ok(Self {
            world_age,
            time_of_day,
        })
    }

    /// Encode to a raw packet.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        let mut payload = BytesMut::with_capacity(16);
        payload.put_i64(self.world_age);
        payload.put_i64(self.time_of_day);
        RawPacket::new(Self::ID, payload)
    }
}

/// Player Position And Look packet (server -> client).
///
/// An absolute teleport of the player's camera.
#[derive(Debug, Clone, Copy)]
pub struct PlayerPositionAndLook {
    /// Absolute x coordinate.
    pub x: f64,
    /// Absolute y coordinate (eye level).
    pub y: f64,
    /// Absolute z coordinate.
    pub z: f64,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
    /// Whether the player is on the ground.
    pub on_ground: bool,
}

impl Packet for PlayerPositionAndLook {
    const ID: i32 = 0x08;
    const STATE: ConnectionState = ConnectionState::Play;
}

impl PlayerPositionAndLook {
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

        let x = read_f64(&mut buf)?;
        let y = read_f64(&mut buf)?;
        let z = read_f64(&mut buf)?;
        let yaw = read_f32(&mut buf)?;
        let pitch = read_f32(&mut buf)?;
        let on_ground = read_bool(&mut buf)?;

        Ok(Self {
            x,
            y,
            z,
            yaw,
            pitch,
            on_ground,
        })
    }

    /// Encode to a raw packet.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        let mut payload = BytesMut::with_capacity(33);

        payload.put_f64(self.x);
        payload.put_f64(self.y);
        payload.put_f64(self.z);
        payload.put_f32(self.yaw);
        payload.put_f32(self.pitch);
        payload.put_u8(u8::from(self.on_ground));

        RawPacket::new(Self::ID, payload)
    }
}

/// Player Abilities packet (server -> client).
#[derive(Debug, Clone, Copy)]
pub struct PlayerAbilities {
    /// Bit flags: invulnerable, flying, may fly, creative.
    pub flags: u8,
    /// Flying speed.
    pub flying_speed: f32,
    /// Walking speed.
    pub walking_speed: f32,
}

impl Packet for PlayerAbilities {
    const ID: i32 = 0x39;
    const STATE: ConnectionState = ConnectionState::Play;
}

impl PlayerAbilities {
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

        let flags = read_u8(&mut buf)?;
        let flying_speed = read_f32(&mut buf)?;
        let walking_speed = read_f32(&mut buf)?;

        Ok(Self {
            flags,
            flying_speed,
            walking_speed,
        })
    }

    /// Encode to a raw packet.
    #[must_use]
    pub fn to_raw(&self) -> RawPacket {
        let mut payload = BytesMut::with_capacity(9);

        payload.put_u8(self.flags);
        payload.put_f32(self.flying_speed);
        payload.put_f32(self.walking_speed);

        RawPacket::new(Self::ID, payload)
    }
}

/// Map Chunk Bulk packet (server -> client).
///
/// Carries a batch of chunk columns as one raw-DEFLATE compressed blob.
/// Parsing inflates the blob in memory; what happens to the chunk data
/// afterwards is up to the consumer.
#[derive(Debug, Clone)]
pub struct MapChunkBulk {
    /// Number of chunk columns in the batch.
    pub column_count: i16,
    /// Whether sky light data is included.
    pub sky_light_sent: bool,
    /// Decompressed chunk data.
    pub data: Vec<u8>,
}

impl Packet for MapChunkBulk {
    const ID: i32 = 0x26;
    const STATE: ConnectionState = ConnectionState::Play;
}

impl MapChunkBulk {
    /// Parse from a raw packet, inflating the chunk data.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet is malformed, the compressed blob is
    /// truncated or corrupt, or the decompressed data exceeds
    /// [`MAX_CHUNK_DATA`].
    pub fn from_raw(packet: &RawPacket) -> Result<Self> {
        if packet.id != Self::ID {
            return Err(ProtocolError::UnexpectedPacket {
                expected: Self::ID,
                actual: packet.id,
            });
        }

        let mut buf = packet.payload.clone().freeze();

        let column_count = read_i16(&mut buf)?;
        let data_length = read_i32(&mut buf)?;
        let sky_light_sent = read_bool(&mut buf)?;

        let data_length = usize::try_from(data_length).map_err(|_| ProtocolError::Truncated)?;
        if buf.remaining() < data_length {
            return Err(ProtocolError::Truncated);
        }
        let compressed = buf.copy_to_bytes(data_length);

        let mut data = Vec::new();
        let mut decoder = DeflateDecoder::new(&compressed[..]).take(MAX_CHUNK_DATA as u64 + 1);
        decoder.read_to_end(&mut data)?;
        if data.len() > MAX_CHUNK_DATA {
            return Err(ProtocolError::PacketTooLong {
                len: data.len(),
                max: MAX_CHUNK_DATA,
            });
        }

        Ok(Self {
            column_count,
            sky_light_sent,
            data,
        })
    }

    /// Encode to a raw packet, deflating the chunk data.
    ///
    /// # Panics
    ///
    /// This function will not panic - the unwrap is infallible when writing
    /// to a `Vec`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn to_raw(&self) -> RawPacket {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        // Writing to a Vec<u8> sink never fails
        std::io::Write::write_all(&mut encoder, &self.data).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut payload = BytesMut::new();
        payload.put_i16(self.column_count);
        payload.put_i32(compressed.len() as i32);
        payload.put_u8(u8::from(self.sky_light_sent));
        payload.extend_from_slice(&compressed);

        RawPacket::new(Self::ID, payload)
    }
}
