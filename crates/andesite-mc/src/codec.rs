//! Packet framing for the wire protocol.
//!
//! Packets are framed as:
//! - `[varint length][varint packet_id][payload...]`
//!
//! The length covers the packet id and payload, but not itself.

use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};
use crate::varint::{read_varint, read_varint_buf, varint_len, write_varint_buf};

/// Maximum packet size (2 MiB).
pub const MAX_PACKET_SIZE: usize = 2 * 1024 * 1024;

/// A raw packet with its id and undecoded payload.
#[derive(Debug, Clone)]
pub struct RawPacket {
    /// The packet id.
    pub id: i32,
    /// The packet payload (without the packet id).
    pub payload: BytesMut,
}

impl RawPacket {
    /// Create a new raw packet with the given id and payload.
    #[must_use]
    pub const fn new(id: i32, payload: BytesMut) -> Self {
        Self { id, payload }
    }

    /// Create a new raw packet with the given id and an empty payload.
    #[must_use]
    pub fn empty(id: i32) -> Self {
        Self {
            id,
            payload: BytesMut::new(),
        }
    }
}

/// Read a raw packet from an async reader.
///
/// Short reads from the underlying transport are retried until the full
/// declared frame has been obtained; only end-of-stream mid-frame or a hard
/// I/O error fails.
///
/// # Errors
///
/// Returns an error if:
/// - An I/O error occurs (including the stream closing mid-frame)
/// - The declared length exceeds [`MAX_PACKET_SIZE`]
/// - The packet id varint is malformed
pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> Result<RawPacket> {
    let length = read_varint(reader).await?;

    let length = usize::try_from(length).map_err(|_| ProtocolError::PacketTooLong {
        len: usize::MAX,
        max: MAX_PACKET_SIZE,
    })?;

    // Reject before allocating anything for a hostile length prefix.
    if length > MAX_PACKET_SIZE {
        return Err(ProtocolError::PacketTooLong {
            len: length,
            max: MAX_PACKET_SIZE,
        });
    }

    // Read the entire frame body (packet id + payload).
    let mut data = vec![0u8; length];
    reader.read_exact(&mut data).await?;

    // The id varint's encoded width is included in the declared length; the
    // payload is whatever follows it.
    let mut buf = &data[..];
    let id = read_varint_buf(&mut buf)?;
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    let id = id as i32;

    let payload = BytesMut::from(buf);

    Ok(RawPacket { id, payload })
}

/// Write a raw packet to an async writer.
///
/// The full frame is assembled in one buffer before any byte is written, so
/// a consumer never observes a partial frame; the writer is flushed after
/// the frame.
///
/// # Errors
///
/// Returns an error if an I/O error occurs.
pub async fn write_packet<W: AsyncWrite + Unpin>(writer: &mut W, packet: &RawPacket) -> Result<()> {
    #[allow(clippy::cast_sign_loss)]
    let id = packet.id as u32;
    let id = u64::from(id);

    // The length prefix covers the id varint plus the payload.
    let body_len = varint_len(id) + packet.payload.len();

    let mut buf = Vec::with_capacity(varint_len(body_len as u64) + body_len);
    write_varint_buf(&mut buf, body_len as u64);
    write_varint_buf(&mut buf, id);
    buf.extend_from_slice(&packet.payload);

    writer.write_all(&buf).await?;
    writer.flush().await?;

    Ok(())
}

/// Read a length-prefixed string from a buffer.
///
/// Strings are encoded as `[varint byte_length][UTF-8 bytes]`.
///
/// # Errors
///
/// Returns an error if the declared length exceeds `max_len * 4` bytes, the
/// buffer ends before the declared length, or the bytes are not valid UTF-8.
pub fn read_string(buf: &mut impl Buf, max_len: usize) -> Result<String> {
    let len = read_varint_buf(buf)?;

    let len = usize::try_from(len).map_err(|_| ProtocolError::StringTooLong {
        len: usize::MAX,
        max: max_len * 4,
    })?;

    // Max 4 bytes per char in UTF-8.
    if len > max_len * 4 {
        return Err(ProtocolError::StringTooLong {
            len,
            max: max_len * 4,
        });
    }

    if buf.remaining() < len {
        return Err(ProtocolError::Truncated);
    }

    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);

    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()).into())
}

/// Write a length-prefixed string to a buffer.
pub fn write_string(buf: &mut impl BufMut, s: &str) {
    let bytes = s.as_bytes();
    write_varint_buf(buf, bytes.len() as u64);
    buf.put_slice(bytes);
}

// Checked big-endian fixed-width readers. `bytes::Buf` panics on an
// exhausted buffer; a truncated frame must surface as an error instead.

fn ensure_remaining(buf: &impl Buf, width: usize) -> Result<()> {
    if buf.remaining() < width {
        return Err(ProtocolError::Truncated);
    }
    Ok(())
}

/// Read a single byte from a buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the buffer is exhausted.
pub fn read_u8(buf: &mut impl Buf) -> Result<u8> {
    ensure_remaining(buf, 1)?;
    Ok(buf.get_u8())
}

/// Read a signed byte from a buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the buffer is exhausted.
pub fn read_i8(buf: &mut impl Buf) -> Result<i8> {
    ensure_remaining(buf, 1)?;
    Ok(buf.get_i8())
}

/// Read a big-endian u16 from a buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the buffer is exhausted.
pub fn read_u16(buf: &mut impl Buf) -> Result<u16> {
    ensure_remaining(buf, 2)?;
    Ok(buf.get_u16())
}

/// Read a big-endian i16 from a buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the buffer is exhausted.
pub fn read_i16(buf: &mut impl Buf) -> Result<i16> {
    ensure_remaining(buf, 2)?;
    Ok(buf.get_i16())
}

/// Read a big-endian i32 from a buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the buffer is exhausted.
pub fn read_i32(buf: &mut impl Buf) -> Result<i32> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_i32())
}

/// Read a big-endian i64 from a buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the buffer is exhausted.
pub fn read_i64(buf: &mut impl Buf) -> Result<i64> {
    ensure_remaining(buf, 8)?;
    Ok(buf.get_i64())
}

/// Read a big-endian f32 from a buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the buffer is exhausted.
pub fn read_f32(buf: &mut impl Buf) -> Result<f32> {
    ensure_remaining(buf, 4)?;
    Ok(buf.get_f32())
}

/// Read a big-endian f64 from a buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the buffer is exhausted.
pub fn read_f64(buf: &mut impl Buf) -> Result<f64> {
    ensure_remaining(buf, 8)?;
    Ok(buf.get_f64())
}

/// Read a bool encoded as one byte (zero = false).
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the buffer is exhausted.
pub fn read_bool(buf: &mut impl Buf) -> Result<bool> {
    Ok(read_u8(buf)? != 0)
}
