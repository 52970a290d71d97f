//! Varint encoding/decoding for the wire protocol.
//!
//! The protocol uses an unsigned LEB128-style variable-length encoding where
//! each byte carries 7 bits of data and the high bit indicates that more
//! bytes follow.

use bytes::{Buf, BufMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};

/// Segment bits mask (lower 7 bits).
const SEGMENT_BITS: u8 = 0x7F;

/// Continue bit (high bit).
const CONTINUE_BIT: u8 = 0x80;

/// Maximum encoded width in bytes; 10 bytes covers the full 64-bit range.
pub const MAX_VARINT_BYTES: u32 = 10;

/// Read a varint from an async reader.
///
/// # Errors
///
/// Returns an error if:
/// - An I/O error occurs
/// - The varint is longer than [`MAX_VARINT_BYTES`] bytes
pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u64> {
    let mut value: u64 = 0;
    let mut position: u32 = 0;

    loop {
        let byte = reader.read_u8().await?;
        value |= u64::from(byte & SEGMENT_BITS) << position;

        if byte & CONTINUE_BIT == 0 {
            break;
        }

        position += 7;
        if position >= 7 * MAX_VARINT_BYTES {
            return Err(ProtocolError::VarIntTooLong);
        }
    }

    Ok(value)
}

/// Write a varint to an async writer.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns an error if an I/O error occurs.
pub async fn write_varint<W: AsyncWrite + Unpin>(writer: &mut W, mut value: u64) -> Result<usize> {
    let mut bytes_written = 0;

    loop {
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (value & u64::from(SEGMENT_BITS)) as u8;
        value >>= 7;

        if value != 0 {
            byte |= CONTINUE_BIT;
        }

        writer.write_u8(byte).await?;
        bytes_written += 1;

        if value == 0 {
            break;
        }
    }

    Ok(bytes_written)
}

/// Read a varint from an in-memory buffer.
///
/// # Errors
///
/// Returns an error if the varint is malformed (too long) or the buffer ends
/// mid-sequence.
pub fn read_varint_buf(buf: &mut impl Buf) -> Result<u64> {
    let mut value: u64 = 0;
    let mut position: u32 = 0;

    loop {
        if !buf.has_remaining() {
            return Err(ProtocolError::Truncated);
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & SEGMENT_BITS) << position;

        if byte & CONTINUE_BIT == 0 {
            break;
        }

        position += 7;
        if position >= 7 * MAX_VARINT_BYTES {
            return Err(ProtocolError::VarIntTooLong);
        }
    }

    Ok(value)
}

/// Write a varint to an in-memory buffer.
pub fn write_varint_buf(buf: &mut impl BufMut, mut value: u64) {
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (value & u64::from(SEGMENT_BITS)) as u8;
        value >>= 7;

        if value != 0 {
            byte |= CONTINUE_BIT;
        }

        buf.put_u8(byte);

        if value == 0 {
            break;
        }
    }
}

/// Calculate the number of bytes needed to encode a varint.
#[must_use]
pub const fn varint_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }

    // One encoded byte per 7-bit segment.
    let bits_needed = 64 - value.leading_zeros();
    (bits_needed as usize).div_ceil(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn roundtrip(value: u64) {
        let mut buf = Vec::new();
        write_varint(&mut buf, value).await.unwrap();
        assert_eq!(buf.len(), varint_len(value));

        let mut cursor = Cursor::new(buf);
        let read_value = read_varint(&mut cursor).await.unwrap();
        assert_eq!(read_value, value);
    }

    #[tokio::test]
    async fn test_varint_zero() {
        roundtrip(0).await;
    }

    #[tokio::test]
    async fn test_varint_boundaries() {
        roundtrip(1).await;
        roundtrip(127).await;
        roundtrip(128).await;
        roundtrip(255).await;
        roundtrip(25565).await;
        roundtrip(2_097_151).await;
        roundtrip(u64::from(u32::MAX)).await;
        roundtrip(u64::MAX).await;
    }

    #[test]
    fn test_varint_len() {
        assert_eq!(varint_len(0), 1);
        assert_eq!(varint_len(1), 1);
        assert_eq!(varint_len(127), 1);
        assert_eq!(varint_len(128), 2);
        assert_eq!(varint_len(16383), 2);
        assert_eq!(varint_len(16384), 3);
        assert_eq!(varint_len(2_097_151), 3);
        assert_eq!(varint_len(2_097_152), 4);
        assert_eq!(varint_len(268_435_455), 4);
        assert_eq!(varint_len(268_435_456), 5);
        assert_eq!(varint_len(u64::from(u32::MAX)), 5);
        assert_eq!(varint_len(u64::MAX), 10);
    }

    #[tokio::test]
    async fn test_known_values() {
        let test_cases: &[(u64, &[u8])] = &[
            (0, &[0x00]),
            (1, &[0x01]),
            (127, &[0x7f]),
            (128, &[0x80, 0x01]),
            (255, &[0xff, 0x01]),
            (25565, &[0xdd, 0xc7, 0x01]),
            (2_097_151, &[0xff, 0xff, 0x7f]),
            (u64::from(u32::MAX), &[0xff, 0xff, 0xff, 0xff, 0x0f]),
            (
                u64::MAX,
                &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01],
            ),
        ];

        for (value, expected_bytes) in test_cases {
            let mut buf = Vec::new();
            write_varint(&mut buf, *value).await.unwrap();
            assert_eq!(&buf, expected_bytes, "write failed for {value}");

            let mut cursor = Cursor::new(expected_bytes.to_vec());
            let read_value = read_varint(&mut cursor).await.unwrap();
            assert_eq!(read_value, *value, "read failed for {value}");
        }
    }

    #[tokio::test]
    async fn test_varint_too_long() {
        // 10 continuation bytes mean an 11th byte would be required.
        let bytes = vec![0x80; 10];
        let mut cursor = Cursor::new(bytes);
        let result = read_varint(&mut cursor).await;
        assert!(matches!(result, Err(ProtocolError::VarIntTooLong)));
    }

    #[test]
    fn test_buf_roundtrip() {
        let mut buf = Vec::new();
        write_varint_buf(&mut buf, 25565);
        assert_eq!(buf, vec![0xdd, 0xc7, 0x01]);

        let mut slice = &buf[..];
        assert_eq!(read_varint_buf(&mut slice).unwrap(), 25565);
    }

    #[test]
    fn test_buf_truncated() {
        // Continuation bit set but no next byte available.
        let mut slice: &[u8] = &[0x80];
        let result = read_varint_buf(&mut slice);
        assert!(matches!(result, Err(ProtocolError::Truncated)));
    }
}
