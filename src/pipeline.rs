//! The packet receive pipeline.
//!
//! Once a session reaches play state, a dedicated task owns the read half
//! of the socket and continuously frames inbound bytes into packets,
//! handing each one to the application through a capacity-1 channel. That
//! hand-off is the only backpressure: the worker reads the next frame only
//! after the previous one has been queued and the consumer has made room,
//! so a slow consumer stalls the socket rather than growing a buffer.
//!
//! The worker is the sole reader of the stream for the lifetime of the
//! connection; nothing else may read from the socket once it starts, or
//! frames would interleave and corrupt.

use andesite_mc::ProtocolError;
use andesite_mc::codec::{RawPacket, read_packet};
use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Capacity of the inbound hand-off channel.
const INBOUND_CAPACITY: usize = 1;

/// Create the inbound hand-off channel.
#[must_use]
pub fn channel() -> (mpsc::Sender<RawPacket>, mpsc::Receiver<RawPacket>) {
    mpsc::channel(INBOUND_CAPACITY)
}

/// Spawn the receive worker for a connection.
///
/// The worker terminates when the stream ends, on the first framing error,
/// or when the receiving side of `tx` is dropped. Dropping `tx` on the way
/// out is what the application observes as disconnection: its next receive
/// returns `None` and no further inbound packets will ever arrive.
pub fn spawn<R>(mut reader: R, tx: mpsc::Sender<RawPacket>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let packet = match read_packet(&mut reader).await {
                Ok(packet) => packet,
                Err(ProtocolError::Io(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("server closed the connection");
                    break;
                }
                Err(e) => {
                    error!("couldn't read packet: {e}");
                    break;
                }
            };

            if tx.send(packet).await.is_err() {
                // Receiver dropped; the session is shutting down.
                debug!("inbound queue closed, stopping reader");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use andesite_mc::codec::write_packet;
    use bytes::BytesMut;

    #[tokio::test]
    async fn test_packets_are_delivered_in_wire_order() {
        let (mut near, far) = tokio::io::duplex(1024);
        let (tx, mut rx) = channel();
        let worker = spawn(far, tx);

        for id in 1..=3 {
            let packet = RawPacket::new(id, BytesMut::from(&[id as u8][..]));
            write_packet(&mut near, &packet).await.unwrap();
        }

        for id in 1..=3 {
            let received = rx.recv().await.expect("packet should arrive");
            assert_eq!(received.id, id);
        }

        drop(near);
        assert!(rx.recv().await.is_none());
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_stream_ends_the_pipeline() {
        let (near, far) = tokio::io::duplex(64);
        let (tx, mut rx) = channel();
        let worker = spawn(far, tx);

        drop(near);

        assert!(rx.recv().await.is_none());
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_frame_ends_the_pipeline() {
        use tokio::io::AsyncWriteExt;

        let (mut near, far) = tokio::io::duplex(64);
        let (tx, mut rx) = channel();
        let worker = spawn(far, tx);

        // A length prefix claiming more than MAX_PACKET_SIZE.
        near.write_all(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]).await.unwrap();

        assert!(rx.recv().await.is_none());
        worker.await.unwrap();
    }
}
