//! Transport layer for libvirt RPC communication.
//!
//! Only the local Unix socket transport is provided.

mod unix;

pub use unix::UnixTransport;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use crate::error::Result;

/// Trait for transport implementations.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an encoded packet, length prefix included.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive a complete packet from the remote, without its length prefix.
    async fn recv(&mut self) -> Result<Bytes>;

    /// Close the transport.
    async fn close(&mut self) -> Result<()>;
}

/// Read a complete framed message.
///
/// The libvirt protocol uses a 4-byte big-endian length prefix.
/// The length value includes the 4 bytes of the length field itself.
async fn read_framed<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut R,
    buf: &mut BytesMut,
) -> Result<Bytes> {
    use tokio::io::AsyncReadExt;

    let mut len_buf = [0u8; 4];
    if let Err(e) = reader.read_exact(&mut len_buf).await {
        return Err(match e.kind() {
            std::io::ErrorKind::UnexpectedEof => crate::error::Error::ConnectionClosed,
            _ => e.into(),
        });
    }
    let total_len = u32::from_be_bytes(len_buf) as usize;

    if total_len > crate::packet::MAX_PACKET_SIZE {
        return Err(crate::error::Error::PacketTooLarge(total_len));
    }

    let body_len = total_len.saturating_sub(4);
    if body_len == 0 {
        return Ok(Bytes::new());
    }

    buf.resize(body_len, 0);
    reader.read_exact(buf).await?;

    Ok(buf.split().freeze())
}

/// Write a framed message.
///
/// The data should already include the length prefix.
async fn write_framed<W: tokio::io::AsyncWrite + Unpin>(writer: &mut W, data: &[u8]) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    writer.write_all(data).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_read_framed_strips_length() {
        let mut input: &[u8] = &[0, 0, 0, 7, b'a', b'b', b'c'];
        let mut buf = BytesMut::new();
        let body = read_framed(&mut input, &mut buf).await.unwrap();
        assert_eq!(&body[..], b"abc");
    }

    #[tokio::test]
    async fn test_read_framed_rejects_oversized() {
        let mut input: &[u8] = &[0x7f, 0, 0, 0];
        let mut buf = BytesMut::new();
        let err = read_framed(&mut input, &mut buf).await.unwrap_err();
        assert!(matches!(err, Error::PacketTooLarge(0x7f00_0000)));
    }

    #[tokio::test]
    async fn test_read_framed_eof_is_closed() {
        let mut input: &[u8] = &[];
        let mut buf = BytesMut::new();
        let err = read_framed(&mut input, &mut buf).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }
}
