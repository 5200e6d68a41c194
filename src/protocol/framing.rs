//! Length-delimited framing for the control channel
//!
//! Each frame is a u32 big-endian body length followed by the body. The
//! handshake (raw name string, ack/rejection reply) and every serialized
//! message on the control connection use this framing.

use std::io;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the frame length prefix in bytes
pub const FRAME_HEADER_LEN: usize = 4;

/// Read one frame from the stream.
///
/// Returns `Ok(None)` on a clean EOF at a frame boundary. EOF inside a
/// frame, or a frame whose declared length exceeds `max_size`, is an error.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> io::Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    let mut filled = 0;

    while filled < FRAME_HEADER_LEN {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside frame header",
            ));
        }
        filled += n;
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > max_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit of {}", len, max_size),
        ));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(Bytes::from(body)))
}

/// Write one frame to the stream and flush it.
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(body.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame body too large"))?;

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_frame(&mut client, b"hello relay").await.unwrap();
        let frame = read_frame(&mut server, 1024).await.unwrap().unwrap();

        assert_eq!(&frame[..], b"hello relay");
    }

    #[tokio::test]
    async fn test_empty_frame() {
        let (mut client, mut server) = tokio::io::duplex(64);

        write_frame(&mut client, b"").await.unwrap();
        let frame = read_frame(&mut server, 64).await.unwrap().unwrap();

        assert!(frame.is_empty());
    }

    #[tokio::test]
    async fn test_clean_eof_returns_none() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        let result = read_frame(&mut server, 64).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_eof_inside_header_is_error() {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_all(&[0x00, 0x00]).await.unwrap();
        drop(client);

        let err = read_frame(&mut server, 64).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_all(&1024u32.to_be_bytes()).await.unwrap();

        let err = read_frame(&mut server, 16).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn test_back_to_back_frames() {
        let (mut client, mut server) = tokio::io::duplex(1024);

        write_frame(&mut client, b"one").await.unwrap();
        write_frame(&mut client, b"two").await.unwrap();

        let first = read_frame(&mut server, 1024).await.unwrap().unwrap();
        let second = read_frame(&mut server, 1024).await.unwrap().unwrap();

        assert_eq!(&first[..], b"one");
        assert_eq!(&second[..], b"two");
    }
}
