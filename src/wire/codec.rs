//! Frame encoding and decoding
//!
//! Pure `encode`/`decode` on buffers, plus async `read_frame`/`write_frame`
//! over any `AsyncRead`/`AsyncWrite`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::WireError;
use super::frame::{Frame, FrameKind};

/// Default maximum frame body length (1 MiB)
pub const DEFAULT_MAX_FRAME: usize = 1024 * 1024;

/// Encode a frame body (without the length prefix) into `buf`
///
/// Fails with `NameTooLong` if a channel or node name does not fit the
/// u16 length prefix; a truncating cast would silently bleed the name's
/// tail into the payload.
pub fn encode(frame: &Frame, buf: &mut BytesMut) -> Result<(), WireError> {
    buf.put_u8(frame.kind() as u8);

    match frame {
        Frame::Hello { node } => {
            put_name(buf, node)?;
        }
        Frame::Welcome | Frame::Ping | Frame::Pong => {}
        Frame::Forward { channel, payload } => {
            put_name(buf, channel)?;
            buf.put_slice(payload);
        }
        Frame::Deliver {
            channel,
            sequence,
            payload,
        } => {
            put_name(buf, channel)?;
            buf.put_u64(*sequence);
            buf.put_slice(payload);
        }
    }
    Ok(())
}

/// Decode a frame body (without the length prefix)
pub fn decode(body: &[u8]) -> Result<Frame, WireError> {
    let mut buf = body;

    if buf.remaining() < 1 {
        return Err(WireError::Truncated);
    }
    let kind_byte = buf.get_u8();
    let kind = FrameKind::from_u8(kind_byte).ok_or(WireError::UnknownKind(kind_byte))?;

    match kind {
        FrameKind::Hello => {
            let node = get_name(&mut buf)?;
            Ok(Frame::Hello { node })
        }
        FrameKind::Welcome => Ok(Frame::Welcome),
        FrameKind::Forward => {
            let channel = get_name(&mut buf)?;
            Ok(Frame::Forward {
                channel,
                payload: Bytes::copy_from_slice(buf),
            })
        }
        FrameKind::Deliver => {
            let channel = get_name(&mut buf)?;
            if buf.remaining() < 8 {
                return Err(WireError::Truncated);
            }
            let sequence = buf.get_u64();
            Ok(Frame::Deliver {
                channel,
                sequence,
                payload: Bytes::copy_from_slice(buf),
            })
        }
        FrameKind::Ping => Ok(Frame::Ping),
        FrameKind::Pong => Ok(Frame::Pong),
    }
}

/// Read one frame
///
/// Returns `Ok(None)` on a clean EOF at a frame boundary; EOF mid-frame is
/// an error.
pub async fn read_frame<R>(reader: &mut R, max_frame: usize) -> Result<Option<Frame>, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame {
        return Err(WireError::FrameTooLarge {
            len,
            max: max_frame,
        });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;

    decode(&body).map(Some)
}

/// Write one frame (length prefix + body)
///
/// Checks the body against `max_frame` before anything hits the socket:
/// an oversize frame would otherwise be accepted here and tear the link
/// down at the receiving end instead.
pub async fn write_frame<W>(
    writer: &mut W,
    frame: &Frame,
    max_frame: usize,
) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    let mut body = BytesMut::new();
    encode(frame, &mut body)?;

    if body.len() > max_frame {
        return Err(WireError::FrameTooLarge {
            len: body.len(),
            max: max_frame,
        });
    }

    let mut out = BytesMut::with_capacity(4 + body.len());
    out.put_u32(body.len() as u32);
    out.put_slice(&body);

    writer.write_all(&out).await?;
    writer.flush().await?;
    Ok(())
}

fn put_name(buf: &mut BytesMut, name: &str) -> Result<(), WireError> {
    if name.len() > u16::MAX as usize {
        return Err(WireError::NameTooLong(name.len()));
    }
    buf.put_u16(name.len() as u16);
    buf.put_slice(name.as_bytes());
    Ok(())
}

fn get_name(buf: &mut &[u8]) -> Result<String, WireError> {
    if buf.remaining() < 2 {
        return Err(WireError::Truncated);
    }
    let len = buf.get_u16() as usize;
    if buf.remaining() < len {
        return Err(WireError::Truncated);
    }
    let name = std::str::from_utf8(&buf[..len]).map_err(|_| WireError::InvalidName)?;
    let name = name.to_string();
    buf.advance(len);
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(frame: Frame) -> Frame {
        let mut buf = BytesMut::new();
        encode(&frame, &mut buf).expect("encode failed");
        decode(&buf).expect("decode failed")
    }

    #[test]
    fn test_hello_welcome() {
        assert_eq!(
            round_trip(Frame::Hello {
                node: "node-a".into()
            }),
            Frame::Hello {
                node: "node-a".into()
            }
        );
        assert_eq!(round_trip(Frame::Welcome), Frame::Welcome);
    }

    #[test]
    fn test_forward_with_binary_payload() {
        // Payloads are opaque and may contain length-prefix-looking bytes
        let payload = Bytes::from_static(&[0x00, 0x00, 0x00, 0x04, 0xFF, 0x01]);
        let frame = Frame::Forward {
            channel: "x".into(),
            payload: payload.clone(),
        };
        assert_eq!(round_trip(frame.clone()), frame);
    }

    #[test]
    fn test_deliver_sequence() {
        let frame = Frame::Deliver {
            channel: "orders".into(),
            sequence: u64::MAX,
            payload: Bytes::from_static(b""),
        };
        assert_eq!(round_trip(frame.clone()), frame);
    }

    #[test]
    fn test_decode_unknown_kind() {
        assert!(matches!(decode(&[0x7F]), Err(WireError::UnknownKind(0x7F))));
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(decode(&[]), Err(WireError::Truncated)));
        // Deliver frame cut off before the sequence field
        let mut buf = BytesMut::new();
        buf.put_u8(FrameKind::Deliver as u8);
        buf.put_u16(1);
        buf.put_slice(b"x");
        assert!(matches!(decode(&buf), Err(WireError::Truncated)));
    }

    #[test]
    fn test_encode_rejects_name_over_u16() {
        // A 70,000-byte name would wrap the u16 prefix to 4,464 and leak
        // the rest of the name into the payload
        let frame = Frame::Forward {
            channel: "c".repeat(70_000),
            payload: Bytes::from_static(b"x"),
        };
        let mut buf = BytesMut::new();
        assert!(matches!(
            encode(&frame, &mut buf),
            Err(WireError::NameTooLong(70_000))
        ));

        // Exactly at the prefix limit is fine
        let frame = Frame::Forward {
            channel: "c".repeat(u16::MAX as usize),
            payload: Bytes::from_static(b"x"),
        };
        let mut buf = BytesMut::new();
        encode(&frame, &mut buf).unwrap();
        match decode(&buf).unwrap() {
            Frame::Forward { channel, payload } => {
                assert_eq!(channel.len(), u16::MAX as usize);
                assert_eq!(payload, Bytes::from_static(b"x"));
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[test]
    fn test_decode_invalid_name() {
        let mut buf = BytesMut::new();
        buf.put_u8(FrameKind::Forward as u8);
        buf.put_u16(2);
        buf.put_slice(&[0xFF, 0xFE]);
        assert!(matches!(decode(&buf), Err(WireError::InvalidName)));
    }

    #[tokio::test]
    async fn test_read_write_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(4096);

        let frame = Frame::Deliver {
            channel: "news".into(),
            sequence: 42,
            payload: Bytes::from_static(b"breaking"),
        };
        write_frame(&mut a, &frame, DEFAULT_MAX_FRAME).await.unwrap();
        write_frame(&mut a, &Frame::Ping, DEFAULT_MAX_FRAME)
            .await
            .unwrap();

        assert_eq!(
            read_frame(&mut b, DEFAULT_MAX_FRAME).await.unwrap(),
            Some(frame)
        );
        assert_eq!(
            read_frame(&mut b, DEFAULT_MAX_FRAME).await.unwrap(),
            Some(Frame::Ping)
        );

        // Clean EOF at a frame boundary reads as None
        drop(a);
        assert_eq!(read_frame(&mut b, DEFAULT_MAX_FRAME).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_rejects_oversize_frame() {
        let (mut a, mut b) = tokio::io::duplex(4096);

        // Hand-rolled length prefix claiming a huge body
        a.write_all(&(u32::MAX).to_be_bytes()).await.unwrap();

        let result = read_frame(&mut b, 1024).await;
        assert!(matches!(result, Err(WireError::FrameTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_write_rejects_oversize_frame_before_sending() {
        let (mut a, mut b) = tokio::io::duplex(4096);

        let frame = Frame::Forward {
            channel: "x".into(),
            payload: Bytes::from(vec![0u8; 2048]),
        };
        let result = write_frame(&mut a, &frame, 1024).await;
        assert!(matches!(result, Err(WireError::FrameTooLarge { .. })));

        // Nothing reached the stream; the link stays usable
        write_frame(&mut a, &Frame::Ping, 1024).await.unwrap();
        assert_eq!(read_frame(&mut b, 1024).await.unwrap(), Some(Frame::Ping));
    }
}
