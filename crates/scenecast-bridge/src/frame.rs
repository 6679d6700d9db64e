//! Control-channel framing
//!
//! A message is a big-endian `u32` frame count followed by that many frames,
//! each a big-endian `u32` byte length and the bytes. Both a blocking codec
//! (producer side) and an async codec (server side) are provided.

use std::io::{self, Read, Write};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;

/// Upper bound on frames per message. Commands use 3.
pub const MAX_FRAMES: usize = 16;

/// Default upper bound on a single frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 256 * 1024 * 1024;

/// Serialize a message into one buffer.
pub fn encode_message<F: AsRef<[u8]>>(frames: &[F]) -> Vec<u8> {
    let body: usize = frames.iter().map(|f| 4 + f.as_ref().len()).sum();
    let mut out = Vec::with_capacity(4 + body);
    out.extend_from_slice(&(frames.len() as u32).to_be_bytes());
    for frame in frames {
        let frame = frame.as_ref();
        out.extend_from_slice(&(frame.len() as u32).to_be_bytes());
        out.extend_from_slice(frame);
    }
    out
}

/// Write a message to a blocking stream.
pub fn write_message<W: Write, F: AsRef<[u8]>>(writer: &mut W, frames: &[F]) -> io::Result<()> {
    writer.write_all(&encode_message(frames))?;
    writer.flush()
}

fn check_count(count: usize) -> Result<usize, ProtocolError> {
    if count > MAX_FRAMES {
        return Err(ProtocolError::TooManyFrames(count));
    }
    Ok(count)
}

fn check_len(len: usize, limit: usize) -> Result<usize, ProtocolError> {
    if len > limit {
        return Err(ProtocolError::FrameTooLarge { len, limit });
    }
    Ok(len)
}

/// Fails if the stream ended before `len` bytes arrived.
fn check_complete(frame: Vec<u8>, len: usize) -> Result<Vec<u8>, ProtocolError> {
    if frame.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("frame truncated at {} of {} bytes", frame.len(), len),
        )
        .into());
    }
    Ok(frame)
}

fn read_u32_sync<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

/// Read one message from a blocking stream.
pub fn read_message<R: Read>(reader: &mut R, max_frame_bytes: usize) -> Result<Vec<Vec<u8>>, ProtocolError> {
    let count = check_count(read_u32_sync(reader)? as usize)?;
    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let len = check_len(read_u32_sync(reader)? as usize, max_frame_bytes)?;
        let mut frame = Vec::new();
        reader.by_ref().take(len as u64).read_to_end(&mut frame)?;
        frames.push(check_complete(frame, len)?);
    }
    Ok(frames)
}

/// Read one message from an async stream. Returns `Ok(None)` when the peer
/// closed the connection on a message boundary.
pub async fn read_message_async<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<Option<Vec<Vec<u8>>>, ProtocolError> {
    let count = match reader.read_u32().await {
        Ok(n) => check_count(n as usize)?,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let len = check_len(reader.read_u32().await? as usize, max_frame_bytes)?;
        let mut frame = Vec::new();
        (&mut *reader).take(len as u64).read_to_end(&mut frame).await?;
        frames.push(check_complete(frame, len)?);
    }
    Ok(Some(frames))
}

/// Write a message to an async stream.
pub async fn write_message_async<W: AsyncWrite + Unpin, F: AsRef<[u8]>>(
    writer: &mut W,
    frames: &[F],
) -> io::Result<()> {
    writer.write_all(&encode_message(frames)).await?;
    writer.flush().await
}
