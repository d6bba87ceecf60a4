//! Length-prefixed JSON framing used by browser native-messaging hosts:
//! a 4-byte native-endian length followed by that many bytes of UTF-8 JSON.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::AppError;

/// Browsers refuse host messages above 1 MiB.
pub const MAX_OUTBOUND_BYTES: usize = 1024 * 1024;
/// Browsers never send more than 64 MiB.
pub const MAX_INBOUND_BYTES: usize = 64 * 1024 * 1024;

/// Read one message. `Ok(None)` only when the stream ends on a frame boundary.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, AppError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        match reader.read(&mut prefix[filled..]).await? {
            0 if filled == 0 => return Ok(None),
            0 => {
                return Err(AppError::Transport(format!(
                    "Connection closed after {} of 4 length bytes",
                    filled
                )))
            }
            n => filled += n,
        }
    }

    let len = u32::from_ne_bytes(prefix) as usize;
    if len > MAX_INBOUND_BYTES {
        return Err(AppError::Transport(format!(
            "Inbound message of {} bytes exceeds limit",
            len
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(serde_json::from_slice(&body)?))
}

/// Length prefix plus JSON body, or an error if the frame is over the
/// outbound limit. Nothing is written in that case.
pub fn encode_message<T: Serialize>(message: &T) -> Result<Vec<u8>, AppError> {
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_OUTBOUND_BYTES {
        return Err(AppError::Transport(format!(
            "Outbound message of {} bytes exceeds limit",
            body.len()
        )));
    }

    let mut frame = Vec::with_capacity(body.len() + 4);
    frame.extend_from_slice(&(body.len() as u32).to_ne_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_message(message)?;
    write_frame(writer, &frame).await
}
