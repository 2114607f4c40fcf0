//! Chunked AEAD stream: the length-free record format shared by the LAN TCP
//! transfer and the relay binary-frame transfer. Both call sites provide an
//! `AsyncRead`/`AsyncWrite` — the LAN side a `TcpStream` directly, the relay
//! side a small message-to-byte-stream adapter — and this module knows
//! nothing about sockets or websockets.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::crypto::{AeadSession, TAG_LEN};
use crate::error::{PeerhopError, Result};

/// Fixed plaintext window per frame. The final frame may be shorter
/// (including zero length).
pub const CHUNK_SIZE: usize = 16384;

/// Number of `CHUNK_SIZE`-frames needed to carry `total` plaintext bytes
/// (zero for `total == 0`), per the frame-count invariant.
pub fn frame_count(total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        (total + CHUNK_SIZE as u64 - 1) / CHUNK_SIZE as u64
    }
}

/// Read fixed `CHUNK_SIZE` plaintext windows from `reader`, seal each with
/// `session`, and write the ciphertext to `writer`, stopping as soon as
/// `total` cumulative plaintext bytes have been read. If `reader` ends
/// before `total` is reached the underlying read failure is propagated —
/// the sender must never emit a short chunk that would leave the receiver
/// short.
pub async fn encrypt_stream<R, W>(
    reader: &mut R,
    writer: &mut W,
    session: &mut AeadSession,
    total: u64,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut remaining = total;
    let mut buf = vec![0u8; CHUNK_SIZE];

    while remaining > 0 {
        let want = std::cmp::min(remaining, CHUNK_SIZE as u64) as usize;
        read_exact_or_truncated(reader, &mut buf[..want]).await?;

        let ciphertext = session.seal(&buf[..want])?;
        writer.write_all(&ciphertext).await?;

        remaining -= want as u64;
    }

    writer.flush().await?;
    Ok(())
}

/// Read `CHUNK_SIZE + 16`-byte ciphertext frames from `reader`, open each
/// with `session`, and write the plaintext to `writer`, stopping as soon as
/// `total` cumulative plaintext bytes have been produced.
pub async fn decrypt_stream<R, W>(
    reader: &mut R,
    writer: &mut W,
    session: &mut AeadSession,
    total: u64,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut remaining = total;
    let mut buf = vec![0u8; CHUNK_SIZE + TAG_LEN];

    while remaining > 0 {
        let want_plain = std::cmp::min(remaining, CHUNK_SIZE as u64) as usize;
        let frame_len = want_plain + TAG_LEN;
        read_exact_or_truncated(reader, &mut buf[..frame_len]).await?;

        let plaintext = session.open(&buf[..frame_len])?;
        if plaintext.len() != want_plain {
            return Err(PeerhopError::Protocol("frame plaintext length mismatch".into()));
        }
        writer.write_all(&plaintext).await?;

        remaining -= want_plain as u64;
    }

    writer.flush().await?;
    Ok(())
}

/// `read_exact`, but end-of-source before the buffer fills is reported as
/// `TruncatedStream` rather than a bare I/O error, since at this call site
/// it always means the sender stopped before covering the declared total.
async fn read_exact_or_truncated<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> Result<()> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(PeerhopError::TruncatedStream),
        Err(e) => Err(PeerhopError::Transport(e)),
    }
}
