//! Message-framed AEAD encrypt/decrypt loop for the relay transport.
//!
//! Each websocket binary message is exactly one AEAD frame — both peers
//! chunk to the same `CHUNK_SIZE` window, so there is no re-chunking to do
//! once a message arrives; this mirrors §4.2's termination rule
//! (cumulative-plaintext-byte-count) without forcing the frame loop through
//! a byte-oriented `AsyncRead`/`AsyncWrite` adapter.

use futures_util::{SinkExt, StreamExt};
use peerhop_core::crypto::{AeadSession, TAG_LEN};
use peerhop_core::error::{PeerhopError, Result};
use peerhop_core::stream::CHUNK_SIZE;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

/// Read fixed `CHUNK_SIZE` plaintext windows from `reader`, seal each, and
/// send it as one binary websocket message, stopping once `total`
/// cumulative plaintext bytes have been read.
pub async fn send_frames<S, R>(ws: &mut WebSocketStream<S>, reader: &mut R, session: &mut AeadSession, total: u64) -> Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let mut remaining = total;
    let mut buf = vec![0u8; CHUNK_SIZE];

    while remaining > 0 {
        let want = std::cmp::min(remaining, CHUNK_SIZE as u64) as usize;
        match reader.read_exact(&mut buf[..want]).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(PeerhopError::TruncatedStream),
            Err(e) => return Err(PeerhopError::Transport(e)),
        }

        let ciphertext = session.seal(&buf[..want])?;
        ws.send(Message::Binary(ciphertext))
            .await
            .map_err(|e| PeerhopError::Protocol(format!("websocket send failed: {e}")))?;

        remaining -= want as u64;
    }

    Ok(())
}

/// Receive binary websocket messages, open each with `session`, and write
/// the plaintext to `writer`, stopping once `total` cumulative plaintext
/// bytes have been produced.
pub async fn receive_frames<S, W>(ws: &mut WebSocketStream<S>, writer: &mut W, session: &mut AeadSession, total: u64) -> Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut remaining = total;

    while remaining > 0 {
        let want_plain = std::cmp::min(remaining, CHUNK_SIZE as u64) as usize;
        let expected_len = want_plain + TAG_LEN;

        let message = ws
            .next()
            .await
            .ok_or_else(|| PeerhopError::TruncatedStream)?
            .map_err(|e| PeerhopError::Protocol(format!("websocket recv failed: {e}")))?;

        let ciphertext = match message {
            Message::Binary(data) => data,
            Message::Close(_) => return Err(PeerhopError::TruncatedStream),
            other => {
                return Err(PeerhopError::Protocol(format!(
                    "unexpected message type during transfer: {other:?}"
                )))
            }
        };

        if ciphertext.len() != expected_len {
            return Err(PeerhopError::Protocol(format!(
                "frame length mismatch: expected {expected_len}, got {}",
                ciphertext.len()
            )));
        }

        let plaintext = session.open(&ciphertext)?;
        writer.write_all(&plaintext).await?;

        remaining -= want_plain as u64;
    }

    Ok(())
}
