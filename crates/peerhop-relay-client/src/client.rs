//! Relay websocket dial and handshake for both roles.
//!
//! Both peers reach the arbiter at `/ws`. The sender dials first, carrying
//! its envelope as request headers; the arbiter allocates a pair code and
//! returns it on the upgrade response (`X-FS-PAIRCODE`). The receiver dials
//! with its own envelope as query parameters plus the pair code, and learns
//! the sender's envelope back via the same response-header channel the pair
//! code used. From there the receiver always announces itself over a
//! `receiverInfo` text frame, since only the arbiter (not the receiver) is in
//! a position to set response headers.

use futures_util::{SinkExt, StreamExt};
use http::Request;
use peerhop_core::crypto::{self, AeadSession};
use peerhop_core::envelope::{ClientInfo, PAIRCODE_HEADER};
use peerhop_core::error::{PeerhopError, Result};
use peerhop_core::relay_proto::{self, close_code, ROUTE_RECEIVER_INFO, ROUTE_SIZE};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use crate::frames;

pub type RelaySocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A connected relay session, ready to stream frames once the handshake has
/// negotiated a session key.
pub struct RelayHandle {
    pub(crate) ws: RelaySocket,
    pub session: AeadSession,
}

impl RelayHandle {
    pub async fn send_size(&mut self, total: u64) -> Result<()> {
        let msg = relay_proto::encode_message(ROUTE_SIZE, &(total as i64))?;
        self.ws
            .send(Message::Text(msg))
            .await
            .map_err(|e| PeerhopError::Protocol(format!("failed to send size frame: {e}")))
    }

    pub async fn recv_size(&mut self) -> Result<u64> {
        let text = self.next_text().await?;
        let total: i64 = relay_proto::expect_route(&text, ROUTE_SIZE)?;
        if total < 0 {
            return Err(PeerhopError::Protocol(format!("negative transfer size: {total}")));
        }
        Ok(total as u64)
    }

    pub async fn send_frames<R>(&mut self, reader: &mut R, total: u64) -> Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        frames::send_frames(&mut self.ws, reader, &mut self.session, total).await
    }

    pub async fn receive_frames<W>(&mut self, writer: &mut W, total: u64) -> Result<()>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        frames::receive_frames(&mut self.ws, writer, &mut self.session, total).await
    }

    pub async fn close_normal(mut self) -> Result<()> {
        self.send_close(close_code::NORMAL, "").await
    }

    pub async fn close_protocol_error(mut self, reason: &str) -> Result<()> {
        self.send_close(close_code::PROTOCOL_ERROR, reason).await
    }

    async fn send_close(&mut self, code: u16, reason: &str) -> Result<()> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        let _ = self.ws.send(Message::Close(Some(frame))).await;
        let _ = self.ws.close(None).await;
        Ok(())
    }

    async fn next_text(&mut self) -> Result<String> {
        match self.ws.next().await {
            Some(Ok(Message::Text(t))) => Ok(t),
            Some(Ok(Message::Close(_))) | None => Err(PeerhopError::Protocol("relay closed during handshake".into())),
            Some(Ok(other)) => Err(PeerhopError::Protocol(format!("unexpected message during handshake: {other:?}"))),
            Some(Err(e)) => Err(PeerhopError::Protocol(format!("websocket error during handshake: {e}"))),
        }
    }
}

fn ws_scheme(insecure: bool) -> &'static str {
    if insecure {
        "ws"
    } else {
        "wss"
    }
}

/// Dial the arbiter as the sender. `pair_code_tx` fires as soon as the pair
/// code is known, so the caller can display the share phrase to the user
/// immediately instead of waiting for the receiver to show up.
pub async fn connect_sender(
    base_url: &str,
    insecure: bool,
    share_code: &str,
    pair_code_tx: tokio::sync::oneshot::Sender<String>,
) -> Result<RelayHandle> {
    let (secret, public) = crypto::generate_ephemeral();
    let info = ClientInfo::sign(*public.as_bytes(), share_code);

    let uri = format!("{}://{}/ws", ws_scheme(insecure), base_url);
    let mut request = Request::builder()
        .uri(&uri)
        .body(())
        .map_err(|e| PeerhopError::Protocol(format!("invalid relay URL: {e}")))?;
    info.add_to_headers(request.headers_mut());

    let (ws, response) = connect_async(request)
        .await
        .map_err(|e| PeerhopError::Protocol(format!("failed to dial relay: {e}")))?;

    let pair_code = response
        .headers()
        .get(PAIRCODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| PeerhopError::Protocol("relay did not return a pair code".into()))?
        .to_string();
    debug!(pair_code, "sender received pair code from relay");
    let _ = pair_code_tx.send(pair_code.clone());

    let mut handle = RelayHandle {
        ws,
        session: AeadSession::new(&[0u8; crypto::SESSION_KEY_LEN], share_code),
    };

    let receiver_text = handle.next_text().await?;
    let receiver_info: ClientInfo = relay_proto::expect_route(&receiver_text, ROUTE_RECEIVER_INFO)?;

    if !receiver_info.verify(share_code)? {
        handle.close_protocol_error("receiver envelope failed verification").await?;
        return Err(PeerhopError::Authentication);
    }

    let receiver_pubkey = x25519_dalek::PublicKey::from(receiver_info.pubkey_array()?);
    let shared = secret.diffie_hellman(&receiver_pubkey);
    let session_key = crypto::derive_session_key(&shared, share_code);
    handle.session = AeadSession::new(&session_key, share_code);

    info!("sender handshake complete, pair code {pair_code}");
    Ok(handle)
}

/// Dial the arbiter as the receiver, given the full share phrase (share code
/// plus trailing 4-digit pair code).
pub async fn connect_receiver(base_url: &str, insecure: bool, share_phrase: &str) -> Result<RelayHandle> {
    if share_phrase.len() <= 4 {
        return Err(PeerhopError::Input("share phrase is too short to contain a pair code".into()));
    }
    let split = share_phrase.len() - 4;
    let share_code = &share_phrase[..split];
    let pair_code = &share_phrase[split..];

    let (secret, public) = crypto::generate_ephemeral();
    let info = ClientInfo::sign(*public.as_bytes(), share_code);

    let uri = format!(
        "{}://{}/ws?{}&paircode={}",
        ws_scheme(insecure),
        base_url,
        info.to_query(),
        pair_code
    );
    let request = Request::builder()
        .uri(&uri)
        .body(())
        .map_err(|e| PeerhopError::Protocol(format!("invalid relay URL: {e}")))?;

    let (ws, response) = connect_async(request)
        .await
        .map_err(|e| PeerhopError::Protocol(format!("failed to dial relay: {e}")))?;

    let sender_info = ClientInfo::from_headers(response.headers())?;

    let mut handle = RelayHandle {
        ws,
        session: AeadSession::new(&[0u8; crypto::SESSION_KEY_LEN], share_code),
    };

    if !sender_info.verify(share_code)? {
        handle.close_protocol_error("sender envelope failed verification").await?;
        return Err(PeerhopError::Authentication);
    }

    let sender_pubkey = x25519_dalek::PublicKey::from(sender_info.pubkey_array()?);
    let shared = secret.diffie_hellman(&sender_pubkey);
    let session_key = crypto::derive_session_key(&shared, share_code);
    handle.session = AeadSession::new(&session_key, share_code);

    let announce = relay_proto::encode_message(ROUTE_RECEIVER_INFO, &info)?;
    handle
        .ws
        .send(Message::Text(announce))
        .await
        .map_err(|e| PeerhopError::Protocol(format!("failed to announce receiver info: {e}")))?;

    info!("receiver handshake complete");
    Ok(handle)
}
