//! Bidirectional byte pump between a paired sender and receiver websocket.
//!
//! Forwards text and binary frames untouched in both directions, preserving
//! per-direction order. A close frame from either side is relayed to the
//! other with the same code before both halves stop.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::debug;

use peerhop_core::relay_proto::close_code;

pub async fn pump_pair(sender: WebSocket, receiver: WebSocket) {
    let (s_tx, s_rx) = sender.split();
    let (r_tx, r_rx) = receiver.split();

    tokio::join!(forward("sender->receiver", s_rx, r_tx), forward("receiver->sender", r_rx, s_tx));
}

async fn forward(
    label: &str,
    mut from: futures_util::stream::SplitStream<WebSocket>,
    mut to: futures_util::stream::SplitSink<WebSocket, Message>,
) {
    loop {
        let message = match from.next().await {
            Some(Ok(m)) => m,
            Some(Err(e)) => {
                debug!("{label}: read error, closing: {e}");
                let _ = to.send(close_message(close_code::PROTOCOL_ERROR, "peer read error")).await;
                break;
            }
            None => {
                let _ = to.send(close_message(close_code::NORMAL, "")).await;
                break;
            }
        };

        let stop = matches!(message, Message::Close(_));
        if to.send(message).await.is_err() {
            break;
        }
        if stop {
            debug!("{label}: close frame forwarded");
            break;
        }
    }
}

fn close_message(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }))
}
