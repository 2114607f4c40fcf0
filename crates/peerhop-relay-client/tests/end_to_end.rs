//! Full sender/receiver handshake and transfer against a real in-process
//! relay arbiter, bound to an ephemeral loopback port.

use std::sync::Arc;

use peerhop_relay_client::{connect_receiver, connect_sender};
use peerhop_relay_server::{build_router, RelayState};
use tokio::net::TcpListener;

async fn spawn_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(Arc::new(RelayState::new()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("127.0.0.1:{}", addr.port())
}

#[tokio::test]
async fn sender_and_receiver_negotiate_matching_session_and_stream_data() {
    let base_url = spawn_relay().await;
    let share_code = "ApplePear42";
    let (pair_code_tx, pair_code_rx) = tokio::sync::oneshot::channel();

    let sender_task = tokio::spawn({
        let base_url = base_url.clone();
        let share_code = share_code.to_string();
        async move {
            let mut handle = connect_sender(&base_url, true, &share_code, pair_code_tx).await.unwrap();
            let payload = b"hello from the sender".to_vec();
            handle.send_size(payload.len() as u64).await.unwrap();
            let mut reader = std::io::Cursor::new(payload);
            handle.send_frames(&mut reader, "hello from the sender".len() as u64).await.unwrap();
            handle.close_normal().await.unwrap();
        }
    });

    let pair_code = pair_code_rx.await.unwrap();
    let mut handle = connect_receiver(&base_url, true, &format!("{share_code}{pair_code}")).await.unwrap();
    let total = handle.recv_size().await.unwrap();
    let mut out = Vec::new();
    handle.receive_frames(&mut out, total).await.unwrap();

    sender_task.await.unwrap();
    assert_eq!(out, b"hello from the sender");
}

#[tokio::test]
async fn receiver_with_wrong_share_code_fails_verification() {
    let base_url = spawn_relay().await;
    let (pair_code_tx, pair_code_rx) = tokio::sync::oneshot::channel();

    let sender_task = tokio::spawn({
        let base_url = base_url.clone();
        async move {
            let result = connect_sender(&base_url, true, "ApplePear42", pair_code_tx).await;
            // The sender's own handshake fails too, since the receiver's
            // envelope was signed with a different share code.
            assert!(result.is_err());
        }
    });

    let pair_code = pair_code_rx.await.unwrap();
    let result = connect_receiver(&base_url, true, &format!("WrongCode{pair_code}")).await;
    assert!(result.is_err());

    sender_task.await.unwrap();
}
