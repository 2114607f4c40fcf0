//! Exercises the pairing arbiter directly over real TCP websockets, without
//! going through `peerhop-relay-client`, so the server's own contract (404
//! on an unknown pair code, pair-code uniqueness under concurrent senders)
//! is tested in isolation.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use http::Request;
use peerhop_core::envelope::ClientInfo;
use peerhop_relay_server::{build_router, RelayState};
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};

async fn spawn_relay() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(Arc::new(RelayState::new()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("ws://127.0.0.1:{}/ws", addr.port())
}

fn sender_request(url: &str, share_code: &str) -> Request<()> {
    let info = ClientInfo::sign([1u8; 32], share_code);
    let mut req = Request::builder().uri(url).body(()).unwrap();
    info.add_to_headers(req.headers_mut());
    req
}

#[tokio::test]
async fn receiver_with_unknown_pair_code_gets_404() {
    let url = spawn_relay().await;
    let req = Request::builder().uri(format!("{url}?pubkey=x&salt=y&hmac=z&paircode=9999")).body(()).unwrap();

    let err = connect_async(req).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("404") || message.contains("Not Found"), "unexpected error: {message}");
}

#[tokio::test]
async fn concurrent_senders_receive_distinct_pair_codes() {
    let url = spawn_relay().await;

    let (ws_a, resp_a) = connect_async(sender_request(&url, "ApplePear42")).await.unwrap();
    let (ws_b, resp_b) = connect_async(sender_request(&url, "BananaMango7")).await.unwrap();

    let code_a = resp_a.headers().get(peerhop_core::envelope::PAIRCODE_HEADER).unwrap().to_str().unwrap().to_string();
    let code_b = resp_b.headers().get(peerhop_core::envelope::PAIRCODE_HEADER).unwrap().to_str().unwrap().to_string();

    assert_ne!(code_a, code_b);

    drop(ws_a);
    drop(ws_b);
}

#[tokio::test]
async fn pump_forwards_text_frames_in_order() {
    let url = spawn_relay().await;
    let share_code = "ApplePear42";

    let (mut sender_ws, resp) = connect_async(sender_request(&url, share_code)).await.unwrap();
    let pair_code = resp.headers().get(peerhop_core::envelope::PAIRCODE_HEADER).unwrap().to_str().unwrap().to_string();

    let receiver_info = ClientInfo::sign([2u8; 32], share_code);
    let receiver_url = format!("{url}?{}&paircode={pair_code}", receiver_info.to_query());
    let receiver_req = Request::builder().uri(&receiver_url).body(()).unwrap();
    let (mut receiver_ws, _resp) = connect_async(receiver_req).await.unwrap();

    sender_ws.send(Message::Text("one".to_string())).await.unwrap();
    sender_ws.send(Message::Text("two".to_string())).await.unwrap();

    let first = receiver_ws.next().await.unwrap().unwrap();
    let second = receiver_ws.next().await.unwrap().unwrap();

    assert_eq!(first, Message::Text("one".to_string()));
    assert_eq!(second, Message::Text("two".to_string()));
}
