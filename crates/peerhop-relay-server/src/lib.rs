//! peerhop relay arbiter: axum router plus the pairing table it shares
//! across requests. Split out from `main.rs` so integration tests (and the
//! relay client's own tests) can spin up a real instance in-process.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message};
use axum::routing::get;
use axum::Router;
use tracing::info;

mod handler;
mod pump;
mod state;

pub use state::{RelayState, PAIR_CODE_TTL, SWEEP_INTERVAL};

pub fn build_router(state: Arc<RelayState>) -> Router {
    Router::new().route("/ws", get(handler::ws_handler)).with_state(state)
}

/// Periodically evict sender connections that waited longer than the pair
/// code TTL without a receiver claiming them, closing each with code 3000.
pub async fn run_expiry_sweep(state: Arc<RelayState>) {
    use futures_util::SinkExt;
    use peerhop_core::relay_proto::close_code;

    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        for expired in state.sweep_expired() {
            info!("pair code expired without a receiver, closing sender");
            let mut socket = expired.socket;
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::TIMED_OUT,
                    reason: "no receiver connected within the pairing window".into(),
                })))
                .await;
        }
    }
}
