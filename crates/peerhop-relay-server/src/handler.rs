//! The `/ws` upgrade endpoint: dispatches to the sender or receiver path
//! based on whether a pair code is present.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use peerhop_core::envelope::ClientInfo;

use crate::pump::pump_pair;
use crate::state::RelayState;

pub async fn ws_handler(
    State(state): State<Arc<RelayState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let query = query.unwrap_or_default();
    let paircode_from_query = ClientInfo::paircode_from_query(&query);
    let paircode_from_header = headers
        .get(peerhop_core::envelope::PAIRCODE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match paircode_from_header.or(paircode_from_query) {
        None => sender_upgrade(state, headers, ws),
        Some(code) => receiver_upgrade(state, query, code, ws),
    }
}

fn sender_upgrade(state: Arc<RelayState>, headers: HeaderMap, ws: WebSocketUpgrade) -> Response {
    let info = match ClientInfo::from_headers(&headers) {
        Ok(info) => info,
        Err(e) => {
            warn!("rejecting sender dial: {e}");
            return (StatusCode::BAD_REQUEST, "error parsing sender headers").into_response();
        }
    };

    let code = state.reserve_code();

    let mut response = ws.on_upgrade({
        let code = code.clone();
        move |socket| async move {
            // The socket is parked in the pairing table here, not pumped,
            // until a receiver claims the pair code.
            state.finalize_sender(&code, info, socket);
            info!("sender parked under pair code {code}");
        }
    });
    response
        .headers_mut()
        .insert(peerhop_core::envelope::PAIRCODE_HEADER, code.parse().expect("digits are valid header values"));
    response
}

fn receiver_upgrade(state: Arc<RelayState>, query: String, code: String, ws: WebSocketUpgrade) -> Response {
    let Some(pending) = state.take_sender(&code) else {
        warn!("no sender found for pair code {code}");
        return (StatusCode::NOT_FOUND, "no sender found").into_response();
    };

    if ClientInfo::from_query(&query).is_err() {
        warn!("rejecting receiver dial: malformed envelope query");
        return (StatusCode::BAD_REQUEST, "error parsing receiver query").into_response();
    }

    let mut response = ws.on_upgrade(move |socket| async move {
        info!("receiver claimed pair code {code}, pumping");
        pump_pair(pending.socket, socket).await;
    });
    pending.info.add_to_headers(response.headers_mut());
    response
}
