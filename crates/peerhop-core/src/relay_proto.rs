//! Relay text-frame routing: `"<route>\n<json>"`.
//!
//! Shared between `peerhop-relay-server` and `peerhop-relay-client` so both
//! sides agree on exactly one encode/decode path for the handshake and
//! size messages that ride the relay's text frames.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{PeerhopError, Result};

pub const ROUTE_PAIR_CODE: &str = "pairCode";
pub const ROUTE_SENDER_INFO: &str = "senderInfo";
pub const ROUTE_RECEIVER_INFO: &str = "receiverInfo";
pub const ROUTE_SIZE: &str = "size";

/// Encode a text frame body as `"<route>\n<json>"`.
pub fn encode_message<T: Serialize>(route: &str, payload: &T) -> Result<String> {
    let json = serde_json::to_string(payload)
        .map_err(|e| PeerhopError::Protocol(format!("failed to encode {route}: {e}")))?;
    Ok(format!("{route}\n{json}"))
}

/// Split a text frame into its route and the raw JSON payload that follows it.
pub fn parse_message(message: &str) -> Result<(&str, &str)> {
    message
        .split_once('\n')
        .ok_or_else(|| PeerhopError::Protocol("malformed text frame: missing route separator".into()))
}

/// Parse a text frame, requiring it to be on `expected_route`, and decode its JSON payload.
pub fn expect_route<T: DeserializeOwned>(message: &str, expected_route: &str) -> Result<T> {
    let (route, data) = parse_message(message)?;
    if route != expected_route {
        return Err(PeerhopError::Protocol(format!(
            "unexpected message route: expected {expected_route}, got {route}"
        )));
    }
    serde_json::from_str(data).map_err(|e| PeerhopError::Protocol(format!("failed to decode {expected_route}: {e}")))
}

/// Close codes used on the relay websocket, per the wire spec.
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const PROTOCOL_ERROR: u16 = 1002;
    pub const TIMED_OUT: u16 = 3000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_message_round_trips() {
        let msg = encode_message(ROUTE_SIZE, &12345i64).unwrap();
        assert_eq!(msg, "size\n12345");
        let size: i64 = expect_route(&msg, ROUTE_SIZE).unwrap();
        assert_eq!(size, 12345);
    }

    #[test]
    fn wrong_route_is_rejected() {
        let msg = encode_message(ROUTE_SIZE, &1i64).unwrap();
        let err = expect_route::<i64>(&msg, ROUTE_SENDER_INFO).unwrap_err();
        assert!(matches!(err, PeerhopError::Protocol(_)));
    }

    #[test]
    fn missing_separator_is_rejected() {
        assert!(parse_message("nosep").is_err());
    }
}
