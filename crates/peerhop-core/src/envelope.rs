//! `ClientInfo` — the `(pubkey, salt, hmac)` triple that authenticates an
//! ephemeral public key to a peer who knows the share code — and its two
//! transport encodings: HTTP headers (relay websocket upgrade) and URL
//! query parameters (relay dial).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::crypto::{self, HMAC_TAG_LEN, PUBKEY_LEN, SALT_LEN};
use crate::error::{PeerhopError, Result};

pub const PUBKEY_HEADER: &str = "X-FS-PUBKEY";
pub const SALT_HEADER: &str = "X-FS-SALT";
pub const HMAC_HEADER: &str = "X-FS-HMAC";
pub const PAIRCODE_HEADER: &str = "X-FS-PAIRCODE";

/// The envelope carried over the wire: an ephemeral public key, the salt
/// used to derive its HMAC key, and the HMAC tag itself. JSON-serializable
/// form only (used inside `senderInfo`/`receiverInfo` relay text frames);
/// the header/query encodings are hand-rolled below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(with = "base64_bytes")]
    pub pubkey: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub salt: Vec<u8>,
    #[serde(with = "base64_bytes")]
    pub hmac: Vec<u8>,
}

impl ClientInfo {
    pub fn new(pubkey: [u8; PUBKEY_LEN], salt: [u8; SALT_LEN], hmac: [u8; HMAC_TAG_LEN]) -> Self {
        Self {
            pubkey: pubkey.to_vec(),
            salt: salt.to_vec(),
            hmac: hmac.to_vec(),
        }
    }

    /// Build the envelope for a freshly-generated ephemeral keypair and a share code.
    pub fn sign(pubkey: [u8; PUBKEY_LEN], share_code: &str) -> Self {
        let salt = crypto::generate_salt();
        let tag = crypto::sign_info(&pubkey, share_code, &salt);
        Self::new(pubkey, salt, tag)
    }

    pub fn pubkey_array(&self) -> Result<[u8; PUBKEY_LEN]> {
        self.pubkey
            .as_slice()
            .try_into()
            .map_err(|_| PeerhopError::Protocol("pubkey has wrong length".into()))
    }

    pub fn salt_array(&self) -> Result<[u8; SALT_LEN]> {
        self.salt
            .as_slice()
            .try_into()
            .map_err(|_| PeerhopError::Protocol("salt has wrong length".into()))
    }

    pub fn hmac_array(&self) -> Result<[u8; HMAC_TAG_LEN]> {
        self.hmac
            .as_slice()
            .try_into()
            .map_err(|_| PeerhopError::Protocol("hmac has wrong length".into()))
    }

    /// Verify this envelope's HMAC tag against a share code.
    pub fn verify(&self, share_code: &str) -> Result<bool> {
        Ok(crypto::verify_info(
            &self.pubkey_array()?,
            &self.hmac_array()?,
            share_code,
            &self.salt_array()?,
        ))
    }

    /// Encode this envelope as a 112-byte `pubkey || salt || hmac` datagram
    /// for the LAN UDP discovery protocol.
    pub fn to_datagram(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PUBKEY_LEN + SALT_LEN + HMAC_TAG_LEN);
        out.extend_from_slice(&self.pubkey);
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.hmac);
        out
    }

    /// Decode a 112-byte LAN discovery datagram. Drops (returns `None`) on
    /// any length mismatch per spec — short datagrams are noise, not errors.
    pub fn from_datagram(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < PUBKEY_LEN + SALT_LEN + HMAC_TAG_LEN {
            return None;
        }
        let pubkey = bytes[..PUBKEY_LEN].to_vec();
        let salt = bytes[PUBKEY_LEN..PUBKEY_LEN + SALT_LEN].to_vec();
        let hmac = bytes[PUBKEY_LEN + SALT_LEN..PUBKEY_LEN + SALT_LEN + HMAC_TAG_LEN].to_vec();
        Some(Self { pubkey, salt, hmac })
    }

    /// Add this envelope to an HTTP header map (relay websocket upgrade).
    pub fn add_to_headers(&self, headers: &mut HeaderMap) {
        headers.insert(PUBKEY_HEADER, encode(&self.pubkey).parse().unwrap());
        headers.insert(SALT_HEADER, encode(&self.salt).parse().unwrap());
        headers.insert(HMAC_HEADER, encode(&self.hmac).parse().unwrap());
    }

    /// Parse an envelope back out of an HTTP header map.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let pubkey = header_str(headers, PUBKEY_HEADER)?;
        let salt = header_str(headers, SALT_HEADER)?;
        let hmac = header_str(headers, HMAC_HEADER)?;

        Ok(Self {
            pubkey: decode(pubkey)?,
            salt: decode(salt)?,
            hmac: decode(hmac)?,
        })
    }

    /// Encode this envelope as URL query parameters (`pubkey|salt|hmac`, plus
    /// `paircode` when present — pair code is appended by the caller).
    pub fn to_query(&self) -> String {
        format!(
            "pubkey={}&salt={}&hmac={}",
            urlencoding_safe(&encode(&self.pubkey)),
            urlencoding_safe(&encode(&self.salt)),
            urlencoding_safe(&encode(&self.hmac)),
        )
    }

    /// Parse an envelope back out of a URL query string.
    pub fn from_query(query: &str) -> Result<Self> {
        let parsed = url::form_urlencoded::parse(query.as_bytes());
        let mut pubkey = None;
        let mut salt = None;
        let mut hmac = None;

        for (key, value) in parsed {
            match key.as_ref() {
                "pubkey" => pubkey = Some(value.into_owned()),
                "salt" => salt = Some(value.into_owned()),
                "hmac" => hmac = Some(value.into_owned()),
                _ => {}
            }
        }

        let pubkey = pubkey.ok_or_else(|| PeerhopError::Protocol("missing pubkey query param".into()))?;
        let salt = salt.ok_or_else(|| PeerhopError::Protocol("missing salt query param".into()))?;
        let hmac = hmac.ok_or_else(|| PeerhopError::Protocol("missing hmac query param".into()))?;

        Ok(Self {
            pubkey: decode(&pubkey)?,
            salt: decode(&salt)?,
            hmac: decode(&hmac)?,
        })
    }

    /// Read the pair code out of a query string, if present.
    pub fn paircode_from_query(query: &str) -> Option<String> {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == "paircode")
            .map(|(_, v)| v.into_owned())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str> {
    headers
        .get(name)
        .ok_or_else(|| PeerhopError::Protocol(format!("missing header {name}")))?
        .to_str()
        .map_err(|_| PeerhopError::Protocol(format!("header {name} is not valid ASCII")))
}

fn encode(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

fn decode(s: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(s)
        .map_err(|e| PeerhopError::Protocol(format!("invalid base64: {e}")))
}

fn urlencoding_safe(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

mod base64_bytes {
    use super::{decode, encode};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Vec<u8>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClientInfo {
        ClientInfo::sign([3u8; PUBKEY_LEN], "ApplePear42")
    }

    #[test]
    fn header_codec_round_trips() {
        let info = sample();
        let mut headers = HeaderMap::new();
        info.add_to_headers(&mut headers);

        let parsed = ClientInfo::from_headers(&headers).unwrap();
        assert_eq!(parsed.pubkey, info.pubkey);
        assert_eq!(parsed.salt, info.salt);
        assert_eq!(parsed.hmac, info.hmac);
    }

    #[test]
    fn query_codec_round_trips() {
        let info = sample();
        let query = info.to_query();
        let parsed = ClientInfo::from_query(&query).unwrap();
        assert_eq!(parsed.pubkey, info.pubkey);
        assert_eq!(parsed.salt, info.salt);
        assert_eq!(parsed.hmac, info.hmac);
    }

    #[test]
    fn datagram_round_trips_and_rejects_short() {
        let info = sample();
        let datagram = info.to_datagram();
        assert_eq!(datagram.len(), PUBKEY_LEN + SALT_LEN + HMAC_TAG_LEN);

        let parsed = ClientInfo::from_datagram(&datagram).unwrap();
        assert_eq!(parsed.pubkey, info.pubkey);

        assert!(ClientInfo::from_datagram(&datagram[..100]).is_none());
    }

    #[test]
    fn json_route_payload_round_trips() {
        let info = sample();
        let json = serde_json::to_string(&info).unwrap();
        let parsed: ClientInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.pubkey, info.pubkey);
        assert_eq!(parsed.hmac, info.hmac);
    }

    #[test]
    fn paircode_extracted_from_query() {
        assert_eq!(ClientInfo::paircode_from_query("paircode=4821"), Some("4821".to_string()));
        assert_eq!(ClientInfo::paircode_from_query("pubkey=x"), None);
    }
}
