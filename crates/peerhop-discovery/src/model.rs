use std::net::SocketAddr;

/// What discovery hands back to the transfer layer: where the peer is, and
/// its ephemeral public key (already HMAC-verified).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverResponse {
    pub remote_addr: SocketAddr,
    pub remote_pubkey: [u8; peerhop_core::crypto::PUBKEY_LEN],
}
