//! Shared error taxonomy for the peerhop protocol stack.
//!
//! Every crate in the workspace (LAN transport, relay client, relay server)
//! returns `PeerhopError` from its fallible protocol operations so that the
//! CLI binaries can match on `kind()` to decide exit codes and close codes,
//! per the policy table in the specification.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeerhopError {
    /// Bad CLI input or missing file/message — caller's fault, no network I/O attempted yet.
    #[error("input error: {0}")]
    Input(String),

    /// Malformed envelope, unexpected message route, short datagram, bad framing.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// HMAC verification failed.
    #[error("authentication error: peer HMAC did not verify")]
    Authentication,

    /// AEAD tag mismatch on open.
    #[error("crypto error: AEAD open failed")]
    Crypto,

    /// Source ended before the declared total was reached.
    #[error("truncated stream: sender stopped sending")]
    TruncatedStream,

    /// Underlying I/O failure (socket, file, etc).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Relay sender-wait timed out.
    #[error("timeout error: no receiver arrived in time")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, PeerhopError>;
