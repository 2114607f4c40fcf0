//! peerhop-core — crypto primitives, handshake envelope, and the chunked
//! AEAD stream shared by the LAN and relay transports.

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod relay_proto;
pub mod stream;
pub mod varint;

pub use envelope::ClientInfo;
pub use error::{PeerhopError, Result};
