//! Relay-mode (websocket) sender and receiver clients.
//!
//! Used when direct LAN discovery fails or is skipped (`--web`): both peers
//! dial a shared arbiter instead of each other.

mod client;
mod frames;

pub use client::{connect_receiver, connect_sender, RelayHandle};
