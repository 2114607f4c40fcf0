//! LAN UDP broadcast discovery state machine.
//!
//! `IDLE -> EMITTING <-> LISTENING -> PAIRED -> CLOSED`. Both roles bind the
//! shared port on all interfaces and exchange the same 112-byte envelope
//! datagram; the only asymmetry is *when* each side starts pinging.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use peerhop_core::crypto::PUBKEY_LEN;
use peerhop_core::envelope::ClientInfo;
use peerhop_core::error::{PeerhopError, Result};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::model::DiscoverResponse;
use crate::net::broadcast_addresses;

/// Minimum valid discovery datagram length: `32 + 16 + 64`.
const MIN_DATAGRAM_LEN: usize = PUBKEY_LEN + 16 + 64;

pub struct DiscoveryService {
    socket: Arc<UdpSocket>,
    local_pubkey: [u8; PUBKEY_LEN],
    share_code: String,
    datagram: Vec<u8>,
    port: u16,
    closed: AtomicBool,
    ping_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl DiscoveryService {
    /// Bind a UDP socket on `port`, all interfaces, and prepare this side's
    /// envelope datagram.
    pub async fn bind(port: u16, local_pubkey: [u8; PUBKEY_LEN], share_code: String) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        socket.set_broadcast(true)?;

        let info = ClientInfo::sign(local_pubkey, &share_code);
        let datagram = info.to_datagram();

        Ok(Self {
            socket: Arc::new(socket),
            local_pubkey,
            share_code,
            datagram,
            port,
            closed: AtomicBool::new(false),
            ping_task: std::sync::Mutex::new(None),
        })
    }

    /// Receiver role: broadcast on every up/running/broadcast-capable
    /// interface once per second until the sender's datagram arrives.
    pub async fn discover_sender(&self) -> Result<DiscoverResponse> {
        let addrs = broadcast_addresses(self.port).map_err(PeerhopError::Transport)?;
        self.spawn_pings(addrs);
        self.listen_for_message().await
    }

    /// Sender role: listen passively first (no broadcast storm from the
    /// sender side); once the receiver's ping arrives, narrow to pinging
    /// just that address back so the receiver's own wait can complete.
    pub async fn wait_for_receiver(&self) -> Result<DiscoverResponse> {
        let response = self.listen_for_message().await?;
        self.spawn_pings(vec![response.remote_addr]);
        Ok(response)
    }

    fn spawn_pings(&self, addrs: Vec<SocketAddr>) {
        let socket = self.socket.clone();
        let datagram = self.datagram.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            loop {
                ticker.tick().await;
                for addr in &addrs {
                    let _ = socket.send_to(&datagram, addr).await;
                }
            }
        });

        let mut slot = self.ping_task.lock().unwrap();
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    async fn listen_for_message(&self) -> Result<DiscoverResponse> {
        let mut buf = [0u8; 1024];
        loop {
            let (n, addr) = self.socket.recv_from(&mut buf).await?;
            if n < MIN_DATAGRAM_LEN {
                debug!("dropping short discovery datagram ({n} bytes) from {addr}");
                continue;
            }

            let Some(info) = ClientInfo::from_datagram(&buf[..n]) else {
                continue;
            };

            let Ok(pubkey) = info.pubkey_array() else {
                continue;
            };

            match info.verify(&self.share_code) {
                Ok(true) => {}
                _ => {
                    debug!("dropping discovery datagram with invalid hmac from {addr}");
                    continue;
                }
            }

            if pubkey == self.local_pubkey {
                // Self-echo: our own broadcast looped back.
                continue;
            }

            return Ok(DiscoverResponse {
                remote_addr: addr,
                remote_pubkey: pubkey,
            });
        }
    }

    /// Idempotent: stops the ping task and leaves the socket to be dropped.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.ping_task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for DiscoveryService {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerhop_core::crypto::generate_ephemeral;

    #[tokio::test]
    async fn two_peers_on_loopback_find_each_other_by_unicast_ping() {
        // Discovery normally broadcasts; here we exercise the validation and
        // self-echo logic directly over two bound sockets pinging each
        // other's known address, since loopback interfaces don't carry a
        // broadcast address in `net::broadcast_addresses`.
        let (_secret_a, pub_a) = generate_ephemeral();
        let (_secret_b, pub_b) = generate_ephemeral();
        let pub_a = *pub_a.as_bytes();
        let pub_b = *pub_b.as_bytes();

        let share_code = "ApplePear42".to_string();
        let service_a = DiscoveryService::bind(0, pub_a, share_code.clone()).await.unwrap();
        let service_b = DiscoveryService::bind(0, pub_b, share_code.clone()).await.unwrap();

        let addr_a = service_a.socket.local_addr().unwrap();
        let addr_b = service_b.socket.local_addr().unwrap();

        service_a.spawn_pings(vec![addr_b]);
        service_b.spawn_pings(vec![addr_a]);

        let response = tokio::time::timeout(Duration::from_secs(5), service_b.listen_for_message())
            .await
            .expect("timed out waiting for discovery")
            .unwrap();

        assert_eq!(response.remote_pubkey, pub_a);
        assert_eq!(response.remote_addr.ip(), addr_a.ip());

        service_a.close();
        service_b.close();
    }

    #[tokio::test]
    async fn self_echo_is_ignored() {
        let (_secret, pub_a) = generate_ephemeral();
        let pub_a = *pub_a.as_bytes();
        let share_code = "ApplePear42".to_string();
        let service = DiscoveryService::bind(0, pub_a, share_code.clone()).await.unwrap();
        let addr = service.socket.local_addr().unwrap();

        service.socket.send_to(&service.datagram, addr).await.unwrap();

        let result = tokio::time::timeout(Duration::from_millis(200), service.listen_for_message()).await;
        assert!(result.is_err(), "self-echoed datagram should have been dropped, not returned");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (_secret, pub_a) = generate_ephemeral();
        let service = DiscoveryService::bind(0, *pub_a.as_bytes(), "code".into()).await.unwrap();
        service.close();
        service.close();
    }
}
