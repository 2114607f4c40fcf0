use std::net::SocketAddr;

use anyhow::{Context, Result};

use peerhop_core::crypto::{derive_session_key, generate_ephemeral, AeadSession};
use peerhop_discovery::DiscoveryService;

use crate::cli::ReceiveArgs;
use crate::secret;

pub async fn run(args: ReceiveArgs) -> Result<()> {
    let share_code = match args.code {
        Some(code) => code,
        None => {
            println!("Waiting for sender...");
            secret::prompt("Enter share code: ").await?
        }
    };

    let data = if let Some(base_url) = &args.web {
        receive_via_relay(base_url, args.insecure_ws, &share_code).await?
    } else {
        receive_via_lan(args.port, &share_code).await?
    };

    match args.file {
        Some(path) => {
            tokio::fs::write(&path, &data)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Saved to {}", path.display());
        }
        None => {
            println!("Received data:");
            println!("{}", String::from_utf8_lossy(&data));
        }
    }

    Ok(())
}

async fn receive_via_lan(port: u16, share_code: &str) -> Result<Vec<u8>> {
    let (secret, public) = generate_ephemeral();
    let discovery = DiscoveryService::bind(port, *public.as_bytes(), share_code.to_string())
        .await
        .context("failed to bind LAN discovery socket")?;

    let response = discovery.discover_sender().await.context("LAN discovery failed")?;
    discovery.close();

    let peer_addr = SocketAddr::new(response.remote_addr.ip(), port);
    let mut conn = peerhop_transport_lan::connect_to(peer_addr)
        .await
        .context("failed to connect to sender")?;

    let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(response.remote_pubkey));
    let session_key = derive_session_key(&shared, share_code);
    let mut session = AeadSession::new(&session_key, share_code);

    let mut out = Vec::new();
    peerhop_transport_lan::receive(&mut conn, &mut out, &mut session)
        .await
        .context("LAN transfer failed")?;

    Ok(out)
}

async fn receive_via_relay(base_url: &str, insecure: bool, share_code: &str) -> Result<Vec<u8>> {
    let mut handle = peerhop_relay_client::connect_receiver(base_url, insecure, share_code)
        .await
        .context("relay receiver handshake failed")?;

    let total = handle.recv_size().await.context("failed to read transfer size")?;
    let mut out = Vec::new();
    handle.receive_frames(&mut out, total).await.context("relay transfer failed")?;

    Ok(out)
}
