use std::io::Cursor;
use std::net::SocketAddr;

use anyhow::{bail, Context, Result};
use tokio::sync::oneshot;

use peerhop_core::crypto::{derive_session_key, generate_ephemeral, AeadSession};
use peerhop_discovery::DiscoveryService;

use crate::cli::SendArgs;
use crate::secret;

pub async fn run(args: SendArgs) -> Result<()> {
    let payload = load_payload(&args)?;

    let share_code = if args.code {
        secret::prompt("Enter share code: ").await?
    } else if args.web.is_some() {
        peerhop_words::generate_relay_share_code()
    } else {
        peerhop_words::generate_lan_phrase()
    };

    if let Some(base_url) = args.web {
        send_via_relay(&base_url, args.insecure_ws, &share_code, payload).await
    } else {
        send_via_lan(args.port, &share_code, payload).await
    }
}

fn load_payload(args: &SendArgs) -> Result<Vec<u8>> {
    match (&args.file, &args.message) {
        (Some(path), None) => std::fs::read(path).with_context(|| format!("failed to read {}", path.display())),
        (None, Some(message)) => Ok(message.clone().into_bytes()),
        (Some(_), Some(_)) => bail!("specify either --file or --message, not both"),
        (None, None) => bail!("nothing to send: specify --file or --message"),
    }
}

async fn send_via_lan(port: u16, share_code: &str, payload: Vec<u8>) -> Result<()> {
    let (secret, public) = generate_ephemeral();
    let discovery = DiscoveryService::bind(port, *public.as_bytes(), share_code.to_string())
        .await
        .context("failed to bind LAN discovery socket")?;

    println!("Share this code with the receiver: {share_code}");
    println!("Waiting for receiver...");

    let response = discovery.wait_for_receiver().await.context("LAN discovery failed")?;
    discovery.close();

    let peer_addr = SocketAddr::new(response.remote_addr.ip(), port);
    let mut conn = peerhop_transport_lan::accept_from(port, peer_addr.ip())
        .await
        .context("failed to accept LAN transfer connection")?;

    let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(response.remote_pubkey));
    let session_key = derive_session_key(&shared, share_code);
    let mut session = AeadSession::new(&session_key, share_code);

    let total = payload.len() as u64;
    let mut reader = Cursor::new(payload);
    peerhop_transport_lan::send(&mut conn, &mut reader, &mut session, total)
        .await
        .context("LAN transfer failed")?;

    println!("Sent.");
    Ok(())
}

async fn send_via_relay(base_url: &str, insecure: bool, share_code: &str, payload: Vec<u8>) -> Result<()> {
    let (pair_code_tx, pair_code_rx) = oneshot::channel();

    let printer = tokio::spawn({
        let share_code = share_code.to_string();
        async move {
            if let Ok(pair_code) = pair_code_rx.await {
                println!("Share this code with the receiver: {share_code}{pair_code}");
                println!("Waiting for receiver...");
            }
        }
    });

    let mut handle = peerhop_relay_client::connect_sender(base_url, insecure, share_code, pair_code_tx)
        .await
        .context("relay sender handshake failed")?;
    let _ = printer.await;

    let total = payload.len() as u64;
    handle.send_size(total).await.context("failed to send transfer size")?;

    let mut reader = Cursor::new(payload);
    handle.send_frames(&mut reader, total).await.context("relay transfer failed")?;
    handle.close_normal().await?;

    println!("Sent.");
    Ok(())
}
