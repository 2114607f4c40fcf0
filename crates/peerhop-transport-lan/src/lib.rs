//! LAN TCP transfer: after discovery hands back a peer address and public
//! key, the sender listens and the receiver dials; the accepted connection
//! carries an 8-byte signed-varint `total_plaintext_size` prefix followed by
//! the chunked AEAD stream from `peerhop_core::stream`.

use std::net::{IpAddr, SocketAddr};

use peerhop_core::crypto::AeadSession;
use peerhop_core::error::{PeerhopError, Result};
use peerhop_core::stream::{decrypt_stream, encrypt_stream};
use peerhop_core::varint::{decode_fixed, encode_fixed, PREFIX_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// Bind a listener on `port` and accept the first connection whose peer IP
/// matches `expected_ip`. Any other accepted connection is closed and the
/// loop continues — this is not treated as an error per the spec.
pub async fn accept_from(port: u16, expected_ip: IpAddr) -> Result<TcpStream> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        if peer_addr.ip() != expected_ip {
            debug!("rejecting connection from unexpected peer {peer_addr}");
            drop(stream);
            continue;
        }
        info!("accepted LAN transfer connection from {peer_addr}");
        return Ok(stream);
    }
}

/// Dial the peer's transfer port directly.
pub async fn connect_to(addr: SocketAddr) -> Result<TcpStream> {
    Ok(TcpStream::connect(addr).await?)
}

/// Write the 8-byte signed-varint `total` prefix, then stream-encrypt
/// `reader` over `conn`.
pub async fn send<R: AsyncRead + Unpin>(
    conn: &mut TcpStream,
    reader: &mut R,
    session: &mut AeadSession,
    total: u64,
) -> Result<()> {
    let prefix = encode_fixed(total as i64)
        .ok_or_else(|| PeerhopError::Protocol("total does not fit an 8-byte varint prefix".into()))?;
    conn.write_all(&prefix).await?;
    encrypt_stream(reader, conn, session, total).await
}

/// Read the 8-byte signed-varint `total` prefix, then stream-decrypt `conn`
/// into `writer`. `total <= 0` is treated as an empty no-op transfer;
/// `total < 0` is a protocol error (open question resolved per spec §4.4).
pub async fn receive<W: AsyncWrite + Unpin>(
    conn: &mut TcpStream,
    writer: &mut W,
    session: &mut AeadSession,
) -> Result<u64> {
    let mut prefix = [0u8; PREFIX_LEN];
    conn.read_exact(&mut prefix).await?;
    let total = decode_fixed(&prefix);

    if total < 0 {
        return Err(PeerhopError::Protocol(format!("negative transfer size: {total}")));
    }
    if total == 0 {
        return Ok(0);
    }

    decrypt_stream(conn, writer, session, total as u64).await?;
    Ok(total as u64)
}
