//! Broadcast address enumeration: `ip | ~netmask` over every non-loopback
//! interface, computed per-byte over equal-length IP/mask pairs.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Enumerate one directed-broadcast `SocketAddr` per usable interface
/// address, at `port`. Interfaces without a usable address (loopback, or an
/// address whose mask length disagrees with the IP) are skipped.
pub fn broadcast_addresses(port: u16) -> std::io::Result<Vec<SocketAddr>> {
    let interfaces = if_addrs::get_if_addrs()?;
    let mut out = Vec::new();

    for iface in interfaces {
        if iface.is_loopback() {
            continue;
        }

        let broadcast = match iface.addr {
            if_addrs::IfAddr::V4(v4) => directed_broadcast_v4(v4.ip, v4.netmask).map(IpAddr::V4),
            if_addrs::IfAddr::V6(v6) => directed_broadcast_v6(v6.ip, v6.netmask).map(IpAddr::V6),
        };

        if let Some(ip) = broadcast {
            out.push(SocketAddr::new(ip, port));
        }
    }

    out.sort_by_key(|a| (a.ip(), a.port()));
    out.dedup();
    Ok(out)
}

fn directed_broadcast_v4(ip: Ipv4Addr, mask: Ipv4Addr) -> Option<Ipv4Addr> {
    let ip_bytes = ip.octets();
    let mask_bytes = mask.octets();
    // Equal-length by construction (both are always 4 bytes), kept as an
    // explicit check to mirror the spec's "skip addresses whose IP/mask
    // lengths disagree" rule.
    if ip_bytes.len() != mask_bytes.len() {
        return None;
    }
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = ip_bytes[i] | !mask_bytes[i];
    }
    Some(Ipv4Addr::from(out))
}

fn directed_broadcast_v6(ip: Ipv6Addr, mask: Ipv6Addr) -> Option<Ipv6Addr> {
    let ip_bytes = ip.octets();
    let mask_bytes = mask.octets();
    if ip_bytes.len() != mask_bytes.len() {
        return None;
    }
    let mut out = [0u8; 16];
    for i in 0..16 {
        out[i] = ip_bytes[i] | !mask_bytes[i];
    }
    Some(Ipv6Addr::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_v4_flips_host_bits() {
        let ip = Ipv4Addr::new(192, 168, 1, 42);
        let mask = Ipv4Addr::new(255, 255, 255, 0);
        assert_eq!(directed_broadcast_v4(ip, mask), Some(Ipv4Addr::new(192, 168, 1, 255)));
    }

    #[test]
    fn broadcast_addresses_does_not_panic_on_this_host() {
        // Exercises the real interface table; result content is host-dependent.
        let _ = broadcast_addresses(65432).unwrap();
    }
}
