//! Signed LEB128 varint encoding for the LAN transfer size prefix, fixed to
//! the 8-byte wire width spec'd for the `total_plaintext_size` header.
//!
//! This is the same continuation-bit scheme standard varint encoders use
//! for signed 64-bit integers (zig-zag is not applied — the sign is carried
//! by sign-extending the final group, matching the source implementation's
//! on-wire behavior). Reimplementations MUST read exactly 8 bytes for
//! wire-compatibility: the spec takes the conservative position that
//! practical payload sizes never need the 9th or 10th continuation byte.

pub const PREFIX_LEN: usize = 8;

/// Encode `value` as a signed varint into exactly `PREFIX_LEN` bytes,
/// zero-padding unused trailing bytes. Fails if `value` needs more than 8
/// varint bytes to encode (i.e. doesn't fit the wire-compatible 8-byte
/// window).
pub fn encode_fixed(value: i64) -> Option<[u8; PREFIX_LEN]> {
    let mut out = [0u8; PREFIX_LEN];
    let mut v = value;
    let mut i = 0;
    loop {
        if i == PREFIX_LEN {
            return None;
        }
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        // Sign-extending shift: stop once the remaining bits are all sign copies.
        let done = (v == 0 && byte & 0x40 == 0) || (v == -1 && byte & 0x40 != 0);
        if !done {
            byte |= 0x80;
        }
        out[i] = byte;
        i += 1;
        if done {
            break;
        }
    }
    Some(out)
}

/// Decode a signed varint from exactly `PREFIX_LEN` bytes.
pub fn decode_fixed(bytes: &[u8; PREFIX_LEN]) -> i64 {
    let mut result: i64 = 0;
    let mut shift = 0;
    let mut last_byte = 0u8;
    for &byte in bytes.iter() {
        last_byte = byte;
        result |= ((byte & 0x7f) as i64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            break;
        }
    }
    // Sign-extend if the last consumed byte's sign bit was set and we
    // terminated before filling all 64 bits.
    if shift < 64 && last_byte & 0x40 != 0 {
        result |= -1i64 << shift;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_representative_totals() {
        for total in [0i64, 1, 127, 128, 1 << 31, 1i64 << 40] {
            let encoded = encode_fixed(total).unwrap();
            assert_eq!(decode_fixed(&encoded), total, "mismatch for {total}");
        }
    }

    #[test]
    fn round_trips_negative_one() {
        let encoded = encode_fixed(-1).unwrap();
        assert_eq!(decode_fixed(&encoded), -1);
    }
}
