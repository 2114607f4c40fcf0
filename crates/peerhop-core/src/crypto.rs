//! Crypto primitives: share-code key stretching, envelope HMAC, ECDH session
//! key derivation and the AES-256-GCM frame cipher with its counter nonce.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use x25519_dalek::{EphemeralSecret, PublicKey, SharedSecret};
use zeroize::Zeroizing;

use crate::error::{PeerhopError, Result};

pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const HMAC_KEY_LEN: usize = 128;
pub const HMAC_TAG_LEN: usize = 64;
pub const SALT_LEN: usize = 16;
pub const PUBKEY_LEN: usize = 32;
pub const SESSION_KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// `K = PBKDF2-HMAC-SHA512(S, salt, 100_000, 128)`.
///
/// The output is intentionally the SHA-512 block size: it becomes the HMAC
/// key in [`sign_info`], and a key that long is never itself reduced by
/// HMAC's key-shortening step.
pub fn derive_hmac_key(share_code: &str, salt: &[u8; SALT_LEN]) -> Zeroizing<[u8; HMAC_KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; HMAC_KEY_LEN]);
    pbkdf2_hmac::<Sha512>(share_code.as_bytes(), salt, PBKDF2_ITERATIONS, key.as_mut());
    key
}

/// `tag = HMAC-SHA512(derive_hmac_key(S, salt), pubkey)`.
pub fn sign_info(pubkey: &[u8; PUBKEY_LEN], share_code: &str, salt: &[u8; SALT_LEN]) -> [u8; HMAC_TAG_LEN] {
    let key = derive_hmac_key(share_code, salt);
    let mut mac = Hmac::<Sha512>::new_from_slice(key.as_ref()).expect("HMAC accepts any key length");
    mac.update(pubkey);
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; HMAC_TAG_LEN];
    out.copy_from_slice(&tag);
    out
}

/// Constant-time verification of a peer's envelope HMAC.
pub fn verify_info(
    pubkey: &[u8; PUBKEY_LEN],
    tag: &[u8; HMAC_TAG_LEN],
    share_code: &str,
    salt: &[u8; SALT_LEN],
) -> bool {
    let expected = sign_info(pubkey, share_code, salt);
    expected.ct_eq(tag).into()
}

/// `HKDF-SHA512(ikm = ECDH(priv, peer_pub), salt = empty, info = S) -> 32 bytes`.
pub fn derive_session_key(shared_secret: &SharedSecret, share_code: &str) -> Zeroizing<[u8; SESSION_KEY_LEN]> {
    let hk = Hkdf::<Sha512>::new(None, shared_secret.as_bytes());
    let mut okm = Zeroizing::new([0u8; SESSION_KEY_LEN]);
    hk.expand(share_code.as_bytes(), okm.as_mut())
        .expect("32 bytes is a valid HKDF-SHA512 output length");
    okm
}

/// Little-endian 12-byte counter nonce, incremented after every AEAD
/// operation. Both sides advance in lock-step over the single directed
/// stream (sender encrypts, receiver decrypts, same frame order).
#[derive(Clone, Default)]
pub struct NonceCounter([u8; NONCE_LEN]);

impl NonceCounter {
    pub fn new() -> Self {
        Self([0u8; NONCE_LEN])
    }

    fn as_nonce(&self) -> &Nonce {
        Nonce::from_slice(&self.0)
    }

    /// Increment with carry, byte 0 least significant.
    fn increment(&mut self) {
        for byte in self.0.iter_mut() {
            if *byte == u8::MAX {
                *byte = 0;
            } else {
                *byte += 1;
                return;
            }
        }
    }
}

/// One AEAD session bound to a share code. Holds the cipher and the current
/// nonce counter; `seal`/`open` each advance the counter by one.
pub struct AeadSession {
    cipher: Aes256Gcm,
    nonce: NonceCounter,
    aad: Vec<u8>,
}

impl AeadSession {
    pub fn new(session_key: &[u8; SESSION_KEY_LEN], share_code: &str) -> Self {
        let cipher = Aes256Gcm::new_from_slice(session_key).expect("32-byte key is always valid for AES-256-GCM");
        Self {
            cipher,
            nonce: NonceCounter::new(),
            aad: share_code.as_bytes().to_vec(),
        }
    }

    /// Seal one frame of plaintext; advances the nonce counter.
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = self
            .cipher
            .encrypt(
                self.nonce.as_nonce(),
                Payload {
                    msg: plaintext,
                    aad: &self.aad,
                },
            )
            .map_err(|_| PeerhopError::Crypto)?;
        self.nonce.increment();
        Ok(ciphertext)
    }

    /// Open one frame of ciphertext; advances the nonce counter only on success.
    pub fn open(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let plaintext = self
            .cipher
            .decrypt(
                self.nonce.as_nonce(),
                Payload {
                    msg: ciphertext,
                    aad: &self.aad,
                },
            )
            .map_err(|_| PeerhopError::Crypto)?;
        self.nonce.increment();
        Ok(plaintext)
    }
}

/// Generate a fresh ephemeral X25519 keypair.
pub fn generate_ephemeral() -> (EphemeralSecret, PublicKey) {
    let secret = EphemeralSecret::random_from_rng(rand_core::OsRng);
    let public = PublicKey::from(&secret);
    (secret, public)
}

/// Generate a fresh 16-byte random salt for one envelope.
pub fn generate_salt() -> [u8; SALT_LEN] {
    use rand_core::RngCore;
    let mut salt = [0u8; SALT_LEN];
    rand_core::OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_STRING: &[u8] = b"This is my string... Does it match?";
    const TEST_DISCOVER_PHRASE: &str = "bluepenguin23";

    #[test]
    fn crypto_round_trip_100_iterations() {
        let session_key = [7u8; SESSION_KEY_LEN];
        let mut enc = AeadSession::new(&session_key, TEST_DISCOVER_PHRASE);
        let mut dec = AeadSession::new(&session_key, TEST_DISCOVER_PHRASE);

        for i in 0..100 {
            let ciphertext = enc.seal(TEST_STRING).unwrap();
            let plaintext = dec.open(&ciphertext).unwrap();
            assert_eq!(plaintext, TEST_STRING, "round {i} mismatched");
        }
    }

    #[test]
    fn hmac_agreement_between_independent_verifiers() {
        let salt = generate_salt();
        let pubkey = [9u8; PUBKEY_LEN];

        let tag_a = sign_info(&pubkey, TEST_DISCOVER_PHRASE, &salt);
        let tag_b = sign_info(&pubkey, TEST_DISCOVER_PHRASE, &salt);
        assert_eq!(tag_a, tag_b);

        assert!(verify_info(&pubkey, &tag_a, TEST_DISCOVER_PHRASE, &salt));
        assert!(verify_info(&pubkey, &tag_b, TEST_DISCOVER_PHRASE, &salt));
    }

    #[test]
    fn wrong_share_code_fails_verification() {
        let salt = generate_salt();
        let pubkey = [1u8; PUBKEY_LEN];
        let tag = sign_info(&pubkey, "ApplePear42", &salt);
        assert!(!verify_info(&pubkey, &tag, "ApplePear43", &salt));
    }

    #[test]
    fn nonce_counter_increments_with_carry() {
        let mut counter = NonceCounter([0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        counter.increment();
        assert_eq!(counter.0, [0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn ecdh_session_keys_match_on_both_sides() {
        let (secret_a, public_a) = generate_ephemeral();
        let (secret_b, public_b) = generate_ephemeral();

        let shared_a = secret_a.diffie_hellman(&public_b);
        let shared_b = secret_b.diffie_hellman(&public_a);

        let key_a = derive_session_key(&shared_a, "ApplePear42");
        let key_b = derive_session_key(&shared_b, "ApplePear42");
        assert_eq!(*key_a, *key_b);
    }
}
