use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

/// AES-256 key length in bytes.
pub const SECRET_KEY_LEN: usize = 32;

/// GCM nonce length in bytes (96-bit, the GCM standard).
pub const NONCE_LEN: usize = 12;

/// PBKDF2-HMAC-SHA256 iteration count for key derivation.
const PBKDF2_ROUNDS: u32 = 65_536;

/// Errors produced by key derivation and sealing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption credential must not be empty: {0}")]
    EmptyCredential(&'static str),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("sealed payload too short: {len} bytes, need at least {min}")]
    TruncatedPayload { len: usize, min: usize },
}

/// A derived AES-256 key. Zeroized on drop.
pub struct SecretKey([u8; SECRET_KEY_LEN]);

impl SecretKey {
    /// Derive a key from a passphrase and salt with PBKDF2-HMAC-SHA256.
    ///
    /// Derivation is deterministic: the same passphrase and salt always
    /// produce the same key. Callers own the wiping of the passphrase and
    /// salt buffers they pass in.
    pub fn derive(passphrase: &[u8], salt: &[u8]) -> Result<Self, CryptoError> {
        if passphrase.is_empty() {
            return Err(CryptoError::EmptyCredential("passphrase"));
        }
        if salt.is_empty() {
            return Err(CryptoError::EmptyCredential("salt"));
        }

        let mut key = [0u8; SECRET_KEY_LEN];
        pbkdf2_hmac::<Sha256>(passphrase, salt, PBKDF2_ROUNDS, &mut key);
        Ok(Self(key))
    }

    fn as_bytes(&self) -> &[u8; SECRET_KEY_LEN] {
        &self.0
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("SecretKey(..)")
    }
}

/// Symmetric authenticated-encryption gate over content payloads.
///
/// Sealed output layout: `[12-byte random nonce][ciphertext + GCM tag]`.
/// Every call draws a fresh nonce, so sealing the same plaintext twice
/// yields different bytes.
pub struct ContentCipher {
    key: SecretKey,
}

impl ContentCipher {
    pub fn new(key: SecretKey) -> Self {
        Self { key }
    }

    /// Seal a payload. Output is self-describing (nonce prepended).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.as_bytes()));

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Open a sealed payload produced by [`encrypt`](Self::encrypt).
    ///
    /// Fails when the payload was tampered with or sealed under a different
    /// key (GCM tag verification).
    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if sealed.len() < NONCE_LEN {
            return Err(CryptoError::TruncatedPayload {
                len: sealed.len(),
                min: NONCE_LEN,
            });
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.as_bytes()));

        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| CryptoError::Decryption(e.to_string()))
    }
}

impl std::fmt::Debug for ContentCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentCipher(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cipher() -> ContentCipher {
        ContentCipher::new(SecretKey::derive(b"password", b"salt").unwrap())
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = SecretKey::derive(b"password", b"salt").unwrap();
        let b = SecretKey::derive(b"password", b"salt").unwrap();
        let c = SecretKey::derive(b"password", b"pepper").unwrap();

        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn empty_credentials_are_rejected() {
        assert_eq!(
            SecretKey::derive(b"", b"salt").unwrap_err(),
            CryptoError::EmptyCredential("passphrase")
        );
        assert_eq!(
            SecretKey::derive(b"password", b"").unwrap_err(),
            CryptoError::EmptyCredential("salt")
        );
    }

    #[test]
    fn seal_and_open_round_trip() {
        let cipher = cipher();
        let sealed = cipher.encrypt(b"PAYLOAD").unwrap();

        assert_ne!(sealed.as_slice(), b"PAYLOAD" as &[u8]);
        assert_eq!(cipher.decrypt(&sealed).unwrap(), b"PAYLOAD");
    }

    #[test]
    fn sealing_twice_differs() {
        let cipher = cipher();
        let first = cipher.encrypt(b"PAYLOAD").unwrap();
        let second = cipher.encrypt(b"PAYLOAD").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn tampering_is_detected() {
        let cipher = cipher();
        let mut sealed = cipher.encrypt(b"PAYLOAD").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        assert!(matches!(
            cipher.decrypt(&sealed),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let sealed = cipher().encrypt(b"PAYLOAD").unwrap();
        let other = ContentCipher::new(SecretKey::derive(b"password", b"pepper").unwrap());

        assert!(matches!(
            other.decrypt(&sealed),
            Err(CryptoError::Decryption(_))
        ));
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let error = cipher().decrypt(&[0u8; 4]).unwrap_err();
        assert_eq!(
            error,
            CryptoError::TruncatedPayload {
                len: 4,
                min: NONCE_LEN
            }
        );
    }

    proptest! {
        #[test]
        fn round_trip_recovers_any_payload(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let cipher = cipher();
            let sealed = cipher.encrypt(&payload).unwrap();
            prop_assert_eq!(cipher.decrypt(&sealed).unwrap(), payload);
        }
    }
}
