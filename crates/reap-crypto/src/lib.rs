//! At-rest encryption for the Reap content pipeline.
//!
//! Payloads handed to the rawdata backend may be sealed with AES-256-GCM
//! under a key derived once, at store construction, from a passphrase and
//! salt (PBKDF2-HMAC-SHA256). Each sealed payload is self-describing: the
//! random nonce is prepended to the ciphertext, so decryption needs no
//! external state beyond the key.

pub mod cipher;

pub use cipher::{ContentCipher, CryptoError, SecretKey, NONCE_LEN, SECRET_KEY_LEN};
