//! AES-256-GCM payload encryption.
//!
//! # Envelope
//!
//! ```text
//! base64( nonce[12] || ciphertext || tag[16] )
//! ```
//!
//! A fresh random nonce is drawn for every call.

use aes_gcm::{
    aead::{rand_core::RngCore, Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoError, Result};

/// Nonce size for AES-GCM (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// AES-256 key size in bytes.
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// A 32-byte AES-256 key, zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_SIZE]);

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build a key from a slice, which must be exactly 32 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SYMMETRIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::crypto(format!(
                "symmetric key must be {} bytes, got {}",
                SYMMETRIC_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.0
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(&self.0.into())
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

/// Generate a random AES-256 key.
pub fn generate_symmetric_key() -> SymmetricKey {
    let mut bytes = [0u8; SYMMETRIC_KEY_SIZE];
    OsRng.fill_bytes(&mut bytes);
    let key = SymmetricKey(bytes);
    bytes.zeroize();
    key
}

/// Encrypt `plaintext` under `key`.
pub fn encrypt_payload(plaintext: &[u8], key: &SymmetricKey) -> Result<String> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = key
        .cipher()
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::crypto(format!("encryption failed: {e}")))?;

    let mut envelope = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);

    Ok(BASE64.encode(envelope))
}

/// Decrypt an envelope produced by [`encrypt_payload`].
pub fn decrypt_payload(envelope: &str, key: &SymmetricKey) -> Result<Vec<u8>> {
    let data = BASE64
        .decode(envelope)
        .map_err(|e| CryptoError::crypto(format!("invalid ciphertext encoding: {e}")))?;

    if data.len() < NONCE_SIZE {
        return Err(CryptoError::crypto("ciphertext too short"));
    }

    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);

    key.cipher()
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| CryptoError::crypto(format!("decryption failed: {e}")))
}
