//! Error types for the cryptographic primitives.

use thiserror::Error;

/// Errors raised by the crypto primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Entropy or allocation failure while generating a key pair
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    /// A public key could not be encoded to, or decoded from, its PEM form
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Malformed ciphertext, key mismatch or failed authentication tag
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl CryptoError {
    /// Create a new key generation error.
    pub fn key_generation(msg: impl Into<String>) -> Self {
        Self::KeyGeneration(msg.into())
    }

    /// Create a new encoding error.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Create a new crypto error.
    pub fn crypto(msg: impl Into<String>) -> Self {
        Self::Crypto(msg.into())
    }
}
