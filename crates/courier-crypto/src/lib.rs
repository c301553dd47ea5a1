//! # courier-crypto
//!
//! Cryptographic primitives for Courier peers and the relay itself.
//!
//! The relay never decrypts traffic; these primitives exist so that each
//! connection can be handed a server key pair during the handshake, and so
//! the same envelope formats are available to Rust peers:
//!
//! - **Asymmetric keys**: RSA-2048, public halves exchanged as PKIX PEM
//! - **Key wrapping**: RSA-OAEP with SHA-256, base64 output
//! - **Payloads**: AES-256-GCM, random 96-bit nonce prepended to the
//!   ciphertext, base64 output
//!
//! All text output uses the standard base64 alphabet with padding so it
//! interoperates with the browser client.

mod error;
pub mod keys;
pub mod symmetric;

pub use error::CryptoError;
pub use keys::{
    decode_public_key, encode_public_key, generate_key_pair, generate_key_pair_with_bits,
    unwrap_symmetric_key, wrap_symmetric_key, KeyPair, DEFAULT_KEY_BITS,
};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
pub use symmetric::{
    decrypt_payload, encrypt_payload, generate_symmetric_key, SymmetricKey, NONCE_SIZE,
    SYMMETRIC_KEY_SIZE,
};

/// Result alias for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
