//! RSA key pairs, PEM encoding and OAEP key wrapping.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::symmetric::SymmetricKey;
use crate::{CryptoError, Result};

/// Modulus size used for per-connection key pairs.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// An RSA key pair.
#[derive(Clone)]
pub struct KeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl KeyPair {
    /// The private half.
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// The public half.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.public.size() * 8
    }

    /// PEM encoding of the public half.
    pub fn public_key_pem(&self) -> Result<String> {
        encode_public_key(&self.public)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

/// Generate an RSA-2048 key pair.
///
/// This is CPU heavy; async callers should run it on a blocking thread.
pub fn generate_key_pair() -> Result<KeyPair> {
    generate_key_pair_with_bits(DEFAULT_KEY_BITS)
}

/// Generate an RSA key pair with a custom modulus size.
pub fn generate_key_pair_with_bits(bits: usize) -> Result<KeyPair> {
    let private = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| CryptoError::key_generation(e.to_string()))?;
    let public = RsaPublicKey::from(&private);
    Ok(KeyPair { private, public })
}

/// Encode a public key as a PKIX (`PUBLIC KEY`) PEM block.
pub fn encode_public_key(public_key: &RsaPublicKey) -> Result<String> {
    public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::encoding(e.to_string()))
}

/// Decode a PKIX PEM block into an RSA public key.
pub fn decode_public_key(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem.trim())
        .map_err(|e| CryptoError::encoding(format!("failed to decode public key: {e}")))
}

/// Encrypt a symmetric key for the holder of `public_key`.
pub fn wrap_symmetric_key(key: &SymmetricKey, public_key: &RsaPublicKey) -> Result<String> {
    let wrapped = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key.as_bytes())
        .map_err(|e| CryptoError::crypto(format!("key wrapping failed: {e}")))?;
    Ok(BASE64.encode(wrapped))
}

/// Recover a symmetric key wrapped with [`wrap_symmetric_key`].
pub fn unwrap_symmetric_key(wrapped: &str, private_key: &RsaPrivateKey) -> Result<SymmetricKey> {
    let ciphertext = BASE64
        .decode(wrapped)
        .map_err(|e| CryptoError::crypto(format!("invalid wrapped key encoding: {e}")))?;

    let bytes = private_key
        .decrypt(Oaep::new::<Sha256>(), &ciphertext)
        .map_err(|e| CryptoError::crypto(format!("key unwrapping failed: {e}")))?;

    SymmetricKey::from_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetric::generate_symmetric_key;

    // Smaller modulus keeps debug-build tests fast; OAEP/SHA-256 still fits a 32-byte key.
    const TEST_BITS: usize = 1024;

    fn test_pair() -> KeyPair {
        generate_key_pair_with_bits(TEST_BITS).unwrap()
    }

    #[test]
    fn test_generate_key_pair() {
        let pair = test_pair();
        assert_eq!(pair.bits(), TEST_BITS);
        assert_eq!(pair.public_key(), &RsaPublicKey::from(pair.private_key()));
    }

    #[test]
    fn test_default_key_size() {
        let pair = generate_key_pair().unwrap();
        assert_eq!(pair.bits(), DEFAULT_KEY_BITS);
    }

    #[test]
    fn test_public_key_pem_roundtrip() {
        let pair = test_pair();
        let pem = pair.public_key_pem().unwrap();

        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));
        assert!(pem.trim_end().ends_with("-----END PUBLIC KEY-----"));

        let decoded = decode_public_key(&pem).unwrap();
        assert_eq!(&decoded, pair.public_key());
    }

    #[test]
    fn test_decode_malformed_public_key() {
        let err = decode_public_key("-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----")
            .unwrap_err();
        assert!(matches!(err, CryptoError::Encoding(_)));

        assert!(matches!(
            decode_public_key("").unwrap_err(),
            CryptoError::Encoding(_)
        ));
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let pair = test_pair();
        let key = generate_symmetric_key();

        let wrapped = wrap_symmetric_key(&key, pair.public_key()).unwrap();
        let unwrapped = unwrap_symmetric_key(&wrapped, pair.private_key()).unwrap();

        assert_eq!(unwrapped, key);
    }

    #[test]
    fn test_unwrap_with_mismatched_key_fails() {
        let alice = test_pair();
        let bob = test_pair();
        let key = generate_symmetric_key();

        let wrapped = wrap_symmetric_key(&key, alice.public_key()).unwrap();
        let err = unwrap_symmetric_key(&wrapped, bob.private_key()).unwrap_err();

        assert!(matches!(err, CryptoError::Crypto(_)));
    }

    #[test]
    fn test_unwrap_malformed_input_fails() {
        let pair = test_pair();
        assert!(unwrap_symmetric_key("%%%", pair.private_key()).is_err());
        assert!(unwrap_symmetric_key(&BASE64.encode([1u8; 7]), pair.private_key()).is_err());
    }

    #[test]
    fn test_wrapped_key_through_pem_exchange() {
        // Peer publishes its PEM, sender decodes it and wraps a session key.
        let peer = test_pair();
        let pem = peer.public_key_pem().unwrap();
        let peer_public = decode_public_key(&pem).unwrap();

        let session_key = generate_symmetric_key();
        let wrapped = wrap_symmetric_key(&session_key, &peer_public).unwrap();
        let ciphertext = crate::encrypt_payload(b"hi bob", &session_key).unwrap();

        let recovered = unwrap_symmetric_key(&wrapped, peer.private_key()).unwrap();
        assert_eq!(
            crate::decrypt_payload(&ciphertext, &recovered).unwrap(),
            b"hi bob"
        );
    }
}
