//! Cryptographic utilities for `ActivityPub` signatures and actor keys.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rsa::{
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
    traits::{PrivateKeyParts, PublicKeyParts},
    RsaPrivateKey, RsaPublicKey,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// RSA key pair for `ActivityPub` HTTP Signatures.
#[derive(Debug, Clone)]
pub struct RsaKeypair {
    /// Public key in PEM format.
    pub public_key_pem: String,
    /// Private key in PEM format.
    pub private_key_pem: String,
}

/// A public/private key pair in JWK form (RFC 7517).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwkPair {
    /// Public JWK.
    pub public_key: Jwk,
    /// Private JWK.
    pub private_key: Jwk,
}

/// A single RSA JSON Web Key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type; always `RSA`.
    pub kty: String,
    /// Modulus, base64url without padding.
    pub n: String,
    /// Public exponent, base64url without padding.
    pub e: String,
    /// Private exponent, base64url without padding. Private keys only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

/// Default RSA key size (2048 bits).
const RSA_KEY_SIZE: usize = 2048;

/// Generate a new RSA key pair.
pub fn generate_rsa_keypair() -> AppResult<RsaKeypair> {
    let mut rng = rand::thread_rng();

    let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_SIZE)
        .map_err(|e| AppError::Internal(format!("Failed to generate RSA key: {e}")))?;

    let public_key = RsaPublicKey::from(&private_key);

    let private_key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("Failed to encode private key: {e}")))?
        .to_string();

    let public_key_pem = public_key
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| AppError::Internal(format!("Failed to encode public key: {e}")))?;

    Ok(RsaKeypair {
        public_key_pem,
        private_key_pem,
    })
}

/// Parse a private key from PEM format.
pub fn parse_private_key(pem: &str) -> AppResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .map_err(|e| AppError::Internal(format!("Failed to parse private key: {e}")))
}

/// Parse a public key from PEM format.
pub fn parse_public_key(pem: &str) -> AppResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .map_err(|e| AppError::Internal(format!("Failed to parse public key: {e}")))
}

/// Convert a PEM key pair into JWK form.
pub fn keypair_to_jwk(keypair: &RsaKeypair) -> AppResult<JwkPair> {
    let private_key = parse_private_key(&keypair.private_key_pem)?;
    let public_key = RsaPublicKey::from(&private_key);

    let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
    let d = URL_SAFE_NO_PAD.encode(private_key.d().to_bytes_be());

    Ok(JwkPair {
        public_key: Jwk {
            kty: "RSA".to_string(),
            n: n.clone(),
            e: e.clone(),
            d: None,
        },
        private_key: Jwk {
            kty: "RSA".to_string(),
            n,
            e,
            d: Some(d),
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keypair() {
        let keypair = generate_rsa_keypair().unwrap();

        assert!(keypair.public_key_pem.contains("BEGIN PUBLIC KEY"));
        assert!(keypair.public_key_pem.contains("END PUBLIC KEY"));
        assert!(keypair.private_key_pem.contains("BEGIN PRIVATE KEY"));
        assert!(keypair.private_key_pem.contains("END PRIVATE KEY"));
    }

    #[test]
    fn test_parse_generated_keys() {
        let keypair = generate_rsa_keypair().unwrap();

        let _private = parse_private_key(&keypair.private_key_pem).unwrap();
        let _public = parse_public_key(&keypair.public_key_pem).unwrap();
    }

    #[test]
    fn test_keypair_to_jwk() {
        let keypair = generate_rsa_keypair().unwrap();
        let jwk = keypair_to_jwk(&keypair).unwrap();

        assert_eq!(jwk.public_key.kty, "RSA");
        assert!(jwk.public_key.d.is_none());
        assert!(jwk.private_key.d.is_some());
        assert_eq!(jwk.public_key.n, jwk.private_key.n);
        // base64url, no padding
        assert!(!jwk.public_key.n.contains('='));
    }
}
