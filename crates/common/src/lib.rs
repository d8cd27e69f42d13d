//! Common utilities and shared types for ghostpub.

pub mod ap_urls;
pub mod config;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod http_signature;

pub use ap_urls::{ApUrls, AP_BASE_PATH};
pub use config::Config;
pub use crypto::{
    generate_rsa_keypair, keypair_to_jwk, parse_private_key, parse_public_key, Jwk, JwkPair,
    RsaKeypair,
};
pub use error::{AppError, AppResult};
pub use hash::sha256_hex;
pub use http_signature::{
    build_signature_string, calculate_digest, sign_request, verify_digest, verify_signature,
    HttpSignature,
};
