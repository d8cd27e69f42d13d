//! HTTP Signature utilities for `ActivityPub`.
//!
//! Implements HTTP Signatures as used by `ActivityPub` for request
//! authentication, per draft-cavage-http-signatures-12. Remote servers
//! first knock with `algorithm="hs2019"`; both that and the legacy
//! `rsa-sha256` label verify as RSASSA-PKCS1-v1_5 over SHA-256 here.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::{
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    pkcs8::DecodePublicKey,
    sha2::Sha256,
    signature::{SignatureEncoding, Signer, Verifier},
    RsaPrivateKey, RsaPublicKey,
};
use sha2::{Digest, Sha256 as Sha256Hasher};
use std::collections::HashMap;

use crate::{AppError, AppResult};

/// Parsed HTTP Signature header.
#[derive(Debug, Clone)]
pub struct HttpSignature {
    /// Key ID (typically the actor's public key URL).
    pub key_id: String,
    /// Algorithm label (`hs2019` or `rsa-sha256`).
    pub algorithm: String,
    /// Headers included in the signature.
    pub headers: Vec<String>,
    /// The signature itself (base64 encoded).
    pub signature: String,
}

impl HttpSignature {
    /// Parse an HTTP Signature header value.
    ///
    /// Format: `keyId="...",algorithm="...",headers="...",signature="..."`
    pub fn parse(header: &str) -> AppResult<Self> {
        let mut key_id = None;
        let mut algorithm = None;
        let mut headers = None;
        let mut signature = None;

        for part in header.split(',') {
            let part = part.trim();
            if let Some((key, value)) = part.split_once('=') {
                let value = value.trim_matches('"');
                match key.trim() {
                    "keyId" => key_id = Some(value.to_string()),
                    "algorithm" => algorithm = Some(value.to_string()),
                    "headers" => headers = Some(value.to_string()),
                    "signature" => signature = Some(value.to_string()),
                    _ => {} // Ignore unknown fields (created, expires, ...)
                }
            }
        }

        Ok(Self {
            key_id: key_id.ok_or_else(|| AppError::BadRequest("Missing keyId".to_string()))?,
            algorithm: algorithm.unwrap_or_else(|| "hs2019".to_string()),
            headers: headers
                .unwrap_or_else(|| "date".to_string())
                .split(' ')
                .map(std::string::ToString::to_string)
                .collect(),
            signature: signature
                .ok_or_else(|| AppError::BadRequest("Missing signature".to_string()))?,
        })
    }

    /// Whether the declared algorithm is one this server can verify.
    #[must_use]
    pub fn algorithm_supported(&self) -> bool {
        matches!(self.algorithm.as_str(), "hs2019" | "rsa-sha256")
    }
}

/// Build the signature string from request components.
pub fn build_signature_string(
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
    signed_headers: &[String],
) -> AppResult<String> {
    let mut parts = Vec::new();

    for header_name in signed_headers {
        let value = if header_name == "(request-target)" {
            format!("{} {}", method.to_lowercase(), path)
        } else {
            headers
                .get(&header_name.to_lowercase())
                .cloned()
                .ok_or_else(|| AppError::BadRequest(format!("Missing header: {header_name}")))?
        };

        parts.push(format!("{header_name}: {value}"));
    }

    Ok(parts.join("\n"))
}

/// Verify an HTTP Signature against a PEM public key.
pub fn verify_signature(
    signature: &HttpSignature,
    public_key_pem: &str,
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
) -> AppResult<bool> {
    if !signature.algorithm_supported() {
        return Err(AppError::BadRequest(format!(
            "Unsupported signature algorithm: {}",
            signature.algorithm
        )));
    }

    let sig_string = build_signature_string(method, path, headers, &signature.headers)?;

    let sig_bytes = BASE64
        .decode(&signature.signature)
        .map_err(|e| AppError::BadRequest(format!("Invalid signature encoding: {e}")))?;

    let public_key = RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| AppError::Internal(format!("Invalid public key: {e}")))?;

    let verifying_key = VerifyingKey::<Sha256>::new(public_key);
    let signature_obj = Signature::try_from(sig_bytes.as_slice())
        .map_err(|e| AppError::BadRequest(format!("Invalid signature format: {e}")))?;

    Ok(verifying_key
        .verify(sig_string.as_bytes(), &signature_obj)
        .is_ok())
}

/// Sign an HTTP request, returning the `Signature` header value.
pub fn sign_request(
    private_key: &RsaPrivateKey,
    key_id: &str,
    method: &str,
    path: &str,
    headers: &HashMap<String, String>,
    signed_header_names: &[&str],
) -> AppResult<String> {
    let header_names: Vec<String> = signed_header_names
        .iter()
        .map(|s| (*s).to_string())
        .collect();
    let sig_string = build_signature_string(method, path, headers, &header_names)?;

    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature = signing_key.sign(sig_string.as_bytes());
    let sig_base64 = BASE64.encode(signature.to_bytes());

    Ok(format!(
        r#"keyId="{}",algorithm="rsa-sha256",headers="{}",signature="{}""#,
        key_id,
        signed_header_names.join(" "),
        sig_base64
    ))
}

/// Calculate the `Digest` header value of a body.
#[must_use]
pub fn calculate_digest(body: &[u8]) -> String {
    let mut hasher = Sha256Hasher::new();
    hasher.update(body);
    let hash = hasher.finalize();
    format!("SHA-256={}", BASE64.encode(hash))
}

/// Check a request body against its `Digest` header.
#[must_use]
pub fn verify_digest(body: &[u8], digest_header: &str) -> bool {
    calculate_digest(body) == digest_header.trim()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::crypto::{generate_rsa_keypair, parse_private_key};

    #[test]
    fn test_parse_signature_header() {
        let header = r#"keyId="https://r.example/u/alice#main-key",algorithm="rsa-sha256",headers="(request-target) host date digest",signature="abc123==""#;

        let sig = HttpSignature::parse(header).unwrap();

        assert_eq!(sig.key_id, "https://r.example/u/alice#main-key");
        assert_eq!(sig.algorithm, "rsa-sha256");
        assert_eq!(
            sig.headers,
            vec!["(request-target)", "host", "date", "digest"]
        );
        assert_eq!(sig.signature, "abc123==");
    }

    #[test]
    fn test_parse_defaults_to_hs2019() {
        let header = r#"keyId="https://r.example/u/alice#main-key",signature="abc==""#;
        let sig = HttpSignature::parse(header).unwrap();
        assert_eq!(sig.algorithm, "hs2019");
        assert!(sig.algorithm_supported());
    }

    #[test]
    fn test_unsupported_algorithm_rejected() {
        let header =
            r#"keyId="https://r.example/u/a#main-key",algorithm="hmac-sha256",signature="x""#;
        let sig = HttpSignature::parse(header).unwrap();
        assert!(!sig.algorithm_supported());

        let result = verify_signature(&sig, "irrelevant", "POST", "/inbox", &HashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_build_signature_string() {
        let mut headers = HashMap::new();
        headers.insert("host".to_string(), "site.example".to_string());
        headers.insert(
            "date".to_string(),
            "Sun, 06 Nov 1994 08:49:37 GMT".to_string(),
        );

        let signed_headers = vec![
            "(request-target)".to_string(),
            "host".to_string(),
            "date".to_string(),
        ];

        let sig_string = build_signature_string(
            "POST",
            "/.ghost/activitypub/inbox",
            &headers,
            &signed_headers,
        )
        .unwrap();

        assert!(sig_string.contains("(request-target): post /.ghost/activitypub/inbox"));
        assert!(sig_string.contains("host: site.example"));
        assert!(sig_string.contains("date: Sun, 06 Nov 1994 08:49:37 GMT"));
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = generate_rsa_keypair().unwrap();
        let private_key = parse_private_key(&keypair.private_key_pem).unwrap();

        let mut headers = HashMap::new();
        headers.insert("host".to_string(), "site.example".to_string());
        headers.insert(
            "date".to_string(),
            "Sun, 06 Nov 1994 08:49:37 GMT".to_string(),
        );

        let signed_header_names = &["(request-target)", "host", "date"];

        let sig_header = sign_request(
            &private_key,
            "https://site.example/.ghost/activitypub/users/index#main-key",
            "POST",
            "/inbox",
            &headers,
            signed_header_names,
        )
        .unwrap();

        let parsed_sig = HttpSignature::parse(&sig_header).unwrap();
        let is_valid = verify_signature(
            &parsed_sig,
            &keypair.public_key_pem,
            "POST",
            "/inbox",
            &headers,
        )
        .unwrap();

        assert!(is_valid);
    }

    #[test]
    fn test_verify_rejects_tampered_string() {
        let keypair = generate_rsa_keypair().unwrap();
        let private_key = parse_private_key(&keypair.private_key_pem).unwrap();

        let mut headers = HashMap::new();
        headers.insert("host".to_string(), "site.example".to_string());
        headers.insert("date".to_string(), "Sun, 06 Nov 1994 08:49:37 GMT".to_string());

        let sig_header = sign_request(
            &private_key,
            "key",
            "POST",
            "/inbox",
            &headers,
            &["(request-target)", "host", "date"],
        )
        .unwrap();

        headers.insert("date".to_string(), "Mon, 07 Nov 1994 08:49:37 GMT".to_string());

        let parsed = HttpSignature::parse(&sig_header).unwrap();
        let is_valid =
            verify_signature(&parsed, &keypair.public_key_pem, "POST", "/inbox", &headers)
                .unwrap();
        assert!(!is_valid);
    }

    #[test]
    fn test_digest_round_trip() {
        let body = br#"{"type":"Follow"}"#;
        let digest = calculate_digest(body);

        assert!(digest.starts_with("SHA-256="));
        assert!(verify_digest(body, &digest));
        assert!(!verify_digest(b"other body", &digest));
    }
}
