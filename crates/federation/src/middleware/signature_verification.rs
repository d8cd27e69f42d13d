//! Inbound HTTP signature verification.
//!
//! Incoming POSTs carry a draft-cavage signature over at least
//! `(request-target)`, `host`, `date` and `digest`. The signing key is
//! resolved from the local store for our own actors and from the remote
//! actor document otherwise.

use axum::http::HeaderMap;
use ghostpub_common::{verify_digest, verify_signature, AppError, AppResult, HttpSignature};
use ghostpub_core::ports::SharedResolver;
use ghostpub_db::repositories::AccountRepository;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Verifies inbound request signatures.
#[derive(Clone)]
pub struct SignatureVerifier {
    account_repo: AccountRepository,
    resolver: SharedResolver,
    /// Development bypass; verification always runs when false.
    pub skip_verification: bool,
}

impl SignatureVerifier {
    /// Create a new verifier.
    #[must_use]
    pub const fn new(
        account_repo: AccountRepository,
        resolver: SharedResolver,
        skip_verification: bool,
    ) -> Self {
        Self {
            account_repo,
            resolver,
            skip_verification,
        }
    }

    /// Resolve the public key PEM for a signature's key id.
    async fn public_key_pem(&self, key_id: &str) -> AppResult<String> {
        let actor_iri = key_id.split('#').next().unwrap_or(key_id);

        if let Some(account) = self.account_repo.find_by_ap_id(actor_iri).await?
            && let Some(pem) = account.public_key
        {
            return Ok(pem);
        }

        let iri = Url::parse(actor_iri)
            .map_err(|e| AppError::BadRequest(format!("Invalid keyId: {e}")))?;
        let actor = self
            .resolver
            .lookup_actor(&iri)
            .await
            .map_err(|e| AppError::Federation(format!("Failed to fetch signer: {e}")))?
            .ok_or_else(|| AppError::BadRequest(format!("Signer is gone: {actor_iri}")))?;

        actor
            .get("publicKey")
            .and_then(|pk| pk.get("publicKeyPem"))
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| AppError::BadRequest("Signer has no public key".to_string()))
    }
}

/// Verify an inbound inbox request. Returns the verified key id.
pub async fn verify_inbox_request(
    verifier: &SignatureVerifier,
    headers: &HeaderMap,
    method: &str,
    path: &str,
    body: &[u8],
) -> AppResult<Option<String>> {
    if verifier.skip_verification {
        debug!("Signature verification skipped by configuration");
        return Ok(None);
    }

    let signature_header = headers
        .get("signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Signature header".to_string()))?;

    let signature = HttpSignature::parse(signature_header)?;

    if let Some(digest_header) = headers.get("digest").and_then(|v| v.to_str().ok())
        && !verify_digest(body, digest_header)
    {
        return Err(AppError::BadRequest("Digest mismatch".to_string()));
    }

    let public_key_pem = verifier.public_key_pem(&signature.key_id).await?;

    let mut verify_headers = HashMap::new();
    for header_name in &signature.headers {
        if header_name == "(request-target)" {
            continue;
        }
        if let Some(value) = headers
            .get(header_name.as_str())
            .and_then(|v| v.to_str().ok())
        {
            verify_headers.insert(header_name.to_lowercase(), value.to_string());
        }
    }

    let valid = verify_signature(&signature, &public_key_pem, method, path, &verify_headers)?;
    if !valid {
        return Err(AppError::BadRequest("Invalid signature".to_string()));
    }

    debug!(key_id = %signature.key_id, "Signature verified");
    Ok(Some(signature.key_id))
}
