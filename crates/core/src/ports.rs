//! Trait seams implemented outside this crate.
//!
//! Services talk to the resolver, the job queue, and the image storage
//! adapter through these traits; the federation and queue crates provide
//! the real implementations.

use async_trait::async_trait;
use ghostpub_common::AppResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// Resolution failure taxonomy.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The document does not exist (distinct from the `Ok(None)` of a
    /// clean 404/410 lookup; used by callers that require the object).
    #[error("not-found: {0}")]
    NotFound(String),

    /// The document exists but is not of an accepted type.
    #[error("invalid-type: {0}")]
    InvalidType(String),

    /// The document could not be parsed.
    #[error("invalid-data: {0}")]
    InvalidData(String),

    /// DNS, TLS or connection failure.
    #[error("network-failure: {0}")]
    NetworkFailure(String),

    /// Remote 5xx, timeout, or other transient upstream fault. Retryable.
    #[error("upstream-error: {0}")]
    UpstreamError(String),
}

/// Fetches remote `ActivityPub` documents with signed GETs.
#[async_trait]
pub trait ObjectResolver: Send + Sync {
    /// Fetch an object. `Ok(None)` on 404/410; errors are typed per
    /// [`ResolveError`].
    async fn lookup(&self, iri: &Url) -> Result<Option<Value>, ResolveError>;

    /// Fetch an object, requiring an actor document.
    async fn lookup_actor(&self, iri: &Url) -> Result<Option<Value>, ResolveError>;
}

/// Shared handle to a resolver.
pub type SharedResolver = Arc<dyn ObjectResolver>;

/// One delivery to one inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverRequest {
    /// The local account whose key signs the request.
    pub account_id: i64,
    /// Target inbox URL.
    pub inbox: String,
    /// Activity JSON-LD to deliver.
    pub activity: Value,
}

/// Durable job queue seam.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue one delivery on the primary topic.
    async fn enqueue_deliver(&self, request: DeliverRequest) -> AppResult<()>;

    /// Enqueue an inbox activity for asynchronous handling.
    async fn enqueue_inbox(&self, activity: Value) -> AppResult<()>;
}

/// Shared handle to the queue.
pub type SharedJobQueue = Arc<dyn JobQueue>;

/// Image adapter failure taxonomy.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("file-too-large")]
    FileTooLarge,
    #[error("file-type-not-supported")]
    FileTypeNotSupported,
    #[error("invalid-url")]
    InvalidUrl,
    #[error("error-saving-file")]
    ErrorSavingFile,
}

/// Verifies that an attachment URL points at stored, servable media.
///
/// The storage adapter itself is an external collaborator; this seam is
/// what `create_note` consults before accepting an attachment.
#[async_trait]
pub trait ImageVerifier: Send + Sync {
    /// Check one attachment URL.
    async fn verify_url(&self, url: &Url) -> Result<(), ImageError>;
}

/// Shared handle to an image verifier.
pub type SharedImageVerifier = Arc<dyn ImageVerifier>;

/// No-op queue for tests and single-process development.
#[derive(Clone, Default)]
pub struct NoOpJobQueue;

#[async_trait]
impl JobQueue for NoOpJobQueue {
    async fn enqueue_deliver(&self, _request: DeliverRequest) -> AppResult<()> {
        Ok(())
    }

    async fn enqueue_inbox(&self, _activity: Value) -> AppResult<()> {
        Ok(())
    }
}

/// Image verifier that accepts every HTTPS URL.
#[derive(Clone, Default)]
pub struct NoOpImageVerifier;

#[async_trait]
impl ImageVerifier for NoOpImageVerifier {
    async fn verify_url(&self, url: &Url) -> Result<(), ImageError> {
        if url.scheme() == "https" || url.scheme() == "http" {
            Ok(())
        } else {
            Err(ImageError::InvalidUrl)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_image_verifier_rejects_non_http() {
        let verifier = NoOpImageVerifier;
        let url = Url::parse("ftp://site.example/image.png").unwrap();
        assert_eq!(
            verifier.verify_url(&url).await.unwrap_err(),
            ImageError::InvalidUrl
        );

        let url = Url::parse("https://site.example/image.png").unwrap();
        assert!(verifier.verify_url(&url).await.is_ok());
    }
}
