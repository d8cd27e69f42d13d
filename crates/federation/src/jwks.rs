//! JWKS cache for the admin authentication layer.
//!
//! The JWT verifier is an external collaborator, but key documents are
//! cached here: one KV entry per hostname, refreshed with a bounded
//! retry loop so a single slow rotation does not fail a request burst.

use ghostpub_common::{AppError, AppResult};
use ghostpub_db::SharedObjectStore;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const JWKS_FETCH_ATTEMPTS: u32 = 5;
const JWKS_INITIAL_BACKOFF_MS: u64 = 200;

/// Hostname-keyed JWKS cache backed by the object store.
#[derive(Clone)]
pub struct JwksCache {
    store: SharedObjectStore,
    client: Client,
}

impl JwksCache {
    /// Create a new cache.
    ///
    /// # Panics
    /// Panics if the HTTP client fails to build.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(store: SharedObjectStore) -> Self {
        Self {
            store,
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn cache_key(host: &str) -> String {
        format!("jwks:{host}")
    }

    /// Cached JWKS document for a host, if present.
    pub async fn get(&self, host: &str) -> AppResult<Option<Value>> {
        self.store.get(&Self::cache_key(host)).await
    }

    /// Fetch a host's JWKS document with exponential backoff and cache it.
    pub async fn refresh(&self, host: &str) -> AppResult<Value> {
        let url = format!("https://{host}/members/.well-known/jwks.json");
        let mut backoff = Duration::from_millis(JWKS_INITIAL_BACKOFF_MS);
        let mut last_error = String::new();

        for attempt in 1..=JWKS_FETCH_ATTEMPTS {
            match self.fetch_once(&url).await {
                Ok(jwks) => {
                    self.store.set(&Self::cache_key(host), jwks.clone()).await?;
                    debug!(host = %host, attempt, "Cached JWKS document");
                    return Ok(jwks);
                }
                Err(e) => {
                    warn!(host = %host, attempt, error = %e, "JWKS fetch failed");
                    last_error = e.to_string();
                }
            }
            if attempt < JWKS_FETCH_ATTEMPTS {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }

        Err(AppError::ExternalService(format!(
            "JWKS fetch for {host} failed after {JWKS_FETCH_ATTEMPTS} attempts: {last_error}"
        )))
    }

    /// Cached document, refreshed on miss.
    pub async fn get_or_refresh(&self, host: &str) -> AppResult<Value> {
        if let Some(cached) = self.get(host).await? {
            return Ok(cached);
        }
        self.refresh(host).await
    }

    async fn fetch_once(&self, url: &str) -> AppResult<Value> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "{url} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_hostname_scoped() {
        assert_eq!(JwksCache::cache_key("site.example"), "jwks:site.example");
        assert_ne!(
            JwksCache::cache_key("a.example"),
            JwksCache::cache_key("b.example")
        );
    }
}
