//! Remote object resolver: signed GETs for `ActivityPub` IRIs.

use async_trait::async_trait;
use chrono::Utc;
use ghostpub_common::{calculate_digest, parse_private_key, sign_request};
use ghostpub_core::ports::{ObjectResolver, ResolveError};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::{Host, Url};

/// Failed actor lookups are remembered briefly so a burst of activities
/// from a dead instance does not refetch it per activity.
const NEGATIVE_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

const ACCEPT_HEADER: &str =
    "application/activity+json, application/ld+json; profile=\"https://www.w3.org/ns/activitystreams\"";

const ACTOR_TYPES: &[&str] = &["Person", "Service", "Application", "Group", "Organization"];

/// Key material for signed fetches.
#[derive(Clone)]
pub struct FetchSigner {
    /// Key id advertised in the signature (actor URL + fragment).
    pub key_id: String,
    /// PEM private key.
    pub private_key_pem: String,
}

/// HTTP resolver for remote `ActivityPub` documents.
#[derive(Clone)]
pub struct ApResolver {
    client: Client,
    user_agent: String,
    signer: Option<FetchSigner>,
    allow_private_address: bool,
    negative_cache: Arc<Mutex<HashMap<String, Instant>>>,
}

impl ApResolver {
    /// Create a resolver.
    ///
    /// # Panics
    /// Panics if the HTTP client fails to build.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(
        instance_url: &str,
        timeout: Duration,
        signer: Option<FetchSigner>,
        allow_private_address: bool,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            user_agent: format!("ghostpub/{} (+{instance_url})", env!("CARGO_PKG_VERSION")),
            signer,
            allow_private_address,
            negative_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn negative_cached(&self, iri: &Url) -> bool {
        let Ok(mut cache) = self.negative_cache.lock() else {
            return false;
        };
        match cache.get(iri.as_str()) {
            Some(failed_at) if failed_at.elapsed() < NEGATIVE_CACHE_TTL => true,
            Some(_) => {
                cache.remove(iri.as_str());
                false
            }
            None => false,
        }
    }

    fn record_negative(&self, iri: &Url) {
        if let Ok(mut cache) = self.negative_cache.lock() {
            cache.insert(iri.to_string(), Instant::now());
        }
    }

    /// Install the signing key after the default account exists.
    #[must_use]
    pub fn with_signer(mut self, signer: FetchSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    fn guard_address(&self, iri: &Url) -> Result<(), ResolveError> {
        if self.allow_private_address {
            return Ok(());
        }
        if is_private_host(iri) {
            return Err(ResolveError::NetworkFailure(format!(
                "Refusing to fetch private address: {iri}"
            )));
        }
        Ok(())
    }

    fn signature_headers(&self, iri: &Url) -> Result<Vec<(String, String)>, ResolveError> {
        let Some(signer) = &self.signer else {
            return Ok(Vec::new());
        };

        let host = iri
            .host_str()
            .ok_or_else(|| ResolveError::InvalidData(format!("IRI has no host: {iri}")))?
            .to_string();
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let digest = calculate_digest(b"");

        let mut headers = HashMap::new();
        headers.insert("host".to_string(), host.clone());
        headers.insert("date".to_string(), date.clone());
        headers.insert("digest".to_string(), digest.clone());

        let private_key = parse_private_key(&signer.private_key_pem)
            .map_err(|e| ResolveError::InvalidData(e.to_string()))?;
        let path = match iri.query() {
            Some(q) => format!("{}?{q}", iri.path()),
            None => iri.path().to_string(),
        };
        let signature = sign_request(
            &private_key,
            &signer.key_id,
            "GET",
            &path,
            &headers,
            &["(request-target)", "host", "date"],
        )
        .map_err(|e| ResolveError::InvalidData(e.to_string()))?;

        Ok(vec![
            ("Host".to_string(), host),
            ("Date".to_string(), date),
            ("Digest".to_string(), digest),
            ("Signature".to_string(), signature),
        ])
    }

    async fn fetch(&self, iri: &Url) -> Result<Option<Value>, ResolveError> {
        self.guard_address(iri)?;

        debug!(iri = %iri, "Resolving remote object");

        let mut request = self
            .client
            .get(iri.clone())
            .header("User-Agent", &self.user_agent)
            .header("Accept", ACCEPT_HEADER);
        for (name, value) in self.signature_headers(iri)? {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            debug!(iri = %iri, status = %status, "Object is absent");
            return Ok(None);
        }
        if status.is_server_error() {
            return Err(ResolveError::UpstreamError(format!(
                "{iri} returned {status}"
            )));
        }
        if !status.is_success() {
            return Err(ResolveError::NotFound(format!("{iri} returned {status}")));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ResolveError::InvalidData(format!("{iri}: {e}")))?;
        Ok(Some(value))
    }
}

fn map_transport_error(err: reqwest::Error) -> ResolveError {
    if err.is_timeout() {
        ResolveError::UpstreamError(format!("timeout: {err}"))
    } else if err.is_connect() {
        ResolveError::NetworkFailure(err.to_string())
    } else {
        ResolveError::NetworkFailure(err.to_string())
    }
}

fn is_private_host(iri: &Url) -> bool {
    match iri.host() {
        Some(Host::Ipv4(ip)) => {
            ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
        }
        Some(Host::Ipv6(ip)) => {
            let ip = IpAddr::V6(ip);
            ip.is_loopback() || ip.is_unspecified()
        }
        Some(Host::Domain(domain)) => domain == "localhost" || domain.ends_with(".localhost"),
        None => true,
    }
}

#[async_trait]
impl ObjectResolver for ApResolver {
    async fn lookup(&self, iri: &Url) -> Result<Option<Value>, ResolveError> {
        self.fetch(iri).await
    }

    async fn lookup_actor(&self, iri: &Url) -> Result<Option<Value>, ResolveError> {
        if self.negative_cached(iri) {
            debug!(iri = %iri, "Actor lookup negative-cached");
            return Ok(None);
        }

        let Some(value) = self.fetch(iri).await? else {
            self.record_negative(iri);
            return Ok(None);
        };

        let actor_type = value.get("type").and_then(Value::as_str).unwrap_or("");
        if !ACTOR_TYPES.contains(&actor_type) {
            warn!(iri = %iri, actor_type = %actor_type, "Document is not an actor");
            return Err(ResolveError::InvalidType(actor_type.to_string()));
        }

        Ok(Some(value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_private_host_detection() {
        let private = [
            "http://127.0.0.1/x",
            "http://10.0.0.5/x",
            "http://192.168.1.1/x",
            "http://localhost/x",
            "http://foo.localhost/x",
        ];
        for iri in private {
            assert!(is_private_host(&Url::parse(iri).unwrap()), "{iri}");
        }

        assert!(!is_private_host(&Url::parse("https://r.example/x").unwrap()));
        assert!(!is_private_host(&Url::parse("https://8.8.8.8/x").unwrap()));
    }

    #[test]
    fn test_resolver_user_agent() {
        let resolver = ApResolver::new(
            "https://site.example",
            Duration::from_secs(30),
            None,
            false,
        );
        assert!(resolver.user_agent.starts_with("ghostpub/"));
        assert!(resolver.user_agent.contains("site.example"));
    }

    #[test]
    fn test_negative_cache_round_trip() {
        let resolver = ApResolver::new(
            "https://site.example",
            Duration::from_secs(30),
            None,
            false,
        );
        let iri = Url::parse("https://gone.example/u/alice").unwrap();

        assert!(!resolver.negative_cached(&iri));
        resolver.record_negative(&iri);
        assert!(resolver.negative_cached(&iri));

        // Other IRIs are unaffected
        let other = Url::parse("https://gone.example/u/bob").unwrap();
        assert!(!resolver.negative_cached(&other));
    }

    #[test]
    fn test_unsigned_fetch_has_no_signature_headers() {
        let resolver = ApResolver::new(
            "https://site.example",
            Duration::from_secs(30),
            None,
            false,
        );
        let headers = resolver
            .signature_headers(&Url::parse("https://r.example/u/alice").unwrap())
            .unwrap();
        assert!(headers.is_empty());
    }
}
