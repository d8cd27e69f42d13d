//! Publish webhook: the hosted site announces a newly published post.

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{DateTime, TimeZone, Utc};
use ghostpub_common::ApUrls;
use ghostpub_core::services::{AccountService, ArticleDraft, PostService};
use ghostpub_db::entities::post::Audience;
use ghostpub_db::repositories::SiteRepository;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::net::SocketAddr;
use tracing::{info, warn};

/// Maximum accepted clock skew on the webhook timestamp.
const MAX_SKEW_MS: i64 = 5 * 60 * 1000;

/// State required for the webhook handler.
#[derive(Clone)]
pub struct WebhookState {
    pub site_repo: SiteRepository,
    pub accounts: AccountService,
    pub posts: PostService,
    pub urls: ApUrls,
    pub site_handle: String,
    /// When non-empty, only these source IPs may call the webhook.
    pub allowed_source_ips: Vec<String>,
}

/// `post.published` webhook payload.
#[derive(Debug, Deserialize)]
pub struct PostPublishedPayload {
    pub post: PostEnvelope,
}

#[derive(Debug, Deserialize)]
pub struct PostEnvelope {
    pub current: PublishedPost,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PublishedPost {
    pub uuid: Option<String>,
    pub title: Option<String>,
    pub html: Option<String>,
    pub excerpt: Option<String>,
    pub custom_excerpt: Option<String>,
    pub feature_image: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub visibility: Option<String>,
    pub reading_time: Option<i32>,
}

/// Handle POST `webhooks/post/published`.
pub async fn post_published_handler(
    State(state): State<WebhookState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    if !state.allowed_source_ips.is_empty() {
        let source = addr.ip().to_string();
        if !state.allowed_source_ips.contains(&source) {
            warn!(source = %source, "Webhook from unexpected source IP");
            return StatusCode::FORBIDDEN;
        }
    }

    let Some(signature_header) = headers
        .get("x-ghost-signature")
        .and_then(|v| v.to_str().ok())
    else {
        warn!("Webhook without signature header");
        return StatusCode::UNAUTHORIZED;
    };

    let site = match state.site_repo.find_by_host(state.urls.host()).await {
        Ok(Some(site)) => site,
        Ok(None) => {
            warn!(host = %state.urls.host(), "No site provisioned for host");
            return StatusCode::NOT_FOUND;
        }
        Err(e) => {
            warn!(error = %e, "Site lookup failed");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    if !verify_webhook_signature(&site.webhook_secret, &body, signature_header, Utc::now()) {
        warn!("Webhook signature rejected");
        return StatusCode::UNAUTHORIZED;
    }

    let payload: PostPublishedPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Webhook payload does not parse");
            return StatusCode::BAD_REQUEST;
        }
    };
    let published = payload.post.current;

    let author = match state
        .accounts
        .ensure_internal_account(&site, &state.site_handle)
        .await
    {
        Ok(account) => account,
        Err(e) => {
            warn!(error = %e, "Failed to ensure internal account");
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };

    let audience = match published.visibility.as_deref() {
        None | Some("public") => Audience::Public,
        Some(_) => Audience::FollowersOnly,
    };

    let draft = ArticleDraft {
        uuid: published.uuid,
        title: published.title,
        excerpt: published.custom_excerpt.or(published.excerpt),
        content: published.html,
        url: published.url,
        image_url: published.feature_image,
        published_at: published.published_at,
        reading_time_minutes: published.reading_time.unwrap_or(0),
        audience,
    };

    match state.posts.create_article(&author, draft).await {
        Ok(post) => {
            info!(post_id = post.id, "Published article federated");
            StatusCode::OK
        }
        Err(e) => {
            warn!(error = %e, "Failed to federate published article");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Verify `x-ghost-signature: sha256=<hex>, t=<ms>`: an HMAC-SHA256 over
/// the body concatenated with the millisecond timestamp, within skew.
#[must_use]
pub fn verify_webhook_signature(
    secret: &str,
    body: &[u8],
    header: &str,
    now: DateTime<Utc>,
) -> bool {
    let mut provided_hex = None;
    let mut timestamp_ms = None;

    for part in header.split(',') {
        let part = part.trim();
        if let Some(hex) = part.strip_prefix("sha256=") {
            provided_hex = Some(hex.to_string());
        } else if let Some(t) = part.strip_prefix("t=") {
            timestamp_ms = t.parse::<i64>().ok();
        }
    }

    let (Some(provided_hex), Some(timestamp_ms)) = (provided_hex, timestamp_ms) else {
        return false;
    };

    let Some(timestamp) = Utc.timestamp_millis_opt(timestamp_ms).single() else {
        return false;
    };
    if (now - timestamp).num_milliseconds().abs() > MAX_SKEW_MS {
        return false;
    }

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.update(timestamp_ms.to_string().as_bytes());

    let Ok(provided) = hex::decode(provided_hex) else {
        return false;
    };
    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8], timestamp_ms: i64) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        mac.update(timestamp_ms.to_string().as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());
        format!("sha256={digest}, t={timestamp_ms}")
    }

    #[test]
    fn test_valid_signature_accepted() {
        let now = Utc::now();
        let body = br#"{"post":{"current":{"title":"Hello"}}}"#;
        let header = sign("secret", body, now.timestamp_millis());

        assert!(verify_webhook_signature("secret", body, &header, now));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = Utc::now();
        let body = b"{}";
        let header = sign("secret", body, now.timestamp_millis());

        assert!(!verify_webhook_signature("other", body, &header, now));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let now = Utc::now();
        let header = sign("secret", b"{}", now.timestamp_millis());

        assert!(!verify_webhook_signature(
            "secret",
            b"{\"x\":1}",
            &header,
            now
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let now = Utc::now();
        let stale = now.timestamp_millis() - (6 * 60 * 1000);
        let body = b"{}";
        let header = sign("secret", body, stale);

        assert!(!verify_webhook_signature("secret", body, &header, now));
    }

    #[test]
    fn test_future_timestamp_within_skew_accepted() {
        let now = Utc::now();
        let slightly_ahead = now.timestamp_millis() + (2 * 60 * 1000);
        let body = b"{}";
        let header = sign("secret", body, slightly_ahead);

        assert!(verify_webhook_signature("secret", body, &header, now));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let now = Utc::now();
        assert!(!verify_webhook_signature("secret", b"{}", "sha256=zz", now));
        assert!(!verify_webhook_signature("secret", b"{}", "t=123", now));
        assert!(!verify_webhook_signature("secret", b"{}", "", now));
    }
}
