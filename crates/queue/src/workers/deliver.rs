//! Deliver worker: signs and posts one activity to one inbox.

use apalis::prelude::*;
use chrono::Utc;
use ghostpub_common::{calculate_digest, parse_private_key, sign_request};
use ghostpub_db::repositories::AccountRepository;
use reqwest::Client;
use std::collections::HashMap;
use tracing::{error, info, warn};
use url::Url;

use crate::classifier::{classify, delivery_failure_message};
use crate::jobs::DeliverJob;
use crate::queue_impl::RedisJobQueue;
use crate::retry::{route_failure, FailureRoute, RetryConfig};

/// Context for the deliver worker.
#[derive(Clone)]
pub struct DeliverContext {
    pub account_repo: AccountRepository,
    pub http_client: Client,
    pub user_agent: String,
    pub retry_config: RetryConfig,
    /// Present when the retry topic is enabled.
    pub retry_queue: Option<RedisJobQueue>,
}

impl DeliverContext {
    /// Create a new deliver context.
    ///
    /// # Panics
    /// Panics if the HTTP client fails to build.
    #[must_use]
    #[allow(clippy::expect_used)] // Client build only fails with incompatible TLS settings
    pub fn new(
        account_repo: AccountRepository,
        user_agent: String,
        retry_config: RetryConfig,
        retry_queue: Option<RedisJobQueue>,
    ) -> Self {
        Self {
            account_repo,
            http_client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            user_agent,
            retry_config,
            retry_queue,
        }
    }
}

/// Worker function for delivering activities.
///
/// # Errors
/// Returns an error only when redelivery should happen through the
/// primary topic (retry topic disabled).
pub async fn deliver_worker(job: DeliverJob, ctx: Data<DeliverContext>) -> Result<(), Error> {
    run_deliver(job, &ctx).await
}

/// Deliver one job; shared by the worker and the Pub/Sub push endpoint.
///
/// # Errors
/// Returns an error only when redelivery should happen through the
/// primary topic (retry topic disabled).
pub async fn run_deliver(job: DeliverJob, ctx: &DeliverContext) -> Result<(), Error> {
    // Honor retry backoff carried on the job.
    if let Some(not_before) = job.not_before {
        let wait = not_before - Utc::now();
        if let Ok(wait) = wait.to_std() {
            tokio::time::sleep(wait).await;
        }
    }

    info!(
        inbox = %job.inbox,
        attempt = job.attempt,
        activity = job.activity_id(),
        "Delivering activity"
    );

    let Err(message) = deliver_activity(&job, ctx).await else {
        info!(inbox = %job.inbox, "Activity delivered");
        return Ok(());
    };

    let class = classify(&message);
    if class.reportable {
        error!(inbox = %job.inbox, attempt = job.attempt, error = %message, "Delivery failed");
    } else {
        warn!(inbox = %job.inbox, attempt = job.attempt, error = %message, "Delivery failed");
    }

    match route_failure(class, job.attempt, &ctx.retry_config) {
        FailureRoute::Ack => {
            if class.retryable {
                warn!(
                    inbox = %job.inbox,
                    attempts = job.attempt,
                    "Delivery attempts exhausted, dropping message"
                );
            }
            Ok(())
        }
        FailureRoute::Retry(delay) => match &ctx.retry_queue {
            Some(retry_queue) => {
                let not_before = Utc::now()
                    + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
                retry_queue
                    .enqueue_retry(job.next_attempt(not_before))
                    .await
                    .map_err(|e| {
                        Error::Failed(
                            Box::<dyn std::error::Error + Send + Sync>::from(e.to_string())
                                .into(),
                        )
                    })?;
                Ok(())
            }
            // No retry topic: fail the job so the primary topic redelivers.
            None => Err(Error::Failed(
                Box::<dyn std::error::Error + Send + Sync>::from(message).into(),
            )),
        },
    }
}

async fn deliver_activity(job: &DeliverJob, ctx: &DeliverContext) -> Result<(), String> {
    let account = ctx
        .account_repo
        .find_by_id(job.account_id)
        .await
        .map_err(|e| format!("Failed to load sender account: {e}"))?
        .ok_or_else(|| format!("Sender account {} is gone", job.account_id))?;

    let private_key_pem = account
        .private_key
        .as_ref()
        .ok_or_else(|| format!("Account {} has no signing key", account.id))?;
    let key_id = format!("{}#main-key", account.ap_id);

    let inbox_url =
        Url::parse(&job.inbox).map_err(|e| format!("Invalid inbox URL {}: {e}", job.inbox))?;
    let host = inbox_url
        .host_str()
        .ok_or_else(|| format!("Inbox URL has no host: {}", job.inbox))?
        .to_string();
    let path = inbox_url.path().to_string();

    let body =
        serde_json::to_vec(&job.activity).map_err(|e| format!("Activity unserializable: {e}"))?;
    let digest = calculate_digest(&body);
    let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

    let mut headers = HashMap::new();
    headers.insert("host".to_string(), host.clone());
    headers.insert("date".to_string(), date.clone());
    headers.insert("digest".to_string(), digest.clone());

    let private_key =
        parse_private_key(private_key_pem).map_err(|e| format!("Bad signing key: {e}"))?;
    let signature = sign_request(
        &private_key,
        &key_id,
        "POST",
        &path,
        &headers,
        &["(request-target)", "host", "date", "digest"],
    )
    .map_err(|e| format!("Signing failed: {e}"))?;

    let response = ctx
        .http_client
        .post(&job.inbox)
        .header("Host", host)
        .header("Date", date)
        .header("Digest", digest)
        .header("Signature", signature)
        .header("Content-Type", "application/activity+json")
        .header("Accept", "application/activity+json")
        .header("User-Agent", &ctx.user_agent)
        .body(body)
        .send()
        .await
        .map_err(|e| transport_failure_message(&inbox_url, &e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(delivery_failure_message(
        job.activity_id(),
        &job.inbox,
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        &body,
    ))
}

/// Normalize transport failures into the classifier's vocabulary.
fn transport_failure_message(inbox: &Url, err: &reqwest::Error) -> String {
    let chain = error_chain(err);
    let host = inbox.host_str().unwrap_or("");

    if chain.contains("dns error") || chain.contains("failed to lookup address") {
        return format!("getaddrinfo ENOTFOUND {host}");
    }
    if chain.contains("certificate") && (chain.contains("name") || chain.contains("hostname")) {
        return format!("Hostname/IP does not match certificate's altnames: Host: {host}");
    }
    chain
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::classifier::classify;

    #[test]
    fn test_normalized_dns_failure_classifies_as_silent() {
        // The normalized message must hit the DNS rule, not the fallback.
        let message = "getaddrinfo ENOTFOUND gone.example";
        let class = classify(message);
        assert!(!class.retryable);
        assert!(!class.reportable);
    }

    #[test]
    fn test_status_failure_message_matches_classifier() {
        let message = delivery_failure_message(
            "https://site.example/.ghost/activitypub/create/abc",
            "https://r.example/inbox",
            502,
            "Bad Gateway",
            "boom",
        );
        assert!(classify(&message).retryable);

        let message = delivery_failure_message(
            "https://site.example/.ghost/activitypub/create/abc",
            "https://r.example/inbox",
            410,
            "Gone",
            "",
        );
        assert!(!classify(&message).retryable);
    }
}
