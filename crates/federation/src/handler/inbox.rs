//! Inbox handler for receiving `ActivityPub` activities.
//!
//! The transport verifies the signature and parses the body; the actual
//! work happens in a queue task so redelivery and retry are uniform with
//! outbound deliveries.

use axum::{
    body::Bytes,
    extract::{OriginalUri, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use ghostpub_core::ports::SharedJobQueue;
use serde_json::Value;
use tracing::{info, warn};

use crate::activities::InboxActivity;
use crate::middleware::{verify_inbox_request, SignatureVerifier};

/// State required for the inbox handler.
#[derive(Clone)]
pub struct InboxState {
    pub queue: SharedJobQueue,
    pub verifier: SignatureVerifier,
}

impl InboxState {
    /// Create a new inbox state.
    #[must_use]
    pub const fn new(queue: SharedJobQueue, verifier: SignatureVerifier) -> Self {
        Self { queue, verifier }
    }
}

/// Handle POSTs to the shared inbox and per-actor inboxes.
pub async fn inbox_handler(
    State(state): State<InboxState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    // Syntax errors are the client's fault.
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Inbox body is not JSON");
            return StatusCode::BAD_REQUEST;
        }
    };
    let activity: InboxActivity = match serde_json::from_value(raw.clone()) {
        Ok(a) => a,
        Err(e) => {
            warn!(error = %e, "Inbox body is not an activity");
            return StatusCode::BAD_REQUEST;
        }
    };

    if let Err(e) = verify_inbox_request(
        &state.verifier,
        &headers,
        "POST",
        uri.path(),
        &body,
    )
    .await
    {
        warn!(error = %e, "Inbox signature rejected");
        return e.status_code();
    }

    info!(
        activity_type = activity.activity_type(),
        actor = ?activity.actor(),
        "Accepted activity for processing"
    );

    match state.queue.enqueue_inbox(raw).await {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            warn!(error = %e, "Failed to enqueue inbox activity");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
