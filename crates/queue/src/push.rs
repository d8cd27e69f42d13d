//! Pub/Sub push endpoints.
//!
//! A managed push queue delivers messages by HTTP POST with a base64
//! envelope. A 2xx response acks the message; anything else nacks it and
//! the broker redelivers, up to its own attempt cap. The handler logic is
//! the same worker code the Redis-backed queue runs.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::jobs::{DeliverJob, InboxJob};
use crate::workers::{run_deliver, run_inbox, DeliverContext, InboxContext};

/// State required for the push endpoints.
#[derive(Clone)]
pub struct PushState {
    pub deliver_ctx: DeliverContext,
    pub inbox_ctx: InboxContext,
    /// Shared token authenticating the broker, when configured.
    pub push_token: Option<String>,
}

/// Pub/Sub push envelope.
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,
    #[serde(default)]
    pub subscription: Option<String>,
}

/// The enveloped message: base64 payload plus broker metadata.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub data: String,
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Query parameters for push endpoints.
#[derive(Debug, Deserialize)]
pub struct PushQuery {
    #[serde(default)]
    pub token: Option<String>,
}

fn authorized(state: &PushState, query: &PushQuery) -> bool {
    match &state.push_token {
        Some(expected) => query.token.as_deref() == Some(expected.as_str()),
        None => true,
    }
}

fn decode_payload(envelope: &PushEnvelope) -> Option<Value> {
    let bytes = BASE64.decode(&envelope.message.data).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Handle POST `pubsub/fedify/push`: delivery messages.
pub async fn fedify_push_handler(
    State(state): State<PushState>,
    Query(query): Query<PushQuery>,
    Json(envelope): Json<PushEnvelope>,
) -> impl IntoResponse {
    if !authorized(&state, &query) {
        warn!("Push request with bad token");
        return StatusCode::UNAUTHORIZED;
    }

    let Some(payload) = decode_payload(&envelope) else {
        // A permanently bad envelope must be acked or it loops forever.
        warn!(message_id = ?envelope.message.message_id, "Unparsable push envelope");
        return StatusCode::NO_CONTENT;
    };
    let Ok(job) = serde_json::from_value::<DeliverJob>(payload) else {
        warn!(message_id = ?envelope.message.message_id, "Push payload is not a delivery");
        return StatusCode::NO_CONTENT;
    };

    info!(
        inbox = %job.inbox,
        subscription = ?envelope.subscription,
        "Handling pushed delivery"
    );

    match run_deliver(job, &state.deliver_ctx).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Handle POST `pubsub/ghost/push`: inbound activity messages.
pub async fn ghost_push_handler(
    State(state): State<PushState>,
    Query(query): Query<PushQuery>,
    Json(envelope): Json<PushEnvelope>,
) -> impl IntoResponse {
    if !authorized(&state, &query) {
        warn!("Push request with bad token");
        return StatusCode::UNAUTHORIZED;
    }

    let Some(payload) = decode_payload(&envelope) else {
        warn!(message_id = ?envelope.message.message_id, "Unparsable push envelope");
        return StatusCode::NO_CONTENT;
    };

    // The payload is either a wrapped job or a bare activity.
    let job = serde_json::from_value::<InboxJob>(payload.clone())
        .unwrap_or_else(|_| InboxJob::new(payload));

    match run_inbox(job, &state.inbox_ctx).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
