//! Stored-object dispatchers.
//!
//! GETs of persisted activities and objects serve the stored JSON-LD
//! bytes from the object store; nothing is rebuilt from relational rows.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use ghostpub_common::ApUrls;
use ghostpub_db::SharedObjectStore;
use tracing::{debug, error};

use super::actor::ACTIVITY_JSON;

/// Object kinds with a dispatcher route.
pub const OBJECT_KINDS: &[&str] = &[
    "article", "note", "follow", "accept", "create", "update", "like", "announce", "undo",
    "delete", "reject",
];

/// State required for object dispatchers.
#[derive(Clone)]
pub struct ObjectState {
    pub store: SharedObjectStore,
    pub urls: ApUrls,
}

/// Handle GET `{kind}/{id}` for every stored object kind.
pub async fn object_handler(
    State(state): State<ObjectState>,
    Path((kind, id)): Path<(String, String)>,
) -> impl IntoResponse {
    if !OBJECT_KINDS.contains(&kind.as_str()) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Ok(iri) = state.urls.object(&kind, &id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match state.store.get(iri.as_str()).await {
        Ok(Some(value)) => {
            debug!(iri = %iri, "Serving stored object");
            (StatusCode::OK, [("Content-Type", ACTIVITY_JSON)], Json(value)).into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            error!(error = %e, iri = %iri, "Object store read failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
