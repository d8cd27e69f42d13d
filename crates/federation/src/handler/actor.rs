//! Actor document dispatcher.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use ghostpub_common::ApUrls;
use ghostpub_db::repositories::AccountRepository;
use tracing::{error, info};

use crate::objects::ApActor;

/// Content type for `ActivityPub` responses.
pub const ACTIVITY_JSON: &str = "application/activity+json; charset=utf-8";

/// State required for the actor handler.
#[derive(Clone)]
pub struct ActorState {
    pub account_repo: AccountRepository,
    pub urls: ApUrls,
}

/// Handle GET `users/{handle}`.
pub async fn actor_handler(
    State(state): State<ActorState>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    info!(handle = %handle, "Actor lookup");

    let account = match state.account_repo.find_internal_by_username(&handle).await {
        Ok(Some(account)) => account,
        Ok(None) => return (StatusCode::NOT_FOUND, "Actor not found").into_response(),
        Err(e) => {
            error!(error = %e, "Failed to fetch account");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    match ApActor::from_internal_account(&account, &state.urls) {
        Ok(actor) => (
            StatusCode::OK,
            [("Content-Type", ACTIVITY_JSON)],
            Json(actor),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to build actor document");
            (StatusCode::INTERNAL_SERVER_ERROR, "Actor build error").into_response()
        }
    }
}
