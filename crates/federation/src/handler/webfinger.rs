//! WebFinger responder.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use ghostpub_common::ApUrls;
use ghostpub_db::repositories::AccountRepository;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// State required for the WebFinger handler.
#[derive(Clone)]
pub struct WebfingerState {
    pub account_repo: AccountRepository,
    pub urls: ApUrls,
}

/// WebFinger query parameters.
#[derive(Debug, Deserialize)]
pub struct WebfingerQuery {
    pub resource: String,
}

/// Handle GET `/.well-known/webfinger?resource=acct:user@host`.
pub async fn webfinger_handler(
    State(state): State<WebfingerState>,
    Query(query): Query<WebfingerQuery>,
) -> impl IntoResponse {
    info!(resource = %query.resource, "WebFinger lookup");

    let Some(acct) = query.resource.strip_prefix("acct:") else {
        return (StatusCode::BAD_REQUEST, "Unsupported resource").into_response();
    };
    let Some((username, host)) = acct.split_once('@') else {
        return (StatusCode::BAD_REQUEST, "Malformed acct resource").into_response();
    };

    if host != state.urls.host() {
        return (StatusCode::NOT_FOUND, "Unknown host").into_response();
    }

    let account = match state.account_repo.find_internal_by_username(username).await {
        Ok(Some(account)) => account,
        Ok(None) => return (StatusCode::NOT_FOUND, "Unknown account").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "WebFinger lookup failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response();
        }
    };

    let jrd = json!({
        "subject": format!("acct:{username}@{host}"),
        "aliases": [account.ap_id],
        "links": [
            {
                "rel": "self",
                "type": "application/activity+json",
                "href": account.ap_id,
            }
        ]
    });

    (
        StatusCode::OK,
        [("Content-Type", "application/jrd+json; charset=utf-8")],
        Json(jrd),
    )
        .into_response()
}
