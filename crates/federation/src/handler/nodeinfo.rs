//! NodeInfo responder.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use ghostpub_common::ApUrls;
use serde_json::json;

/// State required for the NodeInfo handlers.
#[derive(Clone)]
pub struct NodeInfoState {
    pub urls: ApUrls,
}

/// Handle GET `/.well-known/nodeinfo`.
pub async fn well_known_nodeinfo(State(state): State<NodeInfoState>) -> impl IntoResponse {
    let href = state
        .urls
        .base_url()
        .join("/.ghost/activitypub/nodeinfo/2.1")
        .map_or_else(|_| String::new(), |u| u.to_string());

    Json(json!({
        "links": [
            {
                "rel": "http://nodeinfo.diaspora.software/ns/schema/2.1",
                "href": href,
            }
        ]
    }))
}

/// Handle GET `nodeinfo/2.1`.
pub async fn nodeinfo_2_1(State(_state): State<NodeInfoState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            "Content-Type",
            "application/json; profile=\"http://nodeinfo.diaspora.software/ns/schema/2.1#\"",
        )],
        Json(json!({
            "version": "2.1",
            "software": {
                "name": "ghostpub",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "protocols": ["activitypub"],
            "services": { "inbound": [], "outbound": [] },
            "openRegistrations": false,
            "usage": {
                "users": { "total": 1 }
            },
            "metadata": {}
        })),
    )
}
