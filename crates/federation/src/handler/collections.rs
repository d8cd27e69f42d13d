//! Collection dispatchers: Followers, Following, Outbox, Liked.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use ghostpub_common::ApUrls;
use ghostpub_db::entities::{account, outbox::OutboxType};
use ghostpub_db::repositories::{
    AccountRepository, FollowRepository, OutboxRepository, PostRepository,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{error, info};

use super::actor::ACTIVITY_JSON;
use crate::activities::ACTIVITYSTREAMS_CONTEXT;
use crate::objects::{build_announce_doc, build_create_doc, build_object_doc};

/// Following pages are offset-cursored with this page size.
const FOLLOWING_PAGE_SIZE: u64 = 36;

/// Outbox pages are timestamp-cursored with this page size.
const OUTBOX_PAGE_SIZE: u64 = 20;

/// Followers are served bounded, as delivery recipients.
const FOLLOWERS_LIMIT: u64 = 10_000;

/// State required for collection handlers.
#[derive(Clone)]
pub struct CollectionState {
    pub account_repo: AccountRepository,
    pub follow_repo: FollowRepository,
    pub outbox_repo: OutboxRepository,
    pub post_repo: PostRepository,
    pub urls: ApUrls,
}

/// Query parameters for paginated collections.
#[derive(Debug, Deserialize)]
pub struct CollectionQuery {
    pub cursor: Option<String>,
}

async fn local_account(
    state: &CollectionState,
    handle: &str,
) -> Result<account::Model, axum::response::Response> {
    match state.account_repo.find_internal_by_username(handle).await {
        Ok(Some(account)) => Ok(account),
        Ok(None) => Err((StatusCode::NOT_FOUND, "Actor not found").into_response()),
        Err(e) => {
            error!(error = %e, "Failed to fetch account");
            Err((StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response())
        }
    }
}

/// Handle GET `followers/{handle}`: a bounded recipient list.
pub async fn followers_handler(
    State(state): State<CollectionState>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    info!(handle = %handle, "Followers lookup");

    let account = match local_account(&state, &handle).await {
        Ok(a) => a,
        Err(response) => return response,
    };

    let (total, followers) = match followers_with_count(&state, &account).await {
        Ok(pair) => pair,
        Err(response) => return response,
    };

    let items: Vec<Value> = followers
        .iter()
        .map(|f| {
            json!({
                "id": f.ap_id,
                "inbox": f.ap_inbox,
                "sharedInbox": f.ap_shared_inbox,
            })
        })
        .collect();

    let collection = json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": collection_id(&state.urls, "followers", &handle),
        "type": "Collection",
        "totalItems": total,
        "items": items,
    });

    (StatusCode::OK, [("Content-Type", ACTIVITY_JSON)], Json(collection)).into_response()
}

async fn followers_with_count(
    state: &CollectionState,
    account: &account::Model,
) -> Result<(u64, Vec<account::Model>), axum::response::Response> {
    let total = state
        .follow_repo
        .count_followers(account.id)
        .await
        .map_err(internal)?;
    let followers = state
        .follow_repo
        .follower_accounts(account.id, FOLLOWERS_LIMIT)
        .await
        .map_err(internal)?;
    Ok((total, followers))
}

/// Handle GET `following/{handle}`: offset cursor, first page at `"0"`.
pub async fn following_handler(
    State(state): State<CollectionState>,
    Path(handle): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> impl IntoResponse {
    info!(handle = %handle, "Following lookup");

    let account = match local_account(&state, &handle).await {
        Ok(a) => a,
        Err(response) => return response,
    };

    let offset: u64 = query
        .cursor
        .as_deref()
        .unwrap_or("0")
        .parse()
        .unwrap_or(0);

    let total = match state.follow_repo.count_following(account.id).await {
        Ok(n) => n,
        Err(e) => return internal(e),
    };
    let accounts = match state
        .follow_repo
        .following_accounts(account.id, FOLLOWING_PAGE_SIZE, offset)
        .await
    {
        Ok(a) => a,
        Err(e) => return internal(e),
    };

    let next_cursor = if offset + (accounts.len() as u64) < total {
        Some((offset + FOLLOWING_PAGE_SIZE).to_string())
    } else {
        None
    };

    let items: Vec<Value> = accounts.iter().map(|a| json!(a.ap_id)).collect();

    let mut collection = json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": collection_id(&state.urls, "following", &handle),
        "type": "OrderedCollection",
        "totalItems": total,
        "orderedItems": items,
    });
    if let Some(next) = next_cursor {
        collection["next"] = json!(next);
    }

    (StatusCode::OK, [("Content-Type", ACTIVITY_JSON)], Json(collection)).into_response()
}

/// Handle GET `outbox/{handle}`: timestamp cursor descending; items are
/// reconstituted Create/Announce wrappers from post rows. Replies never
/// surface here.
pub async fn outbox_handler(
    State(state): State<CollectionState>,
    Path(handle): Path<String>,
    Query(query): Query<CollectionQuery>,
) -> impl IntoResponse {
    info!(handle = %handle, "Outbox lookup");

    let account = match local_account(&state, &handle).await {
        Ok(a) => a,
        Err(response) => return response,
    };

    let before: DateTime<Utc> = query
        .cursor
        .as_deref()
        .and_then(|c| DateTime::parse_from_rfc3339(c).ok())
        .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc));

    let total = match state.outbox_repo.count(account.id).await {
        Ok(n) => n,
        Err(e) => return internal(e),
    };
    let entries = match state
        .outbox_repo
        .page(account.id, before, OUTBOX_PAGE_SIZE)
        .await
    {
        Ok(entries) => entries,
        Err(e) => return internal(e),
    };

    let post_ids: Vec<i64> = entries.iter().map(|e| e.post_id).collect();
    let posts: HashMap<i64, _> = match state.post_repo.find_by_ids(&post_ids).await {
        Ok(posts) => posts.into_iter().map(|p| (p.id, p)).collect(),
        Err(e) => return internal(e),
    };
    let author_ids: Vec<i64> = posts.values().map(|p| p.author_id).collect();
    let authors: HashMap<i64, _> = match state.account_repo.find_by_ids(&author_ids).await {
        Ok(accounts) => accounts.into_iter().map(|a| (a.id, a)).collect(),
        Err(e) => return internal(e),
    };

    let mut items = Vec::new();
    for entry in &entries {
        let Some(post) = posts.get(&entry.post_id) else {
            continue;
        };
        let item = match entry.outbox_type {
            OutboxType::Repost => state
                .urls
                .object("announce", &format!("{}-{}", account.uuid, post.uuid))
                .ok()
                .and_then(|id| build_announce_doc(&id, post, &account, &state.urls).ok()),
            OutboxType::Original => {
                let Some(author) = authors.get(&post.author_id) else {
                    continue;
                };
                state
                    .urls
                    .object("create", &post.uuid)
                    .ok()
                    .and_then(|id| {
                        let object = build_object_doc(post, author, &state.urls).ok()?;
                        build_create_doc(&id, post, author, object, &state.urls).ok()
                    })
            }
            OutboxType::Reply => None,
        };
        if let Some(item) = item {
            items.push(item);
        }
    }

    let next_cursor = if entries.len() as u64 == OUTBOX_PAGE_SIZE {
        entries.last().map(|e| e.published_at.to_rfc3339())
    } else {
        None
    };

    let mut collection = json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": collection_id(&state.urls, "outbox", &handle),
        "type": "OrderedCollection",
        "totalItems": total,
        "orderedItems": items,
    });
    if let Some(next) = next_cursor {
        collection["next"] = json!(next);
    }

    (StatusCode::OK, [("Content-Type", ACTIVITY_JSON)], Json(collection)).into_response()
}

/// Handle GET `liked/{handle}`: an empty collection.
pub async fn liked_handler(
    State(state): State<CollectionState>,
    Path(handle): Path<String>,
) -> impl IntoResponse {
    info!(handle = %handle, "Liked lookup");

    if let Err(response) = local_account(&state, &handle).await {
        return response;
    }

    let collection = json!({
        "@context": ACTIVITYSTREAMS_CONTEXT,
        "id": collection_id(&state.urls, "liked", &handle),
        "type": "OrderedCollection",
        "totalItems": 0,
        "orderedItems": [],
    });

    (StatusCode::OK, [("Content-Type", ACTIVITY_JSON)], Json(collection)).into_response()
}

fn collection_id(urls: &ApUrls, kind: &str, handle: &str) -> String {
    urls.object(kind, handle)
        .map_or_else(|_| String::new(), |u| u.to_string())
}

fn internal(e: ghostpub_common::AppError) -> axum::response::Response {
    error!(error = %e, "Collection query failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
}
