//! Post service.
//!
//! Owns post reads and writes: remote object ingestion (with reply-chain
//! resolution), note/reply/article authoring, like and repost
//! reconciliation, and tombstoning. All row writes funnel through
//! `PostRepository::save`; this service emits the post-commit events in
//! order and awaits them.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use ghostpub_common::{sha256_hex, ApUrls, AppError, AppResult};
use ghostpub_db::entities::post::{self, Audience, PostType};
use ghostpub_db::repositories::{AccountRepository, PostRepository, PostSave, SaveOutcome};
use serde_json::{json, Value};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::events::{DomainEvent, SharedEventBus};
use crate::ports::{ImageError, ResolveError, SharedImageVerifier, SharedResolver};
use crate::services::account::{AccountError, AccountService};
use crate::services::moderation::ModerationService;

/// Reply chains are walked at most this deep.
const MAX_REPLY_DEPTH: usize = 32;

/// Post operation failures.
#[derive(Debug, Error)]
pub enum PostError {
    /// The referenced object is not a Note or Article (or is gone).
    #[error("not-a-post")]
    NotAPost,
    /// The object carries no usable attribution.
    #[error("missing-author")]
    MissingAuthor,
    /// The account already reposted this post.
    #[error("already-reposted")]
    AlreadyReposted,
    /// Moderation forbids the interaction.
    #[error("cannot-interact")]
    CannotInteract,
    /// Transient upstream fault; retryable.
    #[error("upstream-error: {0}")]
    UpstreamError(String),
    /// Attachment verification failure.
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error(transparent)]
    App(#[from] AppError),
}

impl From<ResolveError> for PostError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(_) | ResolveError::InvalidType(_) => Self::NotAPost,
            ResolveError::InvalidData(d) => Self::UpstreamError(d),
            ResolveError::NetworkFailure(e) | ResolveError::UpstreamError(e) => {
                Self::UpstreamError(e)
            }
        }
    }
}

impl From<AccountError> for PostError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound
            | AccountError::InvalidType(_)
            | AccountError::InvalidData(_) => Self::MissingAuthor,
            AccountError::NetworkFailure(e) => Self::UpstreamError(e),
            AccountError::App(e) => Self::App(e),
        }
    }
}

/// Object document fields this service persists.
#[derive(Debug, Clone)]
pub struct ParsedObject {
    pub id: Url,
    pub kind: PostType,
    pub attributed_to: Url,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub in_reply_to: Option<Url>,
    pub attachments: Value,
    pub mention_iris: Vec<Url>,
    pub like_count: Option<i32>,
    pub repost_count: Option<i32>,
}

/// Parse a Note/Article document.
pub fn parse_object(json: &Value) -> Result<ParsedObject, PostError> {
    let id = json
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Url::parse(s).ok())
        .ok_or(PostError::NotAPost)?;

    let kind = match json.get("type").and_then(Value::as_str) {
        Some("Note") => PostType::Note,
        Some("Article") => PostType::Article,
        _ => return Err(PostError::NotAPost),
    };

    let attributed_to = attribution_iri(json.get("attributedTo")).ok_or(PostError::MissingAuthor)?;

    let in_reply_to = json
        .get("inReplyTo")
        .and_then(Value::as_str)
        .and_then(|s| Url::parse(s).ok());

    let published = json
        .get("published")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let attachments = normalize_attachments(json.get("attachment"));

    let mention_iris = json
        .get("tag")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter(|t| t.get("type").and_then(Value::as_str) == Some("Mention"))
                .filter_map(|t| t.get("href").and_then(Value::as_str))
                .filter_map(|s| Url::parse(s).ok())
                .collect()
        })
        .unwrap_or_default();

    Ok(ParsedObject {
        id,
        kind,
        attributed_to,
        title: json.get("name").and_then(Value::as_str).map(String::from),
        summary: json
            .get("summary")
            .and_then(Value::as_str)
            .map(String::from),
        content: json
            .get("content")
            .and_then(Value::as_str)
            .map(String::from),
        url: json.get("url").and_then(Value::as_str).map(String::from),
        image_url: json
            .get("image")
            .and_then(|i| {
                if i.is_object() {
                    i.get("url").and_then(Value::as_str)
                } else {
                    i.as_str()
                }
            })
            .map(String::from),
        published,
        in_reply_to,
        attachments,
        mention_iris,
        like_count: collection_total(json.get("likes")),
        repost_count: collection_total(json.get("shares")),
    })
}

/// `attributedTo` arrives as a string, an object, or an array of either.
fn attribution_iri(value: Option<&Value>) -> Option<Url> {
    let value = value?;
    let first = if let Some(arr) = value.as_array() {
        arr.first()?
    } else {
        value
    };
    let iri = if let Some(s) = first.as_str() {
        s
    } else {
        first.get("id")?.as_str()?
    };
    Url::parse(iri).ok()
}

/// Keep attachments as an ordered `{type, mediaType, name, url}` list.
fn normalize_attachments(value: Option<&Value>) -> Value {
    let Some(value) = value else {
        return json!([]);
    };
    let items: Vec<&Value> = if let Some(arr) = value.as_array() {
        arr.iter().collect()
    } else {
        vec![value]
    };

    let normalized: Vec<Value> = items
        .into_iter()
        .filter_map(|item| {
            let url = item.get("url").and_then(Value::as_str)?;
            Some(json!({
                "type": item.get("type").and_then(Value::as_str).unwrap_or("Document"),
                "mediaType": item.get("mediaType").and_then(Value::as_str),
                "name": item.get("name").and_then(Value::as_str),
                "url": url,
            }))
        })
        .collect();

    Value::Array(normalized)
}

/// `likes`/`shares` are collections (inline or referenced) with totals.
fn collection_total(value: Option<&Value>) -> Option<i32> {
    let value = value?;
    if let Some(n) = value.as_i64() {
        return i32::try_from(n).ok();
    }
    value
        .get("totalItems")
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
}

/// Walk state for reply resolution: memoized IRIs plus a depth cap.
struct ReplyContext {
    seen: HashSet<String>,
    depth: usize,
}

impl ReplyContext {
    fn new() -> Self {
        Self {
            seen: HashSet::new(),
            depth: 0,
        }
    }

    fn enter(&mut self, iri: &str) -> bool {
        if self.depth >= MAX_REPLY_DEPTH || !self.seen.insert(iri.to_string()) {
            return false;
        }
        self.depth += 1;
        true
    }
}

/// A draft article from the publish webhook.
#[derive(Debug, Clone)]
pub struct ArticleDraft {
    pub uuid: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub reading_time_minutes: i32,
    pub audience: Audience,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    account_repo: AccountRepository,
    accounts: AccountService,
    moderation: ModerationService,
    resolver: SharedResolver,
    image_verifier: SharedImageVerifier,
    urls: ApUrls,
    bus: SharedEventBus,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        post_repo: PostRepository,
        account_repo: AccountRepository,
        accounts: AccountService,
        moderation: ModerationService,
        resolver: SharedResolver,
        image_verifier: SharedImageVerifier,
        urls: ApUrls,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            post_repo,
            account_repo,
            accounts,
            moderation,
            resolver,
            image_verifier,
            urls,
            bus,
        }
    }

    /// Read access to the underlying repository for dispatchers.
    #[must_use]
    pub const fn repository(&self) -> &PostRepository {
        &self.post_repo
    }

    /// Load a post by IRI, ingesting it (and its reply chain) from the
    /// remote server on first reference.
    pub async fn get_by_ap_id(&self, iri: &Url) -> Result<post::Model, PostError> {
        let mut ctx = ReplyContext::new();
        self.resolve_post(iri.clone(), &mut ctx).await
    }

    fn resolve_post<'a>(
        &'a self,
        iri: Url,
        ctx: &'a mut ReplyContext,
    ) -> BoxFuture<'a, Result<post::Model, PostError>> {
        Box::pin(async move {
            if let Some(existing) = self.post_repo.find_by_ap_id(iri.as_str()).await? {
                return Ok(existing);
            }

            if !ctx.enter(iri.as_str()) {
                debug!(iri = %iri, "Reply resolution stopped (depth cap or cycle)");
                return Err(PostError::NotAPost);
            }

            let object = self
                .resolver
                .lookup(&iri)
                .await?
                .ok_or(PostError::NotAPost)?;

            let parsed = parse_object(&object)?;

            // Origin integrity: the document must identify itself on the
            // host we fetched it from.
            if parsed.id.host_str() != iri.host_str() {
                warn!(
                    requested = %iri,
                    returned = %parsed.id,
                    "Dropping object with mismatched origin"
                );
                return Err(PostError::NotAPost);
            }

            let author = self.accounts.ensure_by_ap_id(&parsed.attributed_to).await?;

            // Best-effort parent resolution; a broken parent chain does
            // not block ingesting the post itself.
            let parent = match &parsed.in_reply_to {
                Some(parent_iri) => match self.resolve_post(parent_iri.clone(), ctx).await {
                    Ok(parent) => Some(parent),
                    Err(PostError::UpstreamError(e)) => {
                        return Err(PostError::UpstreamError(e));
                    }
                    Err(e) => {
                        debug!(parent = %parent_iri, error = %e, "Reply target unresolvable");
                        None
                    }
                },
                None => None,
            };

            let mut mentions = Vec::new();
            for mention_iri in &parsed.mention_iris {
                if let Ok(account) = self.accounts.ensure_by_ap_id(mention_iri).await {
                    mentions.push(account.id);
                }
            }

            let model = post::Model {
                id: 0,
                uuid: Uuid::new_v4().to_string(),
                kind: parsed.kind,
                audience: Audience::Public,
                title: parsed.title,
                excerpt: None,
                summary: parsed.summary,
                content: parsed.content,
                url: parsed.url,
                image_url: parsed.image_url,
                published_at: parsed.published.unwrap_or_else(Utc::now),
                ap_id: parsed.id.to_string(),
                ap_id_hash: sha256_hex(parsed.id.as_str()),
                author_id: author.id,
                in_reply_to: parent.as_ref().map(|p| p.id),
                thread_root: parent.as_ref().map(|p| p.thread_root.unwrap_or(p.id)),
                like_count: parsed.like_count.unwrap_or(0),
                repost_count: parsed.repost_count.unwrap_or(0),
                reply_count: 0,
                reading_time_minutes: 0,
                attachments: parsed.attachments,
                metadata: None,
                deleted_at: None,
                created_at: Utc::now(),
                updated_at: None,
            };

            let outcome = self
                .post_repo
                .save(PostSave {
                    model,
                    is_new: true,
                    likers: Vec::new(),
                    reposters: Vec::new(),
                    mentions,
                })
                .await?;

            let saved = self.loaded(outcome.post_id).await?;
            self.emit_outcome(&saved, &outcome).await;

            info!(post_id = saved.id, ap_id = %saved.ap_id, "Ingested remote post");
            Ok(saved)
        })
    }

    /// Repost a post (by IRI) on behalf of an account.
    pub async fn repost_by_ap_id(
        &self,
        reposter: &ghostpub_db::entities::account::Model,
        iri: &Url,
    ) -> Result<post::Model, PostError> {
        let target = self.get_by_ap_id(iri).await?;

        if !self
            .moderation
            .can_interact_with_account(reposter.id, target.author_id)
            .await?
        {
            return Err(PostError::CannotInteract);
        }

        let current_likers = self.post_repo.likers(target.id).await?;
        let mut reposters = self.post_repo.reposters(target.id).await?;
        if reposters.contains(&reposter.id) {
            return Err(PostError::AlreadyReposted);
        }
        reposters.push(reposter.id);

        let outcome = self
            .post_repo
            .save(PostSave {
                model: target,
                is_new: false,
                likers: current_likers,
                reposters,
                mentions: Vec::new(),
            })
            .await?;

        let saved = self.loaded(outcome.post_id).await?;
        self.emit_outcome(&saved, &outcome).await;
        Ok(saved)
    }

    /// Remove an account's repost of a post.
    pub async fn remove_repost(
        &self,
        reposter_id: i64,
        post: &post::Model,
    ) -> Result<post::Model, PostError> {
        let current_likers = self.post_repo.likers(post.id).await?;
        let mut reposters = self.post_repo.reposters(post.id).await?;
        reposters.retain(|id| *id != reposter_id);

        let outcome = self
            .post_repo
            .save(PostSave {
                model: post.clone(),
                is_new: false,
                likers: current_likers,
                reposters,
                mentions: Vec::new(),
            })
            .await?;

        let saved = self.loaded(outcome.post_id).await?;
        self.emit_outcome(&saved, &outcome).await;
        Ok(saved)
    }

    /// Add a like to a post. Idempotent.
    pub async fn like_post(
        &self,
        liker_id: i64,
        post: &post::Model,
    ) -> Result<post::Model, PostError> {
        if !self
            .moderation
            .can_interact_with_account(liker_id, post.author_id)
            .await?
        {
            return Err(PostError::CannotInteract);
        }

        let mut likers = self.post_repo.likers(post.id).await?;
        let reposters = self.post_repo.reposters(post.id).await?;
        if !likers.contains(&liker_id) {
            likers.push(liker_id);
        }

        let outcome = self
            .post_repo
            .save(PostSave {
                model: post.clone(),
                is_new: false,
                likers,
                reposters,
                mentions: Vec::new(),
            })
            .await?;

        let saved = self.loaded(outcome.post_id).await?;
        self.emit_outcome(&saved, &outcome).await;
        Ok(saved)
    }

    /// Author a public note.
    pub async fn create_note(
        &self,
        author: &ghostpub_db::entities::account::Model,
        content: &str,
        image_url: Option<&Url>,
    ) -> Result<post::Model, PostError> {
        let attachments = match image_url {
            Some(url) => {
                self.image_verifier.verify_url(url).await?;
                json!([{ "type": "Image", "mediaType": null, "name": null, "url": url.as_str() }])
            }
            None => json!([]),
        };

        let uuid = Uuid::new_v4().to_string();
        let ap_id = self.urls.object("note", &uuid)?;

        let model = post::Model {
            id: 0,
            uuid,
            kind: PostType::Note,
            audience: Audience::Public,
            title: None,
            excerpt: None,
            summary: None,
            content: Some(content.to_string()),
            url: Some(ap_id.to_string()),
            image_url: image_url.map(|u| u.to_string()),
            published_at: Utc::now(),
            ap_id: ap_id.to_string(),
            ap_id_hash: sha256_hex(ap_id.as_str()),
            author_id: author.id,
            in_reply_to: None,
            thread_root: None,
            like_count: 0,
            repost_count: 0,
            reply_count: 0,
            reading_time_minutes: 0,
            attachments,
            metadata: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.persist_new(model).await
    }

    /// Author a reply to a post identified by IRI.
    pub async fn create_reply(
        &self,
        author: &ghostpub_db::entities::account::Model,
        content: &str,
        target_iri: &Url,
    ) -> Result<post::Model, PostError> {
        let target = self.get_by_ap_id(target_iri).await?;

        if !self
            .moderation
            .can_interact_with_account(author.id, target.author_id)
            .await?
        {
            return Err(PostError::CannotInteract);
        }

        let uuid = Uuid::new_v4().to_string();
        let ap_id = self.urls.object("note", &uuid)?;

        let model = post::Model {
            id: 0,
            uuid,
            kind: PostType::Note,
            audience: Audience::Public,
            title: None,
            excerpt: None,
            summary: None,
            content: Some(content.to_string()),
            url: Some(ap_id.to_string()),
            image_url: None,
            published_at: Utc::now(),
            ap_id: ap_id.to_string(),
            ap_id_hash: sha256_hex(ap_id.as_str()),
            author_id: author.id,
            in_reply_to: Some(target.id),
            thread_root: Some(target.thread_root.unwrap_or(target.id)),
            like_count: 0,
            repost_count: 0,
            reply_count: 0,
            reading_time_minutes: 0,
            attachments: json!([]),
            metadata: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.persist_new(model).await
    }

    /// Publish an article from the site's webhook.
    pub async fn create_article(
        &self,
        author: &ghostpub_db::entities::account::Model,
        draft: ArticleDraft,
    ) -> Result<post::Model, PostError> {
        let uuid = draft
            .uuid
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let ap_id = self.urls.object("article", &uuid)?;

        let model = post::Model {
            id: 0,
            uuid,
            kind: PostType::Article,
            audience: draft.audience,
            title: draft.title,
            excerpt: draft.excerpt,
            summary: None,
            content: draft.content,
            url: draft.url.or_else(|| Some(ap_id.to_string())),
            image_url: draft.image_url,
            published_at: draft.published_at.unwrap_or_else(Utc::now),
            ap_id: ap_id.to_string(),
            ap_id_hash: sha256_hex(ap_id.as_str()),
            author_id: author.id,
            in_reply_to: None,
            thread_root: None,
            like_count: 0,
            repost_count: 0,
            reply_count: 0,
            reading_time_minutes: draft.reading_time_minutes,
            attachments: json!([]),
            metadata: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: None,
        };

        self.persist_new(model).await
    }

    /// Tombstone a post when (and only when) `actor` authored it.
    pub async fn delete_post(
        &self,
        actor_id: i64,
        post: &post::Model,
    ) -> Result<Option<post::Model>, PostError> {
        if post.author_id != actor_id {
            info!(
                post_id = post.id,
                actor = actor_id,
                "Ignoring delete from non-owner"
            );
            return Ok(None);
        }
        if post.is_deleted() {
            return Ok(Some(post.clone()));
        }

        let likers = self.post_repo.likers(post.id).await?;
        let reposters = self.post_repo.reposters(post.id).await?;

        let mut tombstoned = post.clone();
        tombstoned.kind = PostType::Tombstone;
        tombstoned.title = None;
        tombstoned.excerpt = None;
        tombstoned.content = None;
        tombstoned.image_url = None;
        tombstoned.attachments = json!([]);
        tombstoned.deleted_at = Some(Utc::now());

        let outcome = self
            .post_repo
            .save(PostSave {
                model: tombstoned,
                is_new: false,
                likers,
                reposters,
                mentions: Vec::new(),
            })
            .await?;

        let saved = self.loaded(outcome.post_id).await?;
        self.emit_outcome(&saved, &outcome).await;
        Ok(Some(saved))
    }

    /// Apply a remote Update(Object) to a known post. Interaction
    /// counters are left untouched.
    pub async fn update_from_remote(
        &self,
        post: &post::Model,
        object: &Value,
    ) -> Result<post::Model, PostError> {
        let parsed = parse_object(object)?;

        let likers = self.post_repo.likers(post.id).await?;
        let reposters = self.post_repo.reposters(post.id).await?;

        let mut updated = post.clone();
        updated.title = parsed.title;
        updated.summary = parsed.summary;
        updated.content = parsed.content;
        updated.url = parsed.url.or(updated.url);
        updated.image_url = parsed.image_url;
        updated.attachments = parsed.attachments;
        updated.updated_at = Some(Utc::now());
        // counters stay as stored
        updated.like_count = post.like_count;
        updated.repost_count = post.repost_count;

        let outcome = self
            .post_repo
            .save(PostSave {
                model: updated,
                is_new: false,
                likers,
                reposters,
                mentions: Vec::new(),
            })
            .await?;

        let saved = self.loaded(outcome.post_id).await?;
        self.emit_outcome(&saved, &outcome).await;
        Ok(saved)
    }

    /// Mirror authoritative remote counts onto an external post.
    pub async fn mirror_remote_counts(
        &self,
        post: &post::Model,
        like_count: i32,
        repost_count: i32,
    ) -> Result<post::Model, PostError> {
        if self.account_repo.is_internal(post.author_id).await? {
            return Ok(post.clone());
        }

        let likers = self.post_repo.likers(post.id).await?;
        let reposters = self.post_repo.reposters(post.id).await?;

        let mut updated = post.clone();
        updated.like_count = like_count;
        updated.repost_count = repost_count;
        updated.updated_at = Some(Utc::now());

        let outcome = self
            .post_repo
            .save(PostSave {
                model: updated,
                is_new: false,
                likers,
                reposters,
                mentions: Vec::new(),
            })
            .await?;

        let saved = self.loaded(outcome.post_id).await?;
        self.emit_outcome(&saved, &outcome).await;
        Ok(saved)
    }

    async fn persist_new(&self, model: post::Model) -> Result<post::Model, PostError> {
        let outcome = self
            .post_repo
            .save(PostSave {
                model,
                is_new: true,
                likers: Vec::new(),
                reposters: Vec::new(),
                mentions: Vec::new(),
            })
            .await?;

        let saved = self.loaded(outcome.post_id).await?;
        self.emit_outcome(&saved, &outcome).await;
        Ok(saved)
    }

    async fn loaded(&self, post_id: i64) -> Result<post::Model, PostError> {
        Ok(self
            .post_repo
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?)
    }

    /// Emit post-commit events in the contract order, awaiting each.
    async fn emit_outcome(&self, post: &post::Model, outcome: &SaveOutcome) {
        if outcome.created {
            self.bus
                .publish(&DomainEvent::PostCreated { post: post.clone() })
                .await;
        }
        if outcome.deleted {
            self.bus
                .publish(&DomainEvent::PostDeleted { post: post.clone() })
                .await;
        }
        for account_id in &outcome.new_likers {
            self.bus
                .publish(&DomainEvent::PostLiked {
                    post: post.clone(),
                    account_id: *account_id,
                })
                .await;
        }
        for account_id in &outcome.new_reposters {
            self.bus
                .publish(&DomainEvent::PostReposted {
                    post: post.clone(),
                    reposted_by: *account_id,
                })
                .await;
        }
        for account_id in &outcome.removed_reposters {
            self.bus
                .publish(&DomainEvent::PostDereposted {
                    post: post.clone(),
                    dereposted_by: *account_id,
                })
                .await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_note() {
        let json = json!({
            "id": "https://r.example/note/1",
            "type": "Note",
            "attributedTo": "https://r.example/u/alice",
            "content": "<p>hi</p>",
            "published": "2025-06-01T12:00:00Z",
            "likes": { "type": "Collection", "totalItems": 3 },
            "shares": 2
        });

        let parsed = parse_object(&json).unwrap();
        assert_eq!(parsed.kind, PostType::Note);
        assert_eq!(parsed.attributed_to.as_str(), "https://r.example/u/alice");
        assert_eq!(parsed.content.as_deref(), Some("<p>hi</p>"));
        assert_eq!(parsed.like_count, Some(3));
        assert_eq!(parsed.repost_count, Some(2));
        assert!(parsed.in_reply_to.is_none());
    }

    #[test]
    fn test_parse_object_rejects_other_types() {
        let json = json!({
            "id": "https://r.example/x/1",
            "type": "Video",
            "attributedTo": "https://r.example/u/alice"
        });

        assert!(matches!(parse_object(&json), Err(PostError::NotAPost)));
    }

    #[test]
    fn test_parse_object_requires_attribution() {
        let json = json!({
            "id": "https://r.example/note/1",
            "type": "Note",
            "content": "hi"
        });

        assert!(matches!(parse_object(&json), Err(PostError::MissingAuthor)));
    }

    #[test]
    fn test_parse_object_attribution_forms() {
        for attributed_to in [
            json!("https://r.example/u/alice"),
            json!({ "id": "https://r.example/u/alice" }),
            json!(["https://r.example/u/alice", "https://r.example/u/bob"]),
        ] {
            let json = json!({
                "id": "https://r.example/note/1",
                "type": "Note",
                "attributedTo": attributed_to
            });
            let parsed = parse_object(&json).unwrap();
            assert_eq!(parsed.attributed_to.as_str(), "https://r.example/u/alice");
        }
    }

    #[test]
    fn test_parse_object_reply_and_mentions() {
        let json = json!({
            "id": "https://r.example/note/2",
            "type": "Note",
            "attributedTo": "https://r.example/u/bob",
            "inReplyTo": "https://site.example/.ghost/activitypub/note/1",
            "tag": [
                { "type": "Mention", "href": "https://site.example/.ghost/activitypub/users/index" },
                { "type": "Hashtag", "name": "#rust" }
            ]
        });

        let parsed = parse_object(&json).unwrap();
        assert!(parsed.in_reply_to.is_some());
        assert_eq!(parsed.mention_iris.len(), 1);
    }

    #[test]
    fn test_normalize_attachments_single_and_list() {
        let single = json!({ "type": "Image", "url": "https://r.example/a.png" });
        let normalized = normalize_attachments(Some(&single));
        assert_eq!(normalized.as_array().unwrap().len(), 1);
        assert_eq!(normalized[0]["url"], "https://r.example/a.png");

        let list = json!([
            { "type": "Image", "url": "https://r.example/a.png", "mediaType": "image/png" },
            { "type": "Document", "name": "no url here" }
        ]);
        let normalized = normalize_attachments(Some(&list));
        // The entry without a url is dropped
        assert_eq!(normalized.as_array().unwrap().len(), 1);

        assert_eq!(normalize_attachments(None), json!([]));
    }

    #[test]
    fn test_reply_context_depth_cap_and_memoization() {
        let mut ctx = ReplyContext::new();
        assert!(ctx.enter("https://r.example/note/1"));
        // Revisiting the same IRI is a cycle
        assert!(!ctx.enter("https://r.example/note/1"));

        let mut ctx = ReplyContext::new();
        for i in 0..MAX_REPLY_DEPTH {
            assert!(ctx.enter(&format!("https://r.example/note/{i}")));
        }
        assert!(!ctx.enter("https://r.example/note/last"));
    }
}
