//! Post repository.
//!
//! `save` is the authoritative write path for posts: row insert, reply
//! counter maintenance, like/repost reconciliation, outbox upkeep, and
//! tombstoning all happen in one transaction. Events are emitted by the
//! caller from the returned [`SaveOutcome`], after commit.

use std::collections::HashSet;
use std::sync::Arc;

use crate::entities::{
    like, mention,
    outbox::{self, OutboxType},
    post, repost, user, Like, Mention, Outbox, Post, Repost, User,
};
use crate::repositories::account::is_unique_violation;
use ghostpub_common::{sha256_hex, AppError, AppResult};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, NotSet, QueryFilter,
    Set, TransactionTrait,
};

/// A post write request: the desired row state plus the desired full sets
/// of likers and reposters.
#[derive(Debug, Clone)]
pub struct PostSave {
    /// Desired row state. `id` is ignored when `is_new`.
    pub model: post::Model,
    /// Whether this is an insert.
    pub is_new: bool,
    /// Desired full set of liker account IDs.
    pub likers: Vec<i64>,
    /// Desired full set of reposter account IDs.
    pub reposters: Vec<i64>,
    /// Mentioned account IDs (applied on insert only).
    pub mentions: Vec<i64>,
}

/// What a `save` call changed, for post-commit event emission.
#[derive(Debug, Clone, Default)]
pub struct SaveOutcome {
    /// The post's row id (existing id on idempotent duplicate inserts).
    pub post_id: i64,
    /// A new row was inserted.
    pub created: bool,
    /// The post transitioned live → deleted.
    pub deleted: bool,
    /// Accounts whose likes were added.
    pub new_likers: Vec<i64>,
    /// Accounts whose likes were removed.
    pub removed_likers: Vec<i64>,
    /// Accounts whose reposts were added.
    pub new_reposters: Vec<i64>,
    /// Accounts whose reposts were removed.
    pub removed_reposters: Vec<i64>,
}

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find posts by IDs, unordered.
    pub async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<post::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Post::find()
            .filter(post::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by its canonical `ActivityPub` IRI.
    pub async fn find_by_ap_id(&self, ap_id: &str) -> AppResult<Option<post::Model>> {
        Post::find()
            .filter(post::Column::ApIdHash.eq(sha256_hex(ap_id)))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Current liker account IDs of a post.
    pub async fn likers(&self, post_id: i64) -> AppResult<Vec<i64>> {
        let rows = Like::find()
            .filter(like::Column::PostId.eq(post_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.account_id).collect())
    }

    /// Current reposter account IDs of a post.
    pub async fn reposters(&self, post_id: i64) -> AppResult<Vec<i64>> {
        let rows = Repost::find()
            .filter(repost::Column::PostId.eq(post_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.account_id).collect())
    }

    /// Of the given posts, which has the account liked?
    pub async fn liked_post_ids(&self, account_id: i64, among: &[i64]) -> AppResult<Vec<i64>> {
        if among.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Like::find()
            .filter(like::Column::AccountId.eq(account_id))
            .filter(like::Column::PostId.is_in(among.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.post_id).collect())
    }

    /// Of the given posts, which has the account reposted?
    pub async fn reposted_post_ids(&self, account_id: i64, among: &[i64]) -> AppResult<Vec<i64>> {
        if among.is_empty() {
            return Ok(Vec::new());
        }
        let rows = Repost::find()
            .filter(repost::Column::AccountId.eq(account_id))
            .filter(repost::Column::PostId.is_in(among.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.post_id).collect())
    }

    /// Most recently published live post IDs, for the counts-refresh
    /// sweep. The refresher itself skips internal posts.
    pub async fn recent_post_ids(&self, limit: u64) -> AppResult<Vec<i64>> {
        use sea_orm::QueryOrder;
        use sea_orm::QuerySelect;
        let rows = Post::find()
            .filter(post::Column::DeletedAt.is_null())
            .order_by_desc(post::Column::PublishedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(|p| p.id).collect())
    }

    /// Count live replies to a post.
    pub async fn live_reply_count(&self, post_id: i64) -> AppResult<u64> {
        use sea_orm::PaginatorTrait;
        Post::find()
            .filter(post::Column::InReplyTo.eq(post_id))
            .filter(post::Column::DeletedAt.is_null())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Write a post and reconcile its dependent rows in one transaction.
    pub async fn save(&self, save: PostSave) -> AppResult<SaveOutcome> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match self.save_in(&txn, save).await {
            Ok(outcome) => {
                txn.commit()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(outcome)
            }
            Err(SaveAbort::Idempotent(outcome)) => {
                let _ = txn.rollback().await;
                Ok(outcome)
            }
            Err(SaveAbort::Failed(e)) => {
                let _ = txn.rollback().await;
                Err(e)
            }
        }
    }

    async fn save_in(
        &self,
        txn: &DatabaseTransaction,
        save: PostSave,
    ) -> Result<SaveOutcome, SaveAbort> {
        let mut outcome = SaveOutcome::default();

        // Step 1: insert or load.
        let prior: Option<post::Model>;
        let post_id: i64;

        if save.is_new {
            // A new-and-already-deleted post is never persisted.
            if save.model.deleted_at.is_some() {
                return Err(SaveAbort::Failed(AppError::BadRequest(
                    "Refusing to persist a deleted post".to_string(),
                )));
            }

            match Post::insert(insert_model(&save.model)).exec(txn).await {
                Ok(result) => {
                    post_id = result.last_insert_id;
                    prior = None;
                    outcome.created = true;
                }
                Err(e) if is_unique_violation(&e) => {
                    // Redelivery race: another task inserted the same ap_id.
                    let existing = self
                        .find_by_ap_id(&save.model.ap_id)
                        .await
                        .map_err(SaveAbort::Failed)?
                        .ok_or_else(|| {
                            SaveAbort::Failed(AppError::Database(
                                "Lost race inserting post".to_string(),
                            ))
                        })?;
                    return Err(SaveAbort::Idempotent(SaveOutcome {
                        post_id: existing.id,
                        ..SaveOutcome::default()
                    }));
                }
                Err(e) => return Err(SaveAbort::Failed(AppError::Database(e.to_string()))),
            }

            // Step 2: a new reply bumps its target's counter.
            if let Some(parent_id) = save.model.in_reply_to {
                adjust_reply_count(txn, parent_id, 1)
                    .await
                    .map_err(SaveAbort::Failed)?;
            }

            // Mention rows ride along with the insert.
            if !save.mentions.is_empty() {
                let models = save.mentions.iter().map(|account_id| mention::ActiveModel {
                    id: NotSet,
                    post_id: Set(post_id),
                    account_id: Set(*account_id),
                });
                insert_ignoring_duplicates(
                    Mention::insert_many(models).on_conflict(
                        OnConflict::columns([
                            mention::Column::PostId,
                            mention::Column::AccountId,
                        ])
                        .do_nothing()
                        .to_owned(),
                    ),
                    txn,
                )
                .await
                .map_err(SaveAbort::Failed)?;
            }
        } else {
            let existing = Post::find_by_id(save.model.id)
                .one(txn)
                .await
                .map_err(|e| SaveAbort::Failed(AppError::Database(e.to_string())))?
                .ok_or_else(|| {
                    SaveAbort::Failed(AppError::PostNotFound(save.model.id.to_string()))
                })?;
            post_id = existing.id;
            prior = Some(existing);
        }

        let author_internal = is_internal(txn, save.model.author_id)
            .await
            .map_err(SaveAbort::Failed)?;

        // Step 3: outbox entry for the author of a new post.
        if outcome.created && author_internal {
            let outbox_type = if save.model.in_reply_to.is_some() {
                OutboxType::Reply
            } else {
                OutboxType::Original
            };
            insert_outbox_entry(txn, save.model.author_id, post_id, &save.model, outbox_type)
                .await
                .map_err(SaveAbort::Failed)?;
        }

        // Step 4: diff likes and reposts against the stored sets.
        let current_likers = current_account_ids(
            Like::find().filter(like::Column::PostId.eq(post_id)),
            txn,
        )
        .await
        .map_err(SaveAbort::Failed)?;
        let current_reposters = current_account_ids(
            Repost::find().filter(repost::Column::PostId.eq(post_id)),
            txn,
        )
        .await
        .map_err(SaveAbort::Failed)?;

        let desired_likers: HashSet<i64> = save.likers.iter().copied().collect();
        let desired_reposters: HashSet<i64> = save.reposters.iter().copied().collect();

        outcome.new_likers = desired_likers.difference(&current_likers).copied().collect();
        outcome.removed_likers = current_likers.difference(&desired_likers).copied().collect();
        outcome.new_reposters = desired_reposters
            .difference(&current_reposters)
            .copied()
            .collect();
        outcome.removed_reposters = current_reposters
            .difference(&desired_reposters)
            .copied()
            .collect();
        outcome.new_likers.sort_unstable();
        outcome.removed_likers.sort_unstable();
        outcome.new_reposters.sort_unstable();
        outcome.removed_reposters.sort_unstable();

        if !outcome.new_likers.is_empty() {
            let now = chrono::Utc::now();
            let models = outcome.new_likers.iter().map(|account_id| like::ActiveModel {
                id: NotSet,
                account_id: Set(*account_id),
                post_id: Set(post_id),
                created_at: Set(now),
            });
            insert_ignoring_duplicates(
                Like::insert_many(models).on_conflict(
                    OnConflict::columns([like::Column::AccountId, like::Column::PostId])
                        .do_nothing()
                        .to_owned(),
                ),
                txn,
            )
            .await
            .map_err(SaveAbort::Failed)?;
        }
        if !outcome.removed_likers.is_empty() {
            Like::delete_many()
                .filter(like::Column::PostId.eq(post_id))
                .filter(like::Column::AccountId.is_in(outcome.removed_likers.clone()))
                .exec(txn)
                .await
                .map_err(|e| SaveAbort::Failed(AppError::Database(e.to_string())))?;
        }

        if !outcome.new_reposters.is_empty() {
            let now = chrono::Utc::now();
            let models = outcome
                .new_reposters
                .iter()
                .map(|account_id| repost::ActiveModel {
                    id: NotSet,
                    account_id: Set(*account_id),
                    post_id: Set(post_id),
                    created_at: Set(now),
                });
            insert_ignoring_duplicates(
                Repost::insert_many(models).on_conflict(
                    OnConflict::columns([repost::Column::AccountId, repost::Column::PostId])
                        .do_nothing()
                        .to_owned(),
                ),
                txn,
            )
            .await
            .map_err(SaveAbort::Failed)?;
        }
        if !outcome.removed_reposters.is_empty() {
            Repost::delete_many()
                .filter(repost::Column::PostId.eq(post_id))
                .filter(repost::Column::AccountId.is_in(outcome.removed_reposters.clone()))
                .exec(txn)
                .await
                .map_err(|e| SaveAbort::Failed(AppError::Database(e.to_string())))?;
        }

        // Counters: internal posts count relative to the stored value;
        // external posts mirror the remote's numbers when no local delta
        // happened in this save.
        let like_delta = outcome.new_likers.len() as i32 - outcome.removed_likers.len() as i32;
        let repost_delta =
            outcome.new_reposters.len() as i32 - outcome.removed_reposters.len() as i32;
        let no_like_delta = outcome.new_likers.is_empty() && outcome.removed_likers.is_empty();
        let no_repost_delta =
            outcome.new_reposters.is_empty() && outcome.removed_reposters.is_empty();

        let base_like = prior.as_ref().map_or(0, |p| p.like_count);
        let base_repost = prior.as_ref().map_or(0, |p| p.repost_count);

        let like_count = if !author_internal && no_like_delta {
            save.model.like_count
        } else {
            base_like + like_delta
        };
        let repost_count = if !author_internal && no_repost_delta {
            save.model.repost_count
        } else {
            base_repost + repost_delta
        };

        // Step 5: outbox entries track repost membership (internal only).
        if !outcome.new_reposters.is_empty() {
            let internal_reposters =
                internal_account_ids(txn, &outcome.new_reposters)
                    .await
                    .map_err(SaveAbort::Failed)?;
            for reposter in internal_reposters {
                insert_outbox_entry(txn, reposter, post_id, &save.model, OutboxType::Repost)
                    .await
                    .map_err(SaveAbort::Failed)?;
            }
        }
        if !outcome.removed_reposters.is_empty() {
            Outbox::delete_many()
                .filter(outbox::Column::PostId.eq(post_id))
                .filter(outbox::Column::AccountId.is_in(outcome.removed_reposters.clone()))
                .filter(outbox::Column::OutboxType.eq(OutboxType::Repost))
                .exec(txn)
                .await
                .map_err(|e| SaveAbort::Failed(AppError::Database(e.to_string())))?;
        }

        // Step 6: live → deleted transition.
        let was_deleted = prior.as_ref().is_some_and(post::Model::is_deleted);
        if save.model.deleted_at.is_some() && !was_deleted && prior.is_some() {
            outcome.deleted = true;

            if let Some(parent_id) = prior.as_ref().and_then(|p| p.in_reply_to) {
                adjust_reply_count(txn, parent_id, -1)
                    .await
                    .map_err(SaveAbort::Failed)?;
            }

            Like::delete_many()
                .filter(like::Column::PostId.eq(post_id))
                .exec(txn)
                .await
                .map_err(|e| SaveAbort::Failed(AppError::Database(e.to_string())))?;
            Mention::delete_many()
                .filter(mention::Column::PostId.eq(post_id))
                .exec(txn)
                .await
                .map_err(|e| SaveAbort::Failed(AppError::Database(e.to_string())))?;
            Outbox::delete_many()
                .filter(outbox::Column::PostId.eq(post_id))
                .exec(txn)
                .await
                .map_err(|e| SaveAbort::Failed(AppError::Database(e.to_string())))?;
        }

        // Apply the row state. `reply_count` is only ever touched by the
        // increment/decrement paths above.
        Post::update_many()
            .col_expr(post::Column::Kind, Expr::value(save.model.kind))
            .col_expr(post::Column::Audience, Expr::value(save.model.audience))
            .col_expr(post::Column::Title, Expr::value(save.model.title.clone()))
            .col_expr(
                post::Column::Excerpt,
                Expr::value(save.model.excerpt.clone()),
            )
            .col_expr(
                post::Column::Summary,
                Expr::value(save.model.summary.clone()),
            )
            .col_expr(
                post::Column::Content,
                Expr::value(save.model.content.clone()),
            )
            .col_expr(post::Column::Url, Expr::value(save.model.url.clone()))
            .col_expr(
                post::Column::ImageUrl,
                Expr::value(save.model.image_url.clone()),
            )
            .col_expr(
                post::Column::Attachments,
                Expr::value(save.model.attachments.clone()),
            )
            .col_expr(
                post::Column::Metadata,
                Expr::value(save.model.metadata.clone()),
            )
            .col_expr(
                post::Column::ReadingTimeMinutes,
                Expr::value(save.model.reading_time_minutes),
            )
            .col_expr(post::Column::LikeCount, Expr::value(like_count))
            .col_expr(post::Column::RepostCount, Expr::value(repost_count))
            .col_expr(post::Column::DeletedAt, Expr::value(save.model.deleted_at))
            .col_expr(post::Column::UpdatedAt, Expr::value(save.model.updated_at))
            .filter(post::Column::Id.eq(post_id))
            .exec(txn)
            .await
            .map_err(|e| SaveAbort::Failed(AppError::Database(e.to_string())))?;

        outcome.post_id = post_id;
        Ok(outcome)
    }
}

enum SaveAbort {
    /// Duplicate insert: roll back and report the existing row.
    Idempotent(SaveOutcome),
    Failed(AppError),
}

fn insert_model(model: &post::Model) -> post::ActiveModel {
    post::ActiveModel {
        id: NotSet,
        uuid: Set(model.uuid.clone()),
        kind: Set(model.kind),
        audience: Set(model.audience),
        title: Set(model.title.clone()),
        excerpt: Set(model.excerpt.clone()),
        summary: Set(model.summary.clone()),
        content: Set(model.content.clone()),
        url: Set(model.url.clone()),
        image_url: Set(model.image_url.clone()),
        published_at: Set(model.published_at),
        ap_id: Set(model.ap_id.clone()),
        ap_id_hash: Set(model.ap_id_hash.clone()),
        author_id: Set(model.author_id),
        in_reply_to: Set(model.in_reply_to),
        thread_root: Set(model.thread_root),
        like_count: Set(model.like_count),
        repost_count: Set(model.repost_count),
        reply_count: Set(0),
        reading_time_minutes: Set(model.reading_time_minutes),
        attachments: Set(model.attachments.clone()),
        metadata: Set(model.metadata.clone()),
        deleted_at: Set(None),
        created_at: Set(model.created_at),
        updated_at: Set(model.updated_at),
    }
}

async fn adjust_reply_count(
    txn: &DatabaseTransaction,
    post_id: i64,
    delta: i32,
) -> AppResult<()> {
    Post::update_many()
        .col_expr(
            post::Column::ReplyCount,
            Expr::col(post::Column::ReplyCount).add(delta),
        )
        .filter(post::Column::Id.eq(post_id))
        .exec(txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(())
}

/// Insert an outbox entry. The `(account_id, post_id)` unique index
/// bounds an account to one row per post, so a reposting author keeps
/// the existing Original row and the Repost insert is ignored.
async fn insert_outbox_entry(
    txn: &DatabaseTransaction,
    account_id: i64,
    post_id: i64,
    model: &post::Model,
    outbox_type: OutboxType,
) -> AppResult<()> {
    let entry = outbox::ActiveModel {
        id: NotSet,
        account_id: Set(account_id),
        post_id: Set(post_id),
        post_type: Set(model.kind),
        outbox_type: Set(outbox_type),
        author_id: Set(model.author_id),
        published_at: Set(model.published_at),
    };
    match Outbox::insert(entry).exec(txn).await {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Ok(()),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

async fn is_internal(txn: &DatabaseTransaction, account_id: i64) -> AppResult<bool> {
    let user = User::find()
        .filter(user::Column::AccountId.eq(account_id))
        .one(txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(user.is_some())
}

async fn internal_account_ids(
    txn: &DatabaseTransaction,
    account_ids: &[i64],
) -> AppResult<Vec<i64>> {
    if account_ids.is_empty() {
        return Ok(Vec::new());
    }
    let users = User::find()
        .filter(user::Column::AccountId.is_in(account_ids.iter().copied()))
        .all(txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(users.into_iter().map(|u| u.account_id).collect())
}

async fn current_account_ids<E>(
    query: sea_orm::Select<E>,
    txn: &DatabaseTransaction,
) -> AppResult<HashSet<i64>>
where
    E: EntityTrait,
    E::Model: AccountLinked,
{
    let rows = query
        .all(txn)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    Ok(rows.into_iter().map(|r| r.account_id()).collect())
}

/// Rows carrying an `account_id` column.
trait AccountLinked {
    fn account_id(&self) -> i64;
}

impl AccountLinked for like::Model {
    fn account_id(&self) -> i64 {
        self.account_id
    }
}

impl AccountLinked for repost::Model {
    fn account_id(&self) -> i64 {
        self.account_id
    }
}

async fn insert_ignoring_duplicates<A>(
    insert: sea_orm::Insert<A>,
    txn: &DatabaseTransaction,
) -> AppResult<()>
where
    A: sea_orm::ActiveModelTrait,
{
    match insert.exec(txn).await {
        Ok(_) | Err(DbErr::RecordNotInserted) => Ok(()),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::post::{Audience, PostType};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    pub(crate) fn test_post(id: i64, ap_id: &str, author_id: i64) -> post::Model {
        post::Model {
            id,
            uuid: format!("00000000-0000-0000-0000-{id:012}"),
            kind: PostType::Note,
            audience: Audience::Public,
            title: None,
            excerpt: None,
            summary: None,
            content: Some("hello".to_string()),
            url: None,
            image_url: None,
            published_at: Utc::now(),
            ap_id: ap_id.to_string(),
            ap_id_hash: sha256_hex(ap_id),
            author_id,
            in_reply_to: None,
            thread_root: None,
            like_count: 0,
            repost_count: 0,
            reply_count: 0,
            reading_time_minutes: 0,
            attachments: json!([]),
            metadata: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn internal_user(account_id: i64) -> user::Model {
        user::Model {
            id: account_id + 100,
            account_id,
            site_id: 1,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_new_internal_post() {
        let model = test_post(0, "https://site.example/note/1", 1);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                // internal check for the author
                .append_query_results([vec![internal_user(1)]])
                // current likers, current reposters
                .append_query_results([Vec::<like::Model>::new()])
                .append_query_results([Vec::<repost::Model>::new()])
                // post insert, outbox insert, final row update
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 42,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 1,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let outcome = repo
            .save(PostSave {
                model,
                is_new: true,
                likers: Vec::new(),
                reposters: Vec::new(),
                mentions: Vec::new(),
            })
            .await
            .unwrap();

        assert!(outcome.created);
        assert!(!outcome.deleted);
        assert_eq!(outcome.post_id, 42);
        assert!(outcome.new_likers.is_empty());
    }

    #[tokio::test]
    async fn test_save_refuses_new_deleted_post() {
        let mut model = test_post(0, "https://site.example/note/2", 1);
        model.deleted_at = Some(Utc::now());

        let db = Arc::new(MockDatabase::new(DatabaseBackend::MySql).into_connection());

        let repo = PostRepository::new(db);
        let result = repo
            .save(PostSave {
                model,
                is_new: true,
                likers: Vec::new(),
                reposters: Vec::new(),
                mentions: Vec::new(),
            })
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_save_tombstone_transition() {
        let prior = test_post(42, "https://r.example/note/42", 2);
        let mut tombstoned = prior.clone();
        tombstoned.kind = PostType::Tombstone;
        tombstoned.content = None;
        tombstoned.attachments = json!([]);
        tombstoned.deleted_at = Some(Utc::now());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                // load existing row
                .append_query_results([vec![prior]])
                // author internal check (external author)
                .append_query_results([Vec::<user::Model>::new()])
                // current likers, current reposters
                .append_query_results([Vec::<like::Model>::new()])
                .append_query_results([Vec::<repost::Model>::new()])
                // delete likes, delete mentions, delete outboxes, row update
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 0,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let outcome = repo
            .save(PostSave {
                model: tombstoned,
                is_new: false,
                likers: Vec::new(),
                reposters: Vec::new(),
                mentions: Vec::new(),
            })
            .await
            .unwrap();

        assert!(outcome.deleted);
        assert!(!outcome.created);
        assert_eq!(outcome.post_id, 42);
    }

    #[tokio::test]
    async fn test_save_diffs_likes_and_reposts() {
        let prior = test_post(42, "https://r.example/note/42", 2);
        let now = Utc::now();
        let current_likes = vec![like::Model {
            id: 1,
            account_id: 7,
            post_id: 42,
            created_at: now,
        }];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([vec![prior.clone()]])
                // external author
                .append_query_results([Vec::<user::Model>::new()])
                .append_query_results([current_likes])
                .append_query_results([Vec::<repost::Model>::new()])
                // internal reposter check for account 9
                .append_query_results([Vec::<user::Model>::new()])
                // like insert (8), repost insert (9), row update
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 2,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 1,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let outcome = repo
            .save(PostSave {
                model: prior,
                is_new: false,
                // 7 stays, 8 is new
                likers: vec![7, 8],
                reposters: vec![9],
                mentions: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(outcome.new_likers, vec![8]);
        assert!(outcome.removed_likers.is_empty());
        assert_eq!(outcome.new_reposters, vec![9]);
    }
}
