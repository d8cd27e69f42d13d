//! Feed repository.

use std::sync::Arc;

use crate::entities::{
    feed,
    post::{Audience, PostType},
    Feed,
};
use ghostpub_common::{AppError, AppResult};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

/// Fan-out inserts are chunked to bound statement size.
const FEED_INSERT_CHUNK_SIZE: usize = 1000;

/// A feed row to be inserted by fan-out.
#[derive(Debug, Clone)]
pub struct NewFeedRow {
    pub user_id: i64,
    pub post_id: i64,
    pub post_type: PostType,
    pub audience: Audience,
    pub author_id: i64,
    pub reposted_by_id: Option<i64>,
}

/// Feed repository for database operations.
#[derive(Clone)]
pub struct FeedRepository {
    db: Arc<DatabaseConnection>,
}

impl FeedRepository {
    /// Create a new feed repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert fan-out rows in one transaction, in chunks, ignoring
    /// duplicate `(user_id, post_id, reposted_by_id)` rows.
    pub async fn add_rows(&self, rows: Vec<NewFeedRow>) -> AppResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let now = chrono::Utc::now();
        for chunk in rows.chunks(FEED_INSERT_CHUNK_SIZE) {
            let models = chunk.iter().map(|row| feed::ActiveModel {
                user_id: Set(row.user_id),
                post_id: Set(row.post_id),
                post_type: Set(row.post_type),
                audience: Set(row.audience),
                author_id: Set(row.author_id),
                reposted_by_id: Set(row.reposted_by_id),
                created_at: Set(now),
                ..Default::default()
            });

            let result = Feed::insert_many(models)
                .on_conflict(
                    OnConflict::columns([
                        feed::Column::UserId,
                        feed::Column::PostId,
                        feed::Column::RepostedById,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec(&txn)
                .await;

            match result {
                Ok(_) | Err(DbErr::RecordNotInserted) => {}
                Err(e) => {
                    let _ = txn.rollback().await;
                    return Err(AppError::Database(e.to_string()));
                }
            }
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Remove feed rows for a post. When `dereposted_by` is set, only rows
    /// that entered feeds via that reposter are removed; otherwise every
    /// row for the post goes. Returns the affected user IDs.
    pub async fn remove_rows(
        &self,
        post_id: i64,
        dereposted_by: Option<i64>,
    ) -> AppResult<Vec<i64>> {
        let mut query = Feed::find().filter(feed::Column::PostId.eq(post_id));
        if let Some(reposter) = dereposted_by {
            query = query.filter(feed::Column::RepostedById.eq(reposter));
        }

        let rows = query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut user_ids: Vec<i64> = rows.iter().map(|row| row.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();

        Feed::delete_many()
            .filter(feed::Column::Id.is_in(ids))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(user_ids)
    }

    /// Read a page of a user's feed, newest first, `id < cursor`.
    ///
    /// `excluded_author_ids` carries the viewer's block set; rows from
    /// those authors (or reposters) are filtered out in SQL.
    pub async fn page(
        &self,
        user_id: i64,
        post_type: PostType,
        excluded_author_ids: &[i64],
        cursor: Option<i64>,
        limit: u64,
    ) -> AppResult<Vec<feed::Model>> {
        let mut query = Feed::find()
            .filter(feed::Column::UserId.eq(user_id))
            .filter(feed::Column::PostType.eq(post_type))
            .order_by_desc(feed::Column::Id);

        if let Some(cursor) = cursor {
            query = query.filter(feed::Column::Id.lt(cursor));
        }

        if !excluded_author_ids.is_empty() {
            query = query
                .filter(feed::Column::AuthorId.is_not_in(excluded_author_ids.iter().copied()))
                .filter(
                    Condition::any()
                        .add(feed::Column::RepostedById.is_null())
                        .add(
                            feed::Column::RepostedById
                                .is_not_in(excluded_author_ids.iter().copied()),
                        ),
                );
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn test_row(id: i64, user_id: i64, post_id: i64, reposted_by: Option<i64>) -> feed::Model {
        feed::Model {
            id,
            user_id,
            post_id,
            post_type: PostType::Note,
            audience: Audience::Public,
            author_id: 1,
            reposted_by_id: reposted_by,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_add_rows_empty_is_noop() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::MySql).into_connection());

        let repo = FeedRepository::new(db);
        repo.add_rows(Vec::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_rows_returns_unique_user_ids() {
        let rows = vec![
            test_row(1, 10, 42, None),
            test_row(2, 11, 42, None),
            test_row(3, 10, 42, Some(7)),
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([rows])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                }])
                .into_connection(),
        );

        let repo = FeedRepository::new(db);
        let user_ids = repo.remove_rows(42, None).await.unwrap();

        assert_eq!(user_ids, vec![10, 11]);
    }

    #[tokio::test]
    async fn test_remove_rows_no_matches() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([Vec::<feed::Model>::new()])
                .into_connection(),
        );

        let repo = FeedRepository::new(db);
        let user_ids = repo.remove_rows(42, Some(7)).await.unwrap();

        assert!(user_ids.is_empty());
    }

    #[tokio::test]
    async fn test_page_returns_rows() {
        let rows = vec![test_row(9, 10, 42, None), test_row(8, 10, 43, None)];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = FeedRepository::new(db);
        let page = repo
            .page(10, PostType::Note, &[], Some(100), 2)
            .await
            .unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, 9);
    }
}
