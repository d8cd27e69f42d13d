//! Outbox repository.

use std::sync::Arc;

use crate::entities::{
    outbox::{self, OutboxType},
    Outbox,
};
use crate::repositories::account::is_unique_violation;
use ghostpub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Outbox repository for database operations.
#[derive(Clone)]
pub struct OutboxRepository {
    db: Arc<DatabaseConnection>,
}

impl OutboxRepository {
    /// Create a new outbox repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Insert an outbox entry; duplicate entries are ignored.
    pub async fn insert_if_absent(&self, model: outbox::ActiveModel) -> AppResult<bool> {
        match model.insert(self.db.as_ref()).await {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Delete a specific entry.
    pub async fn delete_entry(
        &self,
        account_id: i64,
        post_id: i64,
        outbox_type: OutboxType,
    ) -> AppResult<()> {
        Outbox::delete_many()
            .filter(outbox::Column::AccountId.eq(account_id))
            .filter(outbox::Column::PostId.eq(post_id))
            .filter(outbox::Column::OutboxType.eq(outbox_type))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Surface entries for a collection page: original posts and reposts,
    /// never replies, `published_at < before`, newest first.
    pub async fn page(
        &self,
        account_id: i64,
        before: chrono::DateTime<chrono::Utc>,
        limit: u64,
    ) -> AppResult<Vec<outbox::Model>> {
        Outbox::find()
            .filter(outbox::Column::AccountId.eq(account_id))
            .filter(outbox::Column::OutboxType.ne(OutboxType::Reply))
            .filter(outbox::Column::PublishedAt.lt(before))
            .order_by_desc(outbox::Column::PublishedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count surfaced entries (originals and reposts).
    pub async fn count(&self, account_id: i64) -> AppResult<u64> {
        Outbox::find()
            .filter(outbox::Column::AccountId.eq(account_id))
            .filter(outbox::Column::OutboxType.ne(OutboxType::Reply))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::post::PostType;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_entry(id: i64, outbox_type: OutboxType) -> outbox::Model {
        outbox::Model {
            id,
            account_id: 1,
            post_id: 42,
            post_type: PostType::Article,
            outbox_type,
            author_id: 1,
            published_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_page_returns_entries() {
        let entries = vec![
            test_entry(1, OutboxType::Original),
            test_entry(2, OutboxType::Repost),
        ];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([entries])
                .into_connection(),
        );

        let repo = OutboxRepository::new(db);
        let page = repo.page(1, Utc::now(), 10).await.unwrap();

        assert_eq!(page.len(), 2);
    }
}
