//! Block repository: account blocks and domain blocks.

use std::sync::Arc;

use crate::entities::{block, domain_block, Block, DomainBlock};
use crate::repositories::account::is_unique_violation;
use ghostpub_common::{sha256_hex, AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

/// Block repository for database operations.
#[derive(Clone)]
pub struct BlockRepository {
    db: Arc<DatabaseConnection>,
}

impl BlockRepository {
    /// Create a new block repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Block rows in either direction between two accounts.
    pub async fn find_between(&self, a: i64, b: i64) -> AppResult<Vec<block::Model>> {
        Block::find()
            .filter(
                Condition::any()
                    .add(
                        Condition::all()
                            .add(block::Column::BlockerId.eq(a))
                            .add(block::Column::BlockedId.eq(b)),
                    )
                    .add(
                        Condition::all()
                            .add(block::Column::BlockerId.eq(b))
                            .add(block::Column::BlockedId.eq(a)),
                    ),
            )
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Domain-block rows where either account blocks a domain.
    pub async fn find_domain_blocks_for(
        &self,
        blocker_ids: &[i64],
    ) -> AppResult<Vec<domain_block::Model>> {
        if blocker_ids.is_empty() {
            return Ok(Vec::new());
        }
        DomainBlock::find()
            .filter(domain_block::Column::BlockerId.is_in(blocker_ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record a block. Idempotent.
    pub async fn create_block(&self, blocker_id: i64, blocked_id: i64) -> AppResult<bool> {
        let model = block::ActiveModel {
            blocker_id: Set(blocker_id),
            blocked_id: Set(blocked_id),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        match model.insert(self.db.as_ref()).await {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Remove a block.
    pub async fn delete_block(&self, blocker_id: i64, blocked_id: i64) -> AppResult<()> {
        Block::delete_many()
            .filter(block::Column::BlockerId.eq(blocker_id))
            .filter(block::Column::BlockedId.eq(blocked_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Record a domain block. Idempotent.
    pub async fn create_domain_block(&self, blocker_id: i64, domain: &str) -> AppResult<bool> {
        let model = domain_block::ActiveModel {
            blocker_id: Set(blocker_id),
            domain: Set(domain.to_lowercase()),
            domain_hash: Set(sha256_hex(domain)),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        match model.insert(self.db.as_ref()).await {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Remove a domain block.
    pub async fn delete_domain_block(&self, blocker_id: i64, domain: &str) -> AppResult<()> {
        DomainBlock::delete_many()
            .filter(domain_block::Column::BlockerId.eq(blocker_id))
            .filter(domain_block::Column::DomainHash.eq(sha256_hex(domain)))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Author account IDs the viewer must not see: accounts the viewer
    /// blocks, accounts blocking the viewer. Used by feed read filtering.
    pub async fn hidden_account_ids(&self, viewer_account_id: i64) -> AppResult<Vec<i64>> {
        let rows = Block::find()
            .filter(
                Condition::any()
                    .add(block::Column::BlockerId.eq(viewer_account_id))
                    .add(block::Column::BlockedId.eq(viewer_account_id)),
            )
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                if row.blocker_id == viewer_account_id {
                    row.blocked_id
                } else {
                    row.blocker_id
                }
            })
            .collect())
    }

    /// Domain hashes the viewer has blocked.
    pub async fn blocked_domain_hashes(&self, viewer_account_id: i64) -> AppResult<Vec<String>> {
        let rows = DomainBlock::find()
            .filter(domain_block::Column::BlockerId.eq(viewer_account_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows.into_iter().map(|row| row.domain_hash).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_block(id: i64, blocker_id: i64, blocked_id: i64) -> block::Model {
        block::Model {
            id,
            blocker_id,
            blocked_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_between_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([Vec::<block::Model>::new()])
                .into_connection(),
        );

        let repo = BlockRepository::new(db);
        assert!(repo.find_between(1, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hidden_account_ids_both_directions() {
        let rows = vec![test_block(1, 5, 9), test_block(2, 7, 5)];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([rows])
                .into_connection(),
        );

        let repo = BlockRepository::new(db);
        let hidden = repo.hidden_account_ids(5).await.unwrap();

        assert_eq!(hidden, vec![9, 7]);
    }

    #[tokio::test]
    async fn test_find_domain_blocks_for_empty_input() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::MySql).into_connection());

        let repo = BlockRepository::new(db);
        assert!(repo.find_domain_blocks_for(&[]).await.unwrap().is_empty());
    }
}
