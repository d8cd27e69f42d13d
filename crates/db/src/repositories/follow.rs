//! Follow repository.

use std::sync::Arc;

use crate::entities::{account, follow, user, Account, Follow, User};
use crate::repositories::account::is_unique_violation;
use ghostpub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

/// Follow repository for database operations.
#[derive(Clone)]
pub struct FollowRepository {
    db: Arc<DatabaseConnection>,
}

impl FollowRepository {
    /// Create a new follow repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a follow edge by pair.
    pub async fn find_by_pair(
        &self,
        follower_id: i64,
        following_id: i64,
    ) -> AppResult<Option<follow::Model>> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FollowingId.eq(following_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if an account follows another.
    pub async fn is_following(&self, follower_id: i64, following_id: i64) -> AppResult<bool> {
        Ok(self.find_by_pair(follower_id, following_id).await?.is_some())
    }

    /// Record a follow edge. Returns false when the edge already existed;
    /// duplicate-key races collapse to the same answer.
    pub async fn create_if_absent(&self, follower_id: i64, following_id: i64) -> AppResult<bool> {
        let model = follow::ActiveModel {
            follower_id: Set(follower_id),
            following_id: Set(following_id),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        match model.insert(self.db.as_ref()).await {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Delete a follow edge. Returns whether an edge was removed.
    pub async fn delete_by_pair(&self, follower_id: i64, following_id: i64) -> AppResult<bool> {
        let Some(edge) = self.find_by_pair(follower_id, following_id).await? else {
            return Ok(false);
        };
        edge.delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// Accounts following the given account (bounded).
    pub async fn follower_accounts(
        &self,
        account_id: i64,
        limit: u64,
    ) -> AppResult<Vec<account::Model>> {
        let edges = Follow::find()
            .filter(follow::Column::FollowingId.eq(account_id))
            .order_by_desc(follow::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let follower_ids: Vec<i64> = edges.iter().map(|e| e.follower_id).collect();
        if follower_ids.is_empty() {
            return Ok(Vec::new());
        }

        Account::find()
            .filter(account::Column::Id.is_in(follower_ids))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Accounts the given account follows, offset-paged.
    pub async fn following_accounts(
        &self,
        account_id: i64,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<account::Model>> {
        let edges = Follow::find()
            .filter(follow::Column::FollowerId.eq(account_id))
            .order_by_desc(follow::Column::CreatedAt)
            .order_by_desc(follow::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let following_ids: Vec<i64> = edges.iter().map(|e| e.following_id).collect();
        if following_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Preserve edge ordering
        let accounts = Account::find()
            .filter(account::Column::Id.is_in(following_ids.clone()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut by_id: std::collections::HashMap<i64, account::Model> =
            accounts.into_iter().map(|a| (a.id, a)).collect();
        Ok(following_ids
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .collect())
    }

    /// Count followers of an account.
    pub async fn count_followers(&self, account_id: i64) -> AppResult<u64> {
        Follow::find()
            .filter(follow::Column::FollowingId.eq(account_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count accounts an account follows.
    pub async fn count_following(&self, account_id: i64) -> AppResult<u64> {
        Follow::find()
            .filter(follow::Column::FollowerId.eq(account_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Internal user IDs whose accounts follow the given account.
    ///
    /// This is the feed fan-out target set: only accounts with a `users`
    /// row have a feed.
    pub async fn follower_user_ids(&self, account_id: i64) -> AppResult<Vec<i64>> {
        let edges = Follow::find()
            .filter(follow::Column::FollowingId.eq(account_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let follower_ids: Vec<i64> = edges.iter().map(|e| e.follower_id).collect();
        if follower_ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = User::find()
            .filter(user::Column::AccountId.is_in(follower_ids))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().map(|u| u.id).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_follow(id: i64, follower_id: i64, following_id: i64) -> follow::Model {
        follow::Model {
            id,
            follower_id,
            following_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_is_following_true() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[test_follow(1, 10, 20)]])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        assert!(repo.is_following(10, 20).await.unwrap());
    }

    #[tokio::test]
    async fn test_is_following_false() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([Vec::<follow::Model>::new()])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        assert!(!repo.is_following(10, 30).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_pair_absent_edge() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([Vec::<follow::Model>::new()])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        assert!(!repo.delete_by_pair(10, 20).await.unwrap());
    }

    #[tokio::test]
    async fn test_follower_user_ids_no_followers() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([Vec::<follow::Model>::new()])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        assert!(repo.follower_user_ids(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_follower_user_ids_joins_users() {
        let edges = vec![test_follow(1, 10, 99), test_follow(2, 11, 99)];
        // Only account 10 is bound to a user
        let users = vec![user::Model {
            id: 5,
            account_id: 10,
            site_id: 1,
            created_at: Utc::now(),
        }];

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([edges])
                .append_query_results([users])
                .into_connection(),
        );

        let repo = FollowRepository::new(db);
        assert_eq!(repo.follower_user_ids(99).await.unwrap(), vec![5]);
    }
}
