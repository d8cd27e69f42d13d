//! Account repository.

use std::sync::Arc;

use crate::entities::{account, user, Account, User};
use ghostpub_common::{sha256_hex, AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};

/// Account repository for database operations.
#[derive(Clone)]
pub struct AccountRepository {
    db: Arc<DatabaseConnection>,
}

impl AccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an account by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<account::Model>> {
        Account::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find accounts by IDs, unordered.
    pub async fn find_by_ids(&self, ids: &[i64]) -> AppResult<Vec<account::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Account::find()
            .filter(account::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an account by its canonical `ActivityPub` IRI.
    pub async fn find_by_ap_id(&self, ap_id: &str) -> AppResult<Option<account::Model>> {
        Account::find()
            .filter(account::Column::ApIdHash.eq(sha256_hex(ap_id)))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a local account by its handle.
    ///
    /// Handles are only meaningful for internal accounts, so the lookup is
    /// restricted to accounts with a `users` row.
    pub async fn find_internal_by_username(
        &self,
        username: &str,
    ) -> AppResult<Option<account::Model>> {
        Account::find()
            .filter(account::Column::Username.eq(username))
            .join(JoinType::InnerJoin, account::Relation::User.def())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new account.
    pub async fn create(&self, model: account::ActiveModel) -> AppResult<account::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new account, returning the existing row when the unique
    /// `ap_id_hash` index reports a concurrent insert.
    pub async fn create_or_existing(
        &self,
        model: account::ActiveModel,
        ap_id: &str,
    ) -> AppResult<account::Model> {
        match model.insert(self.db.as_ref()).await {
            Ok(created) => Ok(created),
            Err(e) if is_unique_violation(&e) => self
                .find_by_ap_id(ap_id)
                .await?
                .ok_or_else(|| AppError::Database("Lost race inserting account".to_string())),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// Update an account.
    pub async fn update(&self, model: account::ActiveModel) -> AppResult<account::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the `users` row binding an account to a site, if any.
    pub async fn find_user_for_account(&self, account_id: i64) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::AccountId.eq(account_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether an account is internal (bound to a site).
    pub async fn is_internal(&self, account_id: i64) -> AppResult<bool> {
        Ok(self.find_user_for_account(account_id).await?.is_some())
    }

    /// Find `users` rows for a batch of account IDs.
    pub async fn find_users_for_accounts(
        &self,
        account_ids: &[i64],
    ) -> AppResult<Vec<user::Model>> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }
        User::find()
            .filter(user::Column::AccountId.is_in(account_ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Iterate external accounts by keyset `(updated_at, id)`.
    ///
    /// A LIMIT/OFFSET scan over a table that is concurrently mutated skips
    /// or revisits rows; the keyset walk does not.
    pub async fn external_accounts_after(
        &self,
        after: Option<(chrono::DateTime<chrono::Utc>, i64)>,
        limit: u64,
    ) -> AppResult<Vec<account::Model>> {
        let mut query = Account::find()
            .filter(account::Column::PrivateKey.is_null())
            .order_by_asc(account::Column::UpdatedAt)
            .order_by_asc(account::Column::Id);

        if let Some((updated_at, id)) = after {
            query = query.filter(
                Condition::any()
                    .add(account::Column::UpdatedAt.gt(updated_at))
                    .add(
                        Condition::all()
                            .add(account::Column::UpdatedAt.eq(updated_at))
                            .add(account::Column::Id.gt(id)),
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

/// Whether a database error is a unique-index collision.
#[must_use]
pub fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    pub(crate) fn test_account(id: i64, ap_id: &str, domain: &str) -> account::Model {
        account::Model {
            id,
            uuid: format!("00000000-0000-0000-0000-{id:012}"),
            username: format!("account{id}"),
            name: None,
            bio: None,
            url: None,
            avatar_url: None,
            banner_image_url: None,
            ap_id: ap_id.to_string(),
            ap_id_hash: sha256_hex(ap_id),
            ap_inbox: Some(format!("{ap_id}/inbox")),
            ap_shared_inbox: None,
            ap_outbox: None,
            ap_followers: None,
            ap_following: None,
            ap_liked: None,
            public_key: None,
            private_key: None,
            domain: domain.to_string(),
            domain_hash: sha256_hex(domain),
            custom_fields: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_ap_id_found() {
        let account = test_account(1, "https://r.example/u/alice", "r.example");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[account.clone()]])
                .into_connection(),
        );

        let repo = AccountRepository::new(db);
        let result = repo
            .find_by_ap_id("https://r.example/u/alice")
            .await
            .unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_find_by_ap_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([Vec::<account::Model>::new()])
                .into_connection(),
        );

        let repo = AccountRepository::new(db);
        let result = repo.find_by_ap_id("https://r.example/u/nobody").await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_is_no_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::MySql).into_connection());

        let repo = AccountRepository::new(db);
        let result = repo.find_by_ids(&[]).await.unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_is_internal() {
        let user = user::Model {
            id: 7,
            account_id: 1,
            site_id: 1,
            created_at: Utc::now(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([vec![user]])
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = AccountRepository::new(db);
        assert!(repo.is_internal(1).await.unwrap());
        assert!(!repo.is_internal(2).await.unwrap());
    }
}
