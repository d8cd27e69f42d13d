//! Site repository.

use std::sync::Arc;

use crate::entities::{account, site, user, Account, Site, User};
use ghostpub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};

/// Site repository for database operations.
#[derive(Clone)]
pub struct SiteRepository {
    db: Arc<DatabaseConnection>,
}

impl SiteRepository {
    /// Create a new site repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a site by ID.
    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<site::Model>> {
        Site::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a site by its host.
    pub async fn find_by_host(&self, host: &str) -> AppResult<Option<site::Model>> {
        Site::find()
            .filter(site::Column::Host.eq(host))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new site.
    pub async fn create(&self, model: site::ActiveModel) -> AppResult<site::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Bind an internal account to a site. Idempotent: a concurrent
    /// provisioning race collapses to the existing binding.
    pub async fn create_user(&self, account_id: i64, site_id: i64) -> AppResult<user::Model> {
        let model = user::ActiveModel {
            account_id: sea_orm::Set(account_id),
            site_id: sea_orm::Set(site_id),
            created_at: sea_orm::Set(chrono::Utc::now()),
            ..Default::default()
        };
        match model.insert(self.db.as_ref()).await {
            Ok(user) => Ok(user),
            Err(e) if crate::repositories::is_unique_violation(&e) => User::find()
                .filter(user::Column::AccountId.eq(account_id))
                .one(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
                .ok_or_else(|| AppError::Database("Lost race binding user".to_string())),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    /// The site's default internal account.
    ///
    /// Exactly one exists per site; a second row indicates a provisioning
    /// bug and is reported as such.
    pub async fn find_default_account(&self, site_id: i64) -> AppResult<Option<account::Model>> {
        let users = User::find()
            .filter(user::Column::SiteId.eq(site_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let user = match users.len() {
            0 => return Ok(None),
            1 => &users[0],
            n => {
                return Err(AppError::Internal(format!(
                    "Site {site_id} has {n} users, expected exactly one"
                )))
            }
        };

        Account::find_by_id(user.account_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_site(id: i64, host: &str) -> site::Model {
        site::Model {
            id,
            host: host.to_string(),
            webhook_secret: "secret".to_string(),
            ghost_pro: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_find_by_host() {
        let site = test_site(1, "site.example");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[site.clone()]])
                .into_connection(),
        );

        let repo = SiteRepository::new(db);
        let result = repo.find_by_host("site.example").await.unwrap();

        assert_eq!(result.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_default_account_multiple_users_is_error() {
        let user1 = user::Model {
            id: 1,
            account_id: 1,
            site_id: 1,
            created_at: Utc::now(),
        };
        let user2 = user::Model {
            id: 2,
            account_id: 2,
            site_id: 1,
            created_at: Utc::now(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([vec![user1, user2]])
                .into_connection(),
        );

        let repo = SiteRepository::new(db);
        let result = repo.find_default_account(1).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_default_account_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = SiteRepository::new(db);
        let result = repo.find_default_account(1).await.unwrap();

        assert!(result.is_none());
    }
}
