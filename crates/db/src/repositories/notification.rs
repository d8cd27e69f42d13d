//! Notification repository.

use std::sync::Arc;

use crate::entities::notification::{self, NotificationKind};
use ghostpub_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a notification for an internal user.
    pub async fn create(
        &self,
        user_id: i64,
        account_id: i64,
        kind: NotificationKind,
        post_id: Option<i64>,
    ) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            user_id: Set(user_id),
            account_id: Set(account_id),
            kind: Set(kind),
            post_id: Set(post_id),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
