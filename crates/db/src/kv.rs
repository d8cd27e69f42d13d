//! Content-addressed object store: `ActivityPub` IRI → JSON-LD document.
//!
//! Dispatchers serve these documents verbatim; nothing is rebuilt from
//! relational rows. Writes are last-writer-wins on the exact IRI string.

use std::sync::Arc;

use async_trait::async_trait;
use ghostpub_common::{AppError, AppResult};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::Value;

use crate::entities::{key_value, KeyValue};

/// A store of JSON-LD documents keyed by IRI.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a stored document.
    async fn get(&self, key: &str) -> AppResult<Option<Value>>;

    /// Store a document, replacing any existing one.
    async fn set(&self, key: &str, value: Value) -> AppResult<()>;

    /// Remove a document.
    async fn delete(&self, key: &str) -> AppResult<()>;
}

/// Shared handle to an object store implementation.
pub type SharedObjectStore = Arc<dyn ObjectStore>;

/// SQL-backed object store over the `key_value` table.
#[derive(Clone)]
pub struct SqlObjectStore {
    db: Arc<DatabaseConnection>,
}

impl SqlObjectStore {
    /// Create a new SQL-backed object store.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ObjectStore for SqlObjectStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let row = KeyValue::find_by_id(key.to_string())
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::KvStore(e.to_string()))?;
        Ok(row.map(|r| r.value))
    }

    async fn set(&self, key: &str, value: Value) -> AppResult<()> {
        let model = key_value::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(chrono::Utc::now()),
        };

        KeyValue::insert(model)
            .on_conflict(
                OnConflict::column(key_value::Column::Key)
                    .update_columns([key_value::Column::Value, key_value::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::KvStore(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        KeyValue::delete_many()
            .filter(key_value::Column::Key.eq(key))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::KvStore(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    #[tokio::test]
    async fn test_get_found() {
        let stored = key_value::Model {
            key: "https://site.example/.ghost/activitypub/create/abc".to_string(),
            value: json!({"type": "Create"}),
            updated_at: Utc::now(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([[stored]])
                .into_connection(),
        );

        let store = SqlObjectStore::new(db);
        let value = store
            .get("https://site.example/.ghost/activitypub/create/abc")
            .await
            .unwrap();

        assert_eq!(value.unwrap()["type"], "Create");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_query_results([Vec::<key_value::Model>::new()])
                .into_connection(),
        );

        let store = SqlObjectStore::new(db);
        let value = store.get("https://nowhere.example/x").await.unwrap();

        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_set_upserts() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::MySql)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let store = SqlObjectStore::new(db);
        store
            .set("https://site.example/x", json!({"a": 1}))
            .await
            .unwrap();
    }
}
