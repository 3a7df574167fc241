//! libSQL backend — async `StateStore` implementation.
//!
//! Snapshots are stored as JSON text, one row per conversation and one per
//! user. Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::dialog::DialogStack;
use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{StateStore, UserState};

/// libSQL state store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Write a raw value for a conversation, bypassing serialization.
    pub async fn insert_raw_stack(&self, conversation_id: &str, raw: &str) -> Result<(), DatabaseError> {
        self.upsert("conversation_state", "conversation_id", conversation_id, raw)
            .await
    }

    /// The stored snapshot text for a conversation, exactly as written.
    pub async fn raw_stack(&self, conversation_id: &str) -> Result<Option<String>, DatabaseError> {
        self.select("conversation_state", "conversation_id", conversation_id)
            .await
    }

    async fn upsert(&self, table: &str, key_column: &str, key: &str, value: &str) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "INSERT INTO {table} ({key_column}, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT ({key_column}) DO UPDATE SET value = ?2, updated_at = ?3"
        );
        self.conn()
            .execute(&sql, params![key, value, now])
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert {table}: {e}")))?;
        Ok(())
    }

    async fn select(&self, table: &str, key_column: &str, key: &str) -> Result<Option<String>, DatabaseError> {
        let sql = format!("SELECT value FROM {table} WHERE {key_column} = ?1");
        let mut rows = self
            .conn()
            .query(&sql, params![key])
            .await
            .map_err(|e| DatabaseError::Query(format!("select {table}: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<String>(0)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("select {table}: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("select {table}: {e}"))),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(table: &str, key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(table, key, error = %e, "Discarding unreadable snapshot");
            None
        }
    }
}

#[async_trait]
impl StateStore for LibSqlStore {
    async fn load_stack(&self, conversation_id: &str) -> Result<Option<DialogStack>, DatabaseError> {
        let raw = self
            .select("conversation_state", "conversation_id", conversation_id)
            .await?;
        Ok(raw.and_then(|raw| decode("conversation_state", conversation_id, &raw)))
    }

    async fn save_stack(&self, conversation_id: &str, stack: &DialogStack) -> Result<(), DatabaseError> {
        let raw = encode(stack)?;
        self.upsert("conversation_state", "conversation_id", conversation_id, &raw)
            .await?;
        debug!(conversation_id, depth = stack.depth(), "Saved stack");
        Ok(())
    }

    async fn delete_stack(&self, conversation_id: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM conversation_state WHERE conversation_id = ?1",
                params![conversation_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_stack: {e}")))?;
        Ok(count > 0)
    }

    async fn load_user_state(&self, user_id: &str) -> Result<UserState, DatabaseError> {
        let raw = self.select("user_state", "user_id", user_id).await?;
        Ok(raw
            .and_then(|raw| decode("user_state", user_id, &raw))
            .unwrap_or_default())
    }

    async fn save_user_state(&self, user_id: &str, state: &UserState) -> Result<(), DatabaseError> {
        let raw = encode(state)?;
        self.upsert("user_state", "user_id", user_id, &raw).await
    }
}
