//! In-memory `StateStore` — snapshots held as JSON strings, like a real
//! backend, so corruption handling behaves the same.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::warn;

use crate::dialog::DialogStack;
use crate::error::DatabaseError;
use crate::store::traits::{StateStore, UserState};

#[derive(Default)]
pub struct MemoryStore {
    stacks: RwLock<HashMap<String, String>>,
    users: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw snapshot string, bypassing serialization.
    pub async fn insert_raw_stack(&self, conversation_id: &str, raw: &str) {
        self.stacks
            .write()
            .await
            .insert(conversation_id.to_string(), raw.to_string());
    }

    /// Number of conversations with a saved stack.
    pub async fn stack_count(&self) -> usize {
        self.stacks.read().await.len()
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(kind: &str, key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(kind, key, error = %e, "Discarding unreadable snapshot");
            None
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load_stack(&self, conversation_id: &str) -> Result<Option<DialogStack>, DatabaseError> {
        let stacks = self.stacks.read().await;
        Ok(stacks
            .get(conversation_id)
            .and_then(|raw| decode("stack", conversation_id, raw)))
    }

    async fn save_stack(&self, conversation_id: &str, stack: &DialogStack) -> Result<(), DatabaseError> {
        let raw = encode(stack)?;
        self.stacks
            .write()
            .await
            .insert(conversation_id.to_string(), raw);
        Ok(())
    }

    async fn delete_stack(&self, conversation_id: &str) -> Result<bool, DatabaseError> {
        Ok(self.stacks.write().await.remove(conversation_id).is_some())
    }

    async fn load_user_state(&self, user_id: &str) -> Result<UserState, DatabaseError> {
        let users = self.users.read().await;
        Ok(users
            .get(user_id)
            .and_then(|raw| decode("user_state", user_id, raw))
            .unwrap_or_default())
    }

    async fn save_user_state(&self, user_id: &str, state: &UserState) -> Result<(), DatabaseError> {
        let raw = encode(state)?;
        self.users.write().await.insert(user_id.to_string(), raw);
        Ok(())
    }
}
