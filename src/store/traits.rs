//! `StateStore` trait — load/save contract for conversation and user state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dialog::DialogStack;
use crate::error::DatabaseError;

/// Per-user state kept across conversations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(default)]
    pub requests_submitted: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_submitted_at: Option<DateTime<Utc>>,
}

impl UserState {
    pub fn record_submission(&mut self, at: DateTime<Utc>) {
        self.requests_submitted += 1;
        self.last_submitted_at = Some(at);
    }
}

/// Backend-agnostic persistence for dialog stacks and user state.
///
/// Snapshots that no longer deserialize are reported as absent so the
/// conversation starts over instead of failing every turn.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the flow stack for a conversation.
    async fn load_stack(&self, conversation_id: &str) -> Result<Option<DialogStack>, DatabaseError>;

    /// Save (insert or overwrite) the flow stack for a conversation.
    async fn save_stack(&self, conversation_id: &str, stack: &DialogStack) -> Result<(), DatabaseError>;

    /// Remove a conversation's stack. Returns whether one existed.
    async fn delete_stack(&self, conversation_id: &str) -> Result<bool, DatabaseError>;

    /// Load a user's state, or the default when none is stored.
    async fn load_user_state(&self, user_id: &str) -> Result<UserState, DatabaseError>;

    /// Save a user's state.
    async fn save_user_state(&self, user_id: &str, state: &UserState) -> Result<(), DatabaseError>;
}
