//! Directory collaborator — identity resolution and alias availability.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

use super::auth::AuthToken;

/// A user as returned by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryIdentity {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub mail: Option<String>,
    pub user_principal_name: String,
}

/// Lookups the resolver sub-flows validate answers against.
#[async_trait]
pub trait Directory: Send + Sync {
    /// All identities matching `query`.
    async fn resolve_identity(
        &self,
        token: &AuthToken,
        query: &str,
    ) -> Result<Vec<DirectoryIdentity>, CollaboratorError>;

    /// Whether `alias` is already taken by an existing group.
    async fn alias_in_use(&self, token: &AuthToken, alias: &str) -> Result<bool, CollaboratorError>;
}

/// Directory held in memory. Matching mirrors the Graph `startswith` filter.
#[derive(Default)]
pub struct InMemoryDirectory {
    users: Vec<DirectoryIdentity>,
    aliases: HashSet<String>,
    unavailable: AtomicBool,
    alias_checks: AtomicUsize,
    identity_lookups: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, display_name: &str, upn: &str) -> Self {
        self.users.push(DirectoryIdentity {
            id: format!("id-{}", self.users.len() + 1),
            display_name: display_name.to_string(),
            mail: Some(upn.to_string()),
            user_principal_name: upn.to_string(),
        });
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.insert(alias.to_lowercase());
        self
    }

    /// Make every lookup fail, as if the service were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn alias_checks(&self) -> usize {
        self.alias_checks.load(Ordering::SeqCst)
    }

    pub fn identity_lookups(&self) -> usize {
        self.identity_lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), CollaboratorError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CollaboratorError::RequestFailed {
                service: "directory".into(),
                reason: "service unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn resolve_identity(
        &self,
        _token: &AuthToken,
        query: &str,
    ) -> Result<Vec<DirectoryIdentity>, CollaboratorError> {
        self.identity_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .users
            .iter()
            .filter(|u| {
                u.display_name.to_lowercase().starts_with(&q)
                    || u.user_principal_name.to_lowercase().starts_with(&q)
                    || u.mail
                        .as_deref()
                        .is_some_and(|m| m.to_lowercase().starts_with(&q))
            })
            .cloned()
            .collect())
    }

    async fn alias_in_use(&self, _token: &AuthToken, alias: &str) -> Result<bool, CollaboratorError> {
        self.alias_checks.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.aliases.contains(&alias.trim().to_lowercase()))
    }
}
