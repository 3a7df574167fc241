//! Microsoft Graph directory — native `Directory` implementation over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::IgnoredAny;
use tracing::debug;

use crate::error::CollaboratorError;

use super::auth::AuthToken;
use super::directory::{Directory, DirectoryIdentity};

const SERVICE: &str = "graph";

/// Upper bound on candidates fetched per identity lookup.
const MAX_CANDIDATES: usize = 10;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Graph collection envelope.
#[derive(Debug, Deserialize)]
struct GraphList<T> {
    value: Vec<T>,
}

/// Directory backed by the Graph REST API.
pub struct GraphDirectory {
    base_url: String,
    client: reqwest::Client,
}

impl GraphDirectory {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn get_list<T>(
        &self,
        token: &AuthToken,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, CollaboratorError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{path}", self.base_url);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token.expose())
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::Timeout {
                        service: SERVICE.into(),
                        timeout: REQUEST_TIMEOUT,
                    }
                } else {
                    CollaboratorError::RequestFailed {
                        service: SERVICE.into(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CollaboratorError::BadStatus {
                service: SERVICE.into(),
                status: status.as_u16(),
                body,
            });
        }

        let list: GraphList<T> =
            resp.json()
                .await
                .map_err(|e| CollaboratorError::InvalidResponse {
                    service: SERVICE.into(),
                    reason: e.to_string(),
                })?;
        Ok(list.value)
    }
}

/// Escape a value for use inside an OData string literal.
fn odata_literal(value: &str) -> String {
    value.trim().replace('\'', "''")
}

#[async_trait]
impl Directory for GraphDirectory {
    async fn resolve_identity(
        &self,
        token: &AuthToken,
        query: &str,
    ) -> Result<Vec<DirectoryIdentity>, CollaboratorError> {
        let q = odata_literal(query);
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let filter = format!(
            "startswith(displayName,'{q}') or startswith(mail,'{q}') or startswith(userPrincipalName,'{q}')"
        );
        let users: Vec<DirectoryIdentity> = self
            .get_list(
                token,
                "users",
                &[
                    ("$filter", filter),
                    ("$select", "id,displayName,mail,userPrincipalName".to_string()),
                    ("$top", MAX_CANDIDATES.to_string()),
                ],
            )
            .await?;
        debug!(query, matches = users.len(), "Graph identity lookup");
        Ok(users)
    }

    async fn alias_in_use(&self, token: &AuthToken, alias: &str) -> Result<bool, CollaboratorError> {
        let filter = format!("mailNickname eq '{}'", odata_literal(alias));
        let groups: Vec<IgnoredAny> = self
            .get_list(
                token,
                "groups",
                &[("$filter", filter), ("$select", "id".to_string())],
            )
            .await?;
        debug!(alias, in_use = !groups.is_empty(), "Graph alias check");
        Ok(!groups.is_empty())
    }
}
