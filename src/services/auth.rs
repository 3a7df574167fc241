//! Authentication collaborator — sign-in token lookup and magic-code exchange.

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;

use crate::error::CollaboratorError;

/// Opaque bearer credential for the directory service.
///
/// Lives only on the resolver frame that obtained it and is never written to
/// durable state; a reloaded frame asks the [`AuthProvider`] again.
#[derive(Clone)]
pub struct AuthToken(SecretString);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

impl PartialEq for AuthToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

/// The sign-in provider behind a named OAuth connection.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// A token the user already holds for `connection`, if any.
    async fn user_token(
        &self,
        connection: &str,
        user_id: &str,
    ) -> Result<Option<AuthToken>, CollaboratorError>;

    /// Exchange a sign-in magic code for a token. `None` means the code was
    /// not accepted.
    async fn exchange_code(
        &self,
        connection: &str,
        user_id: &str,
        code: &str,
    ) -> Result<Option<AuthToken>, CollaboratorError>;

    /// A sign-in completion event delivered `token` for `user_id`.
    ///
    /// Providers backed by a token service already hold it, hence the no-op
    /// default.
    async fn accept_token(
        &self,
        _connection: &str,
        _user_id: &str,
        _token: &AuthToken,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

/// In-process auth provider with an optional shared token and a table of
/// magic codes.
///
/// Tokens obtained by signing in are kept per connection and user. Used by the
/// CLI host (token from `WIZARD_GRAPH_TOKEN`) and by tests.
#[derive(Default)]
pub struct StaticAuthProvider {
    fallback: Option<AuthToken>,
    signed_in: RwLock<HashMap<(String, String), AuthToken>>,
    codes: RwLock<HashMap<String, AuthToken>>,
}

impl StaticAuthProvider {
    /// No token until a user signs in.
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Every user is already signed in with `token`.
    pub fn signed_in(token: AuthToken) -> Self {
        Self {
            fallback: Some(token),
            ..Default::default()
        }
    }

    /// Accept `code` as a magic code for `token`.
    pub async fn add_code(&self, code: impl Into<String>, token: AuthToken) {
        self.codes.write().await.insert(code.into(), token);
    }

    async fn remember(&self, connection: &str, user_id: &str, token: AuthToken) {
        self.signed_in
            .write()
            .await
            .insert((connection.to_string(), user_id.to_string()), token);
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn user_token(
        &self,
        connection: &str,
        user_id: &str,
    ) -> Result<Option<AuthToken>, CollaboratorError> {
        let key = (connection.to_string(), user_id.to_string());
        if let Some(token) = self.signed_in.read().await.get(&key) {
            return Ok(Some(token.clone()));
        }
        Ok(self.fallback.clone())
    }

    async fn exchange_code(
        &self,
        connection: &str,
        user_id: &str,
        code: &str,
    ) -> Result<Option<AuthToken>, CollaboratorError> {
        let token = self.codes.read().await.get(code.trim()).cloned();
        if let Some(ref t) = token {
            self.remember(connection, user_id, t.clone()).await;
        }
        Ok(token)
    }

    async fn accept_token(
        &self,
        connection: &str,
        user_id: &str,
        token: &AuthToken,
    ) -> Result<(), CollaboratorError> {
        self.remember(connection, user_id, token.clone()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = AuthToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "AuthToken([REDACTED])");
    }

    #[tokio::test]
    async fn code_exchange_caches_token() {
        let auth = StaticAuthProvider::signed_out();
        auth.add_code("123456", AuthToken::new("t1")).await;

        assert!(auth.user_token("conn", "u").await.unwrap().is_none());
        assert!(auth.exchange_code("conn", "u", "000000").await.unwrap().is_none());

        let token = auth.exchange_code("conn", "u", "123456").await.unwrap();
        assert_eq!(token.unwrap().expose(), "t1");
        assert_eq!(auth.user_token("conn", "u").await.unwrap().unwrap().expose(), "t1");
    }

    #[tokio::test]
    async fn code_exchange_signs_in_only_that_user() {
        let auth = StaticAuthProvider::signed_out();
        auth.add_code("123456", AuthToken::new("alice-token")).await;

        auth.exchange_code("GraphConnection", "alice", "123456").await.unwrap();

        assert!(auth.user_token("GraphConnection", "bob").await.unwrap().is_none());
        assert!(auth.user_token("OtherConnection", "alice").await.unwrap().is_none());
        assert_eq!(
            auth.user_token("GraphConnection", "alice").await.unwrap(),
            Some(AuthToken::new("alice-token"))
        );
    }

    #[tokio::test]
    async fn accepted_token_is_per_user_and_overrides_fallback() {
        let auth = StaticAuthProvider::signed_in(AuthToken::new("shared"));
        auth.accept_token("conn", "u1", &AuthToken::new("own")).await.unwrap();

        assert_eq!(auth.user_token("conn", "u1").await.unwrap().unwrap().expose(), "own");
        assert_eq!(auth.user_token("conn", "u2").await.unwrap().unwrap().expose(), "shared");
    }
}
