//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default OAuth connection used by both resolver sub-flows.
pub const DEFAULT_CONNECTION_NAME: &str = "GraphConnection";

/// Default Microsoft Graph endpoint.
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Wizard configuration.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// OAuth connection identifier passed to the auth collaborator.
    pub connection_name: String,
    /// How long a sign-in prompt waits before it resolves as "no token".
    pub sign_in_timeout: Duration,
    /// Validation attempts allowed per resolver invocation (`None` = unbounded).
    pub max_resolve_attempts: Option<u32>,
    /// Base URL of the directory service.
    pub graph_base_url: String,
    /// Database file for conversation state. `None` keeps state in memory.
    pub db_path: Option<PathBuf>,
    /// Port for the HTTP message endpoint.
    pub http_port: u16,
    /// Pre-issued directory token for hosts without an interactive sign-in.
    pub static_token: Option<SecretString>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            connection_name: DEFAULT_CONNECTION_NAME.to_string(),
            sign_in_timeout: Duration::from_millis(300_000),
            max_resolve_attempts: Some(5),
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            db_path: None,
            http_port: 3978,
            static_token: None,
        }
    }
}

impl WizardConfig {
    /// Build the configuration from `WIZARD_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(name) = lookup("WIZARD_CONNECTION_NAME").filter(|s| !s.trim().is_empty()) {
            config.connection_name = name.trim().to_string();
        }

        if let Some(raw) = lookup("WIZARD_SIGN_IN_TIMEOUT_MS") {
            let ms: u64 = parse_number("WIZARD_SIGN_IN_TIMEOUT_MS", &raw)?;
            config.sign_in_timeout = Duration::from_millis(ms);
        }

        if let Some(raw) = lookup("WIZARD_MAX_RESOLVE_ATTEMPTS") {
            let max: u32 = parse_number("WIZARD_MAX_RESOLVE_ATTEMPTS", &raw)?;
            config.max_resolve_attempts = if max == 0 { None } else { Some(max) };
        }

        if let Some(url) = lookup("WIZARD_GRAPH_BASE_URL").filter(|s| !s.trim().is_empty()) {
            config.graph_base_url = url.trim().trim_end_matches('/').to_string();
        }

        config.db_path = lookup("WIZARD_DB_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        if let Some(raw) = lookup("WIZARD_HTTP_PORT") {
            config.http_port = parse_number("WIZARD_HTTP_PORT", &raw)?;
        }

        config.static_token = lookup("WIZARD_GRAPH_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .map(SecretString::from);

        Ok(config)
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
}
