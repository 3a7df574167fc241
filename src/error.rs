//! Error types for the site wizard.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("Dialog error: {0}")]
    Dialog(#[from] DialogError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// Failures of the external services the wizard talks to.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("{service} returned status {status}: {body}")]
    BadStatus {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("{service} timed out after {timeout:?}")]
    Timeout { service: String, timeout: Duration },
}

/// Dialog engine errors.
///
/// These never reach the user verbatim; the turn handler turns them into a
/// generic failure message and keeps the last persisted stack.
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("No dialog registered with id {0}")]
    UnknownDialog(String),

    #[error("Dialog {dialog} has no step {step}")]
    StepOutOfRange { dialog: String, step: usize },

    #[error("Dialog stack is empty")]
    EmptyStack,

    #[error("Frame options do not match dialog {dialog}")]
    OptionsMismatch { dialog: String },

    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),
}

/// Result type alias for the wizard.
pub type Result<T> = std::result::Result<T, Error>;
