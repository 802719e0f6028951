//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout de-assistant.
//! Every error carries the underlying diagnostic text unmodified: the users
//! of this tool are developers who need the raw database message.
//!
//! # Error Categories
//! - `ConfigError`: Bad environment value (e.g. non-numeric `DB_PORT`)
//! - `ConnectionFailed`: A database session could not be established
//! - `QueryFailed`: Statement execution failed
//! - `InvalidInput`: Malformed caller input (non-positive limit, empty message, ...)
//! - `ChatFailed`: The LLM collaborator failed (never surfaced over HTTP)
//! - `Internal`: Anything else (I/O, server startup)

use thiserror::Error;

/// Main error type for de-assistant operations
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Configuration error (bad environment value)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Database connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// LLM collaborator failure
    #[error("Chat model error: {0}")]
    ChatFailed(String),

    /// Unexpected failure outside the database path
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AssistantError {
    /// Convert error to a stable error code string
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ChatFailed(_) => "CHAT_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Human-readable message including the error category
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// The underlying diagnostic text without the category prefix
    ///
    /// This is what the HTTP surface returns in `{"detail": ...}`.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::ConfigError(m)
            | Self::ConnectionFailed(m)
            | Self::QueryFailed(m)
            | Self::InvalidInput(m)
            | Self::ChatFailed(m)
            | Self::Internal(m) => m,
        }
    }

    /// Whether the error is the caller's problem (HTTP 400) rather than ours (HTTP 500)
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_)
                | Self::ConnectionFailed(_)
                | Self::QueryFailed(_)
                | Self::InvalidInput(_)
        )
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a chat collaborator error
    pub fn chat_failed(message: impl Into<String>) -> Self {
        Self::ChatFailed(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<std::io::Error> for AssistantError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Result type alias for de-assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;
