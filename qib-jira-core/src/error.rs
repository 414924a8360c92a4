//! Error types for qib-jira-core

use thiserror::Error;

/// Main error type for the qib-jira-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP transport error (connection, timeout, TLS)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Jira API rejected the request
    #[error("Jira API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication failure (invalid email/token)
    #[error("authentication failed ({status}): check email and API token")]
    Auth { status: u16 },
}

/// Result type alias for qib-jira-core
pub type Result<T> = std::result::Result<T, Error>;
