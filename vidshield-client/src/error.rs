//! Error types for vidshield-client
//!
//! Two failure classes reach the client: transport failures (retried by the
//! reconnect policy) and collaborator API failures (surfaced in state).
//! Server-reported job errors are stream events, not `ClientError`s.

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Stream could not be opened or broke while reading
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the violations API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// vidshield-common error
    #[error("Common error: {0}")]
    Common(#[from] vidshield_common::Error),

    /// Control command sent after the client task ended
    #[error("Processing client has stopped")]
    Stopped,
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
