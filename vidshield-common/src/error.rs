//! Common error types for VidShield

use thiserror::Error;

/// Common result type for VidShield operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across VidShield crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stream event payload could not be decoded
    #[error("Malformed '{event}' payload: {message}")]
    Parse {
        /// SSE event name the payload arrived under
        event: String,
        /// Decoder message
        message: String,
    },
}
