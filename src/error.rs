//! Autoscribe error types

use thiserror::Error;

/// Autoscribe error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Research lookup error
    #[error("Research error: {0}")]
    Research(String),

    /// Generation error (malformed or empty completion)
    #[error("Generation error: {0}")]
    Generation(String),

    /// Generation request timed out
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Generation service unavailable (HTTP 503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Generation API returned an error status
    #[error("API error: {0}")]
    Api(String),

    /// Artifact store error
    #[error("Store error: {0}")]
    Store(String),

    /// Template rendering error
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Autoscribe operations
pub type Result<T> = std::result::Result<T, Error>;
