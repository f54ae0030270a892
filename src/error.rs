//! Error types for acmewarden
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in acmewarden
#[derive(Debug, Error)]
pub enum WardenError {
    /// Domain list could not be read or is malformed
    #[error("Domain list error: {0}")]
    DomainList(String),

    /// A name that is not a valid hostname
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    /// DNS resolver setup error
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// Artifact publication error
    #[error("Publish error: {0}")]
    Publish(String),

    /// File watch error
    #[error("Watch error: {0}")]
    Watch(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for acmewarden operations
pub type Result<T> = std::result::Result<T, WardenError>;
