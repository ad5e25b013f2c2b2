//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The provided URL is invalid or malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A job status string is not one of the known states.
    #[error("unknown job status: {0}")]
    UnknownStatus(String),

    /// A configuration value is out of range or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A batch request contains no URLs.
    #[error("batch must contain at least one URL")]
    EmptyBatch,
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
