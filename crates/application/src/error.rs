//! Application error types

use harvest_domain::DomainError;
use thiserror::Error;

use crate::ports::TransportError;

/// Errors returned to callers of the API gateway and the typed endpoints.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The credential was missing, expired or rejected, and a refresh did
    /// not make the request succeed.
    #[error("authorization failed ({status})")]
    Auth {
        /// Status the server answered with (401 or 403).
        status: u16,
        /// Response body.
        body: String,
    },

    /// No response was received.
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// The server answered with a non-2xx status other than an auth failure.
    #[error("server error {status}: {body}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// A 2xx response body did not have the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// The request could not be built.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
}

impl ApiError {
    /// Returns true if the error means the user must sign in again.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// HTTP status of the failed response, if there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why a credential refresh failed. Always ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// No refresh credential is stored.
    #[error("no refresh credential available")]
    MissingCredential,

    /// The refresh endpoint answered with a non-2xx status.
    #[error("refresh rejected with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The refresh call did not get a response.
    #[error("refresh failed: {0}")]
    Network(#[from] TransportError),

    /// The refresh response could not be decoded.
    #[error("invalid refresh response: {0}")]
    Decode(String),

    /// The session ended while the refresh was in flight.
    #[error("session ended during refresh")]
    Aborted,
}

/// Push channel failures. Recovered by reconnection and the reconciling
/// poll; never surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The connection could not be opened.
    #[error("push connect failed: {0}")]
    Connect(String),

    /// An open connection failed.
    #[error("push connection dropped: {0}")]
    Dropped(String),
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
