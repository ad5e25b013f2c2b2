//! Session repository port
//!
//! Defines the interface for persisting the session between runs.

use async_trait::async_trait;
use harvest_domain::Session;

/// Errors that can occur during session persistence.
#[derive(Debug, thiserror::Error)]
pub enum SessionRepositoryError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No location is available to store the session.
    #[error("no session location available")]
    NoLocation,
}

/// Repository trait for session persistence.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Loads the persisted session.
    ///
    /// # Returns
    /// The stored session. Returns an empty session if none was stored.
    async fn load(&self) -> Result<Session, SessionRepositoryError>;

    /// Persists the session, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the session cannot be written.
    async fn save(&self, session: &Session) -> Result<(), SessionRepositoryError>;

    /// Removes the persisted session.
    ///
    /// # Errors
    /// Returns an error if the stored session exists but cannot be removed.
    async fn clear(&self) -> Result<(), SessionRepositoryError>;
}
