//! Job identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Server-assigned identifier of a harvest job.
///
/// The server issues UUIDs, but the client treats the id as an opaque
/// string so that it never has to re-encode what it received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Creates a job id, rejecting empty or whitespace-only values.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidIdentifier` for a blank id.
    pub fn parse(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidIdentifier(
                "job id cannot be empty".to_string(),
            ));
        }
        if value.contains('/') {
            return Err(DomainError::InvalidIdentifier(format!(
                "job id cannot contain '/': {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_blank() {
        assert!(JobId::parse("").is_err());
        assert!(JobId::parse("   ").is_err());
    }

    #[test]
    fn test_parse_rejects_path_separator() {
        assert!(JobId::parse("a/b").is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = JobId::parse("6f1c").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"6f1c\"");
        assert_eq!(id.to_string(), "6f1c");
    }
}
