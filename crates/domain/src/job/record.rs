//! Job records and the update freshness rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JobStatus;
use crate::id::JobId;

/// Client-side copy of a harvest job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Server-assigned id.
    pub id: JobId,
    /// Target URL of the harvest.
    #[serde(default)]
    pub url: String,
    /// Lifecycle state.
    pub status: JobStatus,
    /// Creation time on the server.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time on the server.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Harvest options, e.g. `{"mode": "full", "depth": 1}`.
    #[serde(default = "empty_options")]
    pub options: serde_json::Value,
    /// Scheduling priority.
    #[serde(default)]
    pub priority: i32,
    /// How many times the server retried the job.
    #[serde(default)]
    pub retry_count: u32,
    /// Failure description for failed jobs.
    #[serde(default)]
    pub error_message: Option<String>,
    /// Free-form labels.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Monotonic update counter used to order competing updates.
    #[serde(default)]
    pub sequence: u64,
}

fn empty_options() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl JobRecord {
    /// Creates a record with only identity and state known.
    ///
    /// Used when a push event names a job the client has not fetched yet;
    /// the next reconciling poll fills in the rest.
    #[must_use]
    pub fn placeholder(update: &JobUpdate) -> Self {
        Self {
            id: update.id.clone(),
            url: String::new(),
            status: update.status,
            created_at: None,
            updated_at: None,
            options: empty_options(),
            priority: 0,
            retry_count: 0,
            error_message: None,
            tags: Vec::new(),
            sequence: update.sequence,
        }
    }

    /// Returns true once the job can no longer change state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The state/sequence pair of this record as an update.
    #[must_use]
    pub fn as_update(&self) -> JobUpdate {
        JobUpdate {
            id: self.id.clone(),
            status: self.status,
            sequence: self.sequence,
        }
    }

    /// Copies descriptive fields (everything except state and sequence).
    pub(crate) fn absorb_details(&mut self, other: &Self) {
        self.url.clone_from(&other.url);
        self.created_at = other.created_at;
        self.updated_at = other.updated_at;
        self.options.clone_from(&other.options);
        self.priority = other.priority;
        self.retry_count = other.retry_count;
        self.error_message.clone_from(&other.error_message);
        self.tags.clone_from(&other.tags);
    }
}

/// A state change for one job, from either the push channel or a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUpdate {
    /// Job the update applies to.
    pub id: JobId,
    /// New state.
    pub status: JobStatus,
    /// Update counter assigned by the server.
    pub sequence: u64,
}

/// Decides whether `incoming` replaces `current` for the same job.
///
/// A terminal state is final. Otherwise a strictly newer sequence wins,
/// and on a tied or older sequence a terminal state still wins over a
/// non-terminal one.
#[must_use]
pub const fn supersedes(current: (JobStatus, u64), incoming: (JobStatus, u64)) -> bool {
    let (current_status, current_sequence) = current;
    let (incoming_status, incoming_sequence) = incoming;

    if current_status.is_terminal() {
        return false;
    }
    incoming_sequence > current_sequence || incoming_status.is_terminal()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_sequence_wins() {
        assert!(supersedes((JobStatus::Pending, 1), (JobStatus::Running, 2)));
        assert!(!supersedes((JobStatus::Running, 2), (JobStatus::Pending, 1)));
    }

    #[test]
    fn test_terminal_wins_on_tie_or_older() {
        assert!(supersedes((JobStatus::Running, 2), (JobStatus::Completed, 1)));
        assert!(supersedes((JobStatus::Running, 2), (JobStatus::Failed, 2)));
        assert!(!supersedes((JobStatus::Running, 2), (JobStatus::Scheduled, 2)));
    }

    #[test]
    fn test_terminal_is_final() {
        assert!(!supersedes((JobStatus::Completed, 1), (JobStatus::Running, 5)));
        assert!(!supersedes((JobStatus::Cancelled, 1), (JobStatus::Failed, 5)));
    }

    #[test]
    fn test_record_defaults_for_missing_fields() {
        let json = r#"{"id": "j1", "status": "running"}"#;
        let record: JobRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.sequence, 0);
        assert_eq!(record.options, serde_json::json!({}));
        assert!(record.created_at.is_none());
    }

    #[test]
    fn test_record_ignores_unknown_fields() {
        let json = r#"{"id": "j1", "status": "pending", "user": 4, "result": null,
                       "url": "https://example.com", "sequence": 3}"#;
        let record: JobRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.url, "https://example.com");
        assert_eq!(record.sequence, 3);
    }
}
