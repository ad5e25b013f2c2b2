//! Push channel message and connection types.

use serde::{Deserialize, Serialize};

use crate::job::JobUpdate;

/// Message received on the job event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// `{"type": "job_updated", "id": .., "status": .., "sequence": ..}`
    JobUpdated(JobUpdate),
    /// Any message type this client does not handle.
    #[serde(other)]
    Unknown,
}

/// State of the push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected and not trying.
    #[default]
    Disconnected,
    /// First connection attempt in progress.
    Connecting,
    /// Connected and receiving events.
    Connected,
    /// Waiting to retry after a drop or failed attempt.
    Reconnecting,
}

impl ConnectionState {
    /// Check if the connection is active.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}
