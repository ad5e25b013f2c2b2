//! The in-memory job table.

use std::collections::HashMap;

use super::record::supersedes;
use super::{JobRecord, JobUpdate};
use crate::id::JobId;

/// What applying an update or record did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The job was not known and has been added.
    Inserted,
    /// The stored record changed.
    Updated,
    /// The update was stale or identical; nothing changed.
    Unchanged,
}

impl ApplyOutcome {
    /// Returns true if subscribers should hear about the change.
    #[must_use]
    pub const fn changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Mapping from job id to the freshest known record.
///
/// Every writer goes through [`supersedes`], so updates for a job apply in
/// non-decreasing freshness no matter which channel delivered them.
#[derive(Debug, Clone, Default)]
pub struct JobTable {
    jobs: HashMap<JobId, JobRecord>,
}

impl JobTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a bare state change (push event).
    pub fn apply_update(&mut self, update: &JobUpdate) -> ApplyOutcome {
        match self.jobs.get_mut(&update.id) {
            None => {
                self.jobs
                    .insert(update.id.clone(), JobRecord::placeholder(update));
                ApplyOutcome::Inserted
            }
            Some(stored) => {
                if supersedes(
                    (stored.status, stored.sequence),
                    (update.status, update.sequence),
                ) {
                    stored.status = update.status;
                    stored.sequence = stored.sequence.max(update.sequence);
                    ApplyOutcome::Updated
                } else {
                    ApplyOutcome::Unchanged
                }
            }
        }
    }

    /// Applies an authoritative record (poll result or API response).
    ///
    /// Descriptive fields are always refreshed; state and sequence follow
    /// the freshness rule.
    pub fn apply_record(&mut self, record: JobRecord) -> ApplyOutcome {
        match self.jobs.get_mut(&record.id) {
            None => {
                self.jobs.insert(record.id.clone(), record);
                ApplyOutcome::Inserted
            }
            Some(stored) => {
                let before = stored.clone();
                stored.absorb_details(&record);
                if supersedes(
                    (stored.status, stored.sequence),
                    (record.status, record.sequence),
                ) {
                    stored.status = record.status;
                    stored.sequence = stored.sequence.max(record.sequence);
                }
                if *stored == before {
                    ApplyOutcome::Unchanged
                } else {
                    ApplyOutcome::Updated
                }
            }
        }
    }

    /// Overwrites a record unconditionally.
    ///
    /// Only for a server-side retry, which starts a new run of a job that
    /// may already be terminal.
    pub fn replace(&mut self, record: JobRecord) {
        self.jobs.insert(record.id.clone(), record);
    }

    /// Looks up a job.
    #[must_use]
    pub fn get(&self, id: &JobId) -> Option<&JobRecord> {
        self.jobs.get(id)
    }

    /// Returns true if the job is unknown or has not reached a terminal state.
    #[must_use]
    pub fn is_pending(&self, id: &JobId) -> bool {
        self.jobs.get(id).is_none_or(|record| !record.is_terminal())
    }

    /// Ids of all known jobs that are still running their lifecycle.
    pub fn non_terminal_ids(&self) -> impl Iterator<Item = &JobId> {
        self.jobs
            .values()
            .filter(|record| !record.is_terminal())
            .map(|record| &record.id)
    }

    /// All records, newest first (records without a timestamp last).
    #[must_use]
    pub fn snapshot(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self.jobs.values().cloned().collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        records
    }

    /// Number of known jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns true if no job is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
