//! Which jobs a sync channel follows.

use std::collections::{BTreeSet, HashSet};

use harvest_domain::{JobId, JobTable};

/// The set of jobs whose updates are delivered.
///
/// In `all` mode every job is followed except the explicitly untracked
/// ones; otherwise only the listed ids are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interest {
    all: bool,
    ids: HashSet<JobId>,
    excluded: HashSet<JobId>,
}

impl Interest {
    /// Follow nothing yet.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Follow every job.
    #[must_use]
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    /// Follow the given jobs.
    #[must_use]
    pub fn ids<I: IntoIterator<Item = JobId>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Returns true in `all` mode.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        self.all
    }

    /// Returns true if updates for the job are delivered.
    #[must_use]
    pub fn includes(&self, id: &JobId) -> bool {
        if self.excluded.contains(id) {
            return false;
        }
        self.all || self.ids.contains(id)
    }

    /// Starts following a job.
    pub fn track(&mut self, id: JobId) {
        self.excluded.remove(&id);
        self.ids.insert(id);
    }

    /// Switches to `all` mode.
    pub fn track_all(&mut self) {
        self.all = true;
    }

    /// Stops following a job.
    pub fn untrack(&mut self, id: &JobId) {
        self.ids.remove(id);
        self.excluded.insert(id.clone());
    }

    /// Returns true while any followed job may still change state.
    ///
    /// An explicitly tracked job counts as pending until the table holds a
    /// terminal record for it.
    #[must_use]
    pub fn has_pending(&self, table: &JobTable) -> bool {
        self.ids
            .iter()
            .any(|id| !self.excluded.contains(id) && table.is_pending(id))
            || (self.all && table.non_terminal_ids().any(|id| self.includes(id)))
    }

    /// Ids the reconciling poll fetches one by one: explicitly tracked jobs
    /// without a terminal record and, in `all` mode, every followed row of
    /// the table that is not terminal yet.
    #[must_use]
    pub fn pending_ids(&self, table: &JobTable) -> Vec<JobId> {
        let mut ids: BTreeSet<JobId> = self
            .ids
            .iter()
            .filter(|id| !self.excluded.contains(*id) && table.is_pending(id))
            .cloned()
            .collect();
        if self.all {
            ids.extend(
                table
                    .non_terminal_ids()
                    .filter(|id| self.includes(id))
                    .cloned(),
            );
        }
        ids.into_iter().collect()
    }
}
