//! Harvest job domain types

mod record;
mod requests;
mod status;
mod table;

pub use record::{JobRecord, JobUpdate, supersedes};
pub use requests::{BatchCreate, CreateJob, JobListQuery, JobStatistics, Page};
pub use status::JobStatus;
pub use table::{ApplyOutcome, JobTable};
