//! Live job synchronisation.
//!
//! A sync channel keeps a [`JobTable`](harvest_domain::JobTable) current by
//! combining the server's push stream with a reconciling poll that runs
//! only while a followed job is still in progress. Both sources go through
//! the same freshness rule, so their arrival order does not matter.

mod backoff;
mod channel;
mod interest;

pub use backoff::ReconnectBackoff;
pub use channel::{JobSyncConfig, JobSyncEvent, JobSyncHandle, PollState, StopReason};
pub use interest::Interest;
