//! Job endpoints.

use harvest_domain::{
    BatchCreate, CreateJob, HarvestResult, JobId, JobListQuery, JobRecord, JobStatistics, Page,
};
use tracing::debug;

use super::paths;
use crate::error::{ApiError, ApiResult};
use crate::gateway::{ApiRequest, AuthenticatedGateway};
use crate::sync::JobSyncHandle;

/// Job endpoints.
///
/// With a sync handle attached, jobs created or retried through this API
/// are tracked by the sync channel right away.
#[derive(Debug, Clone)]
pub struct JobsApi {
    gateway: AuthenticatedGateway,
    sync: Option<JobSyncHandle>,
}

impl JobsApi {
    /// Creates the API.
    #[must_use]
    pub const fn new(gateway: AuthenticatedGateway) -> Self {
        Self {
            gateway,
            sync: None,
        }
    }

    /// Hands created and retried jobs to the given sync channel.
    #[must_use]
    pub fn with_sync(mut self, sync: JobSyncHandle) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Lists jobs (first page when the server paginates).
    ///
    /// # Errors
    ///
    /// Any gateway error.
    pub async fn list(&self, query: &JobListQuery) -> ApiResult<Vec<JobRecord>> {
        let request = ApiRequest::get(paths::JOBS).with_query(query)?;
        let page: Page<JobRecord> = self.gateway.send_json(request).await?;
        Ok(page.into_items())
    }

    /// Creates a job.
    ///
    /// # Errors
    ///
    /// Any gateway error; validation failures arrive as `ApiError::Server`.
    pub async fn create(&self, job: &CreateJob) -> ApiResult<JobRecord> {
        let request = ApiRequest::post(paths::JOBS).with_json(job)?;
        let record: JobRecord = self.gateway.send_json(request).await?;
        debug!(job_id = %record.id, "job created");
        if let Some(sync) = &self.sync {
            sync.track_record(record.clone());
        }
        Ok(record)
    }

    /// Fetches one job.
    ///
    /// # Errors
    ///
    /// Any gateway error.
    pub async fn get(&self, id: &JobId) -> ApiResult<JobRecord> {
        self.gateway.send_json(ApiRequest::get(paths::job(id))).await
    }

    /// Fetches the result of a job. `None` until the job has produced one.
    ///
    /// # Errors
    ///
    /// Any gateway error other than 404.
    pub async fn result(&self, id: &JobId) -> ApiResult<Option<HarvestResult>> {
        let request = ApiRequest::get(paths::job_action(id, "result"));
        match self.gateway.send_json(request).await {
            Ok(result) => Ok(Some(result)),
            Err(ApiError::Server { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Starts a new run of a job.
    ///
    /// # Errors
    ///
    /// Any gateway error.
    pub async fn retry(&self, id: &JobId) -> ApiResult<JobRecord> {
        let request = ApiRequest::post(paths::job_action(id, "retry"));
        let record: JobRecord = self.gateway.send_json(request).await?;
        if let Some(sync) = &self.sync {
            sync.replace_record(record.clone());
        }
        Ok(record)
    }

    /// Cancels a job.
    ///
    /// # Errors
    ///
    /// Any gateway error.
    pub async fn cancel(&self, id: &JobId) -> ApiResult<JobRecord> {
        let request = ApiRequest::post(paths::job_action(id, "cancel"));
        let record: JobRecord = self.gateway.send_json(request).await?;
        if let Some(sync) = &self.sync {
            sync.track_record(record.clone());
        }
        Ok(record)
    }

    /// Creates several jobs sharing the same options.
    ///
    /// # Errors
    ///
    /// Any gateway error.
    pub async fn batch(&self, batch: &BatchCreate) -> ApiResult<Vec<JobRecord>> {
        let request = ApiRequest::post(paths::JOBS_BATCH).with_json(batch)?;
        let page: Page<JobRecord> = self.gateway.send_json(request).await?;
        let records = page.into_items();
        debug!(count = records.len(), "batch created");
        if let Some(sync) = &self.sync {
            for record in &records {
                sync.track_record(record.clone());
            }
        }
        Ok(records)
    }

    /// Fetches aggregate counters.
    ///
    /// # Errors
    ///
    /// Any gateway error.
    pub async fn statistics(&self) -> ApiResult<JobStatistics> {
        self.gateway
            .send_json(ApiRequest::get(paths::JOBS_STATISTICS))
            .await
    }
}
