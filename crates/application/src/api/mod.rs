//! Typed wrappers over the REST endpoints.

mod jobs;
mod results;

pub use jobs::JobsApi;
pub use results::ResultsApi;

/// Endpoint paths, relative to the API base URL.
pub mod paths {
    use harvest_domain::JobId;

    /// `POST` credentials, returns access and refresh tokens.
    pub const AUTH_LOGIN: &str = "/api/auth/login/";
    /// `POST` a new account, returns tokens and the user.
    pub const AUTH_REGISTER: &str = "/api/auth/register/";
    /// `POST {refresh}`, returns a new access token.
    pub const AUTH_REFRESH: &str = "/api/auth/refresh/";
    /// `GET` the signed-in user.
    pub const AUTH_ME: &str = "/api/auth/me/";
    /// `GET` list or `POST` create.
    pub const JOBS: &str = "/api/jobs/";
    /// `POST` several jobs at once.
    pub const JOBS_BATCH: &str = "/api/jobs/batch/";
    /// `GET` aggregate counters.
    pub const JOBS_STATISTICS: &str = "/api/jobs/statistics/";
    /// `GET` list of results.
    pub const RESULTS: &str = "/api/results/";

    /// `/api/jobs/{id}/`
    #[must_use]
    pub fn job(id: &JobId) -> String {
        format!("{JOBS}{id}/")
    }

    /// `/api/jobs/{id}/{action}/`
    #[must_use]
    pub fn job_action(id: &JobId, action: &str) -> String {
        format!("{JOBS}{id}/{action}/")
    }

    /// `/api/results/{id}/`
    #[must_use]
    pub fn result(id: i64) -> String {
        format!("{RESULTS}{id}/")
    }

    /// `/api/results/{id}/{action}/`
    #[must_use]
    pub fn result_action(id: i64, action: &str) -> String {
        format!("{RESULTS}{id}/{action}/")
    }
}
