//! Result endpoints.

use harvest_domain::{
    CompareRequest, Comparison, ExportFormat, ExportedResult, HarvestResult, Page,
    ResultListQuery,
};

use super::paths;
use crate::error::ApiResult;
use crate::gateway::{ApiRequest, AuthenticatedGateway};

/// Result endpoints.
#[derive(Debug, Clone)]
pub struct ResultsApi {
    gateway: AuthenticatedGateway,
}

impl ResultsApi {
    /// Creates the API.
    #[must_use]
    pub const fn new(gateway: AuthenticatedGateway) -> Self {
        Self { gateway }
    }

    /// Lists results.
    ///
    /// # Errors
    ///
    /// Any gateway error.
    pub async fn list(&self, query: &ResultListQuery) -> ApiResult<Vec<HarvestResult>> {
        let request = ApiRequest::get(paths::RESULTS).with_query(query)?;
        let page: Page<HarvestResult> = self.gateway.send_json(request).await?;
        Ok(page.into_items())
    }

    /// Fetches one result.
    ///
    /// # Errors
    ///
    /// Any gateway error.
    pub async fn get(&self, id: i64) -> ApiResult<HarvestResult> {
        self.gateway.send_json(ApiRequest::get(paths::result(id))).await
    }

    /// Downloads a result in the given format.
    ///
    /// # Errors
    ///
    /// Any gateway error.
    pub async fn export(&self, id: i64, format: ExportFormat) -> ApiResult<ExportedResult> {
        let request = ApiRequest::get(paths::result_action(id, "export"))
            .with_query(&[("format", format.as_str())])?;
        let response = self.gateway.send(request).await?;
        Ok(ExportedResult {
            format,
            content_type: response.content_type().map(String::from),
            bytes: response.into_bytes(),
        })
    }

    /// Compares a result with another one.
    ///
    /// # Errors
    ///
    /// Any gateway error.
    pub async fn compare(&self, id: i64, other: i64) -> ApiResult<Comparison> {
        let request =
            ApiRequest::post(paths::result_action(id, "compare")).with_json(&CompareRequest { other })?;
        self.gateway.send_json(request).await
    }
}
