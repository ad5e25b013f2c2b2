//! Harvest result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::JobId;

/// Output of a completed harvest, as returned by the results endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestResult {
    /// Result id.
    pub id: i64,
    /// Job that produced the result.
    #[serde(default)]
    pub job: Option<JobId>,
    /// Extracted text content.
    #[serde(default)]
    pub content: String,
    /// Collected asset descriptors.
    #[serde(default)]
    pub assets: Vec<serde_json::Value>,
    /// Detected technology stack.
    #[serde(default)]
    pub technologies: serde_json::Value,
    /// Page metadata (meta tags and similar).
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// When the result was stored.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Filters for `GET /results`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultListQuery {
    /// Only results of this job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobId>,
    /// Free-text search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Formats offered by `GET /results/{id}/export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Structured JSON document.
    #[default]
    Json,
    /// Tabular export.
    Csv,
    /// Archive with HTML and downloaded assets.
    Zip,
}

impl ExportFormat {
    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Zip => "zip",
        }
    }
}

/// Downloaded export payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedResult {
    /// Format that was requested.
    pub format: ExportFormat,
    /// Content type reported by the server.
    pub content_type: Option<String>,
    /// Raw bytes.
    pub bytes: Vec<u8>,
}

/// Body of `POST /results/{id}/compare`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompareRequest {
    /// The result to compare against.
    pub other: i64,
}

/// Server-computed difference between two results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Comparison(pub serde_json::Value);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_result_tolerates_sparse_payload() {
        let result: HarvestResult = serde_json::from_str(r#"{"id": 9, "job": "j1"}"#).unwrap();
        assert_eq!(result.job, Some(JobId::from("j1")));
        assert!(result.assets.is_empty());
    }

    #[test]
    fn test_export_format_names() {
        assert_eq!(ExportFormat::Zip.as_str(), "zip");
        assert_eq!(ExportFormat::default(), ExportFormat::Json);
    }
}
