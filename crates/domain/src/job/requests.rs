//! Request and response bodies of the job endpoints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use super::JobStatus;
use crate::error::{DomainError, DomainResult};

fn validate_target(url: &str) -> DomainResult<()> {
    let parsed = Url::parse(url).map_err(|e| DomainError::InvalidUrl(format!("{e}: {url}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DomainError::InvalidUrl(format!(
            "URL must start with http:// or https://: {url}"
        )));
    }
    Ok(())
}

fn default_options() -> serde_json::Value {
    serde_json::json!({ "mode": "full", "depth": 1 })
}

/// Body of `POST /jobs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateJob {
    /// Site to harvest.
    pub url: String,
    /// Harvest options.
    pub options: serde_json::Value,
}

impl CreateJob {
    /// Creates a job request with the default options (`full`, depth 1).
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` if the URL is not absolute http(s).
    pub fn new(url: impl Into<String>) -> DomainResult<Self> {
        let url = url.into();
        validate_target(&url)?;
        Ok(Self {
            url,
            options: default_options(),
        })
    }

    /// Replaces the harvest options.
    #[must_use]
    pub fn with_options(mut self, options: serde_json::Value) -> Self {
        self.options = options;
        self
    }
}

/// Body of `POST /jobs/batch`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchCreate {
    /// Sites to harvest.
    pub urls: Vec<String>,
    /// Options shared by every job in the batch.
    pub options: serde_json::Value,
}

impl BatchCreate {
    /// Creates a batch request, validating every URL.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::EmptyBatch` for an empty list, or
    /// `DomainError::InvalidUrl` naming the first bad entry.
    pub fn new<I, S>(urls: I) -> DomainResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls
            .into_iter()
            .map(Into::into)
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() {
            return Err(DomainError::EmptyBatch);
        }
        for url in &urls {
            validate_target(url)?;
        }
        Ok(Self {
            urls,
            options: default_options(),
        })
    }
}

/// Filters for `GET /jobs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobListQuery {
    /// Only jobs in this state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    /// Free-text search over URLs and tags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Sort key, e.g. `-created_at`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering: Option<String>,
    /// 1-based page number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

/// Aggregate counters from `GET /jobs/statistics`.
///
/// The server decides which counters it reports; they are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobStatistics(pub BTreeMap<String, serde_json::Value>);

impl JobStatistics {
    /// Reads a counter as an integer.
    #[must_use]
    pub fn count(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(serde_json::Value::as_u64)
    }
}

/// A list response that is either a bare array or a paginated envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Page<T> {
    /// `{ "count": n, "next": .., "results": [..] }`
    Paginated {
        /// Total number of items on the server.
        #[serde(default)]
        count: Option<u64>,
        /// URL of the next page, if any.
        #[serde(default)]
        next: Option<String>,
        /// Items on this page.
        results: Vec<T>,
    },
    /// `[..]`
    Plain(Vec<T>),
}

impl<T> Page<T> {
    /// Consumes the page, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Paginated { results, .. } => results,
            Self::Plain(items) => items,
        }
    }

    /// Returns true if the server reported a further page.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        matches!(self, Self::Paginated { next: Some(_), .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_create_job_validates_url() {
        assert!(CreateJob::new("https://example.com").is_ok());
        assert!(matches!(
            CreateJob::new("ftp://example.com"),
            Err(DomainError::InvalidUrl(_))
        ));
        assert!(CreateJob::new("not a url").is_err());
    }

    #[test]
    fn test_create_job_default_options() {
        let job = CreateJob::new("https://example.com").unwrap();
        assert_eq!(job.options, serde_json::json!({"mode": "full", "depth": 1}));
    }

    #[test]
    fn test_batch_skips_blank_lines_and_rejects_empty() {
        let batch = BatchCreate::new(["https://a.example", "  ", "https://b.example"]).unwrap();
        assert_eq!(batch.urls.len(), 2);
        assert_eq!(BatchCreate::new(["", " "]), Err(DomainError::EmptyBatch));
    }

    #[test]
    fn test_list_query_encodes_only_set_fields() {
        let query = JobListQuery {
            status: Some(JobStatus::Running),
            page: Some(2),
            ..JobListQuery::default()
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            serde_json::json!({"status": "running", "page": 2})
        );
    }

    #[test]
    fn test_page_accepts_both_shapes() {
        let plain: Page<u32> = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(plain.into_items(), vec![1, 2]);

        let paged: Page<u32> =
            serde_json::from_str(r#"{"count": 3, "next": "/jobs?page=2", "results": [1]}"#)
                .unwrap();
        assert!(paged.has_next());
        assert_eq!(paged.into_items(), vec![1]);
    }

    #[test]
    fn test_statistics_count() {
        let stats: JobStatistics =
            serde_json::from_str(r#"{"total": 12, "by_status": {"running": 2}}"#).unwrap();
        assert_eq!(stats.count("total"), Some(12));
        assert_eq!(stats.count("by_status"), None);
    }
}
