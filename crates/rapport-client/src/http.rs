//! # HTTP Report Store
//!
//! Production [`ReportStore`](crate::store::ReportStore) implementation
//! over the platform's authenticated JSON API.
//!
//! ## Architecture
//!
//! Wraps a `reqwest::Client` carrying the bearer token and a
//! per-request timeout in its default configuration. Every response
//! routes through one status-mapping path: 401/403 become
//! [`StoreError::Auth`], 404 becomes [`StoreError::NotFound`] (which
//! `fetch_report` further maps to `Ok(None)` — "no report yet" is a
//! normal state), any other non-2xx becomes [`StoreError::Api`] with
//! the service's `{"message"}` body.
//!
//! ## Retry
//!
//! Only the idempotent `fetch_report` read retries on transport errors
//! (see [`crate::retry`]). Mutating commits are sent exactly once.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use rapport_core::{
    GroupId, NewReport, NewSection, ProjectId, Report, ReportId, ReportPatch, Section, SectionId,
    SectionPatch,
};

use crate::envelope::{failure_message, Envelope};
use crate::error::StoreError;
use crate::retry::retry_read;
use crate::store::{ReportDocument, ReportStore};

/// Configuration for the HTTP report store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Base URL of the persistence API (e.g., `https://api.example.edu/v1`).
    pub base_url: String,
    /// Bearer token identifying the authenticated group member.
    pub bearer_token: String,
    /// Request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl StoreConfig {
    /// Create a new configuration with the default timeout.
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: bearer_token.into(),
            timeout_secs: 30,
        }
    }
}

/// Real HTTP client for the report persistence service.
#[derive(Debug)]
pub struct HttpReportStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReportStore {
    /// Create a new HTTP store from configuration.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        // Validate the base URL up front so a typo fails at construction,
        // not on the first autosave commit.
        Url::parse(&config.base_url).map_err(|e| StoreError::InvalidConfig {
            reason: format!("invalid base URL {:?}: {e}", config.base_url),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&format!(
                        "Bearer {}",
                        config.bearer_token
                    ))
                    .map_err(|_| StoreError::InvalidConfig {
                        reason: "invalid bearer token characters".into(),
                    })?,
                );
                headers.insert(
                    reqwest::header::CONTENT_TYPE,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .map_err(|e| StoreError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a request, mapping transport failures.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<reqwest::Response, StoreError> {
        request.send().await.map_err(|e| StoreError::Http {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }

    /// Route a response by status, then unwrap the `{"data": T}` envelope.
    async fn decode<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
        endpoint: &str,
    ) -> Result<T, StoreError> {
        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| StoreError::Http {
            endpoint: endpoint.to_string(),
            source: e,
        })?;

        if let Some(err) = Self::status_error(status, &bytes, endpoint) {
            return Err(err);
        }

        let envelope: Envelope<T> =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Deserialization {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        Ok(envelope.data)
    }

    /// Map a non-2xx status to its error, or `None` for success.
    fn status_error(
        status: reqwest::StatusCode,
        body: &[u8],
        endpoint: &str,
    ) -> Option<StoreError> {
        if status.is_success() {
            return None;
        }
        // 404 is a normal outcome for fetch ("no report yet"), so it
        // logs at debug; everything else is a real failure.
        if status.as_u16() == 404 {
            tracing::debug!(endpoint, "resource not found");
            return Some(StoreError::NotFound {
                endpoint: endpoint.to_string(),
            });
        }
        tracing::warn!(endpoint, status = status.as_u16(), "persistence call failed");
        let err = match status.as_u16() {
            401 | 403 => StoreError::Auth {
                endpoint: endpoint.to_string(),
                message: failure_message(body),
            },
            code => StoreError::Api {
                endpoint: endpoint.to_string(),
                status: code,
                message: failure_message(body),
            },
        };
        Some(err)
    }
}

#[async_trait]
impl ReportStore for HttpReportStore {
    async fn fetch_report(
        &self,
        project_id: ProjectId,
        group_id: GroupId,
    ) -> Result<Option<ReportDocument>, StoreError> {
        let url = self.endpoint(&format!("/projects/{project_id}/groups/{group_id}/report"));
        tracing::debug!(%project_id, %group_id, "fetching report");

        let client = self.client.clone();
        let resp = retry_read(|| client.get(&url).send())
            .await
            .map_err(|e| StoreError::Http {
                endpoint: url.clone(),
                source: e,
            })?;

        match self.decode::<ReportDocument>(resp, &url).await {
            Ok(doc) => Ok(Some(doc)),
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_report(
        &self,
        project_id: ProjectId,
        group_id: GroupId,
        payload: &NewReport,
    ) -> Result<Report, StoreError> {
        let url = self.endpoint(&format!("/projects/{project_id}/groups/{group_id}/report"));
        tracing::debug!(%project_id, %group_id, "creating report");
        let resp = self.send(self.client.post(&url).json(payload), &url).await?;
        self.decode(resp, &url).await
    }

    async fn update_report(
        &self,
        report_id: ReportId,
        patch: &ReportPatch,
    ) -> Result<Report, StoreError> {
        let url = self.endpoint(&format!("/reports/{report_id}"));
        tracing::debug!(%report_id, "updating report");
        let resp = self.send(self.client.patch(&url).json(patch), &url).await?;
        self.decode(resp, &url).await
    }

    async fn create_section(
        &self,
        report_id: ReportId,
        payload: &NewSection,
    ) -> Result<Section, StoreError> {
        let url = self.endpoint(&format!("/reports/{report_id}/sections"));
        tracing::debug!(%report_id, order = payload.order, "creating section");
        let resp = self.send(self.client.post(&url).json(payload), &url).await?;
        self.decode(resp, &url).await
    }

    async fn update_section(
        &self,
        section_id: SectionId,
        patch: &SectionPatch,
    ) -> Result<Section, StoreError> {
        let url = self.endpoint(&format!("/sections/{section_id}"));
        tracing::debug!(%section_id, "committing section");
        let resp = self.send(self.client.patch(&url).json(patch), &url).await?;
        self.decode(resp, &url).await
    }

    async fn delete_section(&self, section_id: SectionId) -> Result<(), StoreError> {
        let url = self.endpoint(&format!("/sections/{section_id}"));
        tracing::debug!(%section_id, "deleting section");
        let resp = self.send(self.client.delete(&url), &url).await?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| StoreError::Http {
            endpoint: url.clone(),
            source: e,
        })?;
        match Self::status_error(status, &bytes, &url) {
            // Deletion returns 204 with no body — no envelope to unwrap.
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    async fn submit_report(&self, report_id: ReportId) -> Result<Report, StoreError> {
        let url = self.endpoint(&format!("/reports/{report_id}/submit"));
        tracing::debug!(%report_id, "submitting report");
        let resp = self.send(self.client.post(&url), &url).await?;
        self.decode(resp, &url).await
    }
}
