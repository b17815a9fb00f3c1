//! Violation prefetch for the review step
//!
//! Review data is fetched once, as soon as the job reaches
//! WAITING_FOR_REVIEW, so the review screen opens without a load delay.
//!
//! **Gate:** `fetched` flips to true *before* the request is issued. Both the
//! `initial_state` and `phase_change` paths can trigger, and the gate keeps
//! it to one request. A failed fetch clears `fetched` so a later retry can run.

use crate::collaborators::{TokenProvider, ViolationsApi};
use crate::config::PrefetchConfig;
use crate::error::{ClientError, ClientResult};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use vidshield_common::Phase;

/// One violation record as listed by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub id: String,
    #[serde(default)]
    pub violation_type: String,
    #[serde(default)]
    pub frame_number: Option<u64>,
    #[serde(default)]
    pub timestamp_seconds: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Paginated list response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationPage {
    #[serde(default)]
    pub items: Vec<ViolationRecord>,
    #[serde(default)]
    pub total: u64,
}

/// Prefetch progress, reset together with the session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViolationPrefetchState {
    /// Exactly-once gate
    pub fetched: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub items: Vec<ViolationRecord>,
    pub total: u64,
}

impl ViolationPrefetchState {
    /// Whether a fetch should start for the job's current phase
    pub fn should_fetch(&self, phase: Phase) -> bool {
        phase == Phase::WaitingForReview && !self.fetched
    }

    /// Close the gate and mark loading
    pub fn begin(&mut self) {
        self.fetched = true;
        self.loading = true;
        self.error = None;
    }

    /// Record the fetch outcome; failure reopens the gate
    pub fn finish(&mut self, result: Result<ViolationPage, String>) {
        self.loading = false;
        match result {
            Ok(page) => {
                self.items = page.items;
                self.total = page.total;
                self.error = None;
            }
            Err(message) => {
                self.error = Some(message);
                self.fetched = false;
            }
        }
    }

    /// Retry is allowed only after a failure and while idle
    pub fn can_retry(&self) -> bool {
        !self.fetched && !self.loading && self.error.is_some()
    }
}

/// Build `{base}/api/v1/videos/{job_id}/violations?page=&page_size=`
pub fn violations_url(base_url: &str, job_id: &str, paging: &PrefetchConfig) -> ClientResult<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| ClientError::Transport(format!("Invalid API URL '{}': {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Transport(format!("API URL '{}' cannot be a base", base_url)))?
        .pop_if_empty()
        .extend(["api", "v1", "videos", job_id, "violations"]);
    url.query_pairs_mut()
        .append_pair("page", &paging.page.to_string())
        .append_pair("page_size", &paging.page_size.to_string());
    Ok(url)
}

/// reqwest-backed [`ViolationsApi`]
pub struct HttpViolationsApi {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    paging: PrefetchConfig,
}

impl HttpViolationsApi {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
        paging: PrefetchConfig,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            tokens,
            paging,
        }
    }
}

#[async_trait]
impl ViolationsApi for HttpViolationsApi {
    async fn list_violations(&self, job_id: &str) -> ClientResult<ViolationPage> {
        let url = violations_url(&self.base_url, job_id, &self.paging)?;
        debug!(job_id, %url, "Fetching violations");

        let mut request = self.http.get(url);
        if let Some(token) = self.tokens.token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<ViolationPage>().await?)
    }
}
