//! Async HTTP client for the dashboard API.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;

use crate::models::{
    DataTablePage, JobActionReceipt, JobActionRequest, LogTail, LogTarget, PoolOverview,
    SaveResponse, SaveStatus, TracebackResponse, WorkerGroups, WorkerGroupsEnvelope,
};

/// Errors from the dashboard API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure or malformed response body.
    #[error("http error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request reached the server but came back non-2xx.
    #[error("unexpected status {status} from {endpoint}")]
    Status {
        endpoint: String,
        status: StatusCode,
    },

    /// A request body failed to encode.
    #[error("failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// The configured base URL is unusable.
    #[error("invalid base url {0:?}: must start with http:// or https://")]
    BaseUrl(String),
}

/// Typed client over the dashboard's HTTP surface.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

impl ApiClient {
    /// Creates a client for a base URL such as `http://127.0.0.1:5555`.
    pub fn new(base: impl Into<String>) -> Result<Self, ApiError> {
        let raw = base.into();
        let base = raw.trim_end_matches('/').to_owned();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ApiError::BaseUrl(raw));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { http, base })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Fetches one window of a datatable resource.
    pub async fn datatable(
        &self,
        resource: &str,
        params: &[(String, String)],
    ) -> Result<DataTablePage, ApiError> {
        let endpoint = format!("{}/api/datatables/{resource}", self.base);
        tracing::debug!(resource, params = params.len(), "fetching datatable page");
        let response = self.http.get(&endpoint).query(params).send().await?;
        let response = check_status(endpoint, response)?;
        Ok(response.json().await?)
    }

    /// Fetches the pool overview (stopped workers excluded server-side).
    pub async fn pool_overview(&self) -> Result<PoolOverview, ApiError> {
        let endpoint = format!("{}/workers", self.base);
        let response = self.http.get(&endpoint).send().await?;
        let response = check_status(endpoint, response)?;
        Ok(response.json().await?)
    }

    /// Fetches a job's stored result.
    pub async fn job_result(&self, job_id: &str) -> Result<Value, ApiError> {
        let endpoint = format!("{}/api/job/{job_id}/result", self.base);
        let response = self.http.get(&endpoint).send().await?;
        let response = check_status(endpoint, response)?;
        let mut body: Value = response.json().await?;
        Ok(body.get_mut("result").map(Value::take).unwrap_or(Value::Null))
    }

    /// Fetches a job's traceback, history included when the server keeps one.
    pub async fn job_traceback(&self, job_id: &str) -> Result<TracebackResponse, ApiError> {
        let endpoint = format!("{}/api/job/{job_id}/traceback", self.base);
        let response = self.http.get(&endpoint).send().await?;
        let response = check_status(endpoint, response)?;
        Ok(response.json().await?)
    }

    /// Applies a cancel/requeue action to one job or a filtered set.
    pub async fn job_action(
        &self,
        request: &JobActionRequest,
    ) -> Result<JobActionReceipt, ApiError> {
        let endpoint = format!("{}/api/jobaction", self.base);
        let form = request.to_form();
        tracing::debug!(action = request.action.as_str(), fields = form.len(), "posting job action");
        let response = self.http.post(&endpoint).form(&form).send().await?;
        let response = check_status(endpoint, response)?;
        Ok(response.json().await?)
    }

    /// Tails logs for a job or worker. Pass the cursor from the previous
    /// tail to receive only new lines; the server hands back a fresh cursor
    /// when already up to date.
    pub async fn logs(
        &self,
        target: &LogTarget,
        cursor: Option<&str>,
    ) -> Result<LogTail, ApiError> {
        let endpoint = format!("{}/api/logs", self.base);
        let (key, id) = target.query_param();
        let mut params = vec![(key, id)];
        if let Some(cursor) = cursor {
            params.push(("last_log_id", cursor));
        }
        let response = self.http.get(&endpoint).query(&params).send().await?;
        let response = check_status(endpoint, response)?;
        Ok(response.json().await?)
    }

    /// Fetches the worker-groups document.
    pub async fn worker_groups(&self) -> Result<WorkerGroups, ApiError> {
        let endpoint = format!("{}/api/workergroups", self.base);
        let response = self.http.get(&endpoint).send().await?;
        let response = check_status(endpoint, response)?;
        let envelope: WorkerGroupsEnvelope = response.json().await?;
        Ok(envelope.workergroups)
    }

    /// Saves the whole worker-groups document.
    ///
    /// [`SaveStatus::Outdated`] in the result is a partial success, not an
    /// error: the named group configs were concurrently modified and skipped.
    pub async fn save_worker_groups(
        &self,
        groups: &WorkerGroups,
    ) -> Result<SaveStatus, ApiError> {
        let endpoint = format!("{}/api/workergroups", self.base);
        let body = serde_json::to_string(groups)?;
        let response = self
            .http
            .post(&endpoint)
            .form(&[("workergroups", body.as_str())])
            .send()
            .await?;
        let response = check_status(endpoint, response)?;
        let raw: SaveResponse = response.json().await?;
        Ok(raw.into())
    }
}

fn check_status(
    endpoint: String,
    response: reqwest::Response,
) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Status { endpoint, status })
    }
}
