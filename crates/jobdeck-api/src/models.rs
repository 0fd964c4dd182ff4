//! Wire types for the dashboard API.
//!
//! Rows from datatable resources stay as raw JSON documents; each page of the
//! dashboard knows the shape of its own resource. Everything else is typed.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One page of a datatable resource.
#[derive(Debug, Clone, Deserialize)]
pub struct DataTablePage {
    /// Raw row documents for this window.
    #[serde(rename = "aaData", default)]
    pub rows: Vec<Value>,
    /// Total records matching the query across all pages.
    #[serde(rename = "iTotalDisplayRecords", default)]
    pub total: u64,
    /// Echo token from the request. The server reflects it verbatim, which
    /// means it can come back as a string.
    #[serde(rename = "sEcho", default, deserialize_with = "u64_lenient")]
    pub echo: u64,
}

fn u64_lenient<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Traceback payload for a job.
///
/// The server returns the saved history when it keeps one and the plain
/// traceback otherwise; [`TracebackResponse::text`] folds both into one
/// displayable string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TracebackResponse {
    #[serde(default)]
    pub traceback: Option<String>,
    #[serde(default)]
    pub traceback_history: Option<Vec<Value>>,
}

impl TracebackResponse {
    /// History first, current traceback second, fixed default last.
    #[must_use]
    pub fn text(&self) -> String {
        if let Some(history) = &self.traceback_history {
            if !history.is_empty() {
                return history
                    .iter()
                    .map(|entry| {
                        entry
                            .get("traceback")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_owned()
                    })
                    .collect::<Vec<_>>()
                    .join("\n---\n");
            }
        }
        match &self.traceback {
            Some(t) if !t.is_empty() => t.clone(),
            _ => "No exception raised".to_owned(),
        }
    }
}

/// An explicit action applied to jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Cancel,
    Requeue,
}

impl JobAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cancel => "cancel",
            Self::Requeue => "requeue",
        }
    }
}

/// A job action request: one job by id, or every job matching the filters.
///
/// A `status` filter containing `-` targets any of the dash-separated
/// statuses; the server splits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobActionRequest {
    pub action: JobAction,
    pub id: Option<String>,
    pub filters: BTreeMap<String, String>,
}

impl JobActionRequest {
    #[must_use]
    pub fn by_id(action: JobAction, id: impl Into<String>) -> Self {
        Self {
            action,
            id: Some(id.into()),
            filters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn by_filters(action: JobAction, filters: BTreeMap<String, String>) -> Self {
        Self {
            action,
            id: None,
            filters,
        }
    }

    /// Form fields for the POST body. An id wins over filters; empty filter
    /// values are omitted.
    #[must_use]
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![("action".to_owned(), self.action.as_str().to_owned())];
        if let Some(id) = &self.id {
            form.push(("id".to_owned(), id.clone()));
        } else {
            for (key, value) in &self.filters {
                if !value.is_empty() {
                    form.push((key.clone(), value.clone()));
                }
            }
        }
        form
    }
}

/// Receipt from a job action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobActionReceipt {
    #[serde(default)]
    pub job_id: Option<Value>,
}

/// Target of a log tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Job(String),
    Worker(String),
}

impl LogTarget {
    #[must_use]
    pub fn query_param(&self) -> (&'static str, &str) {
        match self {
            Self::Job(id) => ("job", id.as_str()),
            Self::Worker(id) => ("worker", id.as_str()),
        }
    }
}

/// A chunk of incremental logs plus the cursor for the next poll.
///
/// `logs` is a newline-joined block, possibly empty when already up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LogTail {
    #[serde(default)]
    pub logs: String,
    #[serde(default)]
    pub last_log_id: String,
}

/// Worker profile within a group: resource bounds and the launch command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProfile {
    #[serde(default)]
    pub memory: u64,
    #[serde(default)]
    pub cpu: u64,
    #[serde(default)]
    pub min_count: u32,
    #[serde(default)]
    pub max_count: u32,
    #[serde(default)]
    pub command: String,
}

/// A named worker group: its profiles plus process handling settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerGroup {
    #[serde(default)]
    pub profiles: BTreeMap<String, WorkerProfile>,
    #[serde(default)]
    pub process_termination_timeout: u64,
}

/// The full worker-groups document, keyed by group name.
pub type WorkerGroups = BTreeMap<String, WorkerGroup>;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct WorkerGroupsEnvelope {
    #[serde(default)]
    pub(crate) workergroups: WorkerGroups,
}

/// Outcome of saving the worker-groups document.
///
/// `Outdated` is a partial success: the named group configs were modified
/// concurrently and were not applied, while everything else was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Ok,
    Outdated(Vec<String>),
    Error(String),
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    outdated_wgcs: Vec<String>,
}

impl From<SaveResponse> for SaveStatus {
    fn from(raw: SaveResponse) -> Self {
        match raw.status.as_str() {
            "ok" => Self::Ok,
            "outdated" => Self::Outdated(raw.outdated_wgcs),
            other => Self::Error(other.to_owned()),
        }
    }
}

/// Snapshot of the worker pool from `GET /workers`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolOverview {
    #[serde(default)]
    pub workers: Vec<PoolWorker>,
}

/// One worker as reported by the pool overview endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolWorker {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub config: PoolWorkerConfig,
    #[serde(default)]
    pub jobs: Vec<Value>,
    #[serde(default)]
    pub done_jobs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolWorkerConfig {
    #[serde(default)]
    pub gevent: u32,
}

impl PoolOverview {
    /// Total concurrency across the pool.
    #[must_use]
    pub fn pool_size(&self) -> u64 {
        self.workers
            .iter()
            .map(|w| u64::from(w.config.gevent))
            .sum()
    }

    /// Jobs currently executing.
    #[must_use]
    pub fn current_jobs(&self) -> u64 {
        self.workers.iter().map(|w| w.jobs.len() as u64).sum()
    }

    /// Jobs finished since the workers started.
    #[must_use]
    pub fn done_jobs(&self) -> u64 {
        self.workers.iter().map(|w| w.done_jobs).sum()
    }

    /// Busy share of the pool as a whole percentage; zero for an empty pool.
    #[must_use]
    pub fn utilization(&self) -> u32 {
        let pool = self.pool_size();
        if pool == 0 {
            return 0;
        }
        ((self.current_jobs() as f64 / pool as f64) * 100.0).round() as u32
    }
}
