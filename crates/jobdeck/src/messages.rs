//! Message taxonomy for the shell and its pages.
//!
//! Pages and the shell talk through typed messages wrapped in
//! [`pagekit::Message`]. Poll messages carry the [`Route`] they belong to so
//! the shell can deliver them to the owning page even while it is hidden;
//! the engine's tag and generation checks reject anything stale.

use std::collections::BTreeMap;

use jobdeck_api::{LogTail, PoolOverview, SaveStatus, WorkerGroups};
use pagekit::TablePage;
use serde_json::Value;

use crate::routes::Route;

/// Switch the visible page.
#[derive(Debug, Clone)]
pub struct NavigateMsg {
    pub route: Route,
    pub params: BTreeMap<String, String>,
}

impl NavigateMsg {
    pub fn to(route: Route) -> Self {
        Self {
            route,
            params: BTreeMap::new(),
        }
    }

    pub const fn with_params(route: Route, params: BTreeMap<String, String>) -> Self {
        Self { route, params }
    }
}

/// Re-evaluate polling now. Sent on visibility and rate changes, on manual
/// refresh, and after a navigation re-applied parameters to an already
/// visible page.
#[derive(Debug, Clone, Copy)]
pub struct RefreshNudgeMsg;

/// Tells the owner page that its modal opened or closed.
#[derive(Debug, Clone, Copy)]
pub struct ModalChangedMsg {
    pub open: bool,
}

/// A poll timer fired for a route page.
#[derive(Debug, Clone, Copy)]
pub struct PollTickMsg {
    pub route: Route,
    pub tag: u64,
    pub just_queue: bool,
}

/// A datatable fetch for a route page settled. `page` is `None` when the
/// fetch failed; the page keeps what it has and retries on cadence.
#[derive(Debug, Clone)]
pub struct TableLoadedMsg {
    pub route: Route,
    pub generation: u64,
    pub page: Option<TablePage>,
}

/// The pool overview fetch settled (overview page).
#[derive(Debug, Clone)]
pub struct PoolLoadedMsg {
    pub generation: u64,
    pub overview: Option<PoolOverview>,
}

/// Open the job-detail modal for the given job.
#[derive(Debug, Clone)]
pub struct OpenJobDetailMsg {
    pub job_id: String,
}

/// Open the worker-IO modal for the given worker.
#[derive(Debug, Clone)]
pub struct OpenWorkerIoMsg {
    pub worker_id: String,
}

/// Stored result and traceback for one job.
#[derive(Debug, Clone)]
pub struct JobDetailBody {
    pub result: Value,
    pub traceback: String,
}

/// The job-detail fetch (result + traceback) settled.
#[derive(Debug, Clone)]
pub struct JobDetailLoadedMsg {
    pub job_id: String,
    pub outcome: Result<JobDetailBody, String>,
}

/// The job-detail log tail timer fired.
#[derive(Debug, Clone, Copy)]
pub struct LogTickMsg {
    pub epoch: u64,
}

/// A log tail poll settled. `tail` is `None` on failure; the tail keeps its
/// cursor and retries on cadence.
#[derive(Debug, Clone)]
pub struct LogChunkMsg {
    pub epoch: u64,
    pub tail: Option<LogTail>,
}

/// The worker-IO modal's poll timer fired.
#[derive(Debug, Clone, Copy)]
pub struct WorkerIoTickMsg {
    pub tag: u64,
    pub just_queue: bool,
}

/// The worker-IO modal's workers fetch settled.
#[derive(Debug, Clone)]
pub struct WorkerIoLoadedMsg {
    pub generation: u64,
    pub page: Option<TablePage>,
}

/// A cancel/requeue action finished.
#[derive(Debug, Clone)]
pub struct JobActionDoneMsg {
    pub verb: &'static str,
    pub error: Option<String>,
}

/// The worker-groups document loaded.
#[derive(Debug, Clone)]
pub struct GroupsLoadedMsg {
    pub outcome: Result<WorkerGroups, String>,
}

/// A worker-groups save finished.
#[derive(Debug, Clone)]
pub struct GroupsSavedMsg {
    pub outcome: Result<SaveStatus, String>,
}

/// Severity of a shell alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl AlertLevel {
    /// Short tag shown in front of the alert text.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "ok",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

/// Post an alert on the shell. Non-sticky alerts expire on their own.
#[derive(Debug, Clone)]
pub struct AlertMsg {
    pub level: AlertLevel,
    pub text: String,
    pub sticky: bool,
}

impl AlertMsg {
    pub fn info(text: impl Into<String>) -> Self {
        Self::new(AlertLevel::Info, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(AlertLevel::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(AlertLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(AlertLevel::Error, text)
    }

    fn new(level: AlertLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            sticky: false,
        }
    }

    /// Keeps the alert up until dismissed.
    #[must_use]
    pub const fn sticky(mut self) -> Self {
        self.sticky = true;
        self
    }
}

/// A non-sticky alert reached its deadline.
#[derive(Debug, Clone, Copy)]
pub struct AlertExpiredMsg {
    pub id: u64,
}
