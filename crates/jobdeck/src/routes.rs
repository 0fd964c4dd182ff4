//! Route table: the navigable pages and deep-link parsing.

use std::collections::BTreeMap;

/// The navigable pages, in nav-bar order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    /// Platform health: pool size, current jobs, throughput.
    #[default]
    Overview,
    /// Known queues and their backlogs.
    Queues,
    /// Worker processes.
    Workers,
    /// In-flight IO operations across all workers.
    Io,
    /// Job listing with server-side filters.
    Jobs,
    /// Scheduled (recurring) jobs.
    ScheduledJobs,
    /// Job counts grouped by task path.
    TaskPaths,
    /// Job counts grouped by path and exception type.
    TaskExceptions,
    /// Job counts grouped by status.
    Status,
    /// Worker-group configuration editor.
    WorkerGroups,
    /// Agent processes.
    Agents,
}

impl Route {
    /// Every route, in display order.
    pub const ALL: [Self; 11] = [
        Self::Overview,
        Self::Queues,
        Self::Workers,
        Self::Io,
        Self::Jobs,
        Self::ScheduledJobs,
        Self::TaskPaths,
        Self::TaskExceptions,
        Self::Status,
        Self::WorkerGroups,
        Self::Agents,
    ];

    /// Display name for the nav bar.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Queues => "Queues",
            Self::Workers => "Workers",
            Self::Io => "IO",
            Self::Jobs => "Jobs",
            Self::ScheduledJobs => "Scheduled",
            Self::TaskPaths => "Task paths",
            Self::TaskExceptions => "Exceptions",
            Self::Status => "Status",
            Self::WorkerGroups => "Worker groups",
            Self::Agents => "Agents",
        }
    }

    /// Child id in the page tree, which doubles as the deep-link path
    /// segment.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Overview => "overview",
            Self::Queues => "queues",
            Self::Workers => "workers",
            Self::Io => "io",
            Self::Jobs => "jobs",
            Self::ScheduledJobs => "scheduled_jobs",
            Self::TaskPaths => "taskpaths",
            Self::TaskExceptions => "taskexceptions",
            Self::Status => "status",
            Self::WorkerGroups => "workergroups",
            Self::Agents => "agents",
        }
    }

    /// Keyboard shortcut in the nav bar.
    #[must_use]
    pub const fn shortcut(self) -> char {
        match self {
            Self::Overview => '1',
            Self::Queues => '2',
            Self::Workers => '3',
            Self::Io => '4',
            Self::Jobs => '5',
            Self::ScheduledJobs => '6',
            Self::TaskPaths => '7',
            Self::TaskExceptions => '8',
            Self::Status => '9',
            Self::WorkerGroups => '0',
            Self::Agents => 'a',
        }
    }

    /// Reverse shortcut lookup.
    #[must_use]
    pub fn from_shortcut(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.shortcut() == c)
    }

    /// Reverse child-id lookup.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.key() == key)
    }

    /// Parses a deep link like `/jobs?status=failed&queue=default` into a
    /// route and its navigation parameters.
    ///
    /// `/` and the empty string mean [`Route::Overview`]. Parameter values
    /// are taken verbatim; there is no percent-decoding.
    #[must_use]
    pub fn parse(link: &str) -> Option<(Self, BTreeMap<String, String>)> {
        let link = link.trim();
        let (path, query) = match link.split_once('?') {
            Some((path, query)) => (path, query),
            None => (link, ""),
        };
        let path = path.trim_matches('/');
        let route = if path.is_empty() {
            Self::Overview
        } else {
            Self::from_key(path)?
        };
        let mut params = BTreeMap::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if !key.is_empty() {
                params.insert(key.to_owned(), value.to_owned());
            }
        }
        Some((route, params))
    }
}
