//! Offline smoke test behind `--self-check`.
//!
//! Primes every route's page with seeded sample data, renders it at a fixed
//! size, and prints one `ok <route>` line per page. No terminal is entered
//! and no network is touched, which makes this safe for CI and packaging.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use jobdeck_api::ApiClient;
use pagekit::{AppContext, Page};

use crate::config::DEFAULT_URL;
use crate::pages::{
    agents::AgentsPage, exceptions::ExceptionsPage, io::IoPage, jobs::JobsPage,
    overview::OverviewPage, queues::QueuesPage, scheduled::ScheduledPage, status::StatusPage,
    taskpaths::TaskPathsPage, workergroups::WorkerGroupsPage, workers::WorkersPage,
};
use crate::routes::Route;
use crate::sample;

const WIDTH: u16 = 100;
const HEIGHT: u16 = 30;
const PAGE_SIZE: usize = 25;

/// Renders every page once and reports per-route results.
pub fn run(out: &mut impl Write) -> Result<()> {
    let api = Arc::new(ApiClient::new(DEFAULT_URL)?);
    let ctx = Arc::new(AppContext::new(Duration::from_secs(10)));
    for route in Route::ALL {
        let view = render(route, &api, &ctx);
        if view.trim().is_empty() {
            bail!("page {} rendered nothing", route.key());
        }
        writeln!(out, "ok {}", route.key()).context("writing self-check output")?;
    }
    Ok(())
}

fn render(route: Route, api: &Arc<ApiClient>, ctx: &Arc<AppContext>) -> String {
    match route {
        Route::Overview => {
            let mut page = OverviewPage::new(api.clone(), ctx.clone());
            page.prime(sample::pool());
            page.view(WIDTH, HEIGHT)
        }
        Route::Queues => {
            let mut page = QueuesPage::new(api.clone(), ctx.clone(), PAGE_SIZE);
            page.prime(sample::queues());
            page.view(WIDTH, HEIGHT)
        }
        Route::Workers => {
            let mut page = WorkersPage::new(api.clone(), ctx.clone(), PAGE_SIZE);
            page.prime(sample::workers());
            page.view(WIDTH, HEIGHT)
        }
        Route::Io => {
            let mut page = IoPage::new(api.clone(), ctx.clone());
            page.prime(sample::workers());
            page.view(WIDTH, HEIGHT)
        }
        Route::Jobs => {
            let mut page = JobsPage::new(api.clone(), ctx.clone(), PAGE_SIZE);
            page.prime(sample::jobs());
            page.view(WIDTH, HEIGHT)
        }
        Route::ScheduledJobs => {
            let mut page = ScheduledPage::new(api.clone(), ctx.clone(), PAGE_SIZE);
            page.prime(sample::scheduled());
            page.view(WIDTH, HEIGHT)
        }
        Route::TaskPaths => {
            let mut page = TaskPathsPage::new(api.clone(), ctx.clone(), PAGE_SIZE);
            page.prime(sample::taskpaths());
            page.view(WIDTH, HEIGHT)
        }
        Route::TaskExceptions => {
            let mut page = ExceptionsPage::new(api.clone(), ctx.clone(), PAGE_SIZE);
            page.prime(sample::exceptions());
            page.view(WIDTH, HEIGHT)
        }
        Route::Status => {
            let mut page = StatusPage::new(api.clone(), ctx.clone());
            page.prime(sample::statuses());
            page.view(WIDTH, HEIGHT)
        }
        Route::WorkerGroups => {
            let mut page = WorkerGroupsPage::new(api.clone());
            page.prime(sample::groups());
            page.view(WIDTH, HEIGHT)
        }
        Route::Agents => {
            let mut page = AgentsPage::new(api.clone(), ctx.clone(), PAGE_SIZE);
            page.prime(sample::agents());
            page.view(WIDTH, HEIGHT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_reports_ok() {
        let mut out = Vec::new();
        run(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), Route::ALL.len());
        assert!(lines.contains(&"ok overview"));
        assert!(lines.contains(&"ok workergroups"));
        assert!(lines.iter().all(|l| l.starts_with("ok ")));
    }

    #[test]
    fn rendered_pages_show_sample_rows() {
        let api = Arc::new(ApiClient::new(DEFAULT_URL).unwrap());
        let ctx = Arc::new(AppContext::new(Duration::from_secs(10)));
        let queues = render(Route::Queues, &api, &ctx);
        assert!(queues.contains("timed_retry"));
        let status = render(Route::Status, &api, &ctx);
        assert!(status.contains("queued"));
    }
}
