//! Overview page: pool-wide gauges derived from `GET /workers`.
//!
//! This page polls the pool overview endpoint instead of a datatable, but it
//! runs on the same refresh ladder as every table page. The done-jobs counter
//! feeds a series so the header can show cluster throughput at a glance.

use std::sync::Arc;

use crossterm::style::Stylize;
use jobdeck_api::{ApiClient, PoolOverview};
use pagekit::{
    sparkline, AppContext, Cmd, CounterTracker, Message, Page, PollingTable, TablePage,
};

use crate::messages::{PollTickMsg, PoolLoadedMsg, RefreshNudgeMsg};
use crate::pages::{SourceKind, TableSource};
use crate::routes::Route;

/// Samples kept for the done-jobs series.
const SAMPLES: usize = 50;

pub struct OverviewPage {
    source: TableSource,
    tracker: CounterTracker,
    overview: Option<PoolOverview>,
}

impl OverviewPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>) -> Self {
        Self {
            source: TableSource::new(api, ctx, SourceKind::Pool, PollingTable::new("pool")),
            tracker: CounterTracker::new(),
            overview: None,
        }
    }

    pub(crate) fn prime(&mut self, overview: PoolOverview) {
        self.tracker
            .add("done-jobs", overview.done_jobs() as f64, SAMPLES);
        self.overview = Some(overview);
    }

    fn absorb(&mut self, overview: &PoolOverview) {
        self.tracker
            .add("done-jobs", overview.done_jobs() as f64, SAMPLES);
        self.overview = Some(overview.clone());
    }
}

/// Renders a filled/empty bar for a whole percentage.
fn gauge(pct: u32, width: usize) -> String {
    let filled = (pct.min(100) as usize * width) / 100;
    let mut bar = String::with_capacity(width * 3);
    for _ in 0..filled {
        bar.push('█');
    }
    for _ in filled..width {
        bar.push('░');
    }
    bar
}

impl Page for OverviewPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let mut out = format!("{}\n\n", "Overview".bold());
        let Some(pool) = &self.overview else {
            let line = if self.source.engine().loading() {
                "loading..."
            } else {
                "no data yet"
            };
            out.push_str(line);
            out.push('\n');
            return out;
        };

        let util = pool.utilization();
        out.push_str(&format!("{:<14}{}\n", "Pool size", pool.pool_size()));
        out.push_str(&format!(
            "{:<14}{}  {} {util}%\n",
            "Current jobs",
            pool.current_jobs(),
            gauge(util, 20),
        ));
        let speed = self.tracker.speed("done-jobs");
        let mut done = format!("{:<14}{}", "Done jobs", pool.done_jobs());
        if speed != 0.0 {
            done.push_str(&format!("  {speed:+.2}/s"));
        }
        let strip = sparkline(&self.tracker.values("done-jobs"), 30);
        if !strip.is_empty() {
            done.push_str(&format!("  {strip}"));
        }
        out.push_str(&done);
        out.push('\n');
        out.push_str(&format!("{:<14}{}\n", "Workers", pool.workers.len()));
        if self.source.engine().loading() {
            out.push_str(&format!("\n{}\n", "refreshing...".dim()));
        }
        out
    }

    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        if let Some(tick) = msg.downcast_ref::<PollTickMsg>() {
            if tick.route == Route::Overview {
                return self.source.tick(tick.tag, tick.just_queue);
            }
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<PoolLoadedMsg>() {
            // The engine wants a page; give it a header-only one so the echo
            // check and retry scheduling still apply.
            let page = loaded.overview.as_ref().map(|_| TablePage {
                rows: vec![],
                total: 0,
                echo: loaded.generation,
            });
            let (fresh, cmd) = self.source.loaded(loaded.generation, page);
            if fresh {
                if let Some(overview) = &loaded.overview {
                    self.absorb(overview);
                }
            }
            return cmd;
        }
        if msg.is::<RefreshNudgeMsg>() {
            return self.source.nudge();
        }
        None
    }

    fn on_show(&mut self) -> Option<Cmd> {
        self.source.on_show()
    }

    fn on_hide(&mut self) -> Option<Cmd> {
        self.source.on_hide()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page() -> OverviewPage {
        let api = Arc::new(ApiClient::new("http://localhost:5555").unwrap());
        let ctx = Arc::new(AppContext::new(std::time::Duration::from_secs(10)));
        OverviewPage::new(api, ctx)
    }

    fn pool() -> PoolOverview {
        serde_json::from_value(json!({
            "workers": [
                {"_id": "w1", "status": "wait", "config": {"gevent": 10}, "jobs": [{}, {}], "done_jobs": 50},
                {"_id": "w2", "status": "full", "config": {"gevent": 10}, "jobs": [{}, {}, {}, {}, {}, {}], "done_jobs": 30}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn fresh_pool_load_updates_the_series() {
        let mut page = page();
        let _ = page.on_show();
        let loaded = Message::new(PoolLoadedMsg {
            generation: 1,
            overview: Some(pool()),
        });
        let follow_up = page.update(&loaded);
        assert!(follow_up.is_some());
        assert_eq!(page.tracker.len("done-jobs"), 1);
        let view = page.view(80, 24);
        assert!(view.contains("Pool size"));
        assert!(view.contains("20"));
        assert!(view.contains("40%"));
    }

    #[test]
    fn failed_pool_load_keeps_the_last_snapshot() {
        let mut page = page();
        let _ = page.on_show();
        let _ = page.update(&Message::new(PoolLoadedMsg {
            generation: 1,
            overview: Some(pool()),
        }));
        let _ = page.source.nudge();
        let _ = page.update(&Message::new(PoolLoadedMsg {
            generation: 2,
            overview: None,
        }));
        assert!(page.overview.is_some());
        assert_eq!(page.tracker.len("done-jobs"), 1);
    }

    #[test]
    fn gauge_fills_proportionally() {
        assert_eq!(gauge(0, 10), "░░░░░░░░░░");
        assert_eq!(gauge(40, 10), "████░░░░░░");
        assert_eq!(gauge(100, 10), "██████████");
        assert_eq!(gauge(250, 10), "██████████");
    }

    #[test]
    fn empty_page_reports_loading_state() {
        let mut page = page();
        let _ = page.on_show();
        assert!(page.view(80, 24).contains("loading..."));
    }
}
