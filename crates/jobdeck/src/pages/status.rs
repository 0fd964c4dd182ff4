//! Job counts per status, with the rate of change and a drain estimate.
//!
//! Each status keeps its own sample series; a shrinking count yields a
//! negative speed and with it an ETA for the backlog to empty.

use std::sync::Arc;

use crossterm::event::KeyCode;
use crossterm::style::Stylize;
use jobdeck_api::ApiClient;
use pagekit::{
    AppContext, Cmd, Column, CounterTracker, DataTable, KeyMsg, Message, Page, PollingTable,
    TablePage, WindowSizeMsg,
};

use crate::messages::{NavigateMsg, PollTickMsg, RefreshNudgeMsg, TableLoadedMsg};
use crate::pages::{body_rows, table_nav, util, SourceKind, TableNav, TableSource};
use crate::routes::Route;

/// Samples kept per status series.
const SAMPLES: usize = 50;

pub struct StatusPage {
    source: TableSource,
    table: DataTable,
    tracker: CounterTracker,
    statuses: Vec<String>,
}

impl StatusPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>) -> Self {
        let engine = PollingTable::new("status");
        let table = DataTable::new()
            .columns(vec![
                Column::new("Status", 16),
                Column::new("Jobs", 12),
                Column::new("Speed", 12),
                Column::new("ETA", 12),
            ])
            .height(20);
        Self {
            source: TableSource::new(api, ctx, SourceKind::Datatable(Route::Status), engine),
            table,
            tracker: CounterTracker::new(),
            statuses: Vec::new(),
        }
    }

    pub(crate) fn prime(&mut self, page: TablePage) {
        self.source.engine_mut().prime(page);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let Some(page) = self.source.engine().last_page() else {
            return;
        };
        self.statuses = page
            .rows
            .iter()
            .map(|row| util::text(row, "_id"))
            .collect();
        let mut rows = Vec::with_capacity(page.rows.len());
        for row in &page.rows {
            let status = util::text(row, "_id");
            let jobs = util::num(row, "jobs");
            self.tracker.add(&status, jobs, SAMPLES);
            let speed = self.tracker.speed(&status);
            let speed_cell = if speed == 0.0 {
                String::new()
            } else {
                format!("{speed:+.2}/s")
            };
            rows.push(vec![
                status.clone(),
                format!("{jobs:.0}"),
                speed_cell,
                self.tracker.eta(&status, jobs).to_string(),
            ]);
        }
        self.table.set_rows(rows, page.total);
    }

    fn sync_loading(&mut self) {
        self.table.set_loading(self.source.engine().loading());
    }
}

impl Page for StatusPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let mut out = format!("{}\n", "Statuses".bold());
        out.push_str(&self.table.view());
        out.push_str(&format!("\n{}\n", self.table.status_line()));
        out.push_str(&format!("{}", "enter: jobs with this status".dim()));
        out
    }

    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
            if table_nav(&mut self.table, key.code()) != TableNav::Ignored {
                return None;
            }
            if key.code() == KeyCode::Enter {
                if let Some(status) = self.statuses.get(self.table.cursor()) {
                    return Some(Cmd::from_msg(NavigateMsg {
                        route: Route::Jobs,
                        params: [("status".to_owned(), status.clone())].into(),
                    }));
                }
            }
            return None;
        }
        if let Some(size) = msg.downcast_ref::<WindowSizeMsg>() {
            self.table.set_height(body_rows(size.height));
            return None;
        }
        if let Some(tick) = msg.downcast_ref::<PollTickMsg>() {
            if tick.route == Route::Status {
                let cmd = self.source.tick(tick.tag, tick.just_queue);
                self.sync_loading();
                return cmd;
            }
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<TableLoadedMsg>() {
            if loaded.route == Route::Status {
                let (fresh, cmd) = self.source.loaded(loaded.generation, loaded.page.clone());
                if fresh {
                    self.rebuild();
                }
                self.sync_loading();
                return cmd;
            }
            return None;
        }
        if msg.is::<RefreshNudgeMsg>() {
            let cmd = self.source.nudge();
            self.sync_loading();
            return cmd;
        }
        None
    }

    fn on_show(&mut self) -> Option<Cmd> {
        self.table.focus();
        let cmd = self.source.on_show();
        self.sync_loading();
        cmd
    }

    fn on_hide(&mut self) -> Option<Cmd> {
        self.table.blur();
        let cmd = self.source.on_hide();
        self.sync_loading();
        cmd
    }
}
