//! Worker processes: queues served, throughput and memory trend per worker.
//!
//! Every worker keeps two sample series, `jobs.<id>` for done-job speed and
//! `mem.<id>` for the memory sparkline. `Enter` opens the worker-IO modal;
//! while it is open this page queues refreshes instead of fetching.

use std::sync::Arc;

use crossterm::event::KeyCode;
use crossterm::style::Stylize;
use jobdeck_api::ApiClient;
use pagekit::{
    sparkline, AppContext, Cmd, Column, CounterTracker, DataTable, KeyMsg, Message, Page,
    PollingTable, TablePage, WindowSizeMsg,
};
use serde_json::Value;

use crate::messages::{
    ModalChangedMsg, OpenWorkerIoMsg, PollTickMsg, RefreshNudgeMsg, TableLoadedMsg,
};
use crate::pages::{body_rows, table_nav, util, SourceKind, TableNav, TableSource};
use crate::routes::Route;

/// Samples kept per worker series.
const SAMPLES: usize = 50;

pub struct WorkersPage {
    source: TableSource,
    table: DataTable,
    tracker: CounterTracker,
    /// Full worker ids aligned with the rows.
    ids: Vec<String>,
}

impl WorkersPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>, page_size: usize) -> Self {
        let engine = PollingTable::new("workers")
            .with_filters(["showstopped", "startTime", "endTime"])
            .with_page_size(page_size);
        let table = DataTable::new()
            .columns(vec![
                Column::new("Id", 14),
                Column::new("Status", 8),
                Column::new("Queues", 20),
                Column::new("Jobs", 6),
                Column::new("Done", 8),
                Column::new("Speed", 10),
                Column::new("Memory", 18),
                Column::new("Started", 12),
            ])
            .height(20)
            .window_len(page_size);
        Self {
            source: TableSource::new(api, ctx, SourceKind::Datatable(Route::Workers), engine),
            table,
            tracker: CounterTracker::new(),
            ids: Vec::new(),
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
        self.ids = page
            .rows
            .iter()
            .map(|row| util::text(row, "_id"))
            .collect();
        let mut rows = Vec::with_capacity(page.rows.len());
        for row in &page.rows {
            let id = util::text(row, "_id");
            let jobs_key = format!("jobs.{id}");
            let mem_key = format!("mem.{id}");
            self.tracker.add(&jobs_key, util::num(row, "done_jobs"), SAMPLES);
            self.tracker.add(&mem_key, util::num(row, "process.mem"), SAMPLES);

            let mem = format!(
                "{} {}",
                util::bytes(util::num(row, "process.mem")),
                sparkline(&self.tracker.values(&mem_key), 8),
            );
            rows.push(vec![
                util::short_id(&id),
                util::text(row, "status"),
                queues_cell(row),
                jobs_count(row).to_string(),
                util::int(row, "done_jobs").to_string(),
                util::speed_cell(self.tracker.speed(&jobs_key)),
                mem,
                util::since(util::num(row, "datestarted")),
            ]);
        }
        self.table.set_rows(rows, page.total);
    }

    fn sync_loading(&mut self) {
        self.table.set_loading(self.source.engine().loading());
    }

    fn showing_stopped(&self) -> bool {
        !self.source.engine().filter("showstopped").is_empty()
    }

    fn handle_key(&mut self, key: &KeyMsg) -> Option<Cmd> {
        match table_nav(&mut self.table, key.code()) {
            TableNav::Windowed => {
                let offset = self.table.window_start();
                let page_size = self.source.engine().page_size();
                self.source.engine_mut().set_window(offset, page_size);
                self.source.invalidate();
                return self.source.nudge();
            }
            TableNav::Moved => return None,
            TableNav::Ignored => {}
        }
        match key.code() {
            KeyCode::Char('s') => {
                let next = if self.showing_stopped() { "" } else { "1" };
                self.source.set_filter("showstopped", next);
                self.source.nudge()
            }
            KeyCode::Enter => {
                let worker_id = self.ids.get(self.table.cursor())?.clone();
                Some(Cmd::from_msg(OpenWorkerIoMsg { worker_id }))
            }
            _ => None,
        }
    }
}

fn queues_cell(row: &Value) -> String {
    util::field(row, "config.queues")
        .and_then(Value::as_array)
        .map(|queues| {
            queues
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(",")
        })
        .unwrap_or_default()
}

fn jobs_count(row: &Value) -> usize {
    util::field(row, "jobs")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}

impl Page for WorkersPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let title = if self.showing_stopped() {
            "Workers (including stopped)"
        } else {
            "Workers"
        };
        let mut out = format!("{}\n", title.bold());
        out.push_str(&self.table.view());
        out.push_str(&format!("\n{}\n", self.table.status_line()));
        out.push_str(&format!(
            "{}",
            "enter: worker IO   s: toggle stopped   ←/→: window".dim()
        ));
        out
    }

    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
            return self.handle_key(key);
        }
        if let Some(size) = msg.downcast_ref::<WindowSizeMsg>() {
            self.table.set_height(body_rows(size.height));
            return None;
        }
        if let Some(modal) = msg.downcast_ref::<ModalChangedMsg>() {
            self.source.set_modal_open(modal.open);
            return None;
        }
        if let Some(tick) = msg.downcast_ref::<PollTickMsg>() {
            if tick.route == Route::Workers {
                let cmd = self.source.tick(tick.tag, tick.just_queue);
                self.sync_loading();
                return cmd;
            }
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<TableLoadedMsg>() {
            if loaded.route == Route::Workers {
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

    fn set_options(&mut self, params: &std::collections::BTreeMap<String, String>) {
        self.source.set_filters(params);
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
