//! Scheduled (recurring) jobs.

use std::sync::Arc;
use std::time::Duration;

use crossterm::style::Stylize;
use jobdeck_api::ApiClient;
use pagekit::{
    humanize, AppContext, Cmd, Column, DataTable, KeyMsg, Message, Page, PollingTable, TablePage,
    WindowSizeMsg,
};
use serde_json::Value;

use crate::messages::{PollTickMsg, RefreshNudgeMsg, TableLoadedMsg};
use crate::pages::{body_rows, table_nav, util, SourceKind, TableNav, TableSource};
use crate::routes::Route;

pub struct ScheduledPage {
    source: TableSource,
    table: DataTable,
}

impl ScheduledPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>, page_size: usize) -> Self {
        let engine = PollingTable::new("scheduled_jobs").with_page_size(page_size);
        let table = DataTable::new()
            .columns(vec![
                Column::new("Path", 36),
                Column::new("Params", 28),
                Column::new("Interval", 10),
                Column::new("Daily", 10),
                Column::new("Last queued", 14),
            ])
            .height(20)
            .window_len(page_size);
        Self {
            source: TableSource::new(api, ctx, SourceKind::Datatable(Route::ScheduledJobs), engine),
            table,
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
        let rows = page.rows.iter().map(row_cells).collect();
        self.table.set_rows(rows, page.total);
    }

    fn sync_loading(&mut self) {
        self.table.set_loading(self.source.engine().loading());
    }
}

fn row_cells(row: &Value) -> Vec<String> {
    let interval = util::int(row, "interval");
    let interval = if interval == 0 {
        String::new()
    } else {
        humanize(Duration::from_secs(interval))
    };
    vec![
        util::text(row, "path"),
        util::json_preview(util::field(row, "params").unwrap_or(&Value::Null), 26),
        interval,
        util::text(row, "dailytime"),
        util::since(util::num(row, "datelastqueued")),
    ]
}

impl Page for ScheduledPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let mut out = format!("{}\n", "Scheduled jobs".bold());
        out.push_str(&self.table.view());
        out.push_str(&format!("\n{}\n", self.table.status_line()));
        out.push_str(&format!("{}", "←/→: window".dim()));
        out
    }

    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
            if table_nav(&mut self.table, key.code()) == TableNav::Windowed {
                let offset = self.table.window_start();
                let page_size = self.source.engine().page_size();
                self.source.engine_mut().set_window(offset, page_size);
                self.source.invalidate();
                return self.source.nudge();
            }
            return None;
        }
        if let Some(size) = msg.downcast_ref::<WindowSizeMsg>() {
            self.table.set_height(body_rows(size.height));
            return None;
        }
        if let Some(tick) = msg.downcast_ref::<PollTickMsg>() {
            if tick.route == Route::ScheduledJobs {
                let cmd = self.source.tick(tick.tag, tick.just_queue);
                self.sync_loading();
                return cmd;
            }
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<TableLoadedMsg>() {
            if loaded.route == Route::ScheduledJobs {
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
