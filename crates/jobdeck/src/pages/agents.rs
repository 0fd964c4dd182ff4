//! Agent processes, with the stopped ones a keypress away.

use std::sync::Arc;

use crossterm::event::KeyCode;
use crossterm::style::Stylize;
use jobdeck_api::ApiClient;
use pagekit::{
    AppContext, Cmd, Column, DataTable, KeyMsg, Message, Page, PollingTable, TablePage,
    WindowSizeMsg,
};
use serde_json::Value;

use crate::messages::{PollTickMsg, RefreshNudgeMsg, TableLoadedMsg};
use crate::pages::{body_rows, table_nav, util, SourceKind, TableNav, TableSource};
use crate::routes::Route;

pub struct AgentsPage {
    source: TableSource,
    table: DataTable,
}

impl AgentsPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>, page_size: usize) -> Self {
        let engine = PollingTable::new("agents")
            .with_filters(["showstopped"])
            .with_page_size(page_size);
        let table = DataTable::new()
            .columns(vec![
                Column::new("Id", 14),
                Column::new("Group", 16),
                Column::new("Status", 10),
                Column::new("Workers", 8),
                Column::new("CPU", 8),
                Column::new("Memory", 10),
                Column::new("Last report", 14),
            ])
            .height(20)
            .window_len(page_size);
        Self {
            source: TableSource::new(api, ctx, SourceKind::Datatable(Route::Agents), engine),
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

    fn showing_stopped(&self) -> bool {
        !self.source.engine().filter("showstopped").is_empty()
    }
}

fn row_cells(row: &Value) -> Vec<String> {
    vec![
        util::short_id(&util::text(row, "_id")),
        util::text(row, "worker_group"),
        util::text(row, "status"),
        util::int(row, "desired_workers").to_string(),
        format!("{:.0}%", util::num(row, "total_cpu")),
        util::bytes(util::num(row, "total_memory")),
        util::since(util::num(row, "date_ping")),
    ]
}

impl Page for AgentsPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let title = if self.showing_stopped() {
            "Agents (including stopped)"
        } else {
            "Agents"
        };
        let mut out = format!("{}\n", title.bold());
        out.push_str(&self.table.view());
        out.push_str(&format!("\n{}\n", self.table.status_line()));
        out.push_str(&format!("{}", "s: toggle stopped   ←/→: window".dim()));
        out
    }

    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
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
            if key.code() == KeyCode::Char('s') {
                let next = if self.showing_stopped() { "" } else { "1" };
                self.source.set_filter("showstopped", next);
                return self.source.nudge();
            }
            return None;
        }
        if let Some(size) = msg.downcast_ref::<WindowSizeMsg>() {
            self.table.set_height(body_rows(size.height));
            return None;
        }
        if let Some(tick) = msg.downcast_ref::<PollTickMsg>() {
            if tick.route == Route::Agents {
                let cmd = self.source.tick(tick.tag, tick.just_queue);
                self.sync_loading();
                return cmd;
            }
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<TableLoadedMsg>() {
            if loaded.route == Route::Agents {
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
