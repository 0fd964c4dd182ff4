//! Queue listing: every known queue with its backlog and storage flags.

use std::sync::Arc;

use crossterm::event::KeyCode;
use crossterm::style::Stylize;
use jobdeck_api::ApiClient;
use pagekit::{
    AppContext, Cmd, Column, DataTable, KeyMsg, Message, Page, PollingTable, TablePage,
    WindowSizeMsg,
};
use serde_json::Value;

use crate::messages::{NavigateMsg, PollTickMsg, RefreshNudgeMsg, TableLoadedMsg};
use crate::pages::{body_rows, table_nav, util, SourceKind, TableNav, TableSource};
use crate::routes::Route;

pub struct QueuesPage {
    source: TableSource,
    table: DataTable,
    /// Full queue names aligned with the table rows, for deep links.
    names: Vec<String>,
}

impl QueuesPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>, page_size: usize) -> Self {
        let engine = PollingTable::new("queues").with_page_size(page_size);
        let table = DataTable::new()
            .columns(vec![
                Column::new("Name", 28),
                Column::new("Jobs", 10),
                Column::new("Size", 10),
                Column::new("Flags", 20),
                Column::new("To dequeue", 10),
            ])
            .height(20)
            .window_len(page_size);
        Self {
            source: TableSource::new(api, ctx, SourceKind::Datatable(Route::Queues), engine),
            table,
            names: Vec::new(),
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
        self.names = page
            .rows
            .iter()
            .map(|row| util::text(row, "name"))
            .collect();
        let rows = page.rows.iter().map(row_cells).collect();
        self.table.set_rows(rows, page.total);
    }

    fn sync_loading(&mut self) {
        self.table.set_loading(self.source.engine().loading());
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
        if key.code() == KeyCode::Enter {
            if let Some(name) = self.names.get(self.table.cursor()) {
                return Some(Cmd::from_msg(NavigateMsg {
                    route: Route::Jobs,
                    params: [("queue".to_owned(), name.clone())].into(),
                }));
            }
        }
        None
    }
}

fn row_cells(row: &Value) -> Vec<String> {
    let mut flags = Vec::new();
    for (name, label) in [
        ("is_sorted", "sorted"),
        ("is_timed", "timed"),
        ("is_raw", "raw"),
        ("is_set", "set"),
    ] {
        if util::field(row, name).and_then(Value::as_bool).unwrap_or(false) {
            flags.push(label);
        }
    }
    let to_dequeue = if flags.contains(&"timed") {
        util::int(row, "jobs_to_dequeue").to_string()
    } else {
        String::new()
    };
    vec![
        util::text(row, "name"),
        util::int(row, "jobs").to_string(),
        util::int(row, "size").to_string(),
        flags.join(","),
        to_dequeue,
    ]
}

impl Page for QueuesPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let mut out = format!("{}\n", "Queues".bold());
        out.push_str(&self.table.view());
        out.push_str(&format!("\n{}\n", self.table.status_line()));
        out.push_str(&format!("{}", "enter: jobs in queue   ←/→: window".dim()));
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
        if let Some(tick) = msg.downcast_ref::<PollTickMsg>() {
            if tick.route == Route::Queues {
                let cmd = self.source.tick(tick.tag, tick.just_queue);
                self.sync_loading();
                return cmd;
            }
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<TableLoadedMsg>() {
            if loaded.route == Route::Queues {
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
