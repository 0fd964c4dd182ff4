//! Job counts grouped by task path.

use std::sync::Arc;

use crossterm::event::KeyCode;
use crossterm::style::Stylize;
use jobdeck_api::ApiClient;
use pagekit::{
    AppContext, Cmd, Column, DataTable, KeyMsg, Message, Page, PollingTable, TablePage,
    WindowSizeMsg,
};

use crate::messages::{NavigateMsg, PollTickMsg, RefreshNudgeMsg, TableLoadedMsg};
use crate::pages::{body_rows, table_nav, util, SourceKind, TableNav, TableSource};
use crate::routes::Route;

pub struct TaskPathsPage {
    source: TableSource,
    table: DataTable,
    paths: Vec<String>,
}

impl TaskPathsPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>, page_size: usize) -> Self {
        let engine = PollingTable::new("taskpaths").with_page_size(page_size);
        let table = DataTable::new()
            .columns(vec![Column::new("Path", 60), Column::new("Jobs", 12)])
            .height(20)
            .window_len(page_size);
        Self {
            source: TableSource::new(api, ctx, SourceKind::Datatable(Route::TaskPaths), engine),
            table,
            paths: Vec::new(),
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
        self.paths = page
            .rows
            .iter()
            .map(|row| util::text(row, "_id"))
            .collect();
        let rows = page
            .rows
            .iter()
            .map(|row| vec![util::text(row, "_id"), util::int(row, "jobs").to_string()])
            .collect();
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
            if let Some(path) = self.paths.get(self.table.cursor()) {
                return Some(Cmd::from_msg(NavigateMsg {
                    route: Route::Jobs,
                    params: [("path".to_owned(), path.clone())].into(),
                }));
            }
        }
        None
    }
}

impl Page for TaskPathsPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let mut out = format!("{}\n", "Task paths".bold());
        out.push_str(&self.table.view());
        out.push_str(&format!("\n{}\n", self.table.status_line()));
        out.push_str(&format!("{}", "enter: jobs with this path   ←/→: window".dim()));
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
            if tick.route == Route::TaskPaths {
                let cmd = self.source.tick(tick.tag, tick.just_queue);
                self.sync_loading();
                return cmd;
            }
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<TableLoadedMsg>() {
            if loaded.route == Route::TaskPaths {
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
