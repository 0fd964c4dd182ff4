//! Job counts grouped by task path and exception type. The grouping key
//! comes back as a document, so cells read `_id.path` and
//! `_id.exceptiontype`.

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

pub struct ExceptionsPage {
    source: TableSource,
    table: DataTable,
    /// `(path, exceptiontype)` pairs aligned with the rows.
    keys: Vec<(String, String)>,
}

impl ExceptionsPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>, page_size: usize) -> Self {
        let engine = PollingTable::new("taskexceptions").with_page_size(page_size);
        let table = DataTable::new()
            .columns(vec![
                Column::new("Path", 44),
                Column::new("Exception", 28),
                Column::new("Jobs", 10),
            ])
            .height(20)
            .window_len(page_size);
        Self {
            source: TableSource::new(api, ctx, SourceKind::Datatable(Route::TaskExceptions), engine),
            table,
            keys: Vec::new(),
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
        self.keys = page
            .rows
            .iter()
            .map(|row| (util::text(row, "_id.path"), util::text(row, "_id.exceptiontype")))
            .collect();
        let rows = page
            .rows
            .iter()
            .map(|row| {
                vec![
                    util::text(row, "_id.path"),
                    util::text(row, "_id.exceptiontype"),
                    util::int(row, "jobs").to_string(),
                ]
            })
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
            if let Some((path, exceptiontype)) = self.keys.get(self.table.cursor()) {
                // Failed jobs of exactly this path and exception.
                return Some(Cmd::from_msg(NavigateMsg {
                    route: Route::Jobs,
                    params: [
                        ("path".to_owned(), path.clone()),
                        ("exceptiontype".to_owned(), exceptiontype.clone()),
                        ("status".to_owned(), "failed".to_owned()),
                    ]
                    .into(),
                }));
            }
        }
        None
    }
}

impl Page for ExceptionsPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let mut out = format!("{}\n", "Task exceptions".bold());
        out.push_str(&self.table.view());
        out.push_str(&format!("\n{}\n", self.table.status_line()));
        out.push_str(&format!("{}", "enter: failed jobs of this kind   ←/→: window".dim()));
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
            if tick.route == Route::TaskExceptions {
                let cmd = self.source.tick(tick.tag, tick.just_queue);
                self.sync_loading();
                return cmd;
            }
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<TableLoadedMsg>() {
            if loaded.route == Route::TaskExceptions {
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

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn enter_targets_failed_jobs_of_the_group() {
        let api = Arc::new(ApiClient::new("http://localhost:5555").unwrap());
        let ctx = Arc::new(AppContext::new(std::time::Duration::from_secs(10)));
        let mut page = ExceptionsPage::new(api, ctx, 25);
        page.prime(TablePage {
            rows: vec![json!({
                "_id": {"path": "tasks.io.Fetch", "exceptiontype": "Timeout"},
                "jobs": 12,
            })],
            total: 1,
            echo: 0,
        });
        let row = page.table.selected_row().unwrap();
        assert_eq!(row[0], "tasks.io.Fetch");
        assert_eq!(row[1], "Timeout");

        let key = Message::new(KeyMsg(crossterm::event::KeyEvent::from(KeyCode::Enter)));
        let msg = page.update(&key).unwrap().execute().await.unwrap();
        let nav = msg.downcast_ref::<NavigateMsg>().unwrap();
        assert_eq!(nav.params.get("status").map(String::as_str), Some("failed"));
        assert_eq!(
            nav.params.get("exceptiontype").map(String::as_str),
            Some("Timeout")
        );
    }
}
