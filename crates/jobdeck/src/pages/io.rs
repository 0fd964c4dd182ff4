//! In-flight IO operations across the whole pool.
//!
//! There is no IO resource server-side; this page pulls a wide window of the
//! `workers` datatable and flattens each worker's current jobs' `io`
//! sub-documents into rows.

use std::sync::Arc;

use crossterm::style::Stylize;
use jobdeck_api::ApiClient;
use pagekit::{
    AppContext, Cmd, Column, DataTable, KeyMsg, Message, Page, PollingTable, TablePage,
    WindowSizeMsg,
};
use serde_json::Value;

use crate::messages::{PollTickMsg, RefreshNudgeMsg, TableLoadedMsg};
use crate::pages::{body_rows, table_nav, util, SourceKind, TableSource};
use crate::routes::Route;

/// Window wide enough to cover every worker in one fetch.
const IO_WINDOW: usize = 1000;

pub struct IoPage {
    source: TableSource,
    table: DataTable,
}

impl IoPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>) -> Self {
        let engine = PollingTable::new("workers").with_page_size(IO_WINDOW);
        let table = DataTable::new()
            .columns(vec![
                Column::new("Type", 20),
                Column::new("Data", 40),
                Column::new("Job", 14),
                Column::new("Worker", 14),
                Column::new("Since", 12),
            ])
            .height(20)
            .window_len(IO_WINDOW);
        Self {
            source: TableSource::new(api, ctx, SourceKind::Datatable(Route::Io), engine),
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
        let rows = flatten_io(&page.rows);
        let total = rows.len() as u64;
        self.table.set_rows(rows, total);
    }

    fn sync_loading(&mut self) {
        self.table.set_loading(self.source.engine().loading());
    }
}

/// One row per job currently inside an IO operation.
fn flatten_io(workers: &[Value]) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    for worker in workers {
        let worker_id = util::short_id(&util::text(worker, "_id"));
        let Some(jobs) = util::field(worker, "jobs").and_then(Value::as_array) else {
            continue;
        };
        for job in jobs {
            let Some(io) = util::field(job, "io") else {
                continue;
            };
            if io.is_null() {
                continue;
            }
            out.push(vec![
                util::text(io, "type"),
                util::json_preview(util::field(io, "data").unwrap_or(&Value::Null), 38),
                util::short_id(&util::text(job, "id")),
                worker_id.clone(),
                util::since(util::num(job, "datestarted")),
            ]);
        }
    }
    out
}

impl Page for IoPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let mut out = format!("{}\n", "IO operations".bold());
        out.push_str(&self.table.view());
        out.push_str(&format!("\n{}", self.table.status_line()));
        out
    }

    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
            let _ = table_nav(&mut self.table, key.code());
            return None;
        }
        if let Some(size) = msg.downcast_ref::<WindowSizeMsg>() {
            self.table.set_height(body_rows(size.height));
            return None;
        }
        if let Some(tick) = msg.downcast_ref::<PollTickMsg>() {
            if tick.route == Route::Io {
                let cmd = self.source.tick(tick.tag, tick.just_queue);
                self.sync_loading();
                return cmd;
            }
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<TableLoadedMsg>() {
            if loaded.route == Route::Io {
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

    #[test]
    fn flatten_skips_jobs_without_io() {
        let workers = vec![
            json!({
                "_id": "w1",
                "jobs": [
                    {"id": "j1", "io": {"type": "mongodb.find", "data": {"col": "jobs"}},
                     "datestarted": 0},
                    {"id": "j2"},
                    {"id": "j3", "io": null},
                ],
            }),
            json!({"_id": "w2", "jobs": []}),
            json!({"_id": "w3"}),
        ];
        let rows = flatten_io(&workers);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "mongodb.find");
        assert_eq!(rows[0][2], "j1");
        assert_eq!(rows[0][3], "w1");
    }

    #[test]
    fn rebuild_counts_flattened_rows_as_total() {
        let api = Arc::new(ApiClient::new("http://localhost:5555").unwrap());
        let ctx = Arc::new(AppContext::new(std::time::Duration::from_secs(10)));
        let mut page = IoPage::new(api, ctx);
        page.prime(TablePage {
            rows: vec![json!({
                "_id": "w1",
                "jobs": [
                    {"id": "a", "io": {"type": "redis.get", "data": "k"}},
                    {"id": "b", "io": {"type": "http.get", "data": "u"}},
                ],
            })],
            total: 57,
            echo: 0,
        });
        // The datatable total (worker count) is irrelevant here.
        assert_eq!(page.table.total(), 2);
    }
}
