//! Modal showing one worker's current jobs and their IO operations.
//!
//! Opened from the workers page. It runs its own poll of the `workers`
//! datatable (the owner's poll is queued while a modal is open) and picks the
//! target worker out of the window locally.

use std::sync::Arc;

use jobdeck_api::ApiClient;
use pagekit::{
    AppContext, Cmd, Column, DataTable, KeyMsg, Message, Page, PollingTable, TablePage,
};
use serde_json::Value;

use crate::messages::{RefreshNudgeMsg, WorkerIoLoadedMsg, WorkerIoTickMsg};
use crate::pages::{table_nav, util, SourceKind, TableSource};

/// Window wide enough to find the worker regardless of the owner's paging.
const WORKER_WINDOW: usize = 100;

pub struct WorkerIoPage {
    source: TableSource,
    table: DataTable,
    worker_id: String,
}

impl WorkerIoPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>) -> Self {
        let engine = PollingTable::new("workers").with_page_size(WORKER_WINDOW);
        let table = DataTable::new()
            .columns(vec![
                Column::new("Type", 18),
                Column::new("Data", 34),
                Column::new("Job", 14),
                Column::new("Since", 10),
            ])
            .height(10)
            .window_len(WORKER_WINDOW);
        Self {
            source: TableSource::new(api, ctx, SourceKind::WorkerIo, engine),
            table,
            worker_id: String::new(),
        }
    }

    pub(crate) fn prime(&mut self, worker_id: &str, page: TablePage) {
        self.worker_id = worker_id.to_owned();
        self.source.engine_mut().prime(page);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let Some(page) = self.source.engine().last_page() else {
            return;
        };
        let rows = page
            .rows
            .iter()
            .find(|row| util::text(row, "_id") == self.worker_id)
            .map(worker_io_rows)
            .unwrap_or_default();
        let total = rows.len() as u64;
        self.table.set_rows(rows, total);
    }

    fn sync_loading(&mut self) {
        self.table.set_loading(self.source.engine().loading());
    }
}

fn worker_io_rows(worker: &Value) -> Vec<Vec<String>> {
    let Some(jobs) = util::field(worker, "jobs").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for job in jobs {
        let Some(io) = util::field(job, "io") else {
            continue;
        };
        if io.is_null() {
            continue;
        }
        out.push(vec![
            util::text(io, "type"),
            util::json_preview(util::field(io, "data").unwrap_or(&Value::Null), 32),
            util::short_id(&util::text(job, "id")),
            util::since(util::num(job, "datestarted")),
        ]);
    }
    out
}

impl Page for WorkerIoPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let mut out = format!("Worker {} IO\n", util::short_id(&self.worker_id));
        out.push_str(&self.table.view());
        out.push_str(&format!("\n{}\nesc: close", self.table.status_line()));
        out
    }

    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
            let _ = table_nav(&mut self.table, key.code());
            return None;
        }
        if let Some(tick) = msg.downcast_ref::<WorkerIoTickMsg>() {
            let cmd = self.source.tick(tick.tag, tick.just_queue);
            self.sync_loading();
            return cmd;
        }
        if let Some(loaded) = msg.downcast_ref::<WorkerIoLoadedMsg>() {
            let (fresh, cmd) = self.source.loaded(loaded.generation, loaded.page.clone());
            if fresh {
                self.rebuild();
            }
            self.sync_loading();
            return cmd;
        }
        if msg.is::<RefreshNudgeMsg>() {
            let cmd = self.source.nudge();
            self.sync_loading();
            return cmd;
        }
        None
    }

    fn set_options(&mut self, params: &std::collections::BTreeMap<String, String>) {
        if let Some(id) = params.get("id") {
            if *id != self.worker_id {
                self.worker_id.clone_from(id);
                self.rebuild();
            }
        }
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

    fn always_render_on_show(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page() -> WorkerIoPage {
        let api = Arc::new(ApiClient::new("http://localhost:5555").unwrap());
        let ctx = Arc::new(AppContext::new(std::time::Duration::from_secs(10)));
        WorkerIoPage::new(api, ctx)
    }

    fn workers_page() -> TablePage {
        TablePage {
            rows: vec![
                json!({
                    "_id": "w1",
                    "jobs": [
                        {"id": "j1", "io": {"type": "mongodb.find", "data": {"collection": "events"}}, "datestarted": 0},
                        {"id": "j2", "io": null, "datestarted": 0}
                    ]
                }),
                json!({
                    "_id": "w2",
                    "jobs": [
                        {"id": "j3", "io": {"type": "redis.get", "data": "queue:default"}, "datestarted": 0}
                    ]
                }),
            ],
            total: 2,
            echo: 0,
        }
    }

    #[test]
    fn shows_only_the_target_workers_io() {
        let mut page = page();
        page.prime("w2", workers_page());
        assert_eq!(page.table.len(), 1);
        let row = page.table.selected_row().unwrap();
        assert_eq!(row[0], "redis.get");
        assert_eq!(row[2], "j3");
    }

    #[test]
    fn jobs_without_io_are_skipped() {
        let mut page = page();
        page.prime("w1", workers_page());
        assert_eq!(page.table.len(), 1, "null io rows drop out");
    }

    #[test]
    fn retargeting_rebuilds_from_the_cached_window() {
        let mut page = page();
        page.prime("w1", workers_page());
        let mut params = std::collections::BTreeMap::new();
        params.insert("id".to_owned(), "w2".to_owned());
        page.set_options(&params);
        let row = page.table.selected_row().unwrap();
        assert_eq!(row[0], "redis.get");
    }

    #[test]
    fn unknown_worker_renders_empty() {
        let mut page = page();
        page.prime("missing", workers_page());
        assert!(page.table.is_empty());
    }
}
