//! The jobs browser: filterable job list plus cancel and requeue actions.
//!
//! Filters arrive from deep links (queue drill-down, exception groups) or from
//! the `s` status cycle. Actions post to the server and report back through
//! [`JobActionDoneMsg`]; they deliberately outlive the page so a mid-flight
//! navigation cannot lose the receipt.

use std::sync::Arc;

use crossterm::event::KeyCode;
use crossterm::style::Stylize;
use jobdeck_api::{ApiClient, JobAction, JobActionRequest};
use pagekit::{
    batch, AppContext, Cmd, Column, DataTable, KeyMsg, Message, Page, PollingTable, TablePage,
    WindowSizeMsg,
};

use crate::messages::{
    AlertMsg, JobActionDoneMsg, ModalChangedMsg, OpenJobDetailMsg, PollTickMsg, RefreshNudgeMsg,
    TableLoadedMsg,
};
use crate::pages::{body_rows, table_nav, util, SourceKind, TableNav, TableSource};
use crate::routes::Route;

/// Status values the `s` key cycles through. Empty means unfiltered.
const STATUS_CYCLE: [&str; 8] = [
    "", "queued", "started", "success", "failed", "interrupt", "retry", "cancel",
];

pub struct JobsPage {
    source: TableSource,
    table: DataTable,
    /// Full job ids aligned with the rows.
    ids: Vec<String>,
    /// Verb of the job action currently posting, if any.
    action_pending: Option<&'static str>,
}

impl JobsPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>, page_size: usize) -> Self {
        let engine = PollingTable::new("jobs")
            .with_filters([
                "queue",
                "path",
                "status",
                "worker",
                "id",
                "params",
                "exceptiontype",
            ])
            .with_page_size(page_size);
        let table = DataTable::new()
            .columns(vec![
                Column::new("Id", 14),
                Column::new("Queue", 12),
                Column::new("Path", 28),
                Column::new("Status", 9),
                Column::new("Worker", 14),
                Column::new("Updated", 12),
                Column::new("Params", 22),
            ])
            .height(20)
            .window_len(page_size);
        Self {
            source: TableSource::new(api, ctx, SourceKind::Datatable(Route::Jobs), engine),
            table,
            ids: Vec::new(),
            action_pending: None,
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
        let rows = page
            .rows
            .iter()
            .map(|row| {
                vec![
                    util::short_id(&util::text(row, "_id")),
                    util::text(row, "queue"),
                    util::text(row, "path"),
                    util::text(row, "status"),
                    util::short_id(&util::text(row, "worker")),
                    util::since(util::num(row, "dateupdated")),
                    util::field(row, "params").map_or_else(String::new, |p| util::json_preview(p, 20)),
                ]
            })
            .collect();
        self.table.set_rows(rows, page.total);
    }

    fn sync_loading(&mut self) {
        self.table.set_loading(self.source.engine().loading());
    }

    fn cycle_status(&mut self) -> Option<Cmd> {
        let current = self.source.engine().filter("status").to_owned();
        let at = STATUS_CYCLE.iter().position(|s| **s == current).unwrap_or(0);
        let next = STATUS_CYCLE[(at + 1) % STATUS_CYCLE.len()];
        self.source.set_filter("status", next);
        self.source.nudge()
    }

    /// Summary of the non-empty filters for the title line.
    fn filter_summary(&self) -> String {
        let parts: Vec<String> = self
            .source
            .engine()
            .filters()
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        parts.join("  ")
    }

    fn has_filter(&self) -> bool {
        self.source.engine().filters().values().any(|v| !v.is_empty())
    }

    fn selected_action(&mut self, action: JobAction) -> Option<Cmd> {
        let id = self.ids.get(self.table.cursor())?.clone();
        self.post_action(JobActionRequest::by_id(action, id))
    }

    fn filtered_action(&mut self, action: JobAction) -> Option<Cmd> {
        if !self.has_filter() {
            // A blanket action over every job is almost never intended.
            return Some(Cmd::from_msg(AlertMsg::info(format!(
                "set a filter before a bulk {}",
                action.as_str()
            ))));
        }
        let filters = self.source.engine().filters().clone();
        self.post_action(JobActionRequest::by_filters(action, filters))
    }

    /// Posts one action at a time. The command is not tied to the page token:
    /// the receipt must arrive even if the user navigates away meanwhile.
    fn post_action(&mut self, request: JobActionRequest) -> Option<Cmd> {
        if self.action_pending.is_some() {
            return None;
        }
        let verb = request.action.as_str();
        self.action_pending = Some(verb);
        let api = Arc::clone(self.source.api());
        Some(Cmd::new(async move {
            let error = match api.job_action(&request).await {
                Ok(_) => None,
                Err(err) => Some(err.to_string()),
            };
            Some(Message::new(JobActionDoneMsg { verb, error }))
        }))
    }

    fn action_done(&mut self, done: &JobActionDoneMsg) -> Option<Cmd> {
        self.action_pending = None;
        let alert = match &done.error {
            None => AlertMsg::success(format!("{} sent", done.verb)),
            Some(err) => AlertMsg::error(format!("{} failed: {err}", done.verb)),
        };
        batch(vec![Some(Cmd::from_msg(alert)), self.source.nudge()])
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
            KeyCode::Char('s') => self.cycle_status(),
            KeyCode::Char('c') => self.selected_action(JobAction::Cancel),
            KeyCode::Char('R') => self.selected_action(JobAction::Requeue),
            KeyCode::Char('C') => self.filtered_action(JobAction::Cancel),
            KeyCode::Char('Q') => self.filtered_action(JobAction::Requeue),
            KeyCode::Enter => {
                let job_id = self.ids.get(self.table.cursor())?.clone();
                Some(Cmd::from_msg(OpenJobDetailMsg { job_id }))
            }
            _ => None,
        }
    }
}

impl Page for JobsPage {
    fn view(&self, _width: u16, _height: u16) -> String {
        let filters = self.filter_summary();
        let title = if filters.is_empty() {
            "Jobs".bold().to_string()
        } else {
            format!("{}  {}", "Jobs".bold(), filters.dim())
        };
        let mut out = format!("{title}\n");
        out.push_str(&self.table.view());
        let mut status = self.table.status_line();
        if let Some(verb) = self.action_pending {
            status.push_str(&format!("  [{verb}...]"));
        }
        out.push_str(&format!("\n{status}\n"));
        out.push_str(&format!(
            "{}",
            "enter: detail   s: status   c/R: cancel/requeue   C/Q: bulk by filter".dim()
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
        if let Some(done) = msg.downcast_ref::<JobActionDoneMsg>() {
            return self.action_done(done);
        }
        if let Some(tick) = msg.downcast_ref::<PollTickMsg>() {
            if tick.route == Route::Jobs {
                let cmd = self.source.tick(tick.tag, tick.just_queue);
                self.sync_loading();
                return cmd;
            }
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<TableLoadedMsg>() {
            if loaded.route == Route::Jobs {
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

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEvent;
    use serde_json::json;

    use crate::messages::AlertLevel;

    use super::*;

    fn page() -> JobsPage {
        let api = Arc::new(ApiClient::new("http://localhost:5555").unwrap());
        let ctx = Arc::new(AppContext::new(std::time::Duration::from_secs(10)));
        JobsPage::new(api, ctx, 25)
    }

    fn key(code: KeyCode) -> Message {
        Message::new(KeyMsg(KeyEvent::from(code)))
    }

    fn job_row(id: &str) -> serde_json::Value {
        json!({
            "_id": id,
            "queue": "default",
            "path": "tasks.io.Fetch",
            "status": "failed",
            "worker": "worker-1",
            "dateupdated": 0,
            "params": {"url": "http://example.net"},
        })
    }

    #[test]
    fn status_key_cycles_and_wraps() {
        let mut page = page();
        let _ = page.on_show();
        for expected in &STATUS_CYCLE[1..] {
            let _ = page.update(&key(KeyCode::Char('s')));
            assert_eq!(page.source.engine().filter("status"), *expected);
        }
        let _ = page.update(&key(KeyCode::Char('s')));
        assert_eq!(page.source.engine().filter("status"), "");
    }

    #[test]
    fn cancel_without_a_selection_is_a_no_op() {
        let mut page = page();
        assert!(page.update(&key(KeyCode::Char('c'))).is_none());
        assert!(page.action_pending.is_none());
    }

    #[tokio::test]
    async fn bulk_action_without_filters_only_warns() {
        let mut page = page();
        let cmd = page.update(&key(KeyCode::Char('C'))).unwrap();
        let msg = cmd.execute().await.unwrap();
        let alert = msg.downcast_ref::<AlertMsg>().unwrap();
        assert_eq!(alert.level, AlertLevel::Info);
        assert!(page.action_pending.is_none());
    }

    #[test]
    fn one_action_at_a_time() {
        let mut page = page();
        page.prime(TablePage {
            rows: vec![job_row("j1")],
            total: 1,
            echo: 0,
        });
        assert!(page.update(&key(KeyCode::Char('c'))).is_some());
        assert_eq!(page.action_pending, Some("cancel"));
        assert!(page.update(&key(KeyCode::Char('R'))).is_none());
    }

    #[test]
    fn receipt_clears_the_pending_marker_and_refreshes() {
        let mut page = page();
        let _ = page.on_show();
        page.action_pending = Some("requeue");
        let done = Message::new(JobActionDoneMsg {
            verb: "requeue",
            error: None,
        });
        let cmd = page.update(&done);
        assert!(page.action_pending.is_none());
        assert!(cmd.is_some());
    }

    #[tokio::test]
    async fn enter_opens_the_job_detail_modal() {
        let mut page = page();
        page.prime(TablePage {
            rows: vec![job_row("job-abcdef-000001")],
            total: 1,
            echo: 0,
        });
        let msg = page
            .update(&key(KeyCode::Enter))
            .unwrap()
            .execute()
            .await
            .unwrap();
        let open = msg.downcast_ref::<OpenJobDetailMsg>().unwrap();
        assert_eq!(open.job_id, "job-abcdef-000001");
    }

    #[test]
    fn deep_link_params_replace_the_filters() {
        let mut page = page();
        let _ = page.on_show();
        let mut params = std::collections::BTreeMap::new();
        params.insert("queue".to_owned(), "mail".to_owned());
        params.insert("status".to_owned(), "failed".to_owned());
        page.set_options(&params);
        assert_eq!(page.source.engine().filter("queue"), "mail");
        assert_eq!(page.source.engine().filter("status"), "failed");
        assert!(page.filter_summary().contains("queue=mail"));
    }
}
