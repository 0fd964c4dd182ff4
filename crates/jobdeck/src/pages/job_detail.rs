//! Modal with one job's stored result, traceback, and a live log tail.
//!
//! The tail is a hand-rolled chain rather than a [`pagekit::PollingTable`]:
//! it must keep fetching while its own modal is open, and it follows a cursor
//! (`last_log_id`) instead of a pagination window. An epoch stamp guards the
//! chain the same way the polling engine's tag does; hiding the modal bumps
//! the epoch and cancels the token, so a re-open starts clean.

use std::sync::Arc;

use crossterm::event::KeyCode;
use jobdeck_api::{ApiClient, LogTarget};
use pagekit::{batch, tick_cancellable, AppContext, Cmd, KeyMsg, Message, Page};
use tokio_util::sync::CancellationToken;

use crate::messages::{
    AlertMsg, JobDetailBody, JobDetailLoadedMsg, LogChunkMsg, LogTickMsg, RefreshNudgeMsg,
};
use crate::pages::util;

/// Retained log lines; older lines fall off the front.
const MAX_LOG_LINES: usize = 500;

pub struct JobDetailPage {
    api: Arc<ApiClient>,
    ctx: Arc<AppContext>,
    cancel: CancellationToken,
    /// Stamps the log chain; chunks and ticks from a previous showing of the
    /// modal carry an old epoch and are dropped.
    epoch: u64,
    job_id: String,
    body: Option<JobDetailBody>,
    detail_error: Option<String>,
    loading: bool,
    log_lines: Vec<String>,
    log_cursor: Option<String>,
    /// Lines scrolled up from the tail of the log.
    scroll: usize,
    shown: bool,
}

impl JobDetailPage {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>) -> Self {
        Self {
            api,
            ctx,
            cancel: CancellationToken::new(),
            epoch: 0,
            job_id: String::new(),
            body: None,
            detail_error: None,
            loading: false,
            log_lines: Vec::new(),
            log_cursor: None,
            scroll: 0,
            shown: false,
        }
    }

    fn detail_cmd(&self) -> Cmd {
        let api = Arc::clone(&self.api);
        let job_id = self.job_id.clone();
        let fetch = Cmd::new(async move {
            let result = api.job_result(&job_id).await;
            let traceback = api.job_traceback(&job_id).await;
            let outcome = match (result, traceback) {
                (Ok(result), Ok(tb)) => Ok(JobDetailBody {
                    result,
                    traceback: tb.text(),
                }),
                (Err(err), _) | (_, Err(err)) => Err(err.to_string()),
            };
            Some(Message::new(JobDetailLoadedMsg { job_id, outcome }))
        });
        Cmd::cancellable(self.cancel.clone(), fetch)
    }

    fn log_fetch(&self) -> Cmd {
        let api = Arc::clone(&self.api);
        let target = LogTarget::Job(self.job_id.clone());
        let cursor = self.log_cursor.clone();
        let epoch = self.epoch;
        let fetch = Cmd::new(async move {
            let tail = match api.logs(&target, cursor.as_deref()).await {
                Ok(tail) => Some(tail),
                Err(err) => {
                    tracing::warn!(error = %err, "job log tail fetch failed");
                    None
                }
            };
            Some(Message::new(LogChunkMsg { epoch, tail }))
        });
        Cmd::cancellable(self.cancel.clone(), fetch)
    }

    /// Arms the next tail poll, unless auto-refresh is effectively paused.
    fn schedule_log_tick(&self) -> Option<Cmd> {
        let interval = self.ctx.effective_interval();
        if interval.is_zero() {
            return None;
        }
        let epoch = self.epoch;
        Some(tick_cancellable(interval, self.cancel.clone(), move || {
            LogTickMsg { epoch }
        }))
    }

    fn absorb_chunk(&mut self, chunk: &LogChunkMsg) -> Option<Cmd> {
        if chunk.epoch != self.epoch {
            return None;
        }
        if let Some(tail) = &chunk.tail {
            if !tail.logs.is_empty() {
                self.log_lines.extend(tail.logs.lines().map(str::to_owned));
                if self.log_lines.len() > MAX_LOG_LINES {
                    let excess = self.log_lines.len() - MAX_LOG_LINES;
                    self.log_lines.drain(..excess);
                }
            }
            if !tail.last_log_id.is_empty() {
                self.log_cursor = Some(tail.last_log_id.clone());
            }
        }
        // A failed poll keeps the cursor and retries on the same cadence.
        self.schedule_log_tick()
    }

    fn handle_key(&mut self, key: &KeyMsg) {
        let max_back = self.log_lines.len().saturating_sub(1);
        match key.code() {
            KeyCode::Up | KeyCode::Char('k') => self.scroll = (self.scroll + 1).min(max_back),
            KeyCode::Down | KeyCode::Char('j') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageUp => self.scroll = (self.scroll + 10).min(max_back),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(10),
            KeyCode::Home | KeyCode::Char('g') => self.scroll = max_back,
            KeyCode::End | KeyCode::Char('G') => self.scroll = 0,
            _ => {}
        }
    }
}

impl Page for JobDetailPage {
    fn view(&self, width: u16, height: u16) -> String {
        let w = usize::from(width).saturating_sub(4).max(20);
        let mut out = format!("Job {}\n", self.job_id);
        if self.loading && self.body.is_none() {
            out.push_str("loading...\n");
        }
        if let Some(err) = &self.detail_error {
            out.push_str(&format!("error: {}\n", util::clip(err, w)));
        }
        let mut used = 3;
        if let Some(body) = &self.body {
            out.push_str(&format!(
                "result: {}\n",
                util::json_preview(&body.result, w.saturating_sub(8))
            ));
            out.push_str("traceback:\n");
            let tb: Vec<&str> = body.traceback.lines().collect();
            let keep = tb.len().min(8);
            for line in &tb[tb.len() - keep..] {
                out.push_str(&format!("  {}\n", util::clip(line, w)));
            }
            used += 2 + keep;
        }

        let total = self.log_lines.len();
        let mut title = format!("logs ({total} lines)");
        if self.scroll > 0 {
            title.push_str(&format!("  [{} back]", self.scroll));
        }
        out.push_str(&format!("{title}:\n"));
        let visible = usize::from(height).saturating_sub(used + 3).max(3);
        let end = total.saturating_sub(self.scroll);
        let start = end.saturating_sub(visible);
        for line in &self.log_lines[start..end] {
            out.push_str(&format!("  {}\n", util::clip(line, w)));
        }
        out.push_str("esc: close   j/k: scroll logs");
        out
    }

    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
            self.handle_key(key);
            return None;
        }
        if let Some(loaded) = msg.downcast_ref::<JobDetailLoadedMsg>() {
            if loaded.job_id != self.job_id {
                return None;
            }
            self.loading = false;
            match &loaded.outcome {
                Ok(body) => {
                    self.body = Some(body.clone());
                    return None;
                }
                Err(err) => {
                    self.detail_error = Some(err.clone());
                    return Some(Cmd::from_msg(AlertMsg::error(format!(
                        "job detail failed: {err}"
                    ))));
                }
            }
        }
        if let Some(tick) = msg.downcast_ref::<LogTickMsg>() {
            if tick.epoch == self.epoch {
                return Some(self.log_fetch());
            }
            return None;
        }
        if let Some(chunk) = msg.downcast_ref::<LogChunkMsg>() {
            return self.absorb_chunk(chunk);
        }
        if msg.is::<RefreshNudgeMsg>() {
            if self.shown {
                return Some(self.log_fetch());
            }
            return None;
        }
        None
    }

    fn set_options(&mut self, params: &std::collections::BTreeMap<String, String>) {
        if let Some(id) = params.get("id") {
            self.job_id.clone_from(id);
        }
    }

    fn on_show(&mut self) -> Option<Cmd> {
        self.shown = true;
        self.epoch = self.epoch.wrapping_add(1);
        self.body = None;
        self.detail_error = None;
        self.loading = true;
        self.log_lines.clear();
        self.log_cursor = None;
        self.scroll = 0;
        batch(vec![Some(self.detail_cmd()), Some(self.log_fetch())])
    }

    fn on_hide(&mut self) -> Option<Cmd> {
        self.shown = false;
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.epoch = self.epoch.wrapping_add(1);
        None
    }

    fn always_render_on_show(&self) -> bool {
        true
    }
}
