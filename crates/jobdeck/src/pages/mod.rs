//! Page implementations, one per route, plus the polling glue they share.

pub mod agents;
pub mod exceptions;
pub mod io;
pub mod job_detail;
pub mod jobs;
pub mod overview;
pub mod queues;
pub mod scheduled;
pub mod status;
pub mod taskpaths;
pub mod util;
pub mod worker_io;
pub mod workergroups;
pub mod workers;

use std::collections::BTreeMap;
use std::sync::Arc;

use crossterm::event::KeyCode;
use jobdeck_api::ApiClient;
use pagekit::{
    batch, tick_cancellable, AppContext, Cmd, DataTable, FetchQuery, LoadResult, Message, Page,
    PollingTable, RefreshCtx, RefreshPlan, TablePage,
};
use tokio_util::sync::CancellationToken;

use crate::messages::{
    PollTickMsg, PoolLoadedMsg, TableLoadedMsg, WorkerIoLoadedMsg, WorkerIoTickMsg,
};
use crate::routes::Route;

/// Builds the page behavior for a route.
pub fn build(
    route: Route,
    api: &Arc<ApiClient>,
    ctx: &Arc<AppContext>,
    page_size: usize,
) -> Box<dyn Page> {
    match route {
        Route::Overview => Box::new(overview::OverviewPage::new(api.clone(), ctx.clone())),
        Route::Queues => Box::new(queues::QueuesPage::new(api.clone(), ctx.clone(), page_size)),
        Route::Workers => Box::new(workers::WorkersPage::new(api.clone(), ctx.clone(), page_size)),
        Route::Io => Box::new(io::IoPage::new(api.clone(), ctx.clone())),
        Route::Jobs => Box::new(jobs::JobsPage::new(api.clone(), ctx.clone(), page_size)),
        Route::ScheduledJobs => {
            Box::new(scheduled::ScheduledPage::new(api.clone(), ctx.clone(), page_size))
        }
        Route::TaskPaths => {
            Box::new(taskpaths::TaskPathsPage::new(api.clone(), ctx.clone(), page_size))
        }
        Route::TaskExceptions => {
            Box::new(exceptions::ExceptionsPage::new(api.clone(), ctx.clone(), page_size))
        }
        Route::Status => Box::new(status::StatusPage::new(api.clone(), ctx.clone())),
        Route::WorkerGroups => Box::new(workergroups::WorkerGroupsPage::new(api.clone())),
        Route::Agents => Box::new(agents::AgentsPage::new(api.clone(), ctx.clone(), page_size)),
    }
}

/// Which fetch a [`TableSource`] dispatches and which messages it emits.
#[derive(Debug, Clone, Copy)]
pub(crate) enum SourceKind {
    /// A datatable resource belonging to a route page.
    Datatable(Route),
    /// The pool overview endpoint (overview page).
    Pool,
    /// The worker-IO modal's private workers poll.
    WorkerIo,
}

/// Polling glue shared by every server-backed page: the engine, the page's
/// cancellation token, and the mapping from [`RefreshPlan`]s to commands.
pub(crate) struct TableSource {
    api: Arc<ApiClient>,
    ctx: Arc<AppContext>,
    kind: SourceKind,
    engine: PollingTable,
    cancel: CancellationToken,
    shown: bool,
    modal_open: bool,
    dirty: bool,
}

impl TableSource {
    pub(crate) fn new(
        api: Arc<ApiClient>,
        ctx: Arc<AppContext>,
        kind: SourceKind,
        engine: PollingTable,
    ) -> Self {
        Self {
            api,
            ctx,
            kind,
            engine,
            cancel: CancellationToken::new(),
            shown: false,
            modal_open: false,
            dirty: false,
        }
    }

    pub(crate) const fn engine(&self) -> &PollingTable {
        &self.engine
    }

    pub(crate) const fn engine_mut(&mut self) -> &mut PollingTable {
        &mut self.engine
    }

    pub(crate) const fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub(crate) const fn app_ctx(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// The page's current cancellation token. Commands built with it die when
    /// the page hides.
    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) const fn is_shown(&self) -> bool {
        self.shown
    }

    pub(crate) const fn set_modal_open(&mut self, open: bool) {
        self.modal_open = open;
    }

    /// Replaces the whole filter set (navigation parameters).
    pub(crate) fn set_filters(&mut self, values: &BTreeMap<String, String>) {
        if self.engine.set_filters(values) {
            self.dirty = true;
        }
    }

    /// Edits one filter (interactive toggles).
    pub(crate) fn set_filter(&mut self, key: &str, value: impl Into<String>) {
        if self.engine.set_filter(key, value) {
            self.dirty = true;
        }
    }

    /// Forces the next nudge to supersede any outstanding fetch, used after
    /// window moves.
    pub(crate) const fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// First show attaches the engine; later shows resume it.
    pub(crate) fn on_show(&mut self) -> Option<Cmd> {
        self.shown = true;
        if self.engine.attached() {
            self.nudge()
        } else {
            let (fetch, settle) = self.engine.attach();
            let fetch = self.plan_cmd(fetch);
            let settle = self.plan_cmd(settle);
            batch(vec![fetch, settle])
        }
    }

    /// Suspends polling and kills in-transit work; a fresh token arms the
    /// next show.
    pub(crate) fn on_hide(&mut self) -> Option<Cmd> {
        self.shown = false;
        self.modal_open = false;
        self.engine.suspend();
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        None
    }

    /// Re-evaluates polling immediately: visibility or rate changed, filters
    /// were re-applied, or the user asked for a refresh.
    pub(crate) fn nudge(&mut self) -> Option<Cmd> {
        if !self.engine.attached() {
            return None;
        }
        if self.dirty {
            self.engine.suspend();
            self.dirty = false;
        }
        let rctx = self.refresh_ctx();
        let plan = self.engine.refresh(&rctx, false);
        self.plan_cmd(plan)
    }

    /// Validates a timer tick and runs the refresh ladder.
    pub(crate) fn tick(&mut self, tag: u64, just_queue: bool) -> Option<Cmd> {
        if !self.engine.tick(tag) {
            return None;
        }
        let rctx = self.refresh_ctx();
        let plan = self.engine.refresh(&rctx, just_queue);
        self.plan_cmd(plan)
    }

    /// Settles a fetch. Returns whether the result was fresh, so the page
    /// knows to rebuild its rows, plus the follow-up command.
    pub(crate) fn loaded(
        &mut self,
        generation: u64,
        page: Option<TablePage>,
    ) -> (bool, Option<Cmd>) {
        let rctx = self.refresh_ctx();
        match self.engine.on_loaded(&rctx, generation, page) {
            LoadResult::Stale => (false, None),
            LoadResult::Settled(plan) => (true, self.plan_cmd(plan)),
        }
    }

    fn refresh_ctx(&self) -> RefreshCtx {
        RefreshCtx {
            interval: self.ctx.effective_interval(),
            widget_visible: self.shown,
            modal_open: self.modal_open,
        }
    }

    fn plan_cmd(&self, plan: RefreshPlan) -> Option<Cmd> {
        match plan {
            RefreshPlan::Flush | RefreshPlan::Stop => None,
            RefreshPlan::Queue {
                tag,
                delay,
                just_queue,
            } => {
                let token = self.cancel.clone();
                Some(match self.kind {
                    SourceKind::Datatable(route) => tick_cancellable(delay, token, move || {
                        PollTickMsg {
                            route,
                            tag,
                            just_queue,
                        }
                    }),
                    SourceKind::Pool => tick_cancellable(delay, token, move || PollTickMsg {
                        route: Route::Overview,
                        tag,
                        just_queue,
                    }),
                    SourceKind::WorkerIo => {
                        tick_cancellable(delay, token, move || WorkerIoTickMsg { tag, just_queue })
                    }
                })
            }
            RefreshPlan::Fetch { generation, query } => {
                let api = self.api.clone();
                let fetch = match self.kind {
                    SourceKind::Datatable(route) => Cmd::new(async move {
                        let page = fetch_table(&api, &query).await;
                        Some(Message::new(TableLoadedMsg {
                            route,
                            generation,
                            page,
                        }))
                    }),
                    SourceKind::Pool => Cmd::new(async move {
                        let overview = match api.pool_overview().await {
                            Ok(overview) => Some(overview),
                            Err(err) => {
                                tracing::warn!(error = %err, "pool overview fetch failed");
                                None
                            }
                        };
                        Some(Message::new(PoolLoadedMsg {
                            generation,
                            overview,
                        }))
                    }),
                    SourceKind::WorkerIo => Cmd::new(async move {
                        let page = fetch_table(&api, &query).await;
                        Some(Message::new(WorkerIoLoadedMsg { generation, page }))
                    }),
                };
                Some(Cmd::cancellable(self.cancel.clone(), fetch))
            }
        }
    }
}

async fn fetch_table(api: &ApiClient, query: &FetchQuery) -> Option<TablePage> {
    match api.datatable(&query.resource, &query.params).await {
        Ok(page) => Some(TablePage {
            rows: page.rows,
            total: page.total,
            echo: page.echo,
        }),
        Err(err) => {
            tracing::warn!(resource = %query.resource, error = %err, "datatable fetch failed");
            None
        }
    }
}

/// Table body rows available at a given terminal height, after the shell
/// chrome and the page's own title, status and hint lines.
pub(crate) fn body_rows(height: u16) -> usize {
    usize::from(height).saturating_sub(8).max(3)
}

/// Outcome of a cursor or window key on a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TableNav {
    /// Key not handled here.
    Ignored,
    /// Cursor or scroll changed; re-render only.
    Moved,
    /// The server window moved; refetch at the new offset.
    Windowed,
}

/// Shared cursor and window bindings for table pages.
pub(crate) fn table_nav(table: &mut DataTable, code: KeyCode) -> TableNav {
    match code {
        KeyCode::Up | KeyCode::Char('k') => {
            table.move_up(1);
            TableNav::Moved
        }
        KeyCode::Down | KeyCode::Char('j') => {
            table.move_down(1);
            TableNav::Moved
        }
        KeyCode::PageUp => {
            table.move_up(10);
            TableNav::Moved
        }
        KeyCode::PageDown => {
            table.move_down(10);
            TableNav::Moved
        }
        KeyCode::Home | KeyCode::Char('g') => {
            table.goto_top();
            TableNav::Moved
        }
        KeyCode::End | KeyCode::Char('G') => {
            table.goto_bottom();
            TableNav::Moved
        }
        KeyCode::Left => {
            if table.page_back() {
                TableNav::Windowed
            } else {
                TableNav::Ignored
            }
        }
        KeyCode::Right => {
            if table.page_forward() {
                TableNav::Windowed
            } else {
                TableNav::Ignored
            }
        }
        _ => TableNav::Ignored,
    }
}
