//! Polling state machine for server-backed tables.
//!
//! A [`PollingTable`] decides when to fetch, when to merely re-arm its timer,
//! and when to park, without performing any I/O itself. The owner executes
//! the returned [`RefreshPlan`] and reports timer ticks and fetch results
//! back in. Two invariants hold at all times: at most one timer is armed and
//! at most one fetch is outstanding per instance. Stale ticks are rejected by
//! tag, stale responses by generation token (which doubles as the wire echo).

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::Value;

/// Delay between the first paint of a table and the start of its periodic
/// refresh chain.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Default server-side page length.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// One page of rows as returned by a datatable resource.
#[derive(Debug, Clone, PartialEq)]
pub struct TablePage {
    /// Raw row documents.
    pub rows: Vec<Value>,
    /// Total records matching the query across all pages.
    pub total: u64,
    /// Echo token the request carried.
    pub echo: u64,
}

/// Inputs the owner resolves at refresh time.
#[derive(Debug, Clone, Copy)]
pub struct RefreshCtx {
    /// Effective auto-refresh interval. Zero suspends polling entirely
    /// (auto-refresh paused or the tab hidden).
    pub interval: Duration,
    /// Whether the table's widget is currently on screen.
    pub widget_visible: bool,
    /// Whether a modal is open above the owning page.
    pub modal_open: bool,
}

impl RefreshCtx {
    /// Context for a fully visible page.
    #[must_use]
    pub const fn active(interval: Duration) -> Self {
        Self {
            interval,
            widget_visible: true,
            modal_open: false,
        }
    }
}

/// A fully resolved fetch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchQuery {
    /// Datatable resource name.
    pub resource: String,
    /// Query parameters: pagination window, echo token, and every non-empty
    /// filter. Empty filter values are omitted.
    pub params: Vec<(String, String)>,
}

/// What the owner must do after a refresh decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshPlan {
    /// No widget attached; fall back to a plain re-render.
    Flush,
    /// Polling is suspended; nothing is scheduled until the next external
    /// nudge (visibility change, rate change, filter edit).
    Stop,
    /// Arm the single pending timer. When the tick carrying this tag fires
    /// and validates, call [`PollingTable::refresh`] with `just_queue`.
    Queue {
        tag: u64,
        delay: Duration,
        just_queue: bool,
    },
    /// Dispatch the fetch now and report back via [`PollingTable::on_loaded`].
    Fetch { generation: u64, query: FetchQuery },
}

/// Outcome of reporting a fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// The response belonged to a superseded or cancelled fetch; discard it.
    Stale,
    /// The fetch settled; execute the follow-up plan.
    Settled(RefreshPlan),
}

/// Polling state for one server-backed table.
#[derive(Debug)]
pub struct PollingTable {
    resource: String,
    filters: BTreeMap<String, String>,
    offset: usize,
    page_size: usize,
    generation: u64,
    in_flight: Option<u64>,
    timer_tag: u64,
    timer_armed: bool,
    attached: bool,
    last_page: Option<TablePage>,
}

impl PollingTable {
    #[must_use]
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            filters: BTreeMap::new(),
            offset: 0,
            page_size: DEFAULT_PAGE_SIZE,
            generation: 0,
            in_flight: None,
            timer_tag: 0,
            timer_armed: false,
            attached: false,
            last_page: None,
        }
    }

    /// Declares the filter keys this table understands. Every declared key is
    /// present from then on; unset values normalize to the empty string.
    #[must_use]
    pub fn with_filters<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for key in keys {
            self.filters.entry(key.into()).or_default();
        }
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Whether a fetch is outstanding.
    #[must_use]
    pub const fn loading(&self) -> bool {
        self.in_flight.is_some()
    }

    #[must_use]
    pub const fn attached(&self) -> bool {
        self.attached
    }

    /// The most recent successfully loaded page. Survives refreshes, fetch
    /// failures, and suspension.
    #[must_use]
    pub const fn last_page(&self) -> Option<&TablePage> {
        self.last_page.as_ref()
    }

    #[must_use]
    pub fn filter(&self, key: &str) -> &str {
        self.filters.get(key).map_or("", String::as_str)
    }

    #[must_use]
    pub const fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replaces the filter values. Declared keys missing from `values` reset
    /// to `""`; unknown keys in `values` are adopted. Returns `true` when any
    /// value changed, in which case the owner should refresh immediately.
    pub fn set_filters(&mut self, values: &BTreeMap<String, String>) -> bool {
        let mut next: BTreeMap<String, String> = self
            .filters
            .keys()
            .map(|k| (k.clone(), String::new()))
            .collect();
        for (k, v) in values {
            next.insert(k.clone(), v.clone());
        }
        if next == self.filters {
            return false;
        }
        self.filters = next;
        true
    }

    /// Sets a single filter value. Returns `true` when it changed.
    pub fn set_filter(&mut self, key: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.filters.get(key).is_some_and(|current| *current == value) {
            return false;
        }
        self.filters.insert(key.to_owned(), value);
        true
    }

    /// Moves the pagination window for subsequent fetches.
    pub fn set_window(&mut self, offset: usize, page_size: usize) {
        self.offset = offset;
        self.page_size = page_size.max(1);
    }

    /// Wires the table widget: returns the initial data load and the settle
    /// tick that starts the periodic chain.
    pub fn attach(&mut self) -> (RefreshPlan, RefreshPlan) {
        self.attached = true;
        let fetch = self.begin_fetch();
        let settle = self.arm_timer(SETTLE_DELAY, true);
        (fetch, settle)
    }

    /// The refresh decision ladder.
    ///
    /// Any pending timer is cancelled first, unconditionally. Then: a zero
    /// interval parks the instance; `just_queue`, a hidden widget, an open
    /// modal, or an outstanding fetch merely re-arm the timer (no concurrent
    /// fetch is ever dispatched); otherwise a fetch begins.
    pub fn refresh(&mut self, ctx: &RefreshCtx, just_queue: bool) -> RefreshPlan {
        if !self.attached {
            return RefreshPlan::Flush;
        }
        self.cancel_timer();
        if ctx.interval.is_zero() {
            return RefreshPlan::Stop;
        }
        if just_queue || !ctx.widget_visible || ctx.modal_open || self.in_flight.is_some() {
            return self.arm_timer(ctx.interval, false);
        }
        self.begin_fetch()
    }

    /// Reports a timer tick. Returns `true` only when the tick carries the
    /// currently armed tag, which it disarms. Stale ticks are ignored.
    pub fn tick(&mut self, tag: u64) -> bool {
        if self.timer_armed && tag == self.timer_tag {
            self.timer_armed = false;
            true
        } else {
            false
        }
    }

    /// Reports the outcome of a dispatched fetch. `page` is `None` when the
    /// fetch failed; the previous page is kept either way and the next cycle
    /// is still scheduled, so transient failures retry on the normal cadence.
    pub fn on_loaded(
        &mut self,
        ctx: &RefreshCtx,
        generation: u64,
        page: Option<TablePage>,
    ) -> LoadResult {
        if self.in_flight != Some(generation) {
            return LoadResult::Stale;
        }
        self.in_flight = None;
        match page {
            Some(page) if page.echo == generation => self.last_page = Some(page),
            Some(page) => {
                tracing::warn!(
                    resource = %self.resource,
                    expected = generation,
                    got = page.echo,
                    "mismatched echo token; keeping previous page"
                );
            }
            None => {}
        }
        let plan = if ctx.interval.is_zero() {
            RefreshPlan::Stop
        } else {
            self.arm_timer(ctx.interval, false)
        };
        LoadResult::Settled(plan)
    }

    /// Suspends the instance when its page is hidden: the pending timer is
    /// cancelled and any outstanding fetch invalidated, so in-transit ticks
    /// and responses are dropped. The last page and filters survive.
    pub fn suspend(&mut self) {
        self.cancel_timer();
        if self.in_flight.take().is_some() {
            self.generation = self.generation.wrapping_add(1);
        }
    }

    /// Installs a locally produced page without a fetch.
    pub fn prime(&mut self, page: TablePage) {
        self.last_page = Some(page);
    }

    fn cancel_timer(&mut self) {
        self.timer_tag = self.timer_tag.wrapping_add(1);
        self.timer_armed = false;
    }

    fn arm_timer(&mut self, delay: Duration, just_queue: bool) -> RefreshPlan {
        self.timer_tag = self.timer_tag.wrapping_add(1);
        self.timer_armed = true;
        RefreshPlan::Queue {
            tag: self.timer_tag,
            delay,
            just_queue,
        }
    }

    fn begin_fetch(&mut self) -> RefreshPlan {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = Some(self.generation);
        RefreshPlan::Fetch {
            generation: self.generation,
            query: self.build_query(),
        }
    }

    fn build_query(&self) -> FetchQuery {
        let mut params = vec![
            ("iDisplayStart".to_owned(), self.offset.to_string()),
            ("iDisplayLength".to_owned(), self.page_size.to_string()),
            ("sEcho".to_owned(), self.generation.to_string()),
        ];
        for (key, value) in &self.filters {
            if !value.is_empty() {
                params.push((key.clone(), value.clone()));
            }
        }
        FetchQuery {
            resource: self.resource.clone(),
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FIVE_S: Duration = Duration::from_secs(5);

    fn active() -> RefreshCtx {
        RefreshCtx::active(FIVE_S)
    }

    fn hidden_tab() -> RefreshCtx {
        RefreshCtx {
            interval: Duration::ZERO,
            widget_visible: true,
            modal_open: false,
        }
    }

    fn page(echo: u64) -> TablePage {
        TablePage {
            rows: vec![json!({"_id": "a"})],
            total: 1,
            echo,
        }
    }

    fn fetch_generation(plan: &RefreshPlan) -> u64 {
        match plan {
            RefreshPlan::Fetch { generation, .. } => *generation,
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    fn queue_tag(plan: &RefreshPlan) -> u64 {
        match plan {
            RefreshPlan::Queue { tag, .. } => *tag,
            other => panic!("expected queue, got {other:?}"),
        }
    }

    // =========================================================================
    // Attach and the settle chain
    // =========================================================================

    #[test]
    fn attach_fetches_and_arms_the_settle_timer() {
        let mut poll = PollingTable::new("jobs");
        let (fetch, settle) = poll.attach();
        assert!(matches!(fetch, RefreshPlan::Fetch { .. }));
        assert!(poll.loading());
        match settle {
            RefreshPlan::Queue {
                delay, just_queue, ..
            } => {
                assert_eq!(delay, SETTLE_DELAY);
                assert!(just_queue);
            }
            other => panic!("expected queue, got {other:?}"),
        }
    }

    #[test]
    fn settle_tick_queues_instead_of_fetching() {
        let mut poll = PollingTable::new("jobs");
        let (_, settle) = poll.attach();
        assert!(poll.tick(queue_tag(&settle)));
        let plan = poll.refresh(&active(), true);
        match plan {
            RefreshPlan::Queue {
                delay, just_queue, ..
            } => {
                assert_eq!(delay, FIVE_S);
                assert!(!just_queue);
            }
            other => panic!("expected queue, got {other:?}"),
        }
    }

    #[test]
    fn unattached_refresh_falls_back_to_flush() {
        let mut poll = PollingTable::new("jobs");
        assert_eq!(poll.refresh(&active(), false), RefreshPlan::Flush);
    }

    // =========================================================================
    // The decision ladder
    // =========================================================================

    #[test]
    fn in_flight_fetch_queues_the_next_cycle() {
        let mut poll = PollingTable::new("jobs");
        let (_, _) = poll.attach();
        assert!(poll.loading());
        let plan = poll.refresh(&active(), false);
        assert!(matches!(plan, RefreshPlan::Queue { .. }));
        assert!(poll.loading());
    }

    #[test]
    fn hidden_widget_queues_without_fetching() {
        let mut poll = PollingTable::new("jobs");
        complete_initial(&mut poll);
        let ctx = RefreshCtx {
            interval: FIVE_S,
            widget_visible: false,
            modal_open: false,
        };
        assert!(matches!(poll.refresh(&ctx, false), RefreshPlan::Queue { .. }));
        assert!(!poll.loading());
    }

    #[test]
    fn open_modal_queues_without_fetching() {
        let mut poll = PollingTable::new("jobs");
        complete_initial(&mut poll);
        let ctx = RefreshCtx {
            interval: FIVE_S,
            widget_visible: true,
            modal_open: true,
        };
        assert!(matches!(poll.refresh(&ctx, false), RefreshPlan::Queue { .. }));
        assert!(!poll.loading());
    }

    #[test]
    fn zero_interval_parks_and_cancels_the_pending_timer() {
        let mut poll = PollingTable::new("jobs");
        complete_initial(&mut poll);
        let queued = poll.refresh(&active(), true);
        let tag = queue_tag(&queued);
        assert_eq!(poll.refresh(&hidden_tab(), false), RefreshPlan::Stop);
        assert!(!poll.tick(tag));
    }

    #[test]
    fn visible_and_idle_dispatches_a_fetch() {
        let mut poll = PollingTable::new("jobs");
        complete_initial(&mut poll);
        let plan = poll.refresh(&active(), false);
        assert!(matches!(plan, RefreshPlan::Fetch { .. }));
        assert!(poll.loading());
    }

    fn complete_initial(poll: &mut PollingTable) {
        let (fetch, _) = poll.attach();
        let generation = fetch_generation(&fetch);
        let result = poll.on_loaded(&active(), generation, Some(page(generation)));
        assert!(matches!(result, LoadResult::Settled(_)));
    }

    // =========================================================================
    // Timer tags
    // =========================================================================

    #[test]
    fn every_refresh_cancels_the_pending_timer() {
        let mut poll = PollingTable::new("jobs");
        complete_initial(&mut poll);
        let first = poll.refresh(&active(), true);
        let second = poll.refresh(&active(), true);
        assert!(!poll.tick(queue_tag(&first)));
        assert!(poll.tick(queue_tag(&second)));
    }

    #[test]
    fn a_tick_fires_at_most_once() {
        let mut poll = PollingTable::new("jobs");
        complete_initial(&mut poll);
        let plan = poll.refresh(&active(), true);
        let tag = queue_tag(&plan);
        assert!(poll.tick(tag));
        assert!(!poll.tick(tag));
    }

    // =========================================================================
    // Load results and staleness
    // =========================================================================

    #[test]
    fn matching_load_stores_the_page_and_queues() {
        let mut poll = PollingTable::new("jobs");
        let (fetch, _) = poll.attach();
        let generation = fetch_generation(&fetch);
        let result = poll.on_loaded(&active(), generation, Some(page(generation)));
        match result {
            LoadResult::Settled(RefreshPlan::Queue { delay, .. }) => assert_eq!(delay, FIVE_S),
            other => panic!("expected settled queue, got {other:?}"),
        }
        assert!(!poll.loading());
        assert_eq!(poll.last_page().map(|p| p.total), Some(1));
    }

    #[test]
    fn stale_generation_is_rejected() {
        let mut poll = PollingTable::new("jobs");
        let (fetch, _) = poll.attach();
        let generation = fetch_generation(&fetch);
        assert_eq!(
            poll.on_loaded(&active(), generation + 1, Some(page(generation + 1))),
            LoadResult::Stale
        );
        // The real fetch still settles afterwards.
        assert!(matches!(
            poll.on_loaded(&active(), generation, Some(page(generation))),
            LoadResult::Settled(_)
        ));
    }

    #[test]
    fn failed_fetch_keeps_the_previous_page_and_retries() {
        let mut poll = PollingTable::new("jobs");
        complete_initial(&mut poll);
        assert_eq!(poll.last_page().map(|p| p.total), Some(1));

        let plan = poll.refresh(&active(), false);
        let generation = fetch_generation(&plan);
        let result = poll.on_loaded(&active(), generation, None);
        assert!(matches!(result, LoadResult::Settled(RefreshPlan::Queue { .. })));
        assert_eq!(poll.last_page().map(|p| p.total), Some(1));
        assert!(!poll.loading());
    }

    #[test]
    fn mismatched_echo_keeps_the_previous_page() {
        let mut poll = PollingTable::new("jobs");
        complete_initial(&mut poll);

        let plan = poll.refresh(&active(), false);
        let generation = fetch_generation(&plan);
        let mut bogus = page(generation);
        bogus.echo = generation + 40;
        bogus.total = 999;
        let result = poll.on_loaded(&active(), generation, Some(bogus));
        assert!(matches!(result, LoadResult::Settled(_)));
        assert_eq!(poll.last_page().map(|p| p.total), Some(1));
    }

    #[test]
    fn load_settling_under_a_hidden_tab_parks() {
        let mut poll = PollingTable::new("jobs");
        let (fetch, _) = poll.attach();
        let generation = fetch_generation(&fetch);
        let result = poll.on_loaded(&hidden_tab(), generation, Some(page(generation)));
        assert_eq!(result, LoadResult::Settled(RefreshPlan::Stop));
    }

    // =========================================================================
    // Suspension
    // =========================================================================

    #[test]
    fn suspend_invalidates_the_outstanding_fetch() {
        let mut poll = PollingTable::new("jobs");
        let (fetch, _) = poll.attach();
        let generation = fetch_generation(&fetch);
        poll.suspend();
        assert!(!poll.loading());
        assert_eq!(
            poll.on_loaded(&active(), generation, Some(page(generation))),
            LoadResult::Stale
        );
    }

    #[test]
    fn suspend_keeps_the_last_page_and_filters() {
        let mut poll = PollingTable::new("jobs").with_filters(["status"]);
        poll.set_filter("status", "failed");
        complete_initial(&mut poll);
        poll.suspend();
        assert_eq!(poll.last_page().map(|p| p.total), Some(1));
        assert_eq!(poll.filter("status"), "failed");
    }

    #[test]
    fn resume_after_suspend_fetches_immediately() {
        let mut poll = PollingTable::new("jobs");
        complete_initial(&mut poll);
        poll.suspend();
        let plan = poll.refresh(&active(), false);
        assert!(matches!(plan, RefreshPlan::Fetch { .. }));
    }

    // =========================================================================
    // Filters and query building
    // =========================================================================

    #[test]
    fn declared_filters_normalize_to_empty() {
        let poll = PollingTable::new("jobs").with_filters(["queue", "status"]);
        assert_eq!(poll.filter("queue"), "");
        assert_eq!(poll.filter("status"), "");
        assert_eq!(poll.filter("unknown"), "");
    }

    #[test]
    fn set_filters_resets_missing_keys_and_adopts_unknown_ones() {
        let mut poll = PollingTable::new("jobs").with_filters(["queue", "status"]);
        poll.set_filter("queue", "default");

        let mut values = BTreeMap::new();
        values.insert("status".to_owned(), "failed".to_owned());
        values.insert("exceptiontype".to_owned(), "Timeout".to_owned());
        assert!(poll.set_filters(&values));

        assert_eq!(poll.filter("queue"), "");
        assert_eq!(poll.filter("status"), "failed");
        assert_eq!(poll.filter("exceptiontype"), "Timeout");
    }

    #[test]
    fn set_filters_reports_no_change_when_identical() {
        let mut poll = PollingTable::new("jobs").with_filters(["status"]);
        let mut values = BTreeMap::new();
        values.insert("status".to_owned(), "failed".to_owned());
        assert!(poll.set_filters(&values));
        assert!(!poll.set_filters(&values));
    }

    #[test]
    fn queries_omit_empty_filters() {
        let mut poll = PollingTable::new("jobs").with_filters(["queue", "status"]);
        poll.set_filter("status", "failed");
        poll.set_window(50, 25);
        complete_initial(&mut poll);

        let plan = poll.refresh(&active(), false);
        let RefreshPlan::Fetch { query, .. } = plan else {
            panic!("expected fetch");
        };
        assert_eq!(query.resource, "jobs");
        let keys: Vec<&str> = query.params.iter().map(|(k, _)| k.as_str()).collect();
        assert!(keys.contains(&"iDisplayStart"));
        assert!(keys.contains(&"iDisplayLength"));
        assert!(keys.contains(&"sEcho"));
        assert!(keys.contains(&"status"));
        assert!(!keys.contains(&"queue"));
        let start = query.params.iter().find(|(k, _)| k == "iDisplayStart");
        assert_eq!(start.map(|(_, v)| v.as_str()), Some("50"));
    }

    #[test]
    fn echo_token_matches_the_generation() {
        let mut poll = PollingTable::new("queues");
        let (fetch, _) = poll.attach();
        let RefreshPlan::Fetch { generation, query } = fetch else {
            panic!("expected fetch");
        };
        let echo = query.params.iter().find(|(k, _)| k == "sEcho");
        assert_eq!(echo.map(|(_, v)| v.clone()), Some(generation.to_string()));
    }

    // =========================================================================
    // Priming
    // =========================================================================

    #[test]
    fn prime_installs_a_page_without_a_fetch() {
        let mut poll = PollingTable::new("queues");
        poll.prime(page(0));
        assert_eq!(poll.last_page().map(|p| p.total), Some(1));
        assert!(!poll.loading());
    }
}
