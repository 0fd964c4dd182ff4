//! The dashboard shell.
//!
//! [`Dashboard`] owns the page tree: one node per [`Route`] under a silent
//! root, plus the job-detail and worker-IO modals under their owner pages.
//! It routes keys and poll messages, reacts to terminal focus by pausing the
//! shared refresh rate, fans refresh nudges out to whatever is on screen,
//! and keeps a small stack of expiring alerts painted over the body.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::KeyCode;
use crossterm::style::Stylize;
use jobdeck_api::ApiClient;
use pagekit::{
    batch, quit, tick, AppContext, BlurMsg, Cmd, FocusMsg, KeyMsg, Message, Model, Page, PageNode,
    ShowOptions, WindowSizeMsg,
};

use crate::config::Config;
use crate::messages::{
    AlertExpiredMsg, AlertLevel, AlertMsg, GroupsLoadedMsg, GroupsSavedMsg, JobActionDoneMsg,
    JobDetailLoadedMsg, LogChunkMsg, LogTickMsg, ModalChangedMsg, NavigateMsg, OpenJobDetailMsg,
    OpenWorkerIoMsg, PollTickMsg, PoolLoadedMsg, RefreshNudgeMsg, TableLoadedMsg,
    WorkerIoLoadedMsg, WorkerIoTickMsg,
};
use crate::pages;
use crate::pages::job_detail::JobDetailPage;
use crate::pages::worker_io::WorkerIoPage;
use crate::routes::Route;

/// Child id of the job-detail modal under the jobs page.
const JOB_DETAIL: &str = "jobdetail";
/// Child id of the worker-IO modal under the workers page.
const WORKER_IO: &str = "workerio";
/// Auto-refresh presets cycled by `p`, in seconds. Zero pauses polling.
const RATE_PRESETS: [u64; 5] = [5, 10, 30, 60, 0];
/// Most alerts kept on screen at once; older ones fall off.
const MAX_ALERTS: usize = 4;
/// How long a non-sticky alert stays up.
const ALERT_TTL: Duration = Duration::from_secs(5);
/// Rows taken by the header, the nav bar, and the footer.
const CHROME_ROWS: u16 = 3;

/// Behavior of the root node. The shell draws the frame itself; the root
/// only exists to own the route pages.
struct Shell;

impl Page for Shell {
    fn view(&self, _width: u16, _height: u16) -> String {
        String::new()
    }
}

/// One entry in the alert stack.
struct Alert {
    id: u64,
    level: AlertLevel,
    text: String,
    sticky: bool,
}

/// The top-level model driven by [`pagekit::Program`].
pub struct Dashboard {
    ctx: Arc<AppContext>,
    url: String,
    root: PageNode,
    active: Route,
    initial_route: Route,
    initial_params: BTreeMap<String, String>,
    width: u16,
    height: u16,
    /// Pre-rendered body. `view` must not mutate, so `update` rebuilds this
    /// after every message.
    body: String,
    alerts: Vec<Alert>,
    next_alert_id: u64,
}

impl Dashboard {
    #[must_use]
    pub fn new(api: Arc<ApiClient>, ctx: Arc<AppContext>, config: &Config) -> Self {
        let mut root = PageNode::new(Shell);
        for route in Route::ALL {
            let mut node = PageNode::new(pages::build(route, &api, &ctx, config.page_size));
            match route {
                Route::Jobs => {
                    node.add_child(
                        JOB_DETAIL,
                        PageNode::new(JobDetailPage::new(api.clone(), ctx.clone())),
                    );
                }
                Route::Workers => {
                    node.add_child(
                        WORKER_IO,
                        PageNode::new(WorkerIoPage::new(api.clone(), ctx.clone())),
                    );
                }
                _ => {}
            }
            root.add_child(route.key(), node);
        }
        let (initial_route, initial_params) = config.initial_route();
        Self {
            ctx,
            url: config.url.clone(),
            root,
            active: Route::Overview,
            initial_route,
            initial_params,
            width: 0,
            height: 0,
            body: String::new(),
            alerts: Vec::new(),
            next_alert_id: 0,
        }
    }

    fn dispatch(&mut self, msg: &Message) -> Option<Cmd> {
        if let Some(size) = msg.downcast_ref::<WindowSizeMsg>() {
            return self.resize(msg, size);
        }
        if msg.is::<FocusMsg>() {
            return self.tab_visibility(true);
        }
        if msg.is::<BlurMsg>() {
            return self.tab_visibility(false);
        }
        if let Some(key) = msg.downcast_ref::<KeyMsg>() {
            return self.handle_key(msg, key);
        }
        if let Some(nav) = msg.downcast_ref::<NavigateMsg>() {
            let nav = nav.clone();
            return self.navigate(nav.route, nav.params);
        }
        if let Some(open) = msg.downcast_ref::<OpenJobDetailMsg>() {
            let id = open.job_id.clone();
            return self.open_modal(Route::Jobs, JOB_DETAIL, id);
        }
        if let Some(open) = msg.downcast_ref::<OpenWorkerIoMsg>() {
            let id = open.worker_id.clone();
            return self.open_modal(Route::Workers, WORKER_IO, id);
        }
        if let Some(alert) = msg.downcast_ref::<AlertMsg>() {
            return self.push_alert(alert);
        }
        if let Some(expired) = msg.downcast_ref::<AlertExpiredMsg>() {
            self.alerts.retain(|alert| alert.id != expired.id);
            return None;
        }
        if let Some(tick) = msg.downcast_ref::<PollTickMsg>() {
            return self.route_to(tick.route, msg);
        }
        if let Some(loaded) = msg.downcast_ref::<TableLoadedMsg>() {
            return self.route_to(loaded.route, msg);
        }
        if msg.is::<PoolLoadedMsg>() {
            return self.route_to(Route::Overview, msg);
        }
        if msg.is::<JobDetailLoadedMsg>() || msg.is::<LogTickMsg>() || msg.is::<LogChunkMsg>() {
            return self.route_to_child(Route::Jobs, JOB_DETAIL, msg);
        }
        if msg.is::<WorkerIoTickMsg>() || msg.is::<WorkerIoLoadedMsg>() {
            return self.route_to_child(Route::Workers, WORKER_IO, msg);
        }
        if msg.is::<JobActionDoneMsg>() {
            return self.route_to(Route::Jobs, msg);
        }
        if msg.is::<GroupsLoadedMsg>() || msg.is::<GroupsSavedMsg>() {
            return self.route_to(Route::WorkerGroups, msg);
        }
        // Anything else belongs to the visible page.
        self.route_to(self.active, msg)
    }

    /// Delivers a message to a route page, visible or not, and drops its
    /// render cache. Poll results must reach hidden pages; their engines
    /// decide what is stale.
    fn route_to(&mut self, route: Route, msg: &Message) -> Option<Cmd> {
        let node = self.root.child_mut(route.key())?;
        let cmd = node.update(msg);
        node.flush();
        cmd
    }

    fn route_to_child(&mut self, owner: Route, child: &str, msg: &Message) -> Option<Cmd> {
        let node = self.root.child_mut(owner.key())?.child_mut(child)?;
        let cmd = node.update(msg);
        node.flush();
        cmd
    }

    /// A resize reaches every page, so offscreen tables pick the new height
    /// up before their next show.
    fn resize(&mut self, msg: &Message, size: &WindowSizeMsg) -> Option<Cmd> {
        self.width = size.width;
        self.height = size.height;
        let mut cmds = Vec::new();
        for route in Route::ALL {
            if let Some(node) = self.root.child_mut(route.key()) {
                cmds.push(node.update(msg));
                node.flush();
                let children: Vec<String> = node.child_ids().map(str::to_owned).collect();
                for id in children {
                    if let Some(child) = node.child_mut(&id) {
                        cmds.push(child.update(msg));
                        child.flush();
                    }
                }
            }
        }
        batch(cmds)
    }

    fn tab_visibility(&mut self, visible: bool) -> Option<Cmd> {
        if !self.ctx.set_tab_visible(visible) {
            return None;
        }
        self.fan_out_refresh()
    }

    /// Nudges the visible page and, when one is open, its modal. Hidden
    /// pages re-plan on their own next show.
    fn fan_out_refresh(&mut self) -> Option<Cmd> {
        let nudge = Message::new(RefreshNudgeMsg);
        let mut cmds = vec![self.route_to(self.active, &nudge)];
        if let Some(id) = self.active_modal() {
            cmds.push(self.route_to_child(self.active, &id, &nudge));
        }
        batch(cmds)
    }

    fn active_modal(&self) -> Option<String> {
        self.root
            .child(self.active.key())
            .and_then(PageNode::visible_modal_child)
            .map(str::to_owned)
    }

    fn cycle_rate(&mut self) -> Option<Cmd> {
        let current = self.ctx.refresh_interval().as_secs();
        let at = RATE_PRESETS.iter().position(|preset| *preset == current);
        let next = RATE_PRESETS[at.map_or(0, |at| (at + 1) % RATE_PRESETS.len())];
        if self.ctx.set_refresh_interval(Duration::from_secs(next)) {
            return self.fan_out_refresh();
        }
        None
    }

    fn handle_key(&mut self, msg: &Message, key: &KeyMsg) -> Option<Cmd> {
        // An open modal owns the keyboard; Esc closes it.
        if let Some(id) = self.active_modal() {
            if key.code() == KeyCode::Esc {
                let closed = self.close_active_modal();
                let nudged = self.route_to(self.active, &Message::new(RefreshNudgeMsg));
                return batch(vec![closed, nudged]);
            }
            return self.route_to_child(self.active, &id, msg);
        }
        match key.code() {
            KeyCode::Char('q') => return Some(quit()),
            KeyCode::Char('r') => return self.fan_out_refresh(),
            KeyCode::Char('p') => return self.cycle_rate(),
            KeyCode::Char('x') => {
                self.alerts.clear();
                return None;
            }
            KeyCode::Char(c) => {
                if let Some(route) = Route::from_shortcut(c) {
                    return self.navigate(route, BTreeMap::new());
                }
            }
            _ => {}
        }
        self.route_to(self.active, msg)
    }

    fn navigate(&mut self, route: Route, params: BTreeMap<String, String>) -> Option<Cmd> {
        let closed = self.close_active_modal();
        let re_show = route == self.active
            && self
                .root
                .child(route.key())
                .is_some_and(PageNode::is_visible);
        let ctx = Arc::clone(&self.ctx);
        let opts = ShowOptions::with_params(params);
        let shown = match self.root.show_child(&ctx, route.key(), &opts) {
            Ok(cmd) => cmd,
            Err(err) => {
                tracing::error!(route = route.key(), error = %err, "navigation failed");
                return closed;
            }
        };
        self.active = route;
        if let Some(node) = self.root.child_mut(route.key()) {
            node.flush();
        }
        if re_show {
            // The page stayed up and only got new parameters; poll right away.
            let nudged = self.route_to(route, &Message::new(RefreshNudgeMsg));
            return batch(vec![closed, shown, nudged]);
        }
        batch(vec![closed, shown])
    }

    /// Hides the modal on the active page, if one is open, and tells the
    /// owner. `PageNode::hide` does not cascade, so navigation must close
    /// modals itself or their poll chains would outlive the page switch.
    fn close_active_modal(&mut self) -> Option<Cmd> {
        let owner = self.root.child_mut(self.active.key())?;
        let id = owner.visible_modal_child().map(str::to_owned)?;
        let hidden = owner.child_mut(&id).and_then(PageNode::hide);
        let changed = owner.update(&Message::new(ModalChangedMsg { open: false }));
        owner.flush();
        batch(vec![hidden, changed])
    }

    fn open_modal(&mut self, owner: Route, child: &str, id: String) -> Option<Cmd> {
        let ctx = Arc::clone(&self.ctx);
        let node = self.root.child_mut(owner.key())?;
        let opts = ShowOptions::new().param("id", id).as_modal();
        match node.show_child(&ctx, child, &opts) {
            Ok(shown) => {
                let changed = node.update(&Message::new(ModalChangedMsg { open: true }));
                node.flush();
                batch(vec![shown, changed])
            }
            Err(err) => {
                tracing::error!(owner = owner.key(), child, error = %err, "no such modal");
                None
            }
        }
    }

    fn push_alert(&mut self, alert: &AlertMsg) -> Option<Cmd> {
        let id = self.next_alert_id;
        self.next_alert_id += 1;
        self.alerts.push(Alert {
            id,
            level: alert.level,
            text: alert.text.clone(),
            sticky: alert.sticky,
        });
        if self.alerts.len() > MAX_ALERTS {
            let overflow = self.alerts.len() - MAX_ALERTS;
            self.alerts.drain(..overflow);
        }
        if alert.sticky {
            return None;
        }
        Some(tick(ALERT_TTL, move || AlertExpiredMsg { id }))
    }

    /// Rebuilds the cached body: the visible page, or its modal boxed over
    /// a blank backdrop.
    fn compose_body(&mut self) {
        let width = self.width.max(40);
        let page_h = self.height.max(10) - CHROME_ROWS;
        let modal = self.active_modal();
        let Some(node) = self.root.child_mut(self.active.key()) else {
            self.body.clear();
            return;
        };
        if let Some(id) = modal {
            if let Some(child) = node.child_mut(&id) {
                let inner = child
                    .view_for(width.saturating_sub(6), page_h.saturating_sub(2))
                    .to_owned();
                self.body = frame_modal(&inner, usize::from(width));
                return;
            }
        }
        self.body = node.view_for(width, page_h).to_owned();
    }

    /// Paints the newest alerts over the bottom body rows.
    fn overlay_alerts(&self, body: &mut [String]) {
        let shown = self.alerts.len().min(body.len());
        if shown == 0 {
            return;
        }
        let start = body.len() - shown;
        let newest = &self.alerts[self.alerts.len() - shown..];
        for (line, alert) in body[start..].iter_mut().zip(newest) {
            *line = alert_line(alert);
        }
    }

    fn header_line(&self) -> String {
        let every = self.ctx.refresh_interval();
        let rate = if every.is_zero() {
            "paused".to_owned()
        } else {
            format!("{}s", every.as_secs())
        };
        let mut line = format!("{}  {}  refresh {rate}", "jobdeck".bold(), self.url);
        if !self.ctx.tab_visible() {
            line.push_str(&format!("  {}", "[idle]".dim()));
        }
        line
    }

    fn nav_line(&self) -> String {
        let items: Vec<String> = Route::ALL
            .iter()
            .map(|route| {
                let label = format!("{}:{}", route.shortcut(), route.name());
                if *route == self.active {
                    label.reverse().to_string()
                } else {
                    label.dim().to_string()
                }
            })
            .collect();
        items.join(" ")
    }

    fn footer_line(&self) -> String {
        let hints = if self.active_modal().is_some() {
            "esc: close"
        } else {
            "q: quit   r: refresh   p: rate   x: clear alerts   1-9/0/a: pages"
        };
        format!("{}", hints.dim())
    }
}

impl Model for Dashboard {
    fn init(&self) -> Option<Cmd> {
        Some(Cmd::from_msg(NavigateMsg::with_params(
            self.initial_route,
            self.initial_params.clone(),
        )))
    }

    fn update(&mut self, msg: Message) -> Option<Cmd> {
        let cmd = self.dispatch(&msg);
        self.compose_body();
        cmd
    }

    fn view(&self) -> String {
        let body_rows = usize::from(self.height.max(10) - CHROME_ROWS);
        let mut lines: Vec<String> = Vec::with_capacity(body_rows + 3);
        lines.push(self.header_line());
        lines.push(self.nav_line());
        let mut body: Vec<String> = self.body.lines().map(str::to_owned).collect();
        body.truncate(body_rows);
        body.resize(body_rows, String::new());
        self.overlay_alerts(&mut body);
        lines.append(&mut body);
        lines.push(self.footer_line());
        lines.join("\n")
    }
}

/// Boxes a modal view with top and bottom rules and a left border. Only
/// whole lines are decorated, so styled content stays intact.
fn frame_modal(view: &str, width: usize) -> String {
    let rule = "─".repeat(width.saturating_sub(4).clamp(8, 76));
    let mut out = String::new();
    out.push('\n');
    out.push_str(&format!("  ┌{rule}\n"));
    for line in view.lines() {
        out.push_str(&format!("  │ {line}\n"));
    }
    out.push_str(&format!("  └{rule}"));
    out
}

fn alert_line(alert: &Alert) -> String {
    let label = format!("[{}]", alert.level.label());
    let label = match alert.level {
        AlertLevel::Info => label.cyan().to_string(),
        AlertLevel::Success => label.green().to_string(),
        AlertLevel::Warning => label.yellow().to_string(),
        AlertLevel::Error => label.red().to_string(),
    };
    let pin = if alert.sticky { "  (x dismisses)" } else { "" };
    format!("{label} {}{pin}", alert.text)
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEvent;
    use pagekit::TablePage;

    use super::*;

    fn app() -> Dashboard {
        let api = Arc::new(ApiClient::new("http://localhost:5555").unwrap());
        let config = Config::default();
        let ctx = Arc::new(AppContext::new(config.refresh_interval()));
        Dashboard::new(api, ctx, &config)
    }

    fn key(code: KeyCode) -> Message {
        Message::new(KeyMsg(KeyEvent::from(code)))
    }

    #[tokio::test]
    async fn init_navigates_to_the_configured_route() {
        let api = Arc::new(ApiClient::new("http://localhost:5555").unwrap());
        let config = Config {
            route: "/jobs?status=failed".to_owned(),
            ..Config::default()
        };
        let ctx = Arc::new(AppContext::new(config.refresh_interval()));
        let app = Dashboard::new(api, ctx, &config);

        let msg = app.init().unwrap().execute().await.unwrap();
        let nav = msg.downcast_ref::<NavigateMsg>().unwrap();
        assert_eq!(nav.route, Route::Jobs);
        assert_eq!(nav.params.get("status").map(String::as_str), Some("failed"));
    }

    #[test]
    fn navigation_shows_the_target_and_hides_the_rest() {
        let mut app = app();
        let cmd = app.update(Message::new(NavigateMsg::to(Route::Queues)));
        assert!(cmd.is_some(), "first show should schedule a fetch");
        assert_eq!(app.active, Route::Queues);
        assert!(app.root.child("queues").unwrap().is_visible());

        app.update(Message::new(NavigateMsg::to(Route::Status)));
        assert!(!app.root.child("queues").unwrap().is_visible());
        assert!(app.root.child("status").unwrap().is_visible());
        assert_eq!(app.active, Route::Status);
    }

    #[test]
    fn shortcut_keys_navigate() {
        let mut app = app();
        app.update(key(KeyCode::Char('2')));
        assert_eq!(app.active, Route::Queues);
        app.update(key(KeyCode::Char('a')));
        assert_eq!(app.active, Route::Agents);
        app.update(key(KeyCode::Char('0')));
        assert_eq!(app.active, Route::WorkerGroups);
    }

    #[test]
    fn blur_pauses_and_a_second_blur_is_inert() {
        let mut app = app();
        app.update(Message::new(NavigateMsg::to(Route::Queues)));

        app.update(Message::new(BlurMsg));
        assert!(!app.ctx.tab_visible());
        assert!(app.ctx.effective_interval().is_zero());

        let cmd = app.dispatch(&Message::new(BlurMsg));
        assert!(cmd.is_none(), "no visibility change, no fan-out");

        app.update(Message::new(FocusMsg));
        assert!(app.ctx.tab_visible());
    }

    #[test]
    fn rate_key_walks_the_presets() {
        let mut app = app();
        assert_eq!(app.ctx.refresh_interval(), Duration::from_secs(10));
        app.update(key(KeyCode::Char('p')));
        assert_eq!(app.ctx.refresh_interval(), Duration::from_secs(30));
        app.update(key(KeyCode::Char('p')));
        assert_eq!(app.ctx.refresh_interval(), Duration::from_secs(60));
        app.update(key(KeyCode::Char('p')));
        assert!(app.ctx.refresh_interval().is_zero());
        app.update(key(KeyCode::Char('p')));
        assert_eq!(app.ctx.refresh_interval(), Duration::from_secs(5));
    }

    #[test]
    fn alerts_cap_and_expire() {
        let mut app = app();
        for n in 0..6 {
            let cmd = app.update(Message::new(AlertMsg::info(format!("note {n}"))));
            assert!(cmd.is_some(), "non-sticky alerts schedule an expiry");
        }
        assert_eq!(app.alerts.len(), MAX_ALERTS);
        assert_eq!(app.alerts[0].text, "note 2", "oldest fall off first");

        let id = app.alerts[0].id;
        app.update(Message::new(AlertExpiredMsg { id }));
        assert_eq!(app.alerts.len(), MAX_ALERTS - 1);
        assert!(app.alerts.iter().all(|alert| alert.id != id));
    }

    #[test]
    fn sticky_alerts_wait_for_dismissal() {
        let mut app = app();
        let cmd = app.update(Message::new(AlertMsg::error("backend gone").sticky()));
        assert!(cmd.is_none(), "sticky alerts get no expiry timer");
        assert_eq!(app.alerts.len(), 1);

        app.update(key(KeyCode::Char('x')));
        assert!(app.alerts.is_empty());
    }

    #[test]
    fn worker_io_modal_opens_and_esc_closes() {
        let mut app = app();
        app.update(Message::new(NavigateMsg::to(Route::Workers)));

        app.update(Message::new(OpenWorkerIoMsg {
            worker_id: "w-1".to_owned(),
        }));
        let workers = app.root.child("workers").unwrap();
        assert_eq!(workers.visible_modal_child(), Some(WORKER_IO));
        assert!(workers.is_visible(), "the base page stays up underneath");

        app.update(key(KeyCode::Esc));
        let workers = app.root.child("workers").unwrap();
        assert_eq!(workers.visible_modal_child(), None);
        assert!(workers.is_visible());
    }

    #[test]
    fn an_open_modal_owns_the_keyboard() {
        let mut app = app();
        app.update(Message::new(NavigateMsg::to(Route::Workers)));
        app.update(Message::new(OpenWorkerIoMsg {
            worker_id: "w-1".to_owned(),
        }));

        app.update(key(KeyCode::Char('2')));
        assert_eq!(app.active, Route::Workers, "shortcuts stop at the modal");
        assert_eq!(
            app.root.child("workers").unwrap().visible_modal_child(),
            Some(WORKER_IO)
        );
    }

    #[test]
    fn navigating_away_closes_an_open_modal() {
        let mut app = app();
        app.update(Message::new(NavigateMsg::to(Route::Jobs)));
        app.update(Message::new(OpenJobDetailMsg {
            job_id: "j-1".to_owned(),
        }));
        assert_eq!(
            app.root.child("jobs").unwrap().visible_modal_child(),
            Some(JOB_DETAIL)
        );

        app.update(Message::new(NavigateMsg::to(Route::Overview)));
        assert_eq!(app.active, Route::Overview);
        assert_eq!(app.root.child("jobs").unwrap().visible_modal_child(), None);
    }

    #[test]
    fn body_shows_the_modal_while_open() {
        let mut app = app();
        app.update(Message::new(WindowSizeMsg {
            width: 100,
            height: 30,
        }));
        app.update(Message::new(NavigateMsg::to(Route::Workers)));
        app.update(Message::new(OpenWorkerIoMsg {
            worker_id: "w-42".to_owned(),
        }));

        assert!(app.body.contains('┌'));
        assert!(app.body.contains("w-42"));
    }

    #[test]
    fn stale_results_still_reach_hidden_pages() {
        let mut app = app();
        app.update(Message::new(NavigateMsg::to(Route::Queues)));
        app.update(Message::new(NavigateMsg::to(Route::Status)));

        // The queues page is hidden; its suspended engine rejects the late
        // result without scheduling anything.
        let cmd = app.dispatch(&Message::new(TableLoadedMsg {
            route: Route::Queues,
            generation: 1,
            page: Some(TablePage {
                rows: vec![],
                total: 0,
                echo: 1,
            }),
        }));
        assert!(cmd.is_none());
    }

    #[test]
    fn view_frames_the_body() {
        let mut app = app();
        app.update(Message::new(WindowSizeMsg {
            width: 100,
            height: 24,
        }));
        app.update(Message::new(NavigateMsg::to(Route::Queues)));

        let frame = app.view();
        assert_eq!(frame.lines().count(), 24);
        assert!(frame.contains("jobdeck"));
        assert!(frame.contains("Queues"));
        assert!(frame.contains("q: quit"));
    }

    #[test]
    fn alerts_paint_over_the_body_bottom() {
        let mut app = app();
        app.update(Message::new(WindowSizeMsg {
            width: 100,
            height: 24,
        }));
        app.update(Message::new(NavigateMsg::to(Route::Queues)));
        app.update(Message::new(AlertMsg::warning("queue backlog rising")));

        let frame = app.view();
        assert!(frame.contains("queue backlog rising"));
        assert_eq!(frame.lines().count(), 24);
    }

    #[test]
    fn modal_frame_keeps_lines_intact() {
        let boxed = frame_modal("top\nmiddle", 60);
        let lines: Vec<&str> = boxed.lines().collect();
        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with("  ┌─"));
        assert_eq!(lines[2], "  │ top");
        assert_eq!(lines[3], "  │ middle");
        assert!(lines[4].starts_with("  └─"));
    }
}
