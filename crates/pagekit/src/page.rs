//! Page tree: lifecycle, visibility, render caching, and child routing.
//!
//! A [`PageNode`] wraps one [`Page`] behavior together with its children and
//! lifecycle flags. Showing a node initializes the behavior exactly once per
//! instance; show and hide strictly alternate and redundant calls are no-ops.
//! Child switching hides the outgoing child, applies navigation parameters to
//! the incoming one, and batches whatever commands the transition produced.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::command::{batch, Cmd};
use crate::message::Message;

/// Shared application context handed to pages at initialization.
///
/// Read-mostly: the shell flips the fields, pages read them when deciding how
/// to refresh. Suspension is tab-wide, so one visibility bit and one refresh
/// rate cover the whole tree. A zero interval means auto-refresh is paused.
#[derive(Debug)]
pub struct AppContext {
    tab_visible: AtomicBool,
    refresh_every_ms: AtomicU64,
}

impl AppContext {
    #[must_use]
    pub fn new(refresh_every: Duration) -> Self {
        Self {
            tab_visible: AtomicBool::new(true),
            refresh_every_ms: AtomicU64::new(to_ms(refresh_every)),
        }
    }

    #[must_use]
    pub fn tab_visible(&self) -> bool {
        self.tab_visible.load(Ordering::Relaxed)
    }

    /// Returns `true` when the stored value actually changed.
    pub fn set_tab_visible(&self, visible: bool) -> bool {
        self.tab_visible.swap(visible, Ordering::Relaxed) != visible
    }

    /// The configured auto-refresh interval, regardless of visibility.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_every_ms.load(Ordering::Relaxed))
    }

    /// Returns `true` when the stored value actually changed.
    pub fn set_refresh_interval(&self, every: Duration) -> bool {
        let ms = to_ms(every);
        self.refresh_every_ms.swap(ms, Ordering::Relaxed) != ms
    }

    /// The interval polling actually runs at: zero whenever the tab is
    /// hidden or auto-refresh is paused.
    #[must_use]
    pub fn effective_interval(&self) -> Duration {
        if self.tab_visible() {
            self.refresh_interval()
        } else {
            Duration::ZERO
        }
    }
}

fn to_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Behavior contract for a page in the tree.
///
/// Pages are plain state plus rendering; visibility bookkeeping and render
/// caching live in [`PageNode`]. Every hook except [`Page::view`] has a
/// default no-op implementation.
pub trait Page: Send {
    /// One-time setup, run on the first show and never again.
    fn init(&mut self, ctx: &AppContext) {
        let _ = ctx;
    }

    /// Builds the page's visual block for the given size.
    fn view(&self, width: u16, height: u16) -> String;

    /// Handles a message addressed to this page.
    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        let _ = msg;
        None
    }

    /// Called when the page becomes visible.
    fn on_show(&mut self) -> Option<Cmd> {
        None
    }

    /// Called when the page stops being visible.
    fn on_hide(&mut self) -> Option<Cmd> {
        None
    }

    /// Applies navigation parameters. Runs on every show, including re-shows
    /// of the already current child.
    fn set_options(&mut self, params: &BTreeMap<String, String>) {
        let _ = params;
    }

    /// Pages that must rebuild on every show opt out of render caching.
    fn always_render_on_show(&self) -> bool {
        false
    }
}

impl<P: Page + ?Sized> Page for Box<P> {
    fn init(&mut self, ctx: &AppContext) {
        (**self).init(ctx);
    }

    fn view(&self, width: u16, height: u16) -> String {
        (**self).view(width, height)
    }

    fn update(&mut self, msg: &Message) -> Option<Cmd> {
        (**self).update(msg)
    }

    fn on_show(&mut self) -> Option<Cmd> {
        (**self).on_show()
    }

    fn on_hide(&mut self) -> Option<Cmd> {
        (**self).on_hide()
    }

    fn set_options(&mut self, params: &BTreeMap<String, String>) {
        (**self).set_options(params);
    }

    fn always_render_on_show(&self) -> bool {
        (**self).always_render_on_show()
    }
}

/// Options for [`PageNode::show_child`].
#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    /// Navigation parameters forwarded to [`Page::set_options`].
    pub params: BTreeMap<String, String>,
    /// Show the child as a modal overlay; the current child stays visible.
    pub modal: bool,
    /// Drop the child's render cache before showing.
    pub flush: bool,
}

impl ShowOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_params(params: BTreeMap<String, String>) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn as_modal(mut self) -> Self {
        self.modal = true;
        self
    }

    #[must_use]
    pub fn flushing(mut self) -> Self {
        self.flush = true;
        self
    }
}

/// Errors from page-tree operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PageError {
    /// The requested child id is not registered on this node.
    #[error("unknown child page: {id}")]
    UnknownChild { id: String },
}

/// A node in the page tree.
pub struct PageNode {
    behavior: Box<dyn Page>,
    children: HashMap<String, PageNode>,
    current_child: Option<String>,
    initialized: bool,
    rendered: bool,
    visible: bool,
    modal: bool,
    cached_view: String,
    cached_size: (u16, u16),
}

impl PageNode {
    #[must_use]
    pub fn new(behavior: impl Page + 'static) -> Self {
        Self {
            behavior: Box::new(behavior),
            children: HashMap::new(),
            current_child: None,
            initialized: false,
            rendered: false,
            visible: false,
            modal: false,
            cached_view: String::new(),
            cached_size: (0, 0),
        }
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub const fn is_modal(&self) -> bool {
        self.modal
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn current_child_id(&self) -> Option<&str> {
        self.current_child.as_deref()
    }

    /// Shows the node. Initialization runs here on the first show, exactly
    /// once per instance. Showing an already visible node only re-applies the
    /// render policy; `on_show` does not fire again.
    pub fn show(&mut self, ctx: &AppContext) -> Option<Cmd> {
        self.show_inner(ctx, false)
    }

    /// Shows the node as a modal overlay; the parent's current child stays
    /// visible underneath.
    pub fn show_modal(&mut self, ctx: &AppContext) -> Option<Cmd> {
        self.show_inner(ctx, true)
    }

    fn show_inner(&mut self, ctx: &AppContext, modal: bool) -> Option<Cmd> {
        if !self.initialized {
            self.behavior.init(ctx);
            self.initialized = true;
        }
        let was_visible = self.visible;
        self.visible = true;
        self.modal = modal;
        if !self.rendered || self.behavior.always_render_on_show() {
            self.invalidate();
            self.rendered = true;
        }
        if was_visible {
            None
        } else {
            self.behavior.on_show()
        }
    }

    /// Hides the node. Hiding an already hidden node is a no-op.
    pub fn hide(&mut self) -> Option<Cmd> {
        if !self.visible {
            return None;
        }
        self.visible = false;
        self.modal = false;
        self.behavior.on_hide()
    }

    /// Drops the render cache so the next frame rebuilds the view.
    pub fn flush(&mut self) {
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.cached_view.clear();
        self.cached_size = (0, 0);
    }

    /// Returns the node's view for the given size, rebuilding only when the
    /// cache is empty or the size changed.
    pub fn view_for(&mut self, width: u16, height: u16) -> &str {
        if self.cached_view.is_empty() || self.cached_size != (width, height) {
            self.cached_view = self.behavior.view(width, height);
            self.cached_size = (width, height);
        }
        &self.cached_view
    }

    /// Forwards a message to this node's behavior.
    pub fn update(&mut self, msg: &Message) -> Option<Cmd> {
        self.behavior.update(msg)
    }

    /// Re-applies navigation parameters to the behavior.
    pub fn set_options(&mut self, params: &BTreeMap<String, String>) {
        self.behavior.set_options(params);
    }

    /// Registers a child. Re-registering an id tears the old subtree down
    /// first (postorder) and replaces it; the teardown commands are returned.
    pub fn add_child(&mut self, id: impl Into<String>, node: Self) -> Option<Cmd> {
        let id = id.into();
        let teardown = if self.children.contains_key(&id) {
            self.remove_child(&id)
        } else {
            None
        };
        self.children.insert(id, node);
        teardown
    }

    /// Removes a child subtree in postorder: grandchildren before children
    /// before the child itself, each visible node hidden on the way so its
    /// teardown hook runs.
    pub fn remove_child(&mut self, id: &str) -> Option<Cmd> {
        let mut node = self.children.remove(id)?;
        if self.current_child.as_deref() == Some(id) {
            self.current_child = None;
        }
        node.teardown()
    }

    fn teardown(&mut self) -> Option<Cmd> {
        let mut cmds: Vec<Option<Cmd>> = Vec::new();
        let ids: Vec<String> = self.children.keys().cloned().collect();
        for id in ids {
            if let Some(mut child) = self.children.remove(&id) {
                cmds.push(child.teardown());
            }
        }
        self.current_child = None;
        cmds.push(self.hide());
        batch(cmds)
    }

    /// Switches the visible child.
    ///
    /// Showing the already current, visible child does not hide and re-show
    /// it; options are still re-applied. A modal target leaves the current
    /// child visible underneath and does not become the current child.
    pub fn show_child(
        &mut self,
        ctx: &AppContext,
        id: &str,
        opts: &ShowOptions,
    ) -> Result<Option<Cmd>, PageError> {
        if !self.children.contains_key(id) {
            return Err(PageError::UnknownChild { id: id.to_owned() });
        }
        let re_show = self.current_child.as_deref() == Some(id)
            && self.children.get(id).is_some_and(Self::is_visible)
            && !opts.modal;
        if re_show {
            if let Some(node) = self.children.get_mut(id) {
                node.set_options(&opts.params);
                if opts.flush {
                    node.flush();
                }
            }
            return Ok(None);
        }

        let mut cmds: Vec<Option<Cmd>> = Vec::new();
        if !opts.modal {
            if let Some(current) = self.current_child.take() {
                if current != id {
                    if let Some(node) = self.children.get_mut(&current) {
                        cmds.push(node.hide());
                    }
                }
            }
            self.current_child = Some(id.to_owned());
        }
        if let Some(node) = self.children.get_mut(id) {
            node.set_options(&opts.params);
            if opts.flush {
                node.flush();
            }
            cmds.push(if opts.modal {
                node.show_modal(ctx)
            } else {
                node.show(ctx)
            });
        }
        Ok(batch(cmds))
    }

    #[must_use]
    pub fn child(&self, id: &str) -> Option<&Self> {
        self.children.get(id)
    }

    #[must_use]
    pub fn child_mut(&mut self, id: &str) -> Option<&mut Self> {
        self.children.get_mut(id)
    }

    /// Ids of registered children, in no particular order.
    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    /// Id of a visible modal child, if one is open.
    #[must_use]
    pub fn visible_modal_child(&self) -> Option<&str> {
        self.children
            .iter()
            .find(|(_, node)| node.visible && node.modal)
            .map(|(id, _)| id.as_str())
    }
}
