//! Building blocks for dashboard-style terminal applications.
//!
//! The crate has two halves that meet in the middle:
//!
//! - A small Elm-style runtime: [`Program`] drives a [`Model`] whose
//!   [`update`](Model::update) consumes type-erased [`Message`]s and emits
//!   async [`Cmd`]s.
//! - Dashboard machinery: a [`PageNode`] tree with strict show/hide
//!   lifecycle and render caching, a [`PollingTable`] state machine that
//!   schedules server fetches without ever overlapping them, a
//!   [`CounterTracker`] for deriving rates and ETAs from sampled counters,
//!   and a server-paginated [`DataTable`] widget.
//!
//! Pages own their polling and counter state by composition and talk to the
//! shell exclusively through messages; the shell owns the tree plus a shared
//! [`AppContext`] carrying tab visibility and the auto-refresh rate.

pub mod command;
pub mod counter;
pub mod message;
pub mod page;
pub mod poll;
pub mod program;
pub mod table;

pub use command::{batch, quit, tick, tick_cancellable, Cmd};
pub use counter::{humanize, sparkline, CounterTracker, Eta};
pub use message::{BlurMsg, FocusMsg, InterruptMsg, KeyMsg, Message, QuitMsg, WindowSizeMsg};
pub use page::{AppContext, Page, PageError, PageNode, ShowOptions};
pub use poll::{
    FetchQuery, LoadResult, PollingTable, RefreshCtx, RefreshPlan, TablePage, SETTLE_DELAY,
};
pub use program::{Error, Model, Program, ProgramOptions};
pub use table::{pad, Column, DataTable, Row};
