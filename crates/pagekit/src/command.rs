//! Commands: asynchronous units of work that may produce a message.
//!
//! Commands are how models perform side effects. The runtime spawns each
//! command on the async runtime and feeds the resulting [`Message`] (if any)
//! back into [`Model::update`](crate::program::Model::update). The
//! cancellable variants race a [`CancellationToken`] so that owners can
//! hard-cancel scheduled work instead of merely ignoring its result.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::message::{BatchMsg, Message, QuitMsg};

type BoxFuture = Pin<Box<dyn Future<Output = Option<Message>> + Send + 'static>>;

/// An asynchronous unit of work that may deliver a message back to the model.
pub struct Cmd(BoxFuture);

impl Cmd {
    /// Creates a command from a future resolving to an optional message.
    pub fn new<F>(fut: F) -> Self
    where
        F: Future<Output = Option<Message>> + Send + 'static,
    {
        Self(Box::pin(fut))
    }

    /// A command that resolves immediately with the given message.
    pub fn from_msg<M: Any + Send + 'static>(msg: M) -> Self {
        Self::new(async move { Some(Message::new(msg)) })
    }

    /// Wraps a command so it is abandoned, without producing a message, as
    /// soon as `token` is cancelled.
    #[must_use]
    pub fn cancellable(token: CancellationToken, cmd: Self) -> Self {
        Self::new(async move {
            tokio::select! {
                msg = cmd.0 => msg,
                () = token.cancelled() => None,
            }
        })
    }

    /// Runs the command to completion.
    pub async fn execute(self) -> Option<Message> {
        self.0.await
    }
}

impl fmt::Debug for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cmd").finish_non_exhaustive()
    }
}

/// Combines commands for concurrent execution.
///
/// `None` entries are skipped. Yields `None` when nothing remains, the sole
/// command when exactly one remains, and a batch otherwise.
#[must_use]
pub fn batch(cmds: Vec<Option<Cmd>>) -> Option<Cmd> {
    let mut cmds: Vec<Cmd> = cmds.into_iter().flatten().collect();
    match cmds.len() {
        0 => None,
        1 => cmds.pop(),
        _ => Some(Cmd::from_msg(BatchMsg(cmds))),
    }
}

/// A command that quits the program.
#[must_use]
pub fn quit() -> Cmd {
    Cmd::from_msg(QuitMsg)
}

/// Delivers `f()` as a message after the given delay.
pub fn tick<F, M>(delay: Duration, f: F) -> Cmd
where
    F: FnOnce() -> M + Send + 'static,
    M: Any + Send + 'static,
{
    Cmd::new(async move {
        tokio::time::sleep(delay).await;
        Some(Message::new(f()))
    })
}

/// Like [`tick`], but the sleep is abandoned without a message when `token`
/// is cancelled first.
pub fn tick_cancellable<F, M>(delay: Duration, token: CancellationToken, f: F) -> Cmd
where
    F: FnOnce() -> M + Send + 'static,
    M: Any + Send + 'static,
{
    Cmd::new(async move {
        tokio::select! {
            () = tokio::time::sleep(delay) => Some(Message::new(f())),
            () = token.cancelled() => None,
        }
    })
}
