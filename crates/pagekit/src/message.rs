//! Type-erased messages delivered to the model.
//!
//! Anything `Any + Send` can travel as a [`Message`]; receivers recover the
//! concrete type with [`Message::downcast`] or peek at it with
//! [`Message::downcast_ref`]. The runtime reserves a handful of built-in
//! messages for terminal events and control flow.

use std::any::Any;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::command::Cmd;

/// A type-erased message.
pub struct Message(Box<dyn Any + Send>);

impl Message {
    /// Wraps a concrete value.
    pub fn new<M: Any + Send + 'static>(msg: M) -> Self {
        Self(Box::new(msg))
    }

    /// Consumes the message and returns the concrete value if the type
    /// matches.
    #[must_use]
    pub fn downcast<M: Any + Send + 'static>(self) -> Option<M> {
        self.0.downcast::<M>().ok().map(|boxed| *boxed)
    }

    /// Borrows the concrete value if the type matches.
    #[must_use]
    pub fn downcast_ref<M: Any + Send + 'static>(&self) -> Option<&M> {
        self.0.downcast_ref::<M>()
    }

    /// Returns `true` when the message holds a value of type `M`.
    #[must_use]
    pub fn is<M: Any + Send + 'static>(&self) -> bool {
        self.0.is::<M>()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message").finish_non_exhaustive()
    }
}

/// Requests a graceful shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuitMsg;

/// Emitted when the user presses Ctrl+C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptMsg;

/// The terminal was resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSizeMsg {
    pub width: u16,
    pub height: u16,
}

/// The terminal gained focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusMsg;

/// The terminal lost focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurMsg;

/// A key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyMsg(pub KeyEvent);

impl KeyMsg {
    /// The pressed key code.
    #[must_use]
    pub const fn code(&self) -> KeyCode {
        self.0.code
    }

    /// The pressed character, if this was a plain character key.
    #[must_use]
    pub fn char(&self) -> Option<char> {
        match self.0.code {
            KeyCode::Char(c) => Some(c),
            _ => None,
        }
    }

    /// Whether the control modifier was held.
    #[must_use]
    pub fn ctrl(&self) -> bool {
        self.0.modifiers.contains(KeyModifiers::CONTROL)
    }
}

/// Internal: a set of commands to run concurrently.
pub(crate) struct BatchMsg(pub(crate) Vec<Cmd>);
