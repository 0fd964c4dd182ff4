//! Program runtime: terminal lifecycle, event loop, rendering.
//!
//! A [`Program`] drives a [`Model`] in the Elm style: terminal events and
//! command results arrive as [`Message`]s, `update` produces follow-up
//! commands, and frames render on a fixed cadence with string diffing so an
//! unchanged view costs nothing. Commands run as tracked tasks raced against
//! a shutdown token, so quitting never leaves work behind.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{
    self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEventKind, KeyModifiers,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::command::Cmd;
use crate::message::{
    BatchMsg, BlurMsg, FocusMsg, InterruptMsg, KeyMsg, Message, QuitMsg, WindowSizeMsg,
};

/// Errors from running a program.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("terminal io error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to {action} raw mode: {source}")]
    RawMode {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to {action} the alternate screen: {source}")]
    AltScreen {
        action: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to render frame: {0}")]
    Render(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Application driven by the runtime.
pub trait Model: Send + 'static {
    /// Command to run at startup.
    fn init(&self) -> Option<Cmd>;

    /// State transition for one message; may produce a follow-up command.
    fn update(&mut self, msg: Message) -> Option<Cmd>;

    /// Renders the full frame.
    fn view(&self) -> String;
}

/// Runtime options.
#[derive(Debug, Clone, Copy)]
pub struct ProgramOptions {
    /// Run in the alternate screen buffer.
    pub alt_screen: bool,
    /// Ask the terminal to report focus changes.
    pub report_focus: bool,
    /// Frame rate, clamped to 1..=120.
    pub fps: u16,
}

impl Default for ProgramOptions {
    fn default() -> Self {
        Self {
            alt_screen: true,
            report_focus: true,
            fps: 30,
        }
    }
}

fn frame_duration(fps: u16) -> Duration {
    let fps = fps.clamp(1, 120);
    Duration::from_millis(1000 / u64::from(fps))
}

/// Drives a [`Model`]: terminal setup, event loop, rendering, teardown.
pub struct Program<M: Model> {
    model: M,
    options: ProgramOptions,
}

impl<M: Model> Program<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            options: ProgramOptions::default(),
        }
    }

    #[must_use]
    pub const fn with_alt_screen(mut self, on: bool) -> Self {
        self.options.alt_screen = on;
        self
    }

    #[must_use]
    pub const fn with_report_focus(mut self, on: bool) -> Self {
        self.options.report_focus = on;
        self
    }

    #[must_use]
    pub const fn with_fps(mut self, fps: u16) -> Self {
        self.options.fps = fps;
        self
    }

    /// Runs the program to completion and returns the final model.
    ///
    /// The terminal is restored in reverse setup order even when the event
    /// loop fails.
    pub async fn run(mut self) -> Result<M> {
        enable_raw_mode().map_err(|source| Error::RawMode {
            action: "enable",
            source,
        })?;
        let mut stdout = io::stdout();
        if self.options.alt_screen {
            execute!(stdout, EnterAlternateScreen).map_err(|source| Error::AltScreen {
                action: "enter",
                source,
            })?;
        }
        execute!(stdout, Hide)?;
        if self.options.report_focus {
            execute!(stdout, EnableFocusChange)?;
        }

        let result = self.event_loop(&mut stdout).await;

        if self.options.report_focus {
            let _ = execute!(stdout, DisableFocusChange);
        }
        let _ = execute!(stdout, Show);
        if self.options.alt_screen {
            let _ = execute!(stdout, LeaveAlternateScreen);
        }
        let _ = disable_raw_mode();

        result.map(|()| self.model)
    }

    async fn event_loop(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        let (tx, mut rx) = mpsc::channel::<Message>(256);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        spawn_event_listener(tx.clone(), cancel.clone());

        // Models learn their size from resize events; seed the first one.
        if let Ok((width, height)) = crossterm::terminal::size() {
            let _ = tx.send(Message::new(WindowSizeMsg { width, height })).await;
        }

        if let Some(cmd) = self.model.init() {
            handle_command(&tracker, &cancel, tx.clone(), cmd);
        }

        let mut last_view = String::new();
        self.render(stdout, &mut last_view)?;

        let mut frames = tokio::time::interval(frame_duration(self.options.fps));
        frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let exit = loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let Some(msg) = maybe else { break Ok(()) };
                    if msg.is::<QuitMsg>() || msg.is::<InterruptMsg>() {
                        break Ok(());
                    }
                    if msg.is::<BatchMsg>() {
                        if let Some(BatchMsg(cmds)) = msg.downcast::<BatchMsg>() {
                            for cmd in cmds {
                                handle_command(&tracker, &cancel, tx.clone(), cmd);
                            }
                        }
                        continue;
                    }
                    if let Some(cmd) = self.model.update(msg) {
                        handle_command(&tracker, &cancel, tx.clone(), cmd);
                    }
                }
                _ = frames.tick() => {
                    if let Err(err) = self.render(stdout, &mut last_view) {
                        break Err(err);
                    }
                }
            }
        };

        cancel.cancel();
        tracker.close();
        let _ = tokio::time::timeout(Duration::from_secs(5), tracker.wait()).await;
        exit
    }

    fn render(&self, stdout: &mut io::Stdout, last_view: &mut String) -> Result<()> {
        let view = self.model.view();
        if view == *last_view {
            return Ok(());
        }
        queue!(stdout, MoveTo(0, 0), Clear(ClearType::All)).map_err(Error::Render)?;
        for (row, line) in view.lines().enumerate() {
            let row = u16::try_from(row).unwrap_or(u16::MAX);
            queue!(stdout, MoveTo(0, row)).map_err(Error::Render)?;
            stdout.write_all(line.as_bytes()).map_err(Error::Render)?;
        }
        stdout.flush().map_err(Error::Render)?;
        *last_view = view;
        Ok(())
    }
}

// Terminal events are read on a plain thread; crossterm's poll/read are
// blocking and must stay off the async workers.
fn spawn_event_listener(tx: mpsc::Sender<Message>, cancel: CancellationToken) {
    thread::spawn(move || loop {
        if cancel.is_cancelled() {
            return;
        }
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                tracing::warn!(error = %err, "terminal event poll failed");
                return;
            }
        }
        let Ok(ev) = event::read() else { return };
        let msg = match ev {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    Message::new(InterruptMsg)
                } else {
                    Message::new(KeyMsg(key))
                }
            }
            Event::Resize(width, height) => Message::new(WindowSizeMsg { width, height }),
            Event::FocusGained => Message::new(FocusMsg),
            Event::FocusLost => Message::new(BlurMsg),
            _ => continue,
        };
        if tx.blocking_send(msg).is_err() {
            return;
        }
    });
}

fn handle_command(
    tracker: &TaskTracker,
    cancel: &CancellationToken,
    tx: mpsc::Sender<Message>,
    cmd: Cmd,
) {
    let token = cancel.clone();
    tracker.spawn(async move {
        tokio::select! {
            out = cmd.execute() => {
                if let Some(msg) = out {
                    let _ = tx.send(msg).await;
                }
            }
            () = token.cancelled() => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Options and pacing
    // =========================================================================

    #[test]
    fn frame_duration_clamps_fps() {
        assert_eq!(frame_duration(0), Duration::from_millis(1000));
        assert_eq!(frame_duration(50), Duration::from_millis(20));
        assert_eq!(frame_duration(240), frame_duration(120));
    }

    #[test]
    fn default_options() {
        let opts = ProgramOptions::default();
        assert!(opts.alt_screen);
        assert!(opts.report_focus);
        assert_eq!(opts.fps, 30);
    }

    // =========================================================================
    // Error rendering
    // =========================================================================

    #[test]
    fn error_messages_name_the_failed_action() {
        let err = Error::RawMode {
            action: "enable",
            source: io::Error::other("boom"),
        };
        assert_eq!(err.to_string(), "failed to enable raw mode: boom");

        let err = Error::AltScreen {
            action: "enter",
            source: io::Error::other("nope"),
        };
        assert!(err.to_string().contains("alternate screen"));
    }

    // =========================================================================
    // Command dispatch
    // =========================================================================

    #[tokio::test]
    async fn command_results_flow_back_over_the_channel() {
        let (tx, mut rx) = mpsc::channel::<Message>(8);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        handle_command(&tracker, &cancel, tx, Cmd::from_msg(QuitMsg));
        tracker.close();
        tracker.wait().await;
        let msg = rx.recv().await.expect("message delivered");
        assert!(msg.is::<QuitMsg>());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_inflight_commands() {
        let (tx, mut rx) = mpsc::channel::<Message>(8);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let slow = crate::command::tick(Duration::from_secs(3600), || QuitMsg);
        handle_command(&tracker, &cancel, tx, slow);
        cancel.cancel();
        tracker.close();
        tracker.wait().await;
        assert!(rx.try_recv().is_err(), "cancelled command produced no message");
    }
}
