//! Raw terminal mode and alternate-screen handling, lifted directly from
//! the source's crossterm adapter. Rendering is not this crate's job: the
//! binary owns a `RenderSink` it notifies after draining the scheduler.

use anyhow::Result;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::stdout;
use std::time::Duration;

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    /// Block up to `timeout` for the next key event. `Ok(None)` on timeout.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>>;
}

pub struct CrosstermBackend {
    entered: bool,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard {
            backend: self,
            active: true,
        })
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.entered = true;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<KeyEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) => Ok(Some(key)),
            _ => Ok(None),
        }
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

/// RAII guard ensuring terminal state restoration even on early return or
/// panic.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
    active: bool,
}

impl<'a> Drop for TerminalGuard<'a> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.backend.leave();
        }
    }
}

impl<'a> std::ops::Deref for TerminalGuard<'a> {
    type Target = CrosstermBackend;

    fn deref(&self) -> &Self::Target {
        self.backend
    }
}

impl<'a> std::ops::DerefMut for TerminalGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.backend
    }
}

/// External rendering collaborator, stubbed out: the core has no drawing
/// logic, only a notification that a redraw is due after a tick mutated
/// state.
pub trait RenderSink {
    fn redraw_requested(&mut self);
}

pub struct NoopRenderSink;

impl RenderSink for NoopRenderSink {
    fn redraw_requested(&mut self) {}
}
