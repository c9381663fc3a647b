//! Thin crossterm adapter: raw-mode/alternate-screen lifecycle, key event
//! translation into the wire's string format, and terminal-size-to-frame
//! conversion for the pane tree's root frame. No drawing logic lives here;
//! a real renderer is an external collaborator behind [`RenderSink`].

pub mod backend;
pub mod key_event;

pub use backend::{CrosstermBackend, NoopRenderSink, RenderSink, TerminalBackend, TerminalGuard};
pub use key_event::key_event_to_string;

use anyhow::Result;
use badred_pane::Frame;

/// Query the current terminal size and express it as the pane tree's root
/// frame, anchored at the origin.
pub fn root_frame() -> Result<Frame> {
    let (cols, rows) = crossterm::terminal::size()?;
    Ok(Frame::new(0, 0, rows, cols))
}
