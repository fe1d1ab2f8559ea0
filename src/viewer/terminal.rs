//! Terminal I/O layer: raw mode guard and the status line.
//!
//! Pages go to the framebuffer; the terminal only supplies keyboard input
//! and carries the one-line status text, so the guard puts it in raw mode
//! with the cursor hidden and restores it on drop.

use crossterm::{
    cursor,
    event::{DisableMouseCapture, EnableMouseCapture},
    terminal, ExecutableCommand, QueueableCommand,
};
use std::io::{self, stdout, Write};

pub struct RawGuard {
    cleaned: bool,
}

impl RawGuard {
    pub fn enter() -> io::Result<Self> {
        let mut guard = Self { cleaned: false };
        guard.setup()?;
        Ok(guard)
    }

    /// (Re-)enter raw mode. Also used after a stop/continue cycle, when the
    /// shell has restored cooked mode behind our back.
    pub fn setup(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        let mut out = stdout();
        out.execute(cursor::Hide)?;
        out.execute(EnableMouseCapture)?;
        out.execute(terminal::Clear(terminal::ClearType::All))?;
        self.cleaned = false;
        Ok(())
    }

    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        let mut out = stdout();
        let _ = out.execute(DisableMouseCapture);
        let _ = out.execute(cursor::Show);
        let _ = terminal::disable_raw_mode();
        let _ = writeln!(out);
    }
}

impl Drop for RawGuard {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Draw a one-line status message at the terminal's home position.
pub fn draw_status(msg: &str) -> io::Result<()> {
    let mut out = stdout();
    out.queue(cursor::MoveTo(0, 0))?;
    out.queue(terminal::Clear(terminal::ClearType::CurrentLine))?;
    write!(out, "{msg}\r")?;
    out.flush()
}
