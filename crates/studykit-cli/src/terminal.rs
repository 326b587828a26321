//! Local terminal handling: raw mode and the stdout display surface.

use std::io::Write;

use anyhow::{Context, Result};
use crossterm::{cursor, execute, terminal};
use studykit_client::{ConnectionStatus, TerminalHost};
use tracing::{debug, info};

/// RAII guard that restores the terminal to its original mode on drop.
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Enter raw terminal mode.
    pub fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw terminal mode")?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort restore; nothing more can be done from Drop.
        let _ = terminal::disable_raw_mode();
    }
}

/// Renders a terminal session onto this process's stdout.
pub struct StdoutHost {
    out: std::io::Stdout,
}

impl StdoutHost {
    pub fn new() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl TerminalHost for StdoutHost {
    fn write(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn clear(&mut self) {
        let _ = execute!(
            self.out,
            terminal::Clear(terminal::ClearType::All),
            cursor::MoveTo(0, 0)
        );
    }

    fn status_changed(&mut self, status: ConnectionStatus) {
        debug!(status = %status, "terminal status");
    }

    fn session_started(&mut self, session_id: &str) {
        info!(session_id = %session_id, "sandbox session started");
    }

    fn session_ended(&mut self) {
        info!("sandbox session ended");
    }
}
