//! Interactive terminal session against a remote command sandbox.
//!
//! [`TerminalSession`] is the synchronous state machine: it applies transport
//! events and keystrokes in arrival order and tells the caller which frames
//! to send. [`spawn_session`] drives one on a tokio task, owning the
//! transport and the reconnect delay, and hands back a [`SessionHandle`].

pub mod driver;
pub mod host;
pub mod line_buffer;
pub mod session;

use std::time::Duration;

pub use driver::{spawn_session, SessionHandle};
pub use host::TerminalHost;
pub use line_buffer::LineBuffer;
pub use session::{ConnectionStatus, TerminalSession};

/// Local prompt drawn by the client.
pub const DEFAULT_PROMPT: &str = "$ ";

/// Options for a terminal session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Duplex endpoint (`ws://` or `wss://`). `None` means the host has no
    /// terminal backend configured.
    pub endpoint: Option<String>,
    /// Pause between closing the old transport and opening a new one on
    /// manual reconnect.
    pub reconnect_delay: Duration,
    /// Prompt redrawn after errors, interrupts and clears.
    pub prompt: String,
    /// Line shown when the transport opens.
    pub greeting: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            reconnect_delay: Duration::from_millis(100),
            prompt: DEFAULT_PROMPT.to_string(),
            greeting: "\x1b[32mConnected to sandbox terminal.\x1b[0m\r\n".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Default::default()
        }
    }
}
