//! Terminal session state machine.
//!
//! Owns the connection status, the sandbox availability announced for the
//! current connection, and the local line buffer. It performs no I/O of its
//! own: transport events and keystrokes are fed in, display output goes to
//! the [`TerminalHost`], and frames to send are returned to the caller.

use studykit_core::codec::parse_server_frame;
use studykit_core::messages::{ClientFrame, SandboxAvailability, ServerFrame};
use studykit_core::transport::TransportEvent;
use tracing::{debug, info, warn};

use super::host::TerminalHost;
use super::line_buffer::LineBuffer;
use super::SessionConfig;

const KEY_ENTER: char = '\r';
const KEY_BACKSPACE: char = '\x7f';
const KEY_INTERRUPT: char = '\x03';

/// Message recorded when the transport reports an error. Transports do not
/// expose structured detail.
pub const CONNECTION_ERROR_MESSAGE: &str = "Connection error";

/// Message shown when no endpoint is configured.
pub const NO_ENDPOINT_MESSAGE: &str = "Terminal backend is not configured for this deployment.";

/// Connection health, shown by the host as a status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Connected,
    Disconnected,
    Error,
    Unavailable,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
            Self::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// One logical remote shell.
pub struct TerminalSession<H: TerminalHost> {
    config: SessionConfig,
    host: H,
    status: ConnectionStatus,
    sandbox: SandboxAvailability,
    line: LineBuffer,
    session_id: Option<String>,
    last_error: Option<String>,
}

impl<H: TerminalHost> TerminalSession<H> {
    pub fn new(config: SessionConfig, host: H) -> Self {
        Self {
            config,
            host,
            status: ConnectionStatus::Connecting,
            sandbox: SandboxAvailability::Unknown,
            line: LineBuffer::new(),
            session_id: None,
            last_error: None,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn sandbox(&self) -> SandboxAvailability {
        self.sandbox
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The line typed so far.
    pub fn pending_line(&self) -> String {
        self.line.as_string()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Prepare a new connection attempt.
    ///
    /// Returns the endpoint to open, or `None` when no endpoint is
    /// configured, in which case the session is now `Unavailable` and no
    /// connection must be attempted.
    pub fn begin_connect(&mut self) -> Option<String> {
        let endpoint = self
            .config
            .endpoint
            .clone()
            .filter(|e| !e.trim().is_empty());

        self.sandbox = SandboxAvailability::Unknown;
        self.session_id = None;
        self.last_error = None;
        self.line.clear();

        match endpoint {
            Some(endpoint) => {
                info!(endpoint = %endpoint, "connecting terminal session");
                self.set_status(ConnectionStatus::Connecting);
                Some(endpoint)
            }
            None => {
                warn!("no terminal endpoint configured");
                self.set_status(ConnectionStatus::Unavailable);
                self.last_error = Some(NO_ENDPOINT_MESSAGE.to_string());
                self.host
                    .write(&format!("\x1b[33m{NO_ENDPOINT_MESSAGE}\x1b[0m\r\n"));
                None
            }
        }
    }

    /// Apply one transport event.
    pub fn apply_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => {
                info!("terminal transport open");
                self.set_status(ConnectionStatus::Connected);
                let greeting = self.config.greeting.clone();
                self.host.write(&greeting);
            }
            TransportEvent::Message(payload) => {
                self.apply_frame(parse_server_frame(&payload));
            }
            TransportEvent::Error(detail) => {
                warn!(detail = %detail, "terminal transport error");
                self.last_error = Some(CONNECTION_ERROR_MESSAGE.to_string());
                self.set_status(ConnectionStatus::Error);
                self.host
                    .write(&format!("\r\n\x1b[31m{CONNECTION_ERROR_MESSAGE}\x1b[0m\r\n"));
            }
            TransportEvent::Closed => {
                info!("terminal transport closed");
                self.line.clear();
                self.set_status(ConnectionStatus::Disconnected);
                self.host.write("\r\n\x1b[33mDisconnected from terminal.\x1b[0m\r\n");
                self.host.session_ended();
            }
        }
    }

    /// Apply one parsed server frame.
    pub fn apply_frame(&mut self, frame: ServerFrame) {
        if let Some(sandbox) = frame.sandbox() {
            self.sandbox = sandbox;
        }

        match frame {
            ServerFrame::Session { session_id, .. } => {
                info!(session_id = %session_id, sandbox = %self.sandbox, "terminal session started");
                self.host.session_started(&session_id);
                self.session_id = Some(session_id);
            }
            ServerFrame::Output { data } => self.host.write(&data),
            ServerFrame::Error { message } => {
                debug!(message = %message, "command error");
                let prompt = self.config.prompt.clone();
                self.host
                    .write(&format!("\r\n\x1b[31mError: {message}\x1b[0m\r\n{prompt}"));
            }
            ServerFrame::Unavailable { message } => {
                info!(message = %message, "sandbox unavailable, restricted mode");
                self.host.write(&format!("\x1b[33m{message}\x1b[0m\r\n"));
            }
            ServerFrame::Unknown { kind } => {
                debug!(kind = %kind, "ignoring unknown terminal frame");
            }
            ServerFrame::Raw(payload) => self.host.write(&payload),
        }
    }

    /// Handle one keystroke. Returns the frame to send, if any.
    ///
    /// Keystrokes are ignored unless the transport is open.
    pub fn handle_key(&mut self, key: char) -> Option<ClientFrame> {
        if self.status != ConnectionStatus::Connected {
            debug!(key = ?key, status = %self.status, "keystroke ignored, not connected");
            return None;
        }

        match key {
            KEY_ENTER => {
                let line = self.line.take();
                self.host.write("\r\n");
                debug!(line = %line, "submitting command");
                Some(ClientFrame::command(line))
            }
            KEY_BACKSPACE => {
                if self.line.backspace() {
                    self.host.write("\x08 \x08");
                }
                None
            }
            KEY_INTERRUPT => {
                // The prompt is redrawn before the server confirms the interrupt.
                self.line.clear();
                let prompt = self.config.prompt.clone();
                self.host.write(&format!("^C\r\n{prompt}"));
                Some(ClientFrame::interrupt())
            }
            c if (c as u32) >= 32 => {
                self.line.push(c);
                let mut buf = [0u8; 4];
                self.host.write(c.encode_utf8(&mut buf));
                None
            }
            _ => None,
        }
    }

    /// Handle a chunk of input (one key event or a paste), key by key.
    pub fn handle_input(&mut self, input: &str) -> Vec<ClientFrame> {
        input.chars().filter_map(|c| self.handle_key(c)).collect()
    }

    /// Wipe the display and redraw the prompt. Leaves the transport and the
    /// line buffer alone.
    pub fn clear(&mut self) {
        self.host.clear();
        let prompt = self.config.prompt.clone();
        self.host.write(&prompt);
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            debug!(from = %self.status, to = %status, "connection status");
            self.status = status;
            self.host.status_changed(status);
        }
    }
}
