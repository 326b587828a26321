//! Terminal wire protocol messages.
//!
//! Frames are JSON objects discriminated by a `type` field. The server sends
//! `session`, `output`, `error` and `unavailable`; the client sends `command`
//! and `signal`.

use serde::{Deserialize, Serialize};

/// Signal name carried by an interrupt request.
pub const SIGINT: &str = "SIGINT";

/// `sandboxType` value announcing a fully isolated sandbox.
pub const DOCKER_SANDBOX: &str = "docker";

/// A frame received from the terminal server, after tolerant parsing.
///
/// Parsing never fails: anything that is not a well-formed protocol frame
/// becomes [`ServerFrame::Raw`] and is shown as literal output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// A new session was started on the server.
    Session {
        session_id: String,
        sandbox_type: Option<String>,
    },
    /// Bytes to display verbatim.
    Output { data: String },
    /// A command-level error.
    Error { message: String },
    /// The sandbox is not available; the server runs in restricted mode.
    Unavailable { message: String },
    /// A well-formed JSON frame whose `type` this client does not know.
    Unknown { kind: String },
    /// Payload that is not a protocol frame at all.
    Raw(String),
}

impl ServerFrame {
    /// Sandbox availability announced by a `session` frame, if this is one.
    pub fn sandbox(&self) -> Option<SandboxAvailability> {
        match self {
            Self::Session { sandbox_type, .. } => {
                Some(SandboxAvailability::from_sandbox_type(sandbox_type.as_deref()))
            }
            Self::Unavailable { .. } => Some(SandboxAvailability::Restricted),
            _ => None,
        }
    }
}

/// A frame sent from the client to the terminal server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientFrame {
    /// Submit one full command line.
    Command { data: String },
    /// Request delivery of a signal to the running command.
    Signal { data: String },
}

impl ClientFrame {
    pub fn command(line: impl Into<String>) -> Self {
        Self::Command { data: line.into() }
    }

    pub fn interrupt() -> Self {
        Self::Signal {
            data: SIGINT.to_string(),
        }
    }
}

/// Whether the remote command sandbox is fully isolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SandboxAvailability {
    /// No capability announcement received yet on this connection.
    #[default]
    Unknown,
    /// Full sandbox engine available.
    Available,
    /// Restricted, whitelist-only mode.
    Restricted,
}

impl SandboxAvailability {
    /// Map a `sandboxType` announcement to an availability.
    pub fn from_sandbox_type(sandbox_type: Option<&str>) -> Self {
        match sandbox_type {
            Some(DOCKER_SANDBOX) => Self::Available,
            _ => Self::Restricted,
        }
    }
}

impl std::fmt::Display for SandboxAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Available => "available",
            Self::Restricted => "restricted",
        };
        f.write_str(s)
    }
}
