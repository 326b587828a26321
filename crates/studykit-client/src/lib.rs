//! studykit-client: the two stateful components of studykit.
//!
//! - [`terminal`]: an interactive terminal session against a remote command
//!   sandbox. Raw keystrokes are folded into a local line buffer and
//!   submitted as whole `command` frames over a persistent duplex
//!   connection; server frames are rendered to a host-supplied display.
//! - [`sync`]: an offline-tolerant queue of mutating HTTP operations. Callers
//!   enqueue unconditionally; the queue persists, probes connectivity, and
//!   replays pending operations once the backend is reachable.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use studykit_client::sync::{LogNotices, SyncConfig, SyncQueue};
//! use studykit_client::transport::ReqwestTransport;
//! use studykit_core::{FileStore, HttpMethod, StaticToken};
//!
//! # async fn example() -> studykit_core::StudyResult<()> {
//! let queue = SyncQueue::open(
//!     SyncConfig::default(),
//!     Arc::new(FileStore::new("/tmp/studykit")),
//!     Arc::new(ReqwestTransport::new()?),
//!     Arc::new(StaticToken::new("token")),
//!     Arc::new(LogNotices),
//! )?;
//!
//! queue.enqueue("/progress", HttpMethod::Post, &serde_json::json!({"card": 7}));
//! let monitor = queue.start_monitor();
//! // ...
//! monitor.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod sync;
pub mod terminal;
pub mod transport;

// Re-export primary public types.
pub use sync::{ConnectivityState, DrainOutcome, Notice, PendingOperation, SyncConfig, SyncQueue};
pub use terminal::{
    spawn_session, ConnectionStatus, SessionConfig, SessionHandle, TerminalHost, TerminalSession,
};
pub use transport::{ReqwestTransport, WebSocketConnector};

// Re-export studykit-core error types for convenience.
pub use studykit_core::{StudyError, StudyResult};
