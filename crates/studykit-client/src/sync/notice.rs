//! User-facing transient notices.
//!
//! How a notice is shown (toast, status line, log) is up to the host.

use tokio::sync::mpsc;

/// A one-off message for the user about connectivity or sync progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The backend is reachable again.
    ConnectionRestored { pending: usize },
    /// The backend became unreachable.
    OfflineMode,
    /// A drain pass delivered `count` operations.
    Synced { count: usize },
    /// A drain pass left `count` operations pending.
    SyncFailed { count: usize },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionRestored { pending: 0 } => write!(f, "Connection restored"),
            Self::ConnectionRestored { pending } => write!(
                f,
                "Connection restored. Syncing {pending} pending {}...",
                plural(*pending, "change", "changes")
            ),
            Self::OfflineMode => write!(
                f,
                "You are offline. Changes will be saved and synced when the connection is restored."
            ),
            Self::Synced { count } => write!(
                f,
                "{count} {} synced",
                plural(*count, "change", "changes")
            ),
            Self::SyncFailed { count } => write!(
                f,
                "{count} {} failed to sync and will be retried",
                plural(*count, "change", "changes")
            ),
        }
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

/// Receives notices from a sync queue.
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Emits notices through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotices;

impl NoticeSink for LogNotices {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::SyncFailed { .. } | Notice::OfflineMode => tracing::warn!("{notice}"),
            _ => tracing::info!("{notice}"),
        }
    }
}

impl NoticeSink for mpsc::UnboundedSender<Notice> {
    fn notify(&self, notice: Notice) {
        if self.send(notice).is_err() {
            tracing::debug!("notice receiver dropped");
        }
    }
}
