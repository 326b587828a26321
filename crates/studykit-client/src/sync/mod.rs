//! Offline-tolerant queue of mutating operations.
//!
//! Callers [`SyncQueue::enqueue`] unconditionally. The queue persists every
//! operation to a [`DurableStore`](studykit_core::DurableStore), probes the
//! backend's health endpoint, and replays pending operations in enqueue
//! order once the backend answers. Successful operations are removed;
//! failed ones stay, in place, for the next pass.

pub mod monitor;
pub mod notice;
pub mod operation;
pub mod probe;
pub mod queue;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

pub use monitor::SyncMonitor;
pub use notice::{LogNotices, Notice, NoticeSink};
pub use operation::PendingOperation;
pub use probe::{ConnectivityProbe, ConnectivityState};
pub use queue::{DrainOutcome, DrainReport, SkipReason, SyncQueue, SyncStatus};

/// Store key of the persisted pending-operation list.
pub const PENDING_KEY: &str = "pending_syncs";

/// Store key of the last successful sync time (Unix millis).
pub const LAST_SYNC_KEY: &str = "last_sync";

/// Options for a sync queue.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the backend API. Relative operation endpoints and the
    /// health path are joined onto it.
    pub api_base: String,
    /// Health endpoint path, relative to `api_base`.
    pub health_path: String,
    /// Time between connectivity probes.
    pub probe_interval: Duration,
    /// Hard timeout for one probe.
    pub probe_timeout: Duration,
    /// Timeout for each replayed operation.
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3000/api".to_string(),
            health_path: "/health".to_string(),
            probe_interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    /// Full URL of the health endpoint.
    pub fn health_url(&self) -> String {
        self.resolve(&self.health_path)
    }

    /// Resolve an operation endpoint: absolute `http(s)` URLs pass through,
    /// anything else is joined onto `api_base`.
    pub fn resolve(&self, endpoint: &str) -> String {
        let lower = endpoint.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.api_base.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_url_joins_base() {
        let cfg = SyncConfig {
            api_base: "https://study.example/api/".into(),
            ..Default::default()
        };
        assert_eq!(cfg.health_url(), "https://study.example/api/health");
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let cfg = SyncConfig::default();
        assert_eq!(
            cfg.resolve("/questions/7/progress"),
            "http://localhost:3000/api/questions/7/progress"
        );
        assert_eq!(cfg.resolve("cards"), "http://localhost:3000/api/cards");
        assert_eq!(
            cfg.resolve("https://other.example/x"),
            "https://other.example/x"
        );
    }
}
