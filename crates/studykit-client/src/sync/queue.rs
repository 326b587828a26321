//! The sync queue proper.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use studykit_core::error::{StudyError, StudyResult};
use studykit_core::ids::now_millis;
use studykit_core::store::DurableStore;
use studykit_core::token::TokenSource;
use studykit_core::transport::{HttpMethod, HttpRequest, HttpTransport};
use tracing::{debug, info, warn};

use super::notice::{Notice, NoticeSink};
use super::operation::PendingOperation;
use super::probe::{ConnectivityProbe, ConnectivityState};
use super::{SyncConfig, LAST_SYNC_KEY, PENDING_KEY};

/// Why a drain pass did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoToken,
    Empty,
    Offline,
    AlreadyRunning,
}

/// Result of one completed drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Skipped(SkipReason),
    Completed(DrainReport),
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    pub connectivity: ConnectivityState,
    pub pending: usize,
    /// Unix millis of the last pass that delivered anything.
    pub last_sync: Option<i64>,
}

struct QueueState {
    pending: Vec<PendingOperation>,
    connectivity: ConnectivityState,
    /// Last settled probe result (`Online` or `Offline`); `None` before the first.
    settled: Option<ConnectivityState>,
    last_sync: Option<i64>,
    /// The last write of `pending` to the store failed.
    unsaved: bool,
}

struct Inner {
    config: SyncConfig,
    store: Arc<dyn DurableStore>,
    http: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenSource>,
    notices: Arc<dyn NoticeSink>,
    probe: ConnectivityProbe,
    state: Mutex<QueueState>,
    drain_lock: tokio::sync::Mutex<()>,
}

/// Durable, at-least-once queue of mutating requests.
///
/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct SyncQueue {
    inner: Arc<Inner>,
}

impl SyncQueue {
    /// Open the queue, rehydrating the pending list and last-sync time from
    /// `store`.
    pub fn open(
        config: SyncConfig,
        store: Arc<dyn DurableStore>,
        http: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenSource>,
        notices: Arc<dyn NoticeSink>,
    ) -> StudyResult<Self> {
        let pending = load_pending(store.as_ref())?;
        let last_sync = store
            .get(LAST_SYNC_KEY)?
            .and_then(|v| v.trim().parse::<i64>().ok());

        info!(pending = pending.len(), "sync queue opened");

        let probe = ConnectivityProbe::new(http.clone(), config.health_url(), config.probe_timeout);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                store,
                http,
                tokens,
                notices,
                probe,
                state: Mutex::new(QueueState {
                    pending,
                    connectivity: ConnectivityState::Checking,
                    settled: None,
                    last_sync,
                    unsaved: false,
                }),
                drain_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Queue a mutation. Never fails and never waits on the network.
    ///
    /// Returns the operation id.
    pub fn enqueue(&self, endpoint: &str, method: HttpMethod, body: &serde_json::Value) -> String {
        self.enqueue_operation(PendingOperation::new(endpoint, method, body.to_string()))
    }

    /// Queue an already-built operation. Re-submitting an operation whose id
    /// is already pending does not duplicate it.
    pub fn enqueue_operation(&self, operation: PendingOperation) -> String {
        let id = operation.id.clone();
        let mut state = self.state();
        self.reload_pending(&mut state);

        if state.pending.iter().any(|op| op.id == id) {
            debug!(id = %id, "operation already queued");
            return id;
        }

        info!(id = %id, endpoint = %operation.endpoint, method = %operation.method, "queued operation");
        state.pending.push(operation);
        self.persist_pending(&mut state);
        id
    }

    /// Pending operations in enqueue order, as currently persisted.
    pub fn pending(&self) -> Vec<PendingOperation> {
        let mut state = self.state();
        self.reload_pending(&mut state);
        state.pending.clone()
    }

    pub fn pending_count(&self) -> usize {
        let mut state = self.state();
        self.reload_pending(&mut state);
        state.pending.len()
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.state().connectivity
    }

    pub fn last_sync(&self) -> Option<i64> {
        self.state().last_sync
    }

    pub fn status(&self) -> SyncStatus {
        let mut state = self.state();
        self.reload_pending(&mut state);
        SyncStatus {
            connectivity: state.connectivity,
            pending: state.pending.len(),
            last_sync: state.last_sync,
        }
    }

    /// Probe the backend and update connectivity. When this moves the queue
    /// online and operations are pending, a drain runs before returning.
    pub async fn check_connectivity(&self) -> ConnectivityState {
        let came_online = self.probe_and_settle().await;
        if came_online && self.pending_count() > 0 {
            debug!("connectivity restored, draining pending operations");
            self.process_pending_syncs().await;
        }
        self.connectivity()
    }

    /// The host saw the network come back: probe now.
    pub async fn network_online(&self) -> ConnectivityState {
        self.check_connectivity().await
    }

    /// The host saw the network go away: go offline without probing.
    pub fn network_offline(&self) {
        self.settle(ConnectivityState::Offline);
    }

    /// Deliver every currently pending operation once.
    ///
    /// Requires a bearer token and a non-empty queue, and re-probes
    /// connectivity first. Operations enqueued while the pass runs wait for
    /// the next one. Each operation is attempted independently; successes
    /// are removed, failures stay pending in their original order.
    pub async fn process_pending_syncs(&self) -> DrainOutcome {
        let Ok(_guard) = self.inner.drain_lock.try_lock() else {
            debug!("drain already running");
            return DrainOutcome::Skipped(SkipReason::AlreadyRunning);
        };

        let Some(token) = self.inner.tokens.bearer_token() else {
            debug!("no bearer token, skipping drain");
            return DrainOutcome::Skipped(SkipReason::NoToken);
        };

        if self.pending_count() == 0 {
            return DrainOutcome::Skipped(SkipReason::Empty);
        }

        self.probe_and_settle().await;
        if self.connectivity() != ConnectivityState::Online {
            debug!("backend unreachable, skipping drain");
            return DrainOutcome::Skipped(SkipReason::Offline);
        }

        let snapshot = self.pending();
        info!(count = snapshot.len(), "draining pending operations");

        let mut delivered: HashSet<String> = HashSet::new();
        let mut failed = 0usize;

        for op in &snapshot {
            let request = HttpRequest::new(op.method, self.inner.config.resolve(&op.endpoint))
                .bearer(&token)
                .json_body(op.body.clone())
                .timeout(self.inner.config.request_timeout);

            match self.inner.http.send(request).await {
                Ok(response) if response.is_success() => {
                    debug!(id = %op.id, status = response.status, "operation delivered");
                    delivered.insert(op.id.clone());
                }
                Ok(response) => {
                    warn!(id = %op.id, endpoint = %op.endpoint, status = response.status, "operation rejected");
                    failed += 1;
                }
                Err(e) => {
                    warn!(id = %op.id, endpoint = %op.endpoint, "operation failed: {e}");
                    failed += 1;
                }
            }
        }

        let succeeded = delivered.len();
        {
            let mut state = self.state();
            if succeeded > 0 {
                // Other handles on the same store may have queued more since
                // the snapshot was taken.
                self.reload_pending(&mut state);
                state.pending.retain(|op| !delivered.contains(&op.id));
                self.persist_pending(&mut state);

                let now = now_millis();
                state.last_sync = Some(now);
                if let Err(e) = self.inner.store.set(LAST_SYNC_KEY, &now.to_string()) {
                    warn!("failed to persist last sync time: {e}");
                }
            }
        }

        info!(succeeded, failed, "drain finished");
        if succeeded > 0 {
            self.inner.notices.notify(Notice::Synced { count: succeeded });
        }
        if failed > 0 {
            self.inner.notices.notify(Notice::SyncFailed { count: failed });
        }

        DrainOutcome::Completed(DrainReport { succeeded, failed })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Run one probe cycle. Returns `true` if this moved the queue online
    /// from offline or from the initial unknown state.
    async fn probe_and_settle(&self) -> bool {
        self.state().connectivity = ConnectivityState::Checking;
        let online = self.inner.probe.check().await;
        self.settle(if online {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        })
    }

    /// Record a settled connectivity result and emit transition notices.
    fn settle(&self, now: ConnectivityState) -> bool {
        let (previous, pending) = {
            let mut state = self.state();
            let previous = state.settled;
            state.connectivity = now;
            state.settled = Some(now);
            (previous, state.pending.len())
        };

        if previous == Some(now) {
            return false;
        }

        info!(from = ?previous, to = %now, "connectivity changed");
        match (previous, now) {
            (Some(ConnectivityState::Offline), ConnectivityState::Online) => {
                self.inner
                    .notices
                    .notify(Notice::ConnectionRestored { pending });
            }
            (_, ConnectivityState::Offline) => {
                self.inner.notices.notify(Notice::OfflineMode);
            }
            _ => {}
        }

        now == ConnectivityState::Online
    }

    /// Replace the in-memory list with the persisted one. Operations that
    /// were never written because a persist failed are kept at the end.
    fn reload_pending(&self, state: &mut QueueState) {
        let mut stored = match load_pending(self.inner.store.as_ref()) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("failed to reload pending operations: {e}");
                return;
            }
        };

        if state.unsaved {
            let known: HashSet<&str> = stored.iter().map(|op| op.id.as_str()).collect();
            let unsaved: Vec<PendingOperation> = state
                .pending
                .iter()
                .filter(|op| !known.contains(op.id.as_str()))
                .cloned()
                .collect();
            stored.extend(unsaved);
        }
        state.pending = stored;
    }

    fn persist_pending(&self, state: &mut QueueState) {
        let result = serde_json::to_string(&state.pending)
            .map_err(StudyError::from)
            .and_then(|json| self.inner.store.set(PENDING_KEY, &json));
        state.unsaved = result.is_err();
        if let Err(e) = result {
            warn!(pending = state.pending.len(), "failed to persist pending operations: {e}");
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Read the persisted pending list. A missing key is an empty queue; an
/// unreadable value is logged and treated as empty.
fn load_pending(store: &dyn DurableStore) -> StudyResult<Vec<PendingOperation>> {
    let Some(json) = store.get(PENDING_KEY)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str::<Vec<PendingOperation>>(&json) {
        Ok(mut pending) => {
            let mut seen = HashSet::new();
            pending.retain(|op| seen.insert(op.id.clone()));
            Ok(pending)
        }
        Err(e) => {
            warn!("discarding unreadable pending operation list: {e}");
            Ok(Vec::new())
        }
    }
}
