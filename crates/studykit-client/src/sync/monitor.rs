//! Background connectivity loop for a [`SyncQueue`].

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::queue::SyncQueue;

/// Network changes reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NetworkEvent {
    Online,
    Offline,
}

/// Handle to a running probe loop.
///
/// The loop probes immediately, then every `probe_interval`, and on host
/// network events. Coming online with pending operations triggers a drain.
///
/// The loop only exits between cycles: a probe or drain that has started
/// always runs to completion. Dropping the handle ends the loop the same
/// way, without waiting for it.
pub struct SyncMonitor {
    events: mpsc::UnboundedSender<NetworkEvent>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SyncMonitor {
    /// The host saw the network come back.
    pub fn network_online(&self) {
        self.send(NetworkEvent::Online);
    }

    /// The host saw the network go away.
    pub fn network_offline(&self) {
        self.send(NetworkEvent::Offline);
    }

    /// Stop probing. Waits for an in-flight probe or drain to finish; once
    /// this returns the loop will not touch the queue again.
    pub async fn stop(self) {
        let Self { shutdown, task, .. } = self;
        let _ = shutdown.send(());
        if let Err(e) = task.await {
            tracing::warn!("sync monitor task failed: {e}");
        }
        tracing::debug!("sync monitor stopped");
    }

    fn send(&self, event: NetworkEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!(?event, "sync monitor loop already ended");
        }
    }
}

impl SyncQueue {
    /// Start the probe loop on the current tokio runtime.
    pub fn start_monitor(&self) -> SyncMonitor {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let queue = self.clone();
        let task = tokio::spawn(run_monitor(queue, rx, shutdown_rx));
        SyncMonitor {
            events: tx,
            shutdown: shutdown_tx,
            task,
        }
    }
}

async fn run_monitor(
    queue: SyncQueue,
    mut events: mpsc::UnboundedReceiver<NetworkEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval(queue.config().probe_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // Branch bodies run outside the select, so shutdown is only seen
        // between cycles.
        tokio::select! {
            biased;

            // Fires on `stop` and when the handle is dropped.
            _ = &mut shutdown => break,

            _ = ticker.tick() => {
                let state = queue.check_connectivity().await;
                tracing::trace!(state = %state, "periodic probe");
            }
            event = events.recv() => match event {
                Some(NetworkEvent::Online) => {
                    tracing::debug!("host reports network online");
                    queue.network_online().await;
                }
                Some(NetworkEvent::Offline) => {
                    tracing::debug!("host reports network offline");
                    queue.network_offline();
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;
    use studykit_core::store::MemoryStore;
    use studykit_core::token::StaticToken;
    use studykit_core::transport::HttpMethod;

    use super::*;
    use crate::sync::notice::Notice;
    use crate::sync::probe::ConnectivityState;
    use crate::sync::testing::{Reply, ScriptedHttp};
    use crate::sync::SyncConfig;

    fn queue(http: Arc<ScriptedHttp>) -> (SyncQueue, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = SyncConfig {
            api_base: "http://api.test".into(),
            probe_interval: Duration::from_secs(30),
            ..Default::default()
        };
        let q = SyncQueue::open(
            config,
            Arc::new(MemoryStore::new()),
            http,
            Arc::new(StaticToken::new("tok")),
            Arc::new(tx),
        )
        .unwrap();
        (q, rx)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn probes_immediately_then_on_interval() {
        let http = Arc::new(ScriptedHttp::new());
        let (q, _notices) = queue(http.clone());
        let monitor = q.start_monitor();

        settle().await;
        assert_eq!(http.requests().len(), 1);
        assert_eq!(q.connectivity(), ConnectivityState::Online);

        time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(http.requests().len(), 2);

        monitor.stop().await;
        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(http.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn coming_online_drains_automatically() {
        let http = Arc::new(ScriptedHttp::new());
        http.set_health(Reply::NetworkError);
        let (q, mut notices) = queue(http.clone());
        let monitor = q.start_monitor();
        settle().await;
        assert_eq!(q.connectivity(), ConnectivityState::Offline);

        q.enqueue("/a", HttpMethod::Post, &json!({}));
        q.enqueue("/b", HttpMethod::Post, &json!({}));

        http.set_health(Reply::Status(200));
        monitor.network_online();
        settle().await;

        assert_eq!(q.pending_count(), 0);
        assert_eq!(http.operation_requests().len(), 2);

        let mut seen = Vec::new();
        while let Ok(n) = notices.try_recv() {
            seen.push(n);
        }
        assert_eq!(
            seen,
            vec![
                Notice::OfflineMode,
                Notice::ConnectionRestored { pending: 2 },
                Notice::Synced { count: 2 },
            ]
        );
        monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn offline_event_skips_probe() {
        let http = Arc::new(ScriptedHttp::new());
        let (q, _notices) = queue(http.clone());
        let monitor = q.start_monitor();
        settle().await;
        let probes = http.requests().len();

        monitor.network_offline();
        settle().await;
        assert_eq!(q.connectivity(), ConnectivityState::Offline);
        assert_eq!(http.requests().len(), probes);
        monitor.stop().await;
    }

    #[tokio::test]
    async fn stop_lets_a_running_drain_finish() {
        let http = Arc::new(ScriptedHttp::new());
        http.set_reply("http://api.test/b", Reply::Gated);
        let (q, _notices) = queue(http.clone());
        q.enqueue("/a", HttpMethod::Post, &json!({}));
        q.enqueue("/b", HttpMethod::Post, &json!({}));

        let monitor = q.start_monitor();
        while http.operation_requests().len() < 2 {
            tokio::task::yield_now().await;
        }

        let stopping = tokio::spawn(monitor.stop());
        settle().await;
        assert!(!stopping.is_finished());
        assert_eq!(q.pending_count(), 2);

        http.release();
        stopping.await.unwrap();

        assert_eq!(q.pending_count(), 0);
        assert!(q.last_sync().is_some());
        let a_sent = http
            .operation_requests()
            .iter()
            .filter(|r| r.url == "http://api.test/a")
            .count();
        assert_eq!(a_sent, 1);
        assert_eq!(
            q.process_pending_syncs().await,
            crate::sync::DrainOutcome::Skipped(crate::sync::SkipReason::Empty)
        );
    }

    #[tokio::test]
    async fn dropping_the_handle_does_not_cut_a_drain_short() {
        let http = Arc::new(ScriptedHttp::new());
        http.set_reply("http://api.test/a", Reply::Gated);
        let (q, mut notices) = queue(http.clone());
        q.enqueue("/a", HttpMethod::Post, &json!({}));

        let monitor = q.start_monitor();
        while http.operation_requests().is_empty() {
            tokio::task::yield_now().await;
        }
        drop(monitor);

        http.release();
        while q.pending_count() > 0 {
            tokio::task::yield_now().await;
        }
        settle().await;
        assert_eq!(notices.try_recv().unwrap(), Notice::Synced { count: 1 });
        assert_eq!(http.operation_requests().len(), 1);
    }

    #[tokio::test]
    async fn events_after_stop_are_ignored() {
        let http = Arc::new(ScriptedHttp::new());
        let (q, _notices) = queue(http.clone());
        let monitor = q.start_monitor();
        settle().await;
        let events = monitor.events.clone();
        monitor.stop().await;
        assert!(events.send(NetworkEvent::Online).is_err());
    }
}
