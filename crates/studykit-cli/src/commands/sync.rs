//! `studykit sync`: inspect and drive the offline sync queue.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use studykit_client::sync::{ConnectivityProbe, NoticeSink, SkipReason};
use studykit_client::{DrainOutcome, Notice, ReqwestTransport, SyncConfig, SyncQueue};
use studykit_core::store::{DurableStore, FileStore};
use studykit_core::token::{StaticToken, StoredToken, TokenSource};
use studykit_core::transport::{HttpMethod, HttpTransport};
use tracing::info;

/// Prints notices on stderr so they don't mix with command output.
struct ConsoleNotices;

impl NoticeSink for ConsoleNotices {
    fn notify(&self, notice: Notice) {
        eprintln!("* {notice}");
    }
}

/// Everything a sync subcommand needs.
pub struct SyncContext {
    pub config: SyncConfig,
    pub store: Arc<dyn DurableStore>,
    pub http: Arc<dyn HttpTransport>,
    pub tokens: Arc<dyn TokenSource>,
}

impl SyncContext {
    /// Build the context. An explicit token wins over the stored one.
    pub fn new(config: SyncConfig, data_dir: &Path, token: Option<String>) -> Result<Self> {
        let store: Arc<dyn DurableStore> = Arc::new(FileStore::new(data_dir));
        let http: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new().context("failed to build HTTP client")?);
        let tokens: Arc<dyn TokenSource> = match token {
            Some(token) => Arc::new(StaticToken::new(token)),
            None => Arc::new(StoredToken::new(store.clone())),
        };
        Ok(Self {
            config,
            store,
            http,
            tokens,
        })
    }

    fn open(&self) -> Result<SyncQueue> {
        SyncQueue::open(
            self.config.clone(),
            self.store.clone(),
            self.http.clone(),
            self.tokens.clone(),
            Arc::new(ConsoleNotices),
        )
        .context("failed to open sync queue")
    }
}

/// Queue a mutation for later delivery.
pub async fn run_enqueue(ctx: &SyncContext, endpoint: &str, method: &str, body: &str) -> Result<()> {
    let method: HttpMethod = method.parse().map_err(anyhow::Error::msg)?;
    if method == HttpMethod::Get {
        bail!("GET requests are not queued; only mutations are");
    }
    let body: serde_json::Value =
        serde_json::from_str(body).context("request body is not valid JSON")?;
    if endpoint.trim().is_empty() {
        bail!("endpoint must not be empty");
    }

    let queue = ctx.open()?;
    let id = queue.enqueue(endpoint, method, &body);
    info!(id = %id, endpoint = %endpoint, "operation queued");
    println!("{id}");
    Ok(())
}

/// Show connectivity, pending count, and the last successful sync.
pub async fn run_status(ctx: &SyncContext) -> Result<()> {
    let queue = ctx.open()?;
    let probe = ConnectivityProbe::new(
        ctx.http.clone(),
        ctx.config.health_url(),
        ctx.config.probe_timeout,
    );
    let online = probe.check().await;

    println!("backend:      {}", ctx.config.api_base);
    println!("connectivity: {}", if online { "online" } else { "offline" });
    println!("pending:      {}", queue.pending_count());
    match queue.last_sync() {
        Some(ms) => println!("last sync:    {ms}"),
        None => println!("last sync:    never"),
    }
    Ok(())
}

/// List pending operations in delivery order.
pub async fn run_list(ctx: &SyncContext) -> Result<()> {
    let queue = ctx.open()?;
    let pending = queue.pending();
    if pending.is_empty() {
        println!("No pending operations.");
        return Ok(());
    }

    println!("{:<34} {:<7} {:<15} ENDPOINT", "ID", "METHOD", "QUEUED");
    for op in pending {
        println!(
            "{:<34} {:<7} {:<15} {}",
            op.id,
            op.method.as_str(),
            op.enqueued_at,
            op.endpoint
        );
    }
    Ok(())
}

/// Run one drain pass now.
pub async fn run_drain(ctx: &SyncContext) -> Result<()> {
    let queue = ctx.open()?;
    match queue.process_pending_syncs().await {
        DrainOutcome::Completed(report) => {
            println!(
                "delivered {}, still pending {}",
                report.succeeded, report.failed
            );
        }
        DrainOutcome::Skipped(reason) => println!("nothing sent: {}", skip_reason(reason)),
    }
    Ok(())
}

/// Keep probing and draining until Ctrl+C.
pub async fn run_watch(ctx: &SyncContext) -> Result<()> {
    let queue = ctx.open()?;
    eprintln!(
        "watching {} every {}s (Ctrl+C to stop)",
        ctx.config.health_url(),
        ctx.config.probe_interval.as_secs()
    );

    let monitor = queue.start_monitor();
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    monitor.stop().await;

    eprintln!("{} operation(s) still pending", queue.pending_count());
    Ok(())
}

fn skip_reason(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::NoToken => "not signed in (no auth token)",
        SkipReason::Empty => "queue is empty",
        SkipReason::Offline => "backend unreachable",
        SkipReason::AlreadyRunning => "another drain is in progress",
    }
}
