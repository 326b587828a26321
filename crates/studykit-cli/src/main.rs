//! studykit: sandbox terminal and offline sync queue client.
//!
//! `studykit term` attaches the local terminal to a sandbox shell over
//! WebSocket. `studykit sync ...` manages the durable queue of mutations
//! that are replayed against the study API once it is reachable.

mod commands;
mod config;
mod terminal;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::error;

/// studykit: sandbox terminal and offline sync client
#[derive(Parser)]
#[command(name = "studykit", version, about = "Sandbox terminal and offline sync queue client")]
struct Cli {
    /// Config file path (default ~/.studykit/config.toml)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Directory holding the persisted queue and auth token
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    /// Study API base URL
    #[arg(long = "api-base", global = true)]
    api_base: Option<String>,

    /// Bearer token for sync requests
    #[arg(long = "token", global = true)]
    token: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Open the sandbox terminal (Ctrl+] quits, Ctrl+L clears, Ctrl+R reconnects)
    Term {
        /// WebSocket endpoint (ws:// or wss://)
        #[arg(long)]
        endpoint: Option<String>,
    },

    /// Manage the offline sync queue
    #[command(subcommand)]
    Sync(SyncCommand),
}

#[derive(Subcommand)]
enum SyncCommand {
    /// Queue a mutation for delivery
    Enqueue {
        /// API endpoint, relative to the API base or absolute
        endpoint: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "POST")]
        method: String,

        /// JSON request body
        #[arg(short, long, default_value = "{}")]
        body: String,
    },

    /// Show connectivity and queue state
    Status,

    /// List pending operations
    List,

    /// Deliver pending operations now
    Drain,

    /// Probe periodically and drain whenever the backend is reachable
    Watch,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output and the terminal.
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("studykit=debug,studykit_cli=debug,studykit_client=debug,studykit_core=debug")
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("studykit=warn,studykit_cli=warn,studykit_client=warn")
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        eprintln!("studykit: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config::home_dir().join("config.toml"));
    let cfg = config::Config::load(&config_path)?;

    match cli.command {
        Command::Term { endpoint } => commands::term::run(cfg.session_config(endpoint)).await,
        Command::Sync(command) => {
            let data_dir = cfg.data_dir(cli.data_dir);
            let token = cli.token.or_else(|| cfg.sync.token.clone());
            let ctx = commands::sync::SyncContext::new(cfg.sync_config(cli.api_base), &data_dir, token)?;

            match command {
                SyncCommand::Enqueue {
                    endpoint,
                    method,
                    body,
                } => commands::sync::run_enqueue(&ctx, &endpoint, &method, &body).await,
                SyncCommand::Status => commands::sync::run_status(&ctx).await,
                SyncCommand::List => commands::sync::run_list(&ctx).await,
                SyncCommand::Drain => commands::sync::run_drain(&ctx).await,
                SyncCommand::Watch => commands::sync::run_watch(&ctx).await,
            }
        }
    }
}
