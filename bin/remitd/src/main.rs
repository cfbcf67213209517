//! remitd - Soroban lending-ledger event indexer.
//!
//! # Usage
//!
//! ```bash
//! # Start with default config
//! remitd --contract-id CDLZ...
//!
//! # Start with environment overrides
//! DATABASE_URL=postgres://localhost/remit \
//! SOROBAN_RPC_URL=https://soroban-testnet.stellar.org \
//! CONTRACT_ID=CDLZ... remitd
//! ```

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use remit_core::metrics::init_metrics;
use remit_core::ports::EventSource;
use remit_core::services::{Poller, PollerConfig};
use remit_soroban::{SorobanClient, SorobanClientConfig};
use remit_storage::{Database, DatabaseConfig, PgRepositories};

/// remitd CLI - lending-ledger event indexer.
#[derive(Parser, Debug)]
#[command(name = "remitd")]
#[command(about = "Indexes lending events from a Soroban contract into PostgreSQL")]
#[command(version)]
struct Cli {
    /// Soroban RPC endpoint URL.
    #[arg(
        long,
        env = "SOROBAN_RPC_URL",
        default_value = "http://127.0.0.1:8000/soroban/rpc"
    )]
    rpc_url: String,

    /// Loan manager contract to index (strkey). Without it the indexer
    /// stays disabled.
    #[arg(long, env = "CONTRACT_ID")]
    contract_id: Option<String>,

    /// PostgreSQL database URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost/remit")]
    database_url: String,

    /// Fixed delay between poll cycles, in milliseconds.
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "5000")]
    poll_interval_ms: u64,

    /// Maximum events fetched per cycle.
    #[arg(long, env = "BATCH_SIZE", default_value = "100")]
    batch_size: u32,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Purge all indexed data from the database and exit.
    ///
    /// This deletes all stored events and resets the progress record;
    /// the next run re-scans from ledger 0, bounded by the RPC node's
    /// retention window. Schema/migrations are preserved.
    #[arg(long)]
    purge: bool,

    /// Skip confirmation prompt for destructive operations (like --purge).
    #[arg(long, short = 'y')]
    yes: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    let metrics_enabled =
        match format!("0.0.0.0:{}", cli.metrics_port).parse::<std::net::SocketAddr>() {
            Ok(metrics_addr) => match PrometheusBuilder::new()
                .with_http_listener(metrics_addr)
                .install()
            {
                Ok(()) => {
                    init_metrics();
                    true
                }
                Err(e) => {
                    warn!(
                        "⚠️  Failed to start metrics exporter: {}. Continuing without metrics.",
                        e
                    );
                    false
                }
            },
            Err(e) => {
                warn!(
                    "⚠️  Invalid metrics address: {}. Continuing without metrics.",
                    e
                );
                false
            }
        };

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting remitd");
    debug!(rpc_url = %cli.rpc_url, "Soroban endpoint");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    let db_config = DatabaseConfig::for_indexer(&cli.database_url);

    info!("🗄️  Connecting to database...");
    let db = Database::connect(&db_config)
        .await
        .context("Failed to connect to database")?;

    db.migrate().await.context("Failed to run migrations")?;
    info!("🗄️  Database ready (migrations applied)");

    if cli.migrate_only {
        info!("🛑 --migrate-only flag set, exiting");
        return Ok(());
    }

    if cli.purge {
        return handle_purge(&db, cli.yes).await;
    }

    let db = Arc::new(db);
    let repositories = Arc::new(PgRepositories::new(db.clone()));

    // ─────────────────────────────────────────────────────────────────────────
    // 📡 SOROBAN CONNECTION
    // ─────────────────────────────────────────────────────────────────────────
    let contract_id = cli
        .contract_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let source = Arc::new(
        SorobanClient::new(SorobanClientConfig {
            rpc_url: cli.rpc_url.clone(),
            contract_id: contract_id.clone().unwrap_or_default(),
            ..Default::default()
        })
        .context("Failed to create Soroban RPC client")?,
    );

    match source.latest_ledger().await {
        Ok(sequence) => info!(ledger = sequence, "🔗 Soroban RPC connected"),
        Err(e) => warn!(error = %e, "⚠️  Soroban RPC unreachable, indexer will keep retrying"),
    }

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ INDEXER START
    // ─────────────────────────────────────────────────────────────────────────
    // Misconfiguration is fail-safe, not fatal: the loop never starts
    // with an undefined contract filter, but the process stays up.
    let poller = match contract_id {
        None => {
            warn!("⚠️  CONTRACT_ID is not set, indexing disabled");
            None
        }
        Some(contract_id) => {
            let config = PollerConfig {
                contract_id,
                poll_interval: Duration::from_millis(cli.poll_interval_ms),
                batch_size: cli.batch_size,
            };
            match Poller::new(config, source.clone(), repositories.clone()) {
                Ok(poller) => Some(poller),
                Err(e) => {
                    warn!(error = %e, "⚠️  Invalid indexer configuration, indexing disabled");
                    None
                }
            }
        }
    };

    if let Some(poller) = &poller {
        poller.start().await;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // ✅ READY
    // ─────────────────────────────────────────────────────────────────────────
    info!("✅ remitd ready");
    if metrics_enabled {
        info!(
            "   📊 Metrics:  http://localhost:{}/metrics",
            cli.metrics_port
        );
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    shutdown_signal().await;

    // ─────────────────────────────────────────────────────────────────────────
    // 🛑 SHUTDOWN
    // ─────────────────────────────────────────────────────────────────────────
    info!("🛑 Shutting down...");

    if let Some(poller) = &poller {
        // stop() lets an in-flight cycle persist before returning.
        match tokio::time::timeout(Duration::from_secs(30), poller.stop()).await {
            Ok(()) => debug!("Indexer stopped"),
            Err(_) => warn!("⚠️  Indexer shutdown timed out"),
        }
    }

    db.close().await;

    info!("🛑 Shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Handle the --purge command.
async fn handle_purge(db: &Database, skip_confirmation: bool) -> Result<()> {
    warn!("⚠️  PURGE MODE: This will delete ALL indexed data!");
    warn!("   - All stored loan events");
    warn!("   - The indexer progress record will be reset");
    warn!("   - Schema and migrations will be preserved");

    if !skip_confirmation {
        print!("\n🔴 Are you sure you want to purge all data? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            info!("❌ Purge cancelled");
            return Ok(());
        }
    }

    info!("🗑️  Purging database...");

    let stats = db.purge().await.context("Failed to purge database")?;

    info!("✅ Database purged successfully");
    info!("   📣 Events removed: {}", stats.events_removed);
    info!("   The indexer will re-scan from ledger 0 on next run");

    Ok(())
}
