//! Poll loop controller - orchestrates event ingestion cycles.
//!
//! The poller is the single logical worker of the indexer: exactly one
//! cycle is ever in flight, and suspension happens only between cycles.
//! A failing cycle never stops the loop - only an explicit [`Poller::stop`]
//! does.
//!
//! # Flow (one cycle)
//!
//! 1. Read the progress singleton
//! 2. Fetch one batch of raw events strictly after `last_ledger`
//! 3. Decode each event; per-event failures are logged and skipped
//! 4. Persist decoded events + advanced progress in one transaction
//! 5. Sleep for the configured interval, then repeat

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, instrument, trace, warn};

use crate::decode::decode_event;
use crate::error::{IndexerError, IndexerResult};
use crate::metrics::{
    CycleTimer, record_decode_error, record_events_indexed, record_fetch_error,
    record_persist_error,
};
use crate::models::IndexerProgress;
use crate::ports::{EventSource, Repositories};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the poll loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Contract whose events are indexed. Required: without a filter
    /// the indexer must not start at all.
    pub contract_id: String,
    /// Fixed delay between cycles. There is no backoff or jitter.
    pub poll_interval: Duration,
    /// Maximum number of events fetched per cycle.
    pub batch_size: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            contract_id: String::new(),
            poll_interval: Duration::from_secs(5),
            batch_size: 100,
        }
    }
}

// =============================================================================
// Cycle Outcome
// =============================================================================

/// Result of one successful poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nothing to do: the source returned no events of interest.
    /// No state was written.
    Idle,
    /// Events were persisted and progress advanced.
    Indexed {
        /// Raw events returned by the source.
        fetched: usize,
        /// Newly inserted rows (redelivered duplicates excluded).
        inserted: u64,
        /// New `last_ledger` value, the max ledger in the batch.
        last_ledger: u64,
    },
}

// =============================================================================
// Worker
// =============================================================================

/// Cycle execution, separated from lifecycle management so the spawned
/// loop task can own it.
struct Worker<S, R> {
    config: PollerConfig,
    source: Arc<S>,
    repositories: Arc<R>,
}

impl<S: EventSource, R: Repositories> Worker<S, R> {
    /// Run one poll cycle.
    #[instrument(skip(self))]
    async fn run_cycle(&self) -> IndexerResult<CycleOutcome> {
        let _timer = CycleTimer::new();

        let progress = self.repositories.progress().get_progress().await?;
        trace!(after = progress.last_ledger, "Fetching events");

        let page = self
            .source
            .fetch_events(progress.last_ledger, self.config.batch_size)
            .await
            .inspect_err(|_| record_fetch_error())?;

        if page.events.is_empty() {
            return Ok(CycleOutcome::Idle);
        }

        let fetched = page.events.len();
        let mut decoded = Vec::with_capacity(fetched);
        for raw in &page.events {
            match decode_event(raw) {
                Ok(Some(event)) => decoded.push(event),
                Ok(None) => trace!(event = %raw.id, "Event not of interest, skipped"),
                Err(e) => {
                    warn!(event = %raw.id, error = %e, "⚠️  Undecodable event, skipped");
                    record_decode_error();
                }
            }
        }

        // A batch of only unrecognized/undecodable events writes no
        // state: progress moves only together with persisted events.
        let Some(last_ledger) = decoded.iter().map(|e| e.ledger).max() else {
            return Ok(CycleOutcome::Idle);
        };

        let next_progress = IndexerProgress {
            last_ledger,
            last_cursor: page.cursor,
            updated_at: Utc::now(),
        };

        let inserted = self
            .repositories
            .store_batch_atomic(&decoded, &next_progress)
            .await
            .inspect_err(|_| record_persist_error())?;

        record_events_indexed(inserted);

        Ok(CycleOutcome::Indexed {
            fetched,
            inserted,
            last_ledger,
        })
    }
}

// =============================================================================
// Poller
// =============================================================================

/// Running loop state held between `start()` and `stop()`.
struct RunningLoop {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Poll loop controller with explicit `start`/`stop` lifecycle.
///
/// State machine: `stopped → running` on [`start`](Self::start),
/// self-scheduling while running, `running → stopped` on
/// [`stop`](Self::stop). Start is idempotent; stop cancels the pending
/// inter-cycle sleep but lets an in-flight cycle run to completion.
pub struct Poller<S, R> {
    worker: Arc<Worker<S, R>>,
    running: Mutex<Option<RunningLoop>>,
}

impl<S, R> Poller<S, R>
where
    S: EventSource + 'static,
    R: Repositories + 'static,
{
    /// Create a poller with validated configuration.
    ///
    /// Fails fast on misconfiguration so the loop never starts with an
    /// undefined contract filter or a degenerate schedule.
    pub fn new(config: PollerConfig, source: Arc<S>, repositories: Arc<R>) -> IndexerResult<Self> {
        if config.contract_id.trim().is_empty() {
            return Err(IndexerError::Config("contract id is required".into()));
        }
        if config.poll_interval.is_zero() {
            return Err(IndexerError::Config("poll interval must be positive".into()));
        }
        if config.batch_size == 0 {
            return Err(IndexerError::Config("batch size must be positive".into()));
        }

        Ok(Self {
            worker: Arc::new(Worker {
                config,
                source,
                repositories,
            }),
            running: Mutex::new(None),
        })
    }

    /// Start the loop. The first cycle runs immediately; calling this
    /// while already running is a no-op.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!("Poller already running, start ignored");
            return;
        }

        info!(
            contract = %self.worker.config.contract_id,
            interval_ms = self.worker.config.poll_interval.as_millis(),
            batch_size = self.worker.config.batch_size,
            "⛓️  Starting poll loop"
        );

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let worker = Arc::clone(&self.worker);

        let handle = tokio::spawn(
            async move {
                loop {
                    if *shutdown_rx.borrow() {
                        break;
                    }

                    match worker.run_cycle().await {
                        Ok(CycleOutcome::Idle) => {
                            debug!("Cycle idle, no new events");
                        }
                        Ok(CycleOutcome::Indexed {
                            fetched,
                            inserted,
                            last_ledger,
                        }) => {
                            info!(fetched, inserted, ledger = last_ledger, "📦 Events indexed");
                        }
                        Err(e) => {
                            warn!(error = %e, "⚠️  Cycle failed, retrying next tick");
                        }
                    }

                    tokio::select! {
                        _ = tokio::time::sleep(worker.config.poll_interval) => {}
                        _ = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                        }
                    }
                }
                debug!("Poll loop stopped");
            }
            .instrument(info_span!("poller")),
        );

        *running = Some(RunningLoop {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the loop and wait for it to wind down.
    ///
    /// Cancellation is cooperative and coarse: a cycle already in
    /// flight finishes and persists before the task exits; no further
    /// cycle is scheduled. Calling this while stopped is a no-op.
    pub async fn stop(&self) {
        let running = self.running.lock().await.take();
        let Some(running) = running else {
            debug!("Poller not running, stop ignored");
            return;
        };

        let _ = running.shutdown_tx.send(true);
        if let Err(e) = running.handle.await {
            error!(error = %e, "❌ Poll loop task panicked");
        }

        info!("🛑 Poll loop stopped");
    }

    /// Whether the loop is currently running.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
