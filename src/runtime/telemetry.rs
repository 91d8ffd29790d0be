use crate::runtime::error::CrawlError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Rolling counters describing crawl progress and failures.
#[derive(Default, Debug)]
pub struct Telemetry {
    jobs_dispatched: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    streets_written: AtomicU64,
    retrieval_errors: AtomicU64,
    retrieval_timeouts: AtomicU64,
    decode_errors: AtomicU64,
    write_errors: AtomicU64,
    worker_panics: AtomicU64,
}

impl Telemetry {
    pub fn record_dispatched(&self) {
        self.jobs_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self, streets: usize) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
        self.streets_written
            .fetch_add(streets as u64, Ordering::Relaxed);
    }

    /// Counts a failed job and classifies the cause when it is a [`CrawlError`].
    pub fn record_failure(&self, err: &anyhow::Error) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        self.record_error(err);
    }

    /// Classifies an error without failing the job it belongs to.
    pub fn record_error(&self, err: &anyhow::Error) {
        let counter = match err.downcast_ref::<CrawlError>() {
            Some(CrawlError::Timeout { .. }) => {
                self.retrieval_timeouts.fetch_add(1, Ordering::Relaxed);
                &self.retrieval_errors
            }
            Some(CrawlError::Retrieval { .. }) | Some(CrawlError::Status { .. }) => {
                &self.retrieval_errors
            }
            Some(CrawlError::Decode { .. }) => &self.decode_errors,
            Some(CrawlError::Write { .. }) => &self.write_errors,
            None => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        self.worker_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            jobs_dispatched: self.jobs_dispatched.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            streets_written: self.streets_written.load(Ordering::Relaxed),
            retrieval_errors: self.retrieval_errors.load(Ordering::Relaxed),
            retrieval_timeouts: self.retrieval_timeouts.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            worker_panics: self.worker_panics.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub jobs_dispatched: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub streets_written: u64,
    pub retrieval_errors: u64,
    pub retrieval_timeouts: u64,
    pub decode_errors: u64,
    pub write_errors: u64,
    pub worker_panics: u64,
}

impl TelemetrySnapshot {
    /// Jobs that reached an outcome, successful or not.
    pub fn jobs_finished(&self) -> u64 {
        self.jobs_completed + self.jobs_failed
    }
}

/// Spawns a background task that periodically logs job throughput and failure counters.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "areafetch::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current_snapshot = telemetry.snapshot();
                    let finished_delta = current_snapshot
                        .jobs_finished()
                        .saturating_sub(last_snapshot.jobs_finished());
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let throughput = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        finished_delta as f64 / elapsed
                    };

                    tracing::info!(
                        target: "areafetch::metrics",
                        throughput = format!("{throughput:.2}"),
                        dispatched = current_snapshot.jobs_dispatched,
                        completed = current_snapshot.jobs_completed,
                        failed = current_snapshot.jobs_failed,
                        streets = current_snapshot.streets_written,
                        retrieval_errors = current_snapshot.retrieval_errors,
                        retrieval_timeouts = current_snapshot.retrieval_timeouts,
                        decode_errors = current_snapshot.decode_errors,
                        write_errors = current_snapshot.write_errors,
                        "crawl metrics snapshot"
                    );

                    last_snapshot = current_snapshot;
                    last_tick = Instant::now();
                }
            }
        }
    })
}
