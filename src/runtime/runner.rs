use crate::crawl::{crawl_leaves, CsvSink, RecordSink, WorkerContext};
use crate::runtime::config::CrawlConfig;
use crate::runtime::telemetry::{spawn_metrics_reporter, Telemetry, TelemetrySnapshot};
use crate::source::{parse_asset, AreaSource, HttpAreaSource, SourceMetricsSnapshot};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// What a finished (or interrupted) crawl produced.
#[derive(Debug, Clone, Copy)]
pub struct CrawlSummary {
    pub top_level_records: usize,
    pub jobs_dispatched: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub telemetry: TelemetrySnapshot,
    /// Upstream request counters, when the source keeps them.
    pub source: Option<SourceMetricsSnapshot>,
}

/// Drives one full crawl: address script, top-level rows, then the street
/// crawl, all written to the configured output file.
pub struct Crawler {
    config: CrawlConfig,
    source: Arc<dyn AreaSource>,
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
}

impl Crawler {
    /// Builds a crawler that talks to the configured HTTP endpoints.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let source = HttpAreaSource::from_config(&config)?;
        Ok(Self::with_source(config, Arc::new(source)))
    }

    /// Builds a crawler around any [`AreaSource`].
    pub fn with_source(config: CrawlConfig, source: Arc<dyn AreaSource>) -> Self {
        Self {
            config,
            source,
            telemetry: Arc::new(Telemetry::default()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Returns a clone of the root shutdown token so callers can plug in
    /// their own signal handling.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Runs the crawl to completion or until the shutdown token is cancelled.
    ///
    /// Failing to open the output file or to obtain any top-level record is
    /// fatal. Individual street jobs that fail are logged and skipped.
    pub async fn run(&self) -> Result<CrawlSummary> {
        let started = Instant::now();
        let output_path = self.config.output_path();

        let sink = Arc::new(CsvSink::create(output_path)?);

        let body = self
            .source
            .fetch_asset()
            .await
            .context("failed to retrieve address script")?;
        let records = parse_asset(&body).context("failed to parse address script")?;
        sink.append(&records)
            .context("failed to write top-level records")?;
        tracing::info!(
            records = records.len(),
            path = %output_path.display(),
            "top-level records written"
        );

        let reporter_shutdown = self.shutdown.child_token();
        let reporter = spawn_metrics_reporter(
            self.telemetry.clone(),
            reporter_shutdown.clone(),
            self.config.metrics_interval(),
        );

        let context = WorkerContext {
            source: self.source.clone(),
            sink: sink.clone(),
            telemetry: self.telemetry.clone(),
            retrieval_timeout: self.config.request_timeout(),
        };
        let report = crawl_leaves(
            &records,
            context,
            self.config.worker_count(),
            self.config.queue_capacity(),
            self.shutdown.clone(),
        )
        .await;

        reporter_shutdown.cancel();
        if let Err(err) = reporter.await {
            tracing::warn!(error = %err, "metrics reporter task failed");
        }
        let report = report?;

        let summary = CrawlSummary {
            top_level_records: records.len(),
            jobs_dispatched: report.jobs_dispatched,
            cancelled: report.cancelled,
            elapsed: started.elapsed(),
            telemetry: self.telemetry.snapshot(),
            source: self.source.metrics(),
        };
        tracing::info!(
            top_level = summary.top_level_records,
            jobs = summary.jobs_dispatched,
            completed = summary.telemetry.jobs_completed,
            failed = summary.telemetry.jobs_failed,
            streets = summary.telemetry.streets_written,
            rows = sink.rows_written(),
            cancelled = summary.cancelled,
            "crawl finished"
        );
        if let Some(requests) = summary.source {
            tracing::info!(
                requests = requests.total_requests,
                errors = requests.total_errors,
                avg_latency_ms = format!("{:.1}", requests.average_latency_ms),
                "upstream requests"
            );
        }
        Ok(summary)
    }

    /// Runs the crawl; a Ctrl-C (SIGINT) stops dispatch and lets in-flight
    /// jobs finish before returning.
    pub async fn run_until_ctrl_c(&self) -> Result<CrawlSummary> {
        let crawl = self.run();
        tokio::pin!(crawl);

        tokio::select! {
            summary = &mut crawl => return summary,
            _ = signal::ctrl_c() => {
                tracing::info!("Ctrl-C received; draining in-flight street jobs");
                self.shutdown.cancel();
            }
        }

        crawl.await
    }
}
