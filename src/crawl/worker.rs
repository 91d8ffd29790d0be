//! Street worker: pulls jobs from the shared queue, fetches both locale
//! variants, merges them, and appends the result to the sink.

use crate::area::{Area, StreetJob};
use crate::crawl::dispatch::JobQueue;
use crate::crawl::merge::merge_locales;
use crate::crawl::sink::RecordSink;
use crate::crawl::worker_pool::panic_message;
use crate::runtime::error::CrawlError;
use crate::runtime::telemetry::Telemetry;
use crate::source::{decode_streets, AreaSource, Locale};
use anyhow::Result;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::{join, select};
use tokio_util::sync::CancellationToken;


/// Everything a worker needs besides its queue, shared by the whole pool.
#[derive(Clone)]
pub struct WorkerContext {
    pub source: Arc<dyn AreaSource>,
    pub sink: Arc<dyn RecordSink>,
    pub telemetry: Arc<Telemetry>,
    /// Deadline for each single retrieval.
    pub retrieval_timeout: Duration,
}

pub struct Worker {
    pub id: usize,
    context: WorkerContext,
    queue: JobQueue,
    shutdown: CancellationToken,
}

impl Worker {
    pub fn new(
        id: usize,
        context: WorkerContext,
        queue: JobQueue,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            context,
            queue,
            shutdown,
        }
    }

    /// Drains the queue until it is closed or the run is cancelled. A job in
    /// flight always finishes before the worker observes cancellation.
    #[tracing::instrument(name = "worker", skip_all, fields(worker = self.id))]
    pub async fn run(self) -> Result<()> {
        tracing::debug!(worker = self.id, "worker task started");
        let mut processed = 0usize;

        loop {
            let job = select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    tracing::info!(worker = self.id, "shutdown requested; exiting worker loop");
                    break;
                }
                job = self.queue.next() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let outcome = AssertUnwindSafe(self.process(job)).catch_unwind().await;
            processed += 1;

            match outcome {
                Ok(Ok(written)) => self.context.telemetry.record_completed(written),
                Ok(Err(err)) => {
                    tracing::warn!(worker = self.id, %job, error = %err, "street job failed");
                    self.context.telemetry.record_failure(&err);
                }
                Err(panic_payload) => {
                    let panic_msg = panic_message(panic_payload.as_ref());
                    tracing::error!(worker = self.id, %job, panic = %panic_msg, "street job panicked");
                    self.context.telemetry.record_panic();
                }
            }
        }

        tracing::debug!(worker = self.id, processed, "worker task finished");
        Ok(())
    }

    async fn process(&self, job: StreetJob) -> Result<usize> {
        let records = fetch_and_merge(&self.context, job).await?;
        if records.is_empty() {
            return Ok(0);
        }
        self.context.sink.append(&records)
    }
}

/// Fetches both locale variants of `job` concurrently and merges them.
///
/// Any retrieval failure or an undecodable simplified list fails the job. An
/// undecodable traditional list is logged and treated as empty.
pub async fn fetch_and_merge(context: &WorkerContext, job: StreetJob) -> Result<Vec<Area>> {
    let (simplified, traditional) = join!(
        retrieve(context, job, Locale::Simplified),
        retrieve(context, job, Locale::Traditional),
    );
    let simplified = simplified?;
    let traditional = traditional?;

    let simplified = decode_streets(&simplified)?;
    let traditional = match decode_streets(&traditional) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!(%job, error = %err, "traditional street list unreadable; names left empty");
            context.telemetry.record_error(&err);
            Vec::new()
        }
    };

    Ok(merge_locales(&simplified, &traditional))
}

async fn retrieve(context: &WorkerContext, job: StreetJob, locale: Locale) -> Result<String> {
    let after = context.retrieval_timeout;
    tokio::time::timeout(after, context.source.fetch_streets(job, locale))
        .await
        .map_err(|_| CrawlError::Timeout { locale, after })?
}
