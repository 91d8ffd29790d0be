use crate::area::Area;
use crate::crawl::dispatch::{dispatch_jobs, job_queue, leaf_jobs};
use crate::crawl::worker::WorkerContext;
use crate::crawl::worker_pool::WorkerPool;
use crate::hierarchy::HierarchyIndex;
use anyhow::Result;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Outcome of one leaf crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafCrawlReport {
    pub jobs_dispatched: usize,
    pub cancelled: bool,
}

/// Indexes `records`, launches the pool, feeds it every leaf job and waits
/// for the last worker to return.
pub async fn crawl_leaves(
    records: &[Area],
    context: WorkerContext,
    workers: usize,
    queue_capacity: usize,
    shutdown: CancellationToken,
) -> Result<LeafCrawlReport> {
    let started = Instant::now();
    let index = HierarchyIndex::build(records);
    let telemetry = context.telemetry.clone();

    let (sender, queue) = job_queue(queue_capacity);
    let pool = WorkerPool::launch(workers, context, queue, shutdown.clone());
    tracing::info!(
        parents = index.parent_count(),
        workers = pool.size(),
        "leaf crawl started"
    );

    let jobs_dispatched = dispatch_jobs(leaf_jobs(&index), sender, &shutdown, &telemetry).await?;
    pool.wait().await?;

    let cancelled = shutdown.is_cancelled();
    tracing::info!(
        jobs = jobs_dispatched,
        cancelled,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "leaf crawl finished"
    );

    Ok(LeafCrawlReport {
        jobs_dispatched,
        cancelled,
    })
}
