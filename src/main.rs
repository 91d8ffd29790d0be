use anyhow::Result;
use areafetch::{init_tracing, CrawlConfig, Crawler};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = CrawlConfig::builder().build()?;
    tracing::info!(
        output = %config.output_path().display(),
        workers = config.worker_count(),
        "starting address crawl"
    );

    let crawler = Crawler::new(config)?;
    let summary = crawler.run_until_ctrl_c().await?;

    if summary.cancelled {
        tracing::warn!(
            jobs = summary.jobs_dispatched,
            "crawl interrupted; output is incomplete"
        );
    }
    tracing::info!(
        streets = summary.telemetry.streets_written,
        failed_jobs = summary.telemetry.jobs_failed,
        elapsed_secs = summary.elapsed.as_secs(),
        "done"
    );
    Ok(())
}
