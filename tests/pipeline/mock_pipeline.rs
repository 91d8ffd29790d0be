use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::support::helpers::{
    init_tracing, read_csv, shared, street_rows, InMemorySource, SAMPLE_ASSET,
    SAMPLE_TOP_LEVEL_ROWS,
};
use anyhow::Result;
use areafetch::{
    crawl_leaves, Area, CrawlConfig, Crawler, CsvSink, Level, Telemetry, WorkerContext,
    AREA_HEADER,
};
use tokio_util::sync::CancellationToken;

fn sample_source() -> InMemorySource {
    InMemorySource::new(SAMPLE_ASSET)
        .with_streets(
            110101,
            "[['110101001','东华门街道','110101'],['110101002','景山街道','110101']]",
            "[['110101001','東華門街道','110101'],['110101002','景山街道','110101']]",
        )
        .with_streets(
            120100,
            "[['120100001','和平街道','120100']]",
            "[['120100001','和平街道','120100']]",
        )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_leaf_city_yields_one_street() -> Result<()> {
    init_tracing();
    let records = vec![
        Area::new(1, 0, Level::Province).with_names("L1", "", ""),
        Area::new(2, 1, Level::City).with_names("L2", "", ""),
    ];
    let source = shared(InMemorySource::without_asset().with_streets(
        2,
        r#"[[10,"Main St",2]]"#,
        r#"[[10,"主街",2]]"#,
    ));
    let sink = Arc::new(CsvSink::new(Vec::new()));
    let telemetry = Arc::new(Telemetry::default());

    let context = WorkerContext {
        source: source.clone(),
        sink: sink.clone(),
        telemetry: telemetry.clone(),
        retrieval_timeout: Duration::from_secs(1),
    };
    let report = crawl_leaves(&records, context, 4, 1, CancellationToken::new()).await?;

    assert_eq!(report.jobs_dispatched, 1);
    assert_eq!(source.street_requests(), 2);
    assert_eq!(telemetry.snapshot().streets_written, 1);

    let sink = Arc::try_unwrap(sink)
        .ok()
        .expect("workers should release the sink");
    let output = String::from_utf8(sink.into_inner()?)?;
    assert_eq!(
        output,
        format!("{}\n10,Main St,主街,,2,0,3\n", AREA_HEADER.join(","))
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn crawler_writes_top_level_rows_then_streets() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("tmp").join("address.csv");
    let config = CrawlConfig::builder()
        .output_path(&output)
        .worker_count(3)
        .metrics_interval(Duration::from_millis(20))
        .build()?;

    let source = shared(sample_source());
    let crawler = Crawler::with_source(config, source.clone());
    let summary = crawler.run().await?;

    assert_eq!(summary.top_level_records, SAMPLE_TOP_LEVEL_ROWS);
    // 110101 and 110102 under 北京市, plus 天津市 as its own county
    assert_eq!(summary.jobs_dispatched, 3);
    assert!(!summary.cancelled);
    assert_eq!(summary.telemetry.jobs_completed, 2);
    assert_eq!(summary.telemetry.jobs_failed, 1);
    assert_eq!(summary.telemetry.streets_written, 3);
    assert_eq!(source.street_requests(), 6);
    assert!(summary.source.is_none(), "in-memory source keeps no request counters");

    let (header, rows) = read_csv(&output)?;
    assert_eq!(header, AREA_HEADER);
    assert_eq!(rows.len(), SAMPLE_TOP_LEVEL_ROWS + 3);
    assert_eq!(rows[0], ["110000", "北京", "北京", "", "1", "0", "1"]);
    assert!(rows[..SAMPLE_TOP_LEVEL_ROWS]
        .iter()
        .all(|row| row[6] != "3"));
    assert_eq!(
        rows[SAMPLE_TOP_LEVEL_ROWS - 1],
        ["1", "中国", "中國", "China", "0", "0", "0"]
    );

    let streets: HashSet<(String, String)> = street_rows(&rows)
        .into_iter()
        .map(|row| (row[0].clone(), row[2].clone()))
        .collect();
    let expected: HashSet<(String, String)> = [
        ("110101001", "東華門街道"),
        ("110101002", "景山街道"),
        ("120100001", "和平街道"),
    ]
    .into_iter()
    .map(|(id, name)| (id.to_string(), name.to_string()))
    .collect();
    assert_eq!(streets, expected);
    Ok(())
}

#[tokio::test]
async fn cancelled_crawler_still_writes_top_level_rows() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let output = dir.path().join("address.csv");
    let config = CrawlConfig::builder().output_path(&output).build()?;

    let source = shared(sample_source());
    let crawler = Crawler::with_source(config, source.clone());
    crawler.cancellation_token().cancel();

    let summary = crawler.run().await?;
    assert!(summary.cancelled);
    assert_eq!(summary.jobs_dispatched, 0);
    assert_eq!(source.street_requests(), 0);

    let (_, rows) = read_csv(&output)?;
    assert_eq!(rows.len(), SAMPLE_TOP_LEVEL_ROWS);
    Ok(())
}

#[tokio::test]
async fn missing_asset_is_fatal() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let config = CrawlConfig::builder()
        .output_path(dir.path().join("address.csv"))
        .build()?;

    let source = shared(InMemorySource::without_asset());
    let crawler = Crawler::with_source(config, source.clone());
    let err = crawler.run().await.expect_err("asset failure must abort");
    assert!(
        format!("{err:#}").contains("failed to retrieve address script"),
        "unexpected error: {err:#}"
    );
    assert_eq!(source.street_requests(), 0);
    Ok(())
}

#[tokio::test]
async fn unopenable_output_is_fatal() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory")?;
    let config = CrawlConfig::builder()
        .output_path(blocker.join("address.csv"))
        .build()?;

    let source = shared(sample_source());
    let crawler = Crawler::with_source(config, source.clone());
    let err = crawler.run().await.expect_err("sink failure must abort");
    assert!(
        format!("{err:#}").contains("failed to create output directory"),
        "unexpected error: {err:#}"
    );
    assert_eq!(source.street_requests(), 0);
    Ok(())
}
