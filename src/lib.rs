pub mod area;
pub mod crawl;
pub mod hierarchy;
pub mod runtime;
pub mod source;

pub use area::{Area, Level, StreetJob, AREA_HEADER};
pub use crawl::{crawl_leaves, CsvSink, LeafCrawlReport, RecordSink, WorkerContext, WorkerPool};
pub use hierarchy::HierarchyIndex;
pub use runtime::config::{CrawlConfig, CrawlConfigBuilder, CrawlConfigParams};
pub use runtime::error::CrawlError;
pub use runtime::runner::{CrawlSummary, Crawler};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use source::{AreaSource, HttpAreaSource, Locale, SourceMetricsSnapshot, SourceOptions};
