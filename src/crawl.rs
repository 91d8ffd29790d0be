//! Leaf-level street crawl: job enumeration, the worker pool that fetches and
//! merges both locale variants, and the shared output sink.

pub mod dispatch;
pub mod merge;
pub mod orchestrator;
pub mod sink;
pub mod worker;
pub mod worker_pool;

pub use dispatch::{dispatch_jobs, job_queue, leaf_jobs, JobQueue, JobSender};
pub use merge::merge_locales;
pub use orchestrator::{crawl_leaves, LeafCrawlReport};
pub use sink::{CsvSink, RecordSink};
pub use worker::{fetch_and_merge, Worker, WorkerContext};
pub use worker_pool::WorkerPool;
