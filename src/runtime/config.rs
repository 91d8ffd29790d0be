use crate::runtime::telemetry;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ASSET_URL: &str = "https://g.alicdn.com/vip/address/6.0.14/index-min.js";
pub const DEFAULT_STREET_ENDPOINT: &str =
    "https://lsp.wuliu.taobao.com/locationservice/addr/output_address_town_array.do";
pub const DEFAULT_OUTPUT_PATH: &str = "tmp/address.csv";
const DEFAULT_WORKER_COUNT: usize = 30;
const DEFAULT_QUEUE_CAPACITY: usize = 1;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for a crawl.
///
/// All instances must be constructed via [`CrawlConfig::builder`] or [`CrawlConfig::new`]
/// so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    asset_url: String,
    street_endpoint: String,
    output_path: PathBuf,
    worker_count: usize,
    queue_capacity: usize,
    request_timeout: Duration,
    metrics_interval: Duration,
}

pub struct CrawlConfigParams {
    pub asset_url: String,
    pub street_endpoint: String,
    pub output_path: PathBuf,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub request_timeout: Duration,
    pub metrics_interval: Duration,
}

impl CrawlConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> CrawlConfigBuilder {
        CrawlConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// Prefer [`CrawlConfig::builder`] when most values use defaults.
    pub fn new(params: CrawlConfigParams) -> Result<Self> {
        let CrawlConfigParams {
            asset_url,
            street_endpoint,
            output_path,
            worker_count,
            queue_capacity,
            request_timeout,
            metrics_interval,
        } = params;

        let config = Self {
            asset_url: trimmed_string(asset_url),
            street_endpoint: trimmed_string(street_endpoint),
            output_path,
            worker_count,
            queue_capacity,
            request_timeout,
            metrics_interval,
        };

        config.validate()?;
        Ok(config)
    }

    /// URL of the static address script.
    pub fn asset_url(&self) -> &str {
        &self.asset_url
    }

    /// Street endpoint without query string.
    pub fn street_endpoint(&self) -> &str {
        &self.street_endpoint
    }

    /// CSV file receiving every record.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Number of concurrent street workers.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Jobs that may wait in the queue before the dispatcher blocks.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Deadline applied to every single retrieval.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.asset_url, "asset_url")?;
        validate_url(&self.street_endpoint, "street_endpoint")?;

        if self.output_path.as_os_str().is_empty() {
            bail!("output_path cannot be empty");
        }

        if self.worker_count == 0 {
            bail!("worker_count must be greater than 0");
        }

        if self.queue_capacity == 0 {
            bail!("queue_capacity must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CrawlConfigBuilder {
    asset_url: Option<String>,
    street_endpoint: Option<String>,
    output_path: Option<PathBuf>,
    worker_count: Option<usize>,
    queue_capacity: Option<usize>,
    request_timeout: Option<Duration>,
    metrics_interval: Option<Duration>,
}

impl CrawlConfigBuilder {
    pub fn asset_url(mut self, url: impl Into<String>) -> Self {
        self.asset_url = Some(url.into());
        self
    }

    pub fn street_endpoint(mut self, url: impl Into<String>) -> Self {
        self.street_endpoint = Some(url.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<CrawlConfig> {
        let params = CrawlConfigParams {
            asset_url: self
                .asset_url
                .unwrap_or_else(|| DEFAULT_ASSET_URL.to_string()),
            street_endpoint: self
                .street_endpoint
                .unwrap_or_else(|| DEFAULT_STREET_ENDPOINT.to_string()),
            output_path: self
                .output_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            worker_count: self.worker_count.unwrap_or(DEFAULT_WORKER_COUNT),
            queue_capacity: self.queue_capacity.unwrap_or(DEFAULT_QUEUE_CAPACITY),
            request_timeout: self
                .request_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
        };

        CrawlConfig::new(params)
    }
}

fn trimmed_string(value: String) -> String {
    value.trim().to_owned()
}

fn validate_url(url: &str, field: &str) -> Result<()> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{field} must start with http:// or https://");
    }
    Ok(())
}
