//! HTTP access to the two upstream sources: the static address script and the
//! per-county street endpoint. Houses the `AreaSource` trait consumed by the
//! runner and workers, and its `reqwest` implementation.

use crate::area::StreetJob;
use crate::runtime::config::CrawlConfig;
use crate::runtime::error::CrawlError;
use crate::source::metrics::{SourceMetrics, SourceMetricsSnapshot};
use crate::source::options::SourceOptions;
use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Script variant requested from the street endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locale {
    Simplified,
    Traditional,
}

impl Locale {
    pub fn query_value(self) -> &'static str {
        match self {
            Locale::Simplified => "zh-S",
            Locale::Traditional => "zh-T",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query_value())
    }
}

/// Anything that can hand back raw bodies for the address script and for one
/// locale variant of a county's street list.
pub trait AreaSource: Send + Sync {
    fn fetch_asset(&self) -> BoxFuture<'_, Result<String>>;

    fn fetch_streets(&self, job: StreetJob, locale: Locale) -> BoxFuture<'_, Result<String>>;

    /// Request counters, for sources that keep them.
    fn metrics(&self) -> Option<SourceMetricsSnapshot> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct HttpAreaSource {
    asset_url: Arc<String>,
    street_endpoint: Arc<String>,
    client: Client,
    options: SourceOptions,
    metrics: Arc<SourceMetrics>,
}

impl AreaSource for HttpAreaSource {
    fn fetch_asset(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.fetch_asset_body())
    }

    fn fetch_streets(&self, job: StreetJob, locale: Locale) -> BoxFuture<'_, Result<String>> {
        Box::pin(self.fetch_street_body(job, locale))
    }

    fn metrics(&self) -> Option<SourceMetricsSnapshot> {
        Some(self.metrics.snapshot())
    }
}

impl HttpAreaSource {
    pub fn new(asset_url: impl Into<String>, street_endpoint: impl Into<String>) -> Result<Self> {
        Self::with_options(asset_url, street_endpoint, SourceOptions::default())
    }

    pub fn with_options(
        asset_url: impl Into<String>,
        street_endpoint: impl Into<String>,
        options: SourceOptions,
    ) -> Result<Self> {
        options.validate()?;

        let client = Client::builder()
            .timeout(options.request_timeout)
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(|err| anyhow!("failed to build HTTP client: {err}"))?;

        Ok(Self {
            asset_url: Arc::new(asset_url.into()),
            street_endpoint: Arc::new(street_endpoint.into()),
            client,
            options,
            metrics: Arc::new(SourceMetrics::default()),
        })
    }

    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        config.validate()?;
        let options = SourceOptions {
            request_timeout: config.request_timeout(),
            ..SourceOptions::default()
        };
        Self::with_options(config.asset_url(), config.street_endpoint(), options)
    }

    pub fn asset_url(&self) -> &str {
        &self.asset_url
    }

    pub fn street_url(&self, job: StreetJob, locale: Locale) -> String {
        format!(
            "{}?l1={}&l2={}&l3={}&lang={}",
            self.street_endpoint,
            job.province_id,
            job.city_id,
            job.county_id,
            locale.query_value()
        )
    }

    async fn fetch_asset_body(&self) -> Result<String> {
        let url = self.asset_url.as_str();
        let start = Instant::now();
        let result: Result<String> = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("failed to fetch address script from {url}"))?
                .error_for_status()
                .context("address script request was rejected")?;
            response
                .text()
                .await
                .context("failed to read address script body")
        }
        .await;

        match &result {
            Ok(body) => {
                self.metrics.record_success(start.elapsed());
                tracing::debug!(url, bytes = body.len(), "fetched address script");
            }
            Err(_) => self.metrics.record_failure(start.elapsed()),
        }
        result
    }

    async fn fetch_street_body(&self, job: StreetJob, locale: Locale) -> Result<String> {
        let url = self.street_url(job, locale);
        let start = Instant::now();

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                self.metrics.record_failure(start.elapsed());
                return Err(self.classify(err, locale));
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.metrics.record_failure(start.elapsed());
            return Err(CrawlError::Status {
                locale,
                status: status.as_u16(),
            }
            .into());
        }

        match response.text().await {
            Ok(body) => {
                self.metrics.record_success(start.elapsed());
                tracing::trace!(%job, %locale, bytes = body.len(), "street list fetched");
                Ok(body)
            }
            Err(err) => {
                self.metrics.record_failure(start.elapsed());
                Err(self.classify(err, locale))
            }
        }
    }

    fn classify(&self, err: reqwest::Error, locale: Locale) -> anyhow::Error {
        if err.is_timeout() {
            return CrawlError::Timeout {
                locale,
                after: self.request_timeout(),
            }
            .into();
        }
        CrawlError::Retrieval {
            locale,
            reason: err.to_string(),
        }
        .into()
    }

    fn request_timeout(&self) -> Duration {
        self.options.request_timeout
    }
}
