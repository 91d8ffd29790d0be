use std::{
    collections::HashMap,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Context, Result};
use areafetch::{AreaSource, Locale, StreetJob};
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

/// Address script with four provinces, one multi-county city, one city
/// without counties, a special zone, a foreign city and one country.
pub const SAMPLE_ASSET: &str = "!function(){\
var p0=[[110000,['北京','北京'],1]];\
var p1=[[120000,['天津','天津'],1]];\
var p2=[[130000,['河北省','河北省'],1]];\
var p3=[[140000,['山西省','山西省'],1]];\
var c0=[[110100,['北京市','北京市'],110000,0],[120100,['天津市','天津市'],120000,0]];\
var c1=[[110101,['东城区','東城區'],110100,0],[110102,['西城区','西城區'],110100,0]];\
var c2=[[110199,['经济开发区','經濟開發區'],110100,2]];\
var f0=[[990100,['东京','東京','Tokyo'],990000]];\
var n0=[[2,['日本','日本','Japan'],0]];\
}();";

/// Rows the sample script contributes before any street is fetched.
pub const SAMPLE_TOP_LEVEL_ROWS: usize = 4 + 2 + 2 + 1 + 1 + 1 + 1;

/// In-memory [`AreaSource`] keyed by county id and locale.
#[derive(Default)]
pub struct InMemorySource {
    asset: Option<String>,
    streets: HashMap<(u64, Locale), String>,
    street_requests: AtomicUsize,
}

impl InMemorySource {
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: Some(asset.into()),
            ..Self::default()
        }
    }

    pub fn without_asset() -> Self {
        Self::default()
    }

    pub fn with_streets(
        mut self,
        county_id: u64,
        simplified: impl Into<String>,
        traditional: impl Into<String>,
    ) -> Self {
        self.streets
            .insert((county_id, Locale::Simplified), simplified.into());
        self.streets
            .insert((county_id, Locale::Traditional), traditional.into());
        self
    }

    pub fn street_requests(&self) -> usize {
        self.street_requests.load(Ordering::SeqCst)
    }
}

impl AreaSource for InMemorySource {
    fn fetch_asset(&self) -> BoxFuture<'_, Result<String>> {
        let asset = self.asset.clone();
        Box::pin(async move { asset.ok_or_else(|| anyhow!("asset unavailable")) })
    }

    fn fetch_streets(&self, job: StreetJob, locale: Locale) -> BoxFuture<'_, Result<String>> {
        self.street_requests.fetch_add(1, Ordering::SeqCst);
        let body = self.streets.get(&(job.county_id, locale)).cloned();
        Box::pin(async move { body.ok_or_else(|| anyhow!("no {locale} streets for {job}")) })
    }
}

pub fn shared(source: InMemorySource) -> Arc<InMemorySource> {
    Arc::new(source)
}

/// Reads a CSV file produced by the crawler into its header and data rows.
pub fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let header = reader
        .headers()
        .context("missing header row")?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("malformed csv row")?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((header, rows))
}

/// Rows whose `level` column marks a street.
pub fn street_rows(rows: &[Vec<String>]) -> Vec<&Vec<String>> {
    rows.iter().filter(|row| row[6] == "3").collect()
}
