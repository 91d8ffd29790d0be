//! Upstream access: the HTTP client, the address script parser, and the
//! pseudo-JSON payload helpers shared by both.

pub mod asset;
pub mod client;
mod metrics;
pub mod options;
pub mod payload;

pub use asset::parse_asset;
pub use client::{AreaSource, HttpAreaSource, Locale};
pub use metrics::SourceMetricsSnapshot;
pub use options::SourceOptions;
pub use payload::{decode_streets, StreetEntry};
