//! Failure taxonomy for the leaf crawl. Every variant is handled where it
//! occurs: logged, counted, and the affected job yields no rows.

use crate::source::Locale;
use std::time::Duration;

#[derive(Debug)]
pub enum CrawlError {
    Retrieval { locale: Locale, reason: String },
    Status { locale: Locale, status: u16 },
    Timeout { locale: Locale, after: Duration },
    Decode { reason: String },
    Write { reason: String },
}

impl CrawlError {
    pub fn decode(reason: impl Into<String>) -> Self {
        CrawlError::Decode {
            reason: reason.into(),
        }
    }

    pub fn write(reason: impl Into<String>) -> Self {
        CrawlError::Write {
            reason: reason.into(),
        }
    }

    /// True for transport, status, and deadline failures.
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            CrawlError::Retrieval { .. } | CrawlError::Status { .. } | CrawlError::Timeout { .. }
        )
    }
}

impl std::fmt::Display for CrawlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrawlError::Retrieval { locale, reason } => {
                write!(f, "{locale} retrieval failed: {reason}")
            }
            CrawlError::Status { locale, status } => {
                write!(f, "{locale} retrieval returned HTTP {status}")
            }
            CrawlError::Timeout { locale, after } => {
                write!(f, "{locale} retrieval timed out after {after:?}")
            }
            CrawlError::Decode { reason } => write!(f, "failed to decode street list: {reason}"),
            CrawlError::Write { reason } => write!(f, "failed to write rows: {reason}"),
        }
    }
}

impl std::error::Error for CrawlError {}
