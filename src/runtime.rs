//! Runtime glue: configuration, error taxonomy, telemetry, and the crawl
//! runner that wires them together.

pub mod config;
pub mod error;
pub mod runner;
pub mod telemetry;
