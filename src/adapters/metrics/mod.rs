//! Metrics Adapters
//!
//! Prometheus registry for race and wagering counters. The text
//! exposition is dumped at exit; there is no scrape endpoint.

pub mod prometheus;

pub use prometheus::MetricsRegistry;
