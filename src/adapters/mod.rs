//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! terminal and metrics backends.
//!
//! Adapter categories:
//! - `console`: ASCII track renderer, line prompt, JSON session report
//! - `metrics`: Prometheus counters and gauges for races and wagers

pub mod console;
pub mod metrics;
