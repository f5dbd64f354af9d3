//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use cases require from the
//! outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `RaceObserver`: receives per-tick snapshots and race results
//! - `Prompt`: line-oriented question/answer input for race setup

pub mod observer;
pub mod prompt;
