//! Use Cases Layer - Application Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! simulator's workflows. Each use case is a self-contained operation.
//!
//! Use cases:
//! - `RaceRunner`: Paced race loop with cancellation and snapshots
//! - `Setup`: Build races from config or interactive prompts
//! - `Settlement`: Resolve every bettor's latest wager after a race
//! - `BettingSession`: Wagering variant controller across races

pub mod betting_session;
pub mod race_runner;
pub mod settlement;
pub mod setup;
