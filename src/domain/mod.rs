//! Domain layer - Race simulation core and wager ledger.
//!
//! Pure simulation logic: participants, the race state machine, draw
//! sources, and the bettor/wager ledger. Nothing here sleeps, renders or
//! performs I/O, so every rule can be driven headless from tests.

pub mod bettor;
pub mod draw;
pub mod gear;
pub mod participant;
pub mod race;
pub mod wager;

// Re-export core types for convenience
pub use bettor::{Bettor, BettorStats, Settlement, WagerError};
pub use draw::{RecordingDraws, ReplayDraws, UnitDraw};
pub use gear::{Gear, ParseGearError, Species};
pub use participant::{Confidence, Participant, ParticipantId, RaceVariant, StepEvent};
pub use race::{LaneSnapshot, Race, RaceError, RaceOutcome, RaceSnapshot, RaceState};
pub use wager::{FALLBACK_ODDS, Wager, WagerStatus, winning_odds};
