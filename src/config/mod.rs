//! Configuration Module - TOML-based Simulator Configuration
//!
//! Loads and validates configuration from `config.toml`. The roster of
//! participants, the bettors and their wagers, the track and the pacing
//! all live here; nothing in the domain layer is hardcoded.

pub mod loader;

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::Deserialize;

use crate::domain::gear::{Gear, ParseGearError, Species};
use crate::domain::participant::RaceVariant;

/// Field size accepted by the wagering variant.
pub const WAGERING_PARTICIPANTS: RangeInclusive<usize> = 2..=4;

/// Number of bettors accepted by the wagering variant.
pub const WAGERING_BETTORS: RangeInclusive<usize> = 2..=5;

/// Track lengths accepted by the wagering variant.
pub const WAGERING_TRACK_LENGTH: RangeInclusive<u32> = 300..=510;

/// Horses prompted for in the classic variant when none are configured.
pub const CLASSIC_FIELD_SIZE: usize = 3;

/// Top-level simulator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Mode, pacing, logging.
  pub simulator: SimulatorConfig,
  /// Track definition. Classic mode prompts for it when absent.
  pub track: Option<TrackConfig>,
  /// Participants in lane order. Classic mode prompts when empty.
  #[serde(default)]
  pub participants: Vec<ParticipantConfig>,
  /// Bettors (wagering mode only).
  #[serde(default)]
  pub bettors: Vec<BettorConfig>,
  /// Metrics export.
  #[serde(default)]
  pub metrics: MetricsConfig,
}

/// Simulator behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
  /// Human-readable session name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
  /// Emit JSON log lines instead of plain text.
  #[serde(default)]
  pub json_logs: bool,
  /// Movement rule: `classic` or `wagering`.
  #[serde(default)]
  pub mode: RaceVariant,
  /// Seed for reproducible races. Random when absent.
  pub seed: Option<u64>,
  /// Delay between ticks. Defaults to 200ms classic, 100ms wagering.
  pub tick_interval_ms: Option<u64>,
  /// Give up on a race after this many ticks.
  #[serde(default = "default_max_ticks")]
  pub max_ticks: u64,
  /// Races to run in a wagering session.
  #[serde(default = "default_races")]
  pub races: u32,
  /// Draw the ASCII track every tick.
  #[serde(default = "default_true")]
  pub render: bool,
  /// Clear the terminal before each frame.
  #[serde(default = "default_true")]
  pub clear_screen: bool,
}

impl SimulatorConfig {
  /// Effective inter-tick delay for the configured mode.
  pub fn tick_interval(&self) -> Duration {
    let ms = self.tick_interval_ms.unwrap_or(match self.mode {
      RaceVariant::Classic => 200,
      RaceVariant::Wagering => 100,
    });
    Duration::from_millis(ms)
  }
}

/// Track definition.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackConfig {
  /// Distance to the finish line.
  pub length: u32,
}

/// One participant.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantConfig {
  pub name: String,
  /// Glyph drawn on the track.
  pub symbol: String,
  /// Confidence (classic) or base velocity (wagering); clamped to [0, 1].
  pub confidence: f64,
  pub species: Option<Species>,
  /// Gear tags, case-insensitive: saddle, horseshoes, bridle.
  #[serde(default)]
  pub gear: Vec<String>,
}

impl ParticipantConfig {
  /// Parse the gear tags.
  pub fn parsed_gear(&self) -> Result<Vec<Gear>, ParseGearError> {
    self.gear.iter().map(|g| g.parse()).collect()
  }
}

/// One bettor and the wager it places before each race.
#[derive(Debug, Clone, Deserialize)]
pub struct BettorConfig {
  pub name: String,
  #[serde(default = "default_balance")]
  pub initial_balance: f64,
  pub wager: Option<WagerConfig>,
}

/// A standing wager, placed again before every race.
#[derive(Debug, Clone, Deserialize)]
pub struct WagerConfig {
  /// Participant name to back.
  pub participant: String,
  pub stake: f64,
}

/// Metrics export configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
  /// Dump Prometheus text exposition to stderr at exit.
  #[serde(default)]
  pub enabled: bool,
}

// Default value functions for serde

fn default_name() -> String {
  "equine-race-sim".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_true() -> bool {
  true
}

fn default_max_ticks() -> u64 {
  100_000
}

fn default_races() -> u32 {
  1
}

fn default_balance() -> f64 {
  1000.0
}
