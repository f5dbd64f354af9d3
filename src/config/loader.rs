//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::{
  AppConfig, WAGERING_BETTORS, WAGERING_PARTICIPANTS, WAGERING_TRACK_LENGTH,
};
use crate::domain::participant::RaceVariant;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    mode = ?config.simulator.mode,
    participants = config.participants.len(),
    bettors = config.bettors.len(),
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;
  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Positive track length and tick limit
/// - Well-formed participants (names, symbols, gear tags, unique names)
/// - Wagering-mode ranges for field size, bettors and track length
/// - Wagers that reference a configured participant with a positive stake
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    config.simulator.max_ticks > 0,
    "max_ticks must be positive"
  );

  if let Some(track) = &config.track {
    anyhow::ensure!(track.length > 0, "Track length must be positive");
  }

  let mut names = HashSet::new();
  for (i, p) in config.participants.iter().enumerate() {
    anyhow::ensure!(
      !p.name.trim().is_empty(),
      "Participant {} has an empty name",
      i
    );
    anyhow::ensure!(
      !p.symbol.is_empty(),
      "Participant {} ({}) has an empty symbol",
      i,
      p.name
    );
    anyhow::ensure!(
      names.insert(p.name.as_str()),
      "Participant name '{}' is used more than once",
      p.name
    );
    p.parsed_gear()
      .with_context(|| format!("Participant {} ({}) has invalid gear", i, p.name))?;
  }

  anyhow::ensure!(
    config.participants.is_empty() || config.track.is_some(),
    "Configured participants need a [track] section"
  );

  match config.simulator.mode {
    RaceVariant::Classic => {
      anyhow::ensure!(
        config.bettors.is_empty(),
        "Bettors are only supported in wagering mode"
      );
    }
    RaceVariant::Wagering => validate_wagering(config, &names)?,
  }

  Ok(())
}

fn validate_wagering(config: &AppConfig, names: &HashSet<&str>) -> Result<()> {
  let track = config
    .track
    .as_ref()
    .context("Wagering mode requires a [track] section")?;
  anyhow::ensure!(
    WAGERING_TRACK_LENGTH.contains(&track.length),
    "Track length must be in {}..={}, got {}",
    WAGERING_TRACK_LENGTH.start(),
    WAGERING_TRACK_LENGTH.end(),
    track.length
  );
  anyhow::ensure!(
    WAGERING_PARTICIPANTS.contains(&config.participants.len()),
    "Wagering mode needs {}..={} participants, got {}",
    WAGERING_PARTICIPANTS.start(),
    WAGERING_PARTICIPANTS.end(),
    config.participants.len()
  );
  anyhow::ensure!(
    WAGERING_BETTORS.contains(&config.bettors.len()),
    "Wagering mode needs {}..={} bettors, got {}",
    WAGERING_BETTORS.start(),
    WAGERING_BETTORS.end(),
    config.bettors.len()
  );
  anyhow::ensure!(config.simulator.races > 0, "races must be positive");

  for bettor in &config.bettors {
    anyhow::ensure!(
      bettor.initial_balance >= 0.0,
      "Bettor {} has a negative initial balance",
      bettor.name
    );
    if let Some(wager) = &bettor.wager {
      anyhow::ensure!(
        names.contains(wager.participant.as_str()),
        "Bettor {} backs unknown participant '{}'",
        bettor.name,
        wager.participant
      );
      anyhow::ensure!(
        wager.stake > 0.0,
        "Bettor {} has a non-positive stake {}",
        bettor.name,
        wager.stake
      );
    }
  }

  Ok(())
}
