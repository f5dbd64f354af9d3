//! Race Setup Use Case - Build Races from Config or Prompts
//!
//! Classic races can be described in `config.toml` or entered line by
//! line. Invalid answers are reported and asked again; they never abort
//! setup. Only an exhausted input stream does.

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AppConfig, ParticipantConfig};
use crate::domain::participant::{Confidence, Participant, ParticipantId, RaceVariant};
use crate::domain::race::{Race, RaceError};
use crate::ports::prompt::Prompt;

/// Rejected user input. Always recoverable by asking again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
  #[error("input must not be empty")]
  Empty,
  #[error("'{0}' is not a valid number")]
  NotANumber(String),
  #[error("{value} is out of range, expected {min}..={max}")]
  OutOfRange {
    value: String,
    min: String,
    max: String,
  },
}

/// Parse a number and check it lies in `range`.
pub fn parse_in_range<T>(input: &str, range: &RangeInclusive<T>) -> Result<T, InputError>
where
  T: FromStr + PartialOrd + Display,
{
  let trimmed = input.trim();
  if trimmed.is_empty() {
    return Err(InputError::Empty);
  }
  let value: T = trimmed
    .parse()
    .map_err(|_| InputError::NotANumber(trimmed.to_string()))?;
  if !range.contains(&value) {
    return Err(InputError::OutOfRange {
      value: value.to_string(),
      min: range.start().to_string(),
      max: range.end().to_string(),
    });
  }
  Ok(value)
}

/// Parse a confidence. Any finite number is accepted and clamped.
pub fn parse_confidence(input: &str) -> Result<Confidence, InputError> {
  let trimmed = input.trim();
  if trimmed.is_empty() {
    return Err(InputError::Empty);
  }
  let value: f64 = trimmed
    .parse()
    .map_err(|_| InputError::NotANumber(trimmed.to_string()))?;
  if !value.is_finite() {
    return Err(InputError::NotANumber(trimmed.to_string()));
  }
  Ok(Confidence::from_f64(value))
}

/// Non-empty text, trimmed.
pub fn parse_text(input: &str) -> Result<String, InputError> {
  let trimmed = input.trim();
  if trimmed.is_empty() {
    return Err(InputError::Empty);
  }
  Ok(trimmed.to_string())
}

/// First character of the answer.
pub fn parse_symbol(input: &str) -> Result<String, InputError> {
  input
    .trim()
    .chars()
    .next()
    .map(String::from)
    .ok_or(InputError::Empty)
}

/// Ask `question` until `parse` accepts the answer.
///
/// # Errors
/// Fails only when the input is exhausted or the prompt itself fails.
pub fn ask_until_valid<P, T, F>(prompt: &mut P, question: &str, parse: F) -> Result<T>
where
  P: Prompt + ?Sized,
  F: Fn(&str) -> Result<T, InputError>,
{
  loop {
    let answer = prompt
      .ask(question)?
      .with_context(|| format!("Input closed while waiting for: {question}"))?;
    match parse(&answer) {
      Ok(value) => return Ok(value),
      Err(e) => {
        debug!(error = %e, question, "Rejected input");
        prompt.notify(&format!("Invalid input: {e}. Please try again."))?;
      }
    }
  }
}

/// Prompt for a classic race: track length, then `horses` horses.
///
/// Each horse is enlisted in lane `i`; a rejected lane is reported and
/// the horse is left out.
pub fn prompt_classic_race<P: Prompt + ?Sized>(
  prompt: &mut P,
  horses: usize,
  track_length: Option<u32>,
) -> Result<Race> {
  let length = match track_length {
    Some(length) => length,
    None => ask_until_valid(prompt, "Enter the track length: ", |s| {
      parse_in_range(s, &(1..=u32::MAX))
    })?,
  };
  let mut race = Race::new(length, RaceVariant::Classic)?;

  for lane in 1..=horses {
    prompt.notify(&format!("Enter details for Horse {lane}:"))?;
    let name = ask_until_valid(prompt, "Name: ", parse_text)?;
    let symbol = ask_until_valid(prompt, "Symbol: ", parse_symbol)?;
    let confidence = ask_until_valid(prompt, "Confidence (0.0 - 1.0): ", parse_confidence)?;

    let horse = Participant::new(ParticipantId(0), name, symbol, confidence);
    enlist_or_report(prompt, &mut race, horse, lane)?;
  }

  Ok(race)
}

fn enlist_or_report<P: Prompt + ?Sized>(
  prompt: &mut P,
  race: &mut Race,
  horse: Participant,
  lane: usize,
) -> Result<()> {
  let name = horse.name().to_string();
  match race.enlist(horse, lane) {
    Ok(_) => Ok(()),
    Err(e @ RaceError::InvalidLane { .. }) => {
      warn!(horse = %name, lane, error = %e, "Horse not enlisted");
      prompt.notify("Invalid lane number. Horse not enlisted in the contest.")
    }
    Err(e) => Err(e.into()),
  }
}

/// Build a participant from its config entry.
pub fn participant_from_config(entry: &ParticipantConfig) -> Result<Participant> {
  let gear = entry
    .parsed_gear()
    .with_context(|| format!("Invalid gear for {}", entry.name))?;
  let mut participant = Participant::new(
    ParticipantId(0),
    entry.name.clone(),
    entry.symbol.clone(),
    Confidence::from_f64(entry.confidence),
  )
  .with_gear(gear);
  if let Some(species) = entry.species {
    participant = participant.with_species(species);
  }
  Ok(participant)
}

/// Build a race from the `[track]` and `[[participants]]` sections.
pub fn race_from_config(config: &AppConfig) -> Result<Race> {
  let track = config
    .track
    .as_ref()
    .context("No [track] section configured")?;
  let mut race = Race::new(track.length, config.simulator.mode)?;
  for entry in &config.participants {
    race.add(participant_from_config(entry)?)?;
  }
  Ok(race)
}
