//! Betting Session - Wagering Variant Controller
//!
//! Owns one race and its bettors across consecutive races:
//! 1. Bettors place wagers (stake debited immediately)
//! 2. The race runs through the `RaceRunner`
//! 3. Every bettor's latest wager is settled against the outcome
//!
//! The session has no knowledge of rendering; observers attached to the
//! runner handle presentation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::domain::bettor::{Bettor, BettorStats, WagerError};
use crate::domain::draw::UnitDraw;
use crate::domain::participant::ParticipantId;
use crate::domain::race::Race;
use crate::domain::wager::{Wager, WagerStatus};
use crate::ports::observer::RaceObserver;
use crate::usecases::race_runner::{RaceRunner, RunOutcome, RunnerError};
use crate::usecases::settlement::{SettlementReport, settle_wagers};
use crate::usecases::setup::race_from_config;

/// A standing wager taken from config, placed before every race.
#[derive(Debug, Clone, PartialEq)]
struct StandingWager {
  bettor: usize,
  participant: ParticipantId,
  stake: Decimal,
}

/// One row of the wager history table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WagerRow {
  pub bettor: String,
  pub participant: String,
  pub stake: Decimal,
  pub odds: Decimal,
  pub status: WagerStatus,
  pub won: bool,
  pub placed_at: DateTime<Utc>,
}

/// Per-participant record as shown next to the odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantRecord {
  pub lane: usize,
  pub name: String,
  pub victories: u32,
  pub competitions: u32,
  pub velocity: Decimal,
}

/// Serializable end-of-session summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
  pub races_run: u32,
  pub participants: Vec<ParticipantRecord>,
  pub bettors: Vec<BettorStats>,
  pub history: Vec<WagerRow>,
  pub generated_at: DateTime<Utc>,
}

/// Wagering variant controller.
pub struct BettingSession {
  race: Race,
  bettors: Vec<Bettor>,
  standing: Vec<StandingWager>,
  races_run: u32,
}

impl BettingSession {
  /// Session over an already-built race with no bettors yet.
  pub fn new(race: Race) -> Self {
    Self {
      race,
      bettors: Vec::new(),
      standing: Vec::new(),
      races_run: 0,
    }
  }

  /// Build race, bettors and standing wagers from a validated config.
  pub fn from_config(config: &AppConfig) -> Result<Self> {
    let mut session = Self::new(race_from_config(config)?);

    for entry in &config.bettors {
      let balance = Decimal::from_f64(entry.initial_balance)
        .with_context(|| format!("Bettor {} has an unrepresentable balance", entry.name))?;
      let idx = session.add_bettor(Bettor::new(entry.name.clone(), balance));

      if let Some(wager) = &entry.wager {
        let participant = session
          .participant_by_name(&wager.participant)
          .with_context(|| format!("Unknown participant '{}'", wager.participant))?;
        let stake = Decimal::from_f64(wager.stake)
          .with_context(|| format!("Bettor {} has an unrepresentable stake", entry.name))?;
        session.standing.push(StandingWager {
          bettor: idx,
          participant,
          stake,
        });
      }
    }

    info!(
      participants = session.race.participants().len(),
      bettors = session.bettors.len(),
      standing_wagers = session.standing.len(),
      "Betting session ready"
    );
    Ok(session)
  }

  /// Add a bettor and return its index.
  pub fn add_bettor(&mut self, bettor: Bettor) -> usize {
    self.bettors.push(bettor);
    self.bettors.len() - 1
  }

  pub fn race(&self) -> &Race {
    &self.race
  }

  pub fn race_mut(&mut self) -> &mut Race {
    &mut self.race
  }

  pub fn bettors(&self) -> &[Bettor] {
    &self.bettors
  }

  pub fn races_run(&self) -> u32 {
    self.races_run
  }

  /// Look up a participant id by name.
  pub fn participant_by_name(&self, name: &str) -> Option<ParticipantId> {
    self
      .race
      .participants()
      .iter()
      .find(|p| p.name() == name)
      .map(|p| p.id())
  }

  /// Place a wager for bettor `bettor` on `participant`.
  ///
  /// # Errors
  /// Unknown bettor or participant, non-positive stake, or stake above
  /// the bettor's balance. Nothing changes on error.
  pub fn place_wager(
    &mut self,
    bettor: usize,
    participant: ParticipantId,
    stake: Decimal,
  ) -> Result<Wager, WagerError> {
    let horse = self
      .race
      .participant(participant)
      .ok_or(WagerError::UnknownParticipant(participant))?;
    let bettor_ref = self
      .bettors
      .get_mut(bettor)
      .ok_or(WagerError::UnknownBettor(bettor))?;

    let wager = bettor_ref.place_wager(horse, stake)?.clone();
    info!(
      bettor = %bettor_ref.name(),
      participant = %wager.participant_name(),
      stake = %stake,
      odds = %wager.captured_odds(),
      balance = %bettor_ref.balance(),
      "Wager placed"
    );
    Ok(wager)
  }

  /// Place every standing wager from config.
  ///
  /// Rejections are logged and returned; they never stop the race.
  pub fn place_standing_wagers(&mut self) -> (Vec<Wager>, Vec<WagerError>) {
    let mut placed = Vec::new();
    let mut rejected = Vec::new();
    for standing in self.standing.clone() {
      match self.place_wager(standing.bettor, standing.participant, standing.stake) {
        Ok(wager) => placed.push(wager),
        Err(e) => {
          warn!(bettor = standing.bettor, error = %e, "Wager rejected");
          rejected.push(e);
        }
      }
    }
    (placed, rejected)
  }

  /// Run the race once and settle wagers if it finished.
  ///
  /// A cancelled run leaves every wager pending.
  pub async fn run_race<O, D>(
    &mut self,
    runner: &RaceRunner<O>,
    draws: &mut D,
    shutdown_rx: &mut broadcast::Receiver<()>,
  ) -> Result<Option<SettlementReport>, RunnerError>
  where
    O: RaceObserver + ?Sized,
    D: UnitDraw + Send + ?Sized,
  {
    match runner.run(&mut self.race, draws, shutdown_rx).await? {
      RunOutcome::Finished(report) => {
        self.races_run += 1;
        Ok(Some(settle_wagers(&mut self.bettors, &report.outcome)))
      }
      RunOutcome::Cancelled { tick } => {
        warn!(tick, "Race cancelled, wagers left pending");
        Ok(None)
      }
    }
  }

  /// Per-bettor statistics.
  pub fn statistics(&self) -> Vec<BettorStats> {
    self.bettors.iter().map(Bettor::stats).collect()
  }

  /// Every wager ever placed, bettor by bettor, oldest first.
  pub fn wager_history(&self) -> Vec<WagerRow> {
    self
      .bettors
      .iter()
      .flat_map(|bettor| {
        bettor.history().iter().map(move |w| WagerRow {
          bettor: bettor.name().to_string(),
          participant: w.participant_name().to_string(),
          stake: w.stake(),
          odds: w.captured_odds(),
          status: w.status(),
          won: w.is_won(),
          placed_at: w.placed_at(),
        })
      })
      .collect()
  }

  /// Participant records in lane order.
  pub fn participant_records(&self) -> Vec<ParticipantRecord> {
    self
      .race
      .participants()
      .iter()
      .enumerate()
      .map(|(i, p)| ParticipantRecord {
        lane: i + 1,
        name: p.name().to_string(),
        victories: p.victories(),
        competitions: p.competitions(),
        velocity: p.effective_velocity(),
      })
      .collect()
  }

  pub fn report(&self) -> SessionReport {
    SessionReport {
      races_run: self.races_run,
      participants: self.participant_records(),
      bettors: self.statistics(),
      history: self.wager_history(),
      generated_at: Utc::now(),
    }
  }
}
