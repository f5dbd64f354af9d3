//! Settlement Use Case - Resolve Wagers After a Race
//!
//! Settlement flow:
//! 1. Take the terminal outcome of a race
//! 2. Settle every bettor's latest pending wager against it (no winner: nothing settles)
//! 3. Aggregate paid-out and lost amounts into a report

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::bettor::{Bettor, Settlement};
use crate::domain::race::RaceOutcome;
use crate::domain::wager::WagerStatus;

/// Aggregated report from one settlement sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
  /// Outcome the wagers were settled against.
  pub outcome: RaceOutcome,
  /// Individual settlements, in bettor order.
  pub settlements: Vec<Settlement>,
  /// Payouts credited on top of returned stakes.
  pub total_paid_out: Decimal,
  /// Stakes kept by the house.
  pub total_lost: Decimal,
  /// Bettors with no pending wager this race.
  pub bettors_skipped: usize,
  /// Timestamp of the sweep.
  pub timestamp: DateTime<Utc>,
}

impl SettlementReport {
  /// Number of wagers settled as won.
  pub fn winners(&self) -> usize {
    self
      .settlements
      .iter()
      .filter(|s| s.status == WagerStatus::Won)
      .count()
  }
}

/// Settle every bettor's latest wager against `outcome`.
pub fn settle_wagers(bettors: &mut [Bettor], outcome: &RaceOutcome) -> SettlementReport {
  let mut settlements = Vec::with_capacity(bettors.len());
  let mut bettors_skipped = 0;

  for bettor in bettors.iter_mut() {
    match bettor.settle(outcome) {
      Some(settlement) => settlements.push(settlement),
      None => bettors_skipped += 1,
    }
  }

  let sum_where = |status: WagerStatus, pick: fn(&Settlement) -> Decimal| -> Decimal {
    settlements
      .iter()
      .filter(|s| s.status == status)
      .map(pick)
      .sum()
  };
  let total_paid_out = sum_where(WagerStatus::Won, |s| s.payout);
  let total_lost = sum_where(WagerStatus::Lost, |s| s.stake);

  let report = SettlementReport {
    outcome: outcome.clone(),
    settlements,
    total_paid_out,
    total_lost,
    bettors_skipped,
    timestamp: Utc::now(),
  };

  info!(
    settled = report.settlements.len(),
    winners = report.winners(),
    paid_out = %report.total_paid_out,
    lost = %report.total_lost,
    skipped = report.bettors_skipped,
    "Settlement sweep complete"
  );

  report
}
