//! Bettor ledger: balance, wager history and running totals.
//!
//! Stakes are debited when a wager is placed. At race end only the latest
//! wager is settled; a win credits the stake back plus the payout, a loss
//! books the stake as a loss. A race with no winner settles nothing: the
//! wager stays pending and its debited stake is not returned.

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::participant::{Participant, ParticipantId};
use super::race::RaceOutcome;
use super::wager::{Wager, WagerStatus};

/// Reasons a wager can be refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WagerError {
    #[error("wager amount must be positive, got {0}")]
    NonPositiveStake(Decimal),
    #[error("insufficient balance: stake {stake} exceeds balance {balance}")]
    InsufficientBalance { stake: Decimal, balance: Decimal },
    #[error("no participant {0} in this race")]
    UnknownParticipant(ParticipantId),
    #[error("no bettor at index {0}")]
    UnknownBettor(usize),
}

impl WagerError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NonPositiveStake(_) => "non_positive_stake",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::UnknownParticipant(_) => "unknown_participant",
            Self::UnknownBettor(_) => "unknown_bettor",
        }
    }
}

/// Result of settling one bettor's latest wager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub bettor: String,
    pub wager_id: Uuid,
    pub participant: ParticipantId,
    pub status: WagerStatus,
    pub stake: Decimal,
    pub payout: Decimal,
    pub balance_after: Decimal,
}

/// Summary figures for one bettor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BettorStats {
    pub bettor: String,
    pub balance: Decimal,
    pub victories: u32,
    pub competitions: u32,
    /// Percentage of settled wagers that won.
    pub win_rate_pct: f64,
    pub total_winnings: Decimal,
    pub total_losses: Decimal,
    pub net: Decimal,
}

/// A person placing wagers across races.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bettor {
    name: String,
    balance: Decimal,
    history: Vec<Wager>,
    victories: u32,
    competitions: u32,
    total_winnings: Decimal,
    total_losses: Decimal,
}

impl Bettor {
    pub fn new(name: impl Into<String>, initial_balance: Decimal) -> Self {
        Self {
            name: name.into(),
            balance: initial_balance,
            history: Vec::new(),
            victories: 0,
            competitions: 0,
            total_winnings: Decimal::ZERO,
            total_losses: Decimal::ZERO,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn history(&self) -> &[Wager] {
        &self.history
    }

    pub fn victories(&self) -> u32 {
        self.victories
    }

    /// Number of settled (won or lost) wagers.
    pub fn competitions(&self) -> u32 {
        self.competitions
    }

    pub fn total_winnings(&self) -> Decimal {
        self.total_winnings
    }

    pub fn total_losses(&self) -> Decimal {
        self.total_losses
    }

    /// Debit `stake` and record a pending wager on `participant`.
    ///
    /// # Errors
    /// Rejects non-positive stakes and stakes above the balance; the
    /// balance is unchanged in both cases.
    pub fn place_wager(
        &mut self,
        participant: &Participant,
        stake: Decimal,
    ) -> Result<&Wager, WagerError> {
        if stake <= Decimal::ZERO {
            return Err(WagerError::NonPositiveStake(stake));
        }
        if stake > self.balance {
            return Err(WagerError::InsufficientBalance {
                stake,
                balance: self.balance,
            });
        }
        self.balance -= stake;
        self.history.push(Wager::new(participant, stake));
        Ok(&self.history[self.history.len() - 1])
    }

    /// Settle the latest wager against a finished race.
    ///
    /// Returns `None` when the race has no winner or there is no pending
    /// latest wager. Older pending wagers are left unresolved.
    pub fn settle(&mut self, outcome: &RaceOutcome) -> Option<Settlement> {
        let winner = outcome.winner()?;
        let stale = self
            .history
            .iter()
            .rev()
            .skip(1)
            .filter(|w| w.status() == WagerStatus::Pending)
            .count();
        if stale > 0 {
            warn!(
                bettor = %self.name,
                unresolved = stale,
                "Only the latest wager is settled; earlier pending wagers stay open"
            );
        }

        let wager = self.history.last_mut()?;
        if wager.status() != WagerStatus::Pending {
            return None;
        }

        let stake = wager.stake();
        if winner == wager.participant() {
            wager.resolve(WagerStatus::Won);
            let payout = wager.payout();
            self.balance += stake + payout;
            self.total_winnings += payout;
            self.victories += 1;
        } else {
            wager.resolve(WagerStatus::Lost);
            self.total_losses += stake;
        }
        self.competitions += 1;

        Some(Settlement {
            bettor: self.name.clone(),
            wager_id: wager.id(),
            participant: wager.participant(),
            status: wager.status(),
            stake,
            payout: wager.payout(),
            balance_after: self.balance,
        })
    }

    /// Victories, win rate and money totals.
    pub fn stats(&self) -> BettorStats {
        let win_rate_pct = if self.competitions > 0 {
            f64::from(self.victories) / f64::from(self.competitions) * 100.0
        } else {
            0.0
        };
        BettorStats {
            bettor: self.name.clone(),
            balance: self.balance,
            victories: self.victories,
            competitions: self.competitions,
            win_rate_pct,
            total_winnings: self.total_winnings,
            total_losses: self.total_losses,
            net: self.total_winnings - self.total_losses,
        }
    }

    /// Balance as `f64` for gauges.
    pub fn balance_f64(&self) -> f64 {
        self.balance.to_f64().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::participant::Confidence;

    fn horse(id: u32, name: &str) -> Participant {
        Participant::new(ParticipantId(id), name, &name[..1], Confidence::new(dec!(0.5)))
    }

    fn won_by(p: &Participant) -> RaceOutcome {
        RaceOutcome::Won {
            participant: p.id(),
            lane: 1,
            name: p.name().to_string(),
        }
    }

    /// Replace the captured odds of the latest wager.
    fn set_latest_odds(bettor: &mut Bettor, odds: Decimal) {
        let wager = bettor.history.pop().unwrap().with_odds(odds);
        bettor.history.push(wager);
    }

    #[test]
    fn test_winning_wager_credits_stake_and_payout() {
        let arrow = horse(1, "Arrow");
        let mut bettor = Bettor::new("Ann", dec!(1000));
        bettor.place_wager(&arrow, dec!(100)).unwrap();
        set_latest_odds(&mut bettor, dec!(2.0));
        assert_eq!(bettor.balance(), dec!(900));

        let settlement = bettor.settle(&won_by(&arrow)).unwrap();
        assert_eq!(settlement.status, WagerStatus::Won);
        assert_eq!(settlement.payout, dec!(200));
        assert_eq!(bettor.balance(), dec!(1200));
        assert_eq!(bettor.total_winnings(), dec!(200));
        assert_eq!(bettor.victories(), 1);
    }

    #[test]
    fn test_losing_wager_books_stake_as_loss() {
        let arrow = horse(1, "Arrow");
        let blaze = horse(2, "Blaze");
        let mut bettor = Bettor::new("Ann", dec!(1000));
        bettor.place_wager(&arrow, dec!(100)).unwrap();
        set_latest_odds(&mut bettor, dec!(2.0));

        let settlement = bettor.settle(&won_by(&blaze)).unwrap();
        assert_eq!(settlement.status, WagerStatus::Lost);
        assert_eq!(settlement.payout, Decimal::ZERO);
        assert_eq!(bettor.balance(), dec!(900));
        assert_eq!(bettor.total_losses(), dec!(100));
        assert_eq!(bettor.stats().net, dec!(-100));
    }

    #[test]
    fn test_over_balance_wager_rejected() {
        let arrow = horse(1, "Arrow");
        let mut bettor = Bettor::new("Ann", dec!(50));
        let err = bettor.place_wager(&arrow, dec!(50.01)).unwrap_err();
        assert_eq!(
            err,
            WagerError::InsufficientBalance {
                stake: dec!(50.01),
                balance: dec!(50)
            }
        );
        assert_eq!(bettor.balance(), dec!(50));
        assert!(bettor.history().is_empty());

        assert_eq!(
            bettor.place_wager(&arrow, dec!(0)).unwrap_err(),
            WagerError::NonPositiveStake(dec!(0))
        );
        // exactly the balance is fine
        bettor.place_wager(&arrow, dec!(50)).unwrap();
        assert_eq!(bettor.balance(), Decimal::ZERO);
    }

    #[test]
    fn test_settles_once_per_wager() {
        let arrow = horse(1, "Arrow");
        let mut bettor = Bettor::new("Ann", dec!(1000));
        bettor.place_wager(&arrow, dec!(100)).unwrap();
        assert!(bettor.settle(&won_by(&arrow)).is_some());
        assert!(bettor.settle(&won_by(&arrow)).is_none());
        assert_eq!(bettor.competitions(), 1);
    }

    #[test]
    fn test_only_latest_wager_is_settled() {
        let arrow = horse(1, "Arrow");
        let blaze = horse(2, "Blaze");
        let mut bettor = Bettor::new("Ann", dec!(1000));
        bettor.place_wager(&arrow, dec!(100)).unwrap();
        bettor.place_wager(&blaze, dec!(100)).unwrap();
        bettor.settle(&won_by(&arrow)).unwrap();

        assert_eq!(bettor.history()[0].status(), WagerStatus::Pending);
        assert_eq!(bettor.history()[1].status(), WagerStatus::Lost);
        assert_eq!(bettor.balance(), dec!(800));
    }

    #[test]
    fn test_all_fallen_settles_nothing() {
        let arrow = horse(1, "Arrow");
        let mut bettor = Bettor::new("Ann", dec!(1000));
        bettor.place_wager(&arrow, dec!(100)).unwrap();

        assert!(bettor.settle(&RaceOutcome::AllFallen).is_none());
        // stake stays debited, wager stays open
        assert_eq!(bettor.balance(), dec!(900));
        assert_eq!(bettor.history()[0].status(), WagerStatus::Pending);
        assert_eq!(bettor.competitions(), 0);
        assert_eq!(bettor.total_losses(), Decimal::ZERO);

        // a later winner still settles it
        assert_eq!(
            bettor.settle(&won_by(&arrow)).map(|s| s.status),
            Some(WagerStatus::Won)
        );
    }

    #[test]
    fn test_stats_win_rate() {
        let arrow = horse(1, "Arrow");
        let blaze = horse(2, "Blaze");
        let mut bettor = Bettor::new("Ann", dec!(1000));
        bettor.place_wager(&arrow, dec!(10)).unwrap();
        bettor.settle(&won_by(&arrow)).unwrap();
        bettor.place_wager(&arrow, dec!(10)).unwrap();
        bettor.settle(&won_by(&blaze)).unwrap();

        let stats = bettor.stats();
        assert_eq!(stats.victories, 1);
        assert_eq!(stats.competitions, 2);
        assert!((stats.win_rate_pct - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_winnings, dec!(1000));
        assert_eq!(stats.total_losses, dec!(10));
        assert_eq!(stats.net, dec!(990));
    }
}
