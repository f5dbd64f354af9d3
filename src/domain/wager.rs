//! Wagers placed on a participant.
//!
//! The payout multiplier is captured at placement time from the
//! participant's record: `competitions / victories`, the inverse of its win
//! rate. Untested participants (no races or no wins) get the fallback
//! multiplier of 100.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::participant::{Participant, ParticipantId};

/// Multiplier used when a participant has no win history (`1 / 0.01`).
pub const FALLBACK_ODDS: Decimal = dec!(100);

/// Inverse win rate, or [`FALLBACK_ODDS`] when either counter is zero.
pub fn winning_odds(victories: u32, competitions: u32) -> Decimal {
    if victories == 0 || competitions == 0 {
        return FALLBACK_ODDS;
    }
    Decimal::from(competitions) / Decimal::from(victories)
}

/// Resolution state of a wager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WagerStatus {
    /// Waiting for a race with a winner.
    Pending,
    Won,
    Lost,
}

impl WagerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

impl std::fmt::Display for WagerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single stake on a participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wager {
    id: Uuid,
    participant: ParticipantId,
    participant_name: String,
    stake: Decimal,
    captured_odds: Decimal,
    status: WagerStatus,
    placed_at: DateTime<Utc>,
}

impl Wager {
    /// Open a wager on `participant`, capturing its current odds.
    pub fn new(participant: &Participant, stake: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            participant: participant.id(),
            participant_name: participant.name().to_string(),
            stake,
            captured_odds: winning_odds(participant.victories(), participant.competitions()),
            status: WagerStatus::Pending,
            placed_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    pub fn participant_name(&self) -> &str {
        &self.participant_name
    }

    pub fn stake(&self) -> Decimal {
        self.stake
    }

    pub fn captured_odds(&self) -> Decimal {
        self.captured_odds
    }

    pub fn status(&self) -> WagerStatus {
        self.status
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    pub fn is_won(&self) -> bool {
        self.status == WagerStatus::Won
    }

    /// `stake × captured_odds` when won, zero otherwise.
    pub fn payout(&self) -> Decimal {
        if self.is_won() {
            self.stake * self.captured_odds
        } else {
            Decimal::ZERO
        }
    }

    pub(crate) fn resolve(&mut self, status: WagerStatus) {
        self.status = status;
    }

    #[cfg(test)]
    pub(crate) fn with_odds(mut self, odds: Decimal) -> Self {
        self.captured_odds = odds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::participant::Confidence;

    #[test]
    fn test_fallback_odds_for_untested_participant() {
        assert_eq!(winning_odds(0, 0), dec!(100));
        assert_eq!(winning_odds(0, 7), dec!(100));
        assert_eq!(winning_odds(3, 0), dec!(100));
    }

    #[test]
    fn test_odds_are_inverse_win_rate() {
        assert_eq!(winning_odds(1, 2), dec!(2));
        assert_eq!(winning_odds(2, 5), dec!(2.5));
        assert_eq!(winning_odds(4, 4), dec!(1));
    }

    #[test]
    fn test_payout_only_when_won() {
        let horse = Participant::new(ParticipantId(1), "Bucephalus", "B", Confidence::ONE);
        let mut wager = Wager::new(&horse, dec!(100)).with_odds(dec!(2.0));
        assert_eq!(wager.status(), WagerStatus::Pending);
        assert_eq!(wager.payout(), Decimal::ZERO);

        wager.resolve(WagerStatus::Lost);
        assert_eq!(wager.payout(), Decimal::ZERO);

        wager.resolve(WagerStatus::Won);
        assert_eq!(wager.payout(), dec!(200));
    }

    #[test]
    fn test_captures_odds_at_placement() {
        let horse = Participant::new(ParticipantId(1), "Bucephalus", "B", Confidence::ONE);
        let wager = Wager::new(&horse, dec!(10));
        assert_eq!(wager.captured_odds(), FALLBACK_ODDS);
        assert_eq!(wager.participant_name(), "Bucephalus");
    }
}
