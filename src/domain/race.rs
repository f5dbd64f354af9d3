//! Race state machine.
//!
//! A race owns its participants in lane order and a fixed track length.
//! `start` resets everyone to the line, `step` runs one tick and evaluates
//! the terminal conditions, `snapshot` hands out a read-only copy for
//! renderers.
//!
//! ```text
//! NotStarted ──start──▶ Running ──step──▶ Won { .. } | AllFallen
//!      ▲                                        │
//!      └──────────────── start ◀────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::draw::UnitDraw;
use super::participant::{Participant, ParticipantId, RaceVariant};

/// Recoverable race setup and stepping errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaceError {
    /// Track length must be positive.
    #[error("track length must be positive")]
    ZeroLength,
    /// Lane numbers are 1-based and may extend the field by one.
    #[error("invalid lane {lane}: expected 1..={max}")]
    InvalidLane { lane: usize, max: usize },
    /// A race needs at least one participant.
    #[error("cannot start a race with no participants")]
    NoParticipants,
    /// The field and track are locked while a race runs.
    #[error("race is already running")]
    AlreadyRunning,
    /// `step` was called outside the running state.
    #[error("race is not running")]
    NotRunning,
}

/// Terminal result of a race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RaceOutcome {
    /// A participant reached the finish line first (lowest lane on ties).
    Won {
        participant: ParticipantId,
        lane: usize,
        name: String,
    },
    /// Every participant fell before anyone finished.
    AllFallen,
}

impl RaceOutcome {
    /// The winner, if there is one.
    pub fn winner(&self) -> Option<ParticipantId> {
        match self {
            Self::Won { participant, .. } => Some(*participant),
            Self::AllFallen => None,
        }
    }
}

/// Race lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RaceState {
    #[default]
    NotStarted,
    Running { tick: u64 },
    Finished { tick: u64, outcome: RaceOutcome },
}

impl RaceState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    pub fn outcome(&self) -> Option<&RaceOutcome> {
        match self {
            Self::Finished { outcome, .. } => Some(outcome),
            _ => None,
        }
    }
}

/// Read-only view of one lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneSnapshot {
    pub lane: usize,
    pub id: ParticipantId,
    pub name: String,
    pub symbol: String,
    pub position: f64,
    pub fallen: bool,
    pub confidence: f64,
}

/// Read-only view of the whole race, published once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub track_length: u32,
    pub variant: RaceVariant,
    pub state: RaceState,
    pub lanes: Vec<LaneSnapshot>,
}

impl RaceSnapshot {
    /// Ticks completed so far.
    pub fn tick(&self) -> u64 {
        match self.state {
            RaceState::NotStarted => 0,
            RaceState::Running { tick } | RaceState::Finished { tick, .. } => tick,
        }
    }
}

/// A fixed-length track with participants in lane order.
#[derive(Debug, Clone)]
pub struct Race {
    track_length: u32,
    variant: RaceVariant,
    participants: Vec<Participant>,
    state: RaceState,
    next_id: u32,
}

impl Race {
    /// Create an empty race.
    ///
    /// # Errors
    /// `RaceError::ZeroLength` if `track_length` is zero.
    pub fn new(track_length: u32, variant: RaceVariant) -> Result<Self, RaceError> {
        if track_length == 0 {
            return Err(RaceError::ZeroLength);
        }
        Ok(Self {
            track_length,
            variant,
            participants: Vec::new(),
            state: RaceState::NotStarted,
            next_id: 1,
        })
    }

    pub fn track_length(&self) -> u32 {
        self.track_length
    }

    pub fn variant(&self) -> RaceVariant {
        self.variant
    }

    pub fn state(&self) -> &RaceState {
        &self.state
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id() == id)
    }

    pub fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id() == id)
    }

    /// Change the track length between races.
    pub fn set_track_length(&mut self, track_length: u32) -> Result<(), RaceError> {
        if self.state.is_running() {
            return Err(RaceError::AlreadyRunning);
        }
        if track_length == 0 {
            return Err(RaceError::ZeroLength);
        }
        self.track_length = track_length;
        Ok(())
    }

    /// Add a participant in the next free lane and return its id.
    pub fn add(&mut self, participant: Participant) -> Result<ParticipantId, RaceError> {
        let lane = self.participants.len() + 1;
        self.enlist(participant, lane)
    }

    /// Insert a participant at a 1-based lane, shifting later lanes down.
    ///
    /// The race assigns the participant's id.
    ///
    /// # Errors
    /// `RaceError::InvalidLane` when `lane` is outside `1..=len + 1`; the
    /// participant is not enlisted.
    pub fn enlist(
        &mut self,
        mut participant: Participant,
        lane: usize,
    ) -> Result<ParticipantId, RaceError> {
        if self.state.is_running() {
            return Err(RaceError::AlreadyRunning);
        }
        let max = self.participants.len() + 1;
        if lane == 0 || lane > max {
            return Err(RaceError::InvalidLane { lane, max });
        }
        let id = ParticipantId(self.next_id);
        self.next_id += 1;
        participant.set_id(id);
        self.participants.insert(lane - 1, participant);
        Ok(id)
    }

    /// Reset every participant to the start line and enter `Running`.
    ///
    /// Each participant's competition counter is incremented here and
    /// nowhere else.
    pub fn start(&mut self) -> Result<(), RaceError> {
        if self.state.is_running() {
            return Err(RaceError::AlreadyRunning);
        }
        if self.participants.is_empty() {
            return Err(RaceError::NoParticipants);
        }
        for participant in &mut self.participants {
            participant.reset_for_new_race();
            participant.record_competition();
        }
        self.state = RaceState::Running { tick: 0 };
        Ok(())
    }

    /// Run one tick: step every standing participant in lane order, then
    /// check for all-fallen and for a finisher.
    ///
    /// Returns the outcome when this tick ends the race.
    pub fn step<D: UnitDraw + ?Sized>(
        &mut self,
        draws: &mut D,
    ) -> Result<Option<RaceOutcome>, RaceError> {
        let RaceState::Running { tick } = &self.state else {
            return Err(RaceError::NotRunning);
        };
        let tick = *tick + 1;

        for participant in &mut self.participants {
            participant.try_advance(self.variant, self.track_length, draws);
        }

        let outcome = self.evaluate();
        self.state = match &outcome {
            Some(outcome) => {
                if let RaceOutcome::Won { participant, .. } = outcome {
                    if let Some(winner) = self.participant_mut(*participant) {
                        winner.record_victory();
                    }
                }
                RaceState::Finished {
                    tick,
                    outcome: outcome.clone(),
                }
            }
            None => RaceState::Running { tick },
        };
        Ok(outcome)
    }

    fn evaluate(&self) -> Option<RaceOutcome> {
        if self.participants.iter().all(Participant::has_fallen) {
            return Some(RaceOutcome::AllFallen);
        }
        self.participants
            .iter()
            .enumerate()
            .find(|(_, p)| p.has_finished(self.track_length))
            .map(|(index, p)| RaceOutcome::Won {
                participant: p.id(),
                lane: index + 1,
                name: p.name().to_string(),
            })
    }

    /// Drop a running race back to `NotStarted` (cancelled or stalled).
    /// Positions are left as they were for inspection.
    pub fn abandon(&mut self) {
        if self.state.is_running() {
            self.state = RaceState::NotStarted;
        }
    }

    /// Start and step until terminal, without any pacing.
    ///
    /// Returns `None` if `max_ticks` elapse first; the race is then left
    /// running.
    pub fn run_to_end<D: UnitDraw + ?Sized>(
        &mut self,
        draws: &mut D,
        max_ticks: u64,
    ) -> Result<Option<RaceOutcome>, RaceError> {
        self.start()?;
        for _ in 0..max_ticks {
            if let Some(outcome) = self.step(draws)? {
                return Ok(Some(outcome));
            }
        }
        Ok(None)
    }

    /// Copy the current state for a renderer.
    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            track_length: self.track_length,
            variant: self.variant,
            state: self.state.clone(),
            lanes: self
                .participants
                .iter()
                .enumerate()
                .map(|(index, p)| LaneSnapshot {
                    lane: index + 1,
                    id: p.id(),
                    name: p.name().to_string(),
                    symbol: p.symbol().to_string(),
                    position: p.position(),
                    fallen: p.has_fallen(),
                    confidence: p.confidence().as_f64(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::draw::{RecordingDraws, ReplayDraws};
    use crate::domain::participant::Confidence;

    fn horse(name: &str, confidence: rust_decimal::Decimal) -> Participant {
        Participant::new(ParticipantId(0), name, &name[..1], Confidence::new(confidence))
    }

    fn three_horse_race(length: u32) -> Race {
        let mut race = Race::new(length, RaceVariant::Classic).unwrap();
        race.add(horse("Alpha", dec!(0.9))).unwrap();
        race.add(horse("Bravo", dec!(0.7))).unwrap();
        race.add(horse("Charlie", dec!(0.5))).unwrap();
        race
    }

    #[test]
    fn test_zero_length_rejected() {
        assert_eq!(
            Race::new(0, RaceVariant::Classic).unwrap_err(),
            RaceError::ZeroLength
        );
    }

    #[test]
    fn test_enlist_lane_rules() {
        let mut race = Race::new(10, RaceVariant::Classic).unwrap();
        race.enlist(horse("Alpha", dec!(0.5)), 1).unwrap();
        race.enlist(horse("Bravo", dec!(0.5)), 1).unwrap();
        let err = race.enlist(horse("Charlie", dec!(0.5)), 4).unwrap_err();
        assert_eq!(err, RaceError::InvalidLane { lane: 4, max: 3 });
        assert_eq!(
            race.enlist(horse("Delta", dec!(0.5)), 0).unwrap_err(),
            RaceError::InvalidLane { lane: 0, max: 3 }
        );

        let names: Vec<_> = race.participants().iter().map(Participant::name).collect();
        assert_eq!(names, ["Bravo", "Alpha"]);
    }

    #[test]
    fn test_start_requires_participants() {
        let mut race = Race::new(10, RaceVariant::Classic).unwrap();
        assert_eq!(race.start().unwrap_err(), RaceError::NoParticipants);
        let mut draws = ReplayDraws::new(vec![0.5]);
        assert_eq!(race.step(&mut draws).unwrap_err(), RaceError::NotRunning);
    }

    #[test]
    fn test_field_locked_while_running() {
        let mut race = three_horse_race(10);
        race.start().unwrap();
        assert_eq!(race.start().unwrap_err(), RaceError::AlreadyRunning);
        assert_eq!(
            race.add(horse("Delta", dec!(0.5))).unwrap_err(),
            RaceError::AlreadyRunning
        );
        assert_eq!(race.set_track_length(20).unwrap_err(), RaceError::AlreadyRunning);
    }

    #[test]
    fn test_tie_goes_to_lowest_lane() {
        let mut race = three_horse_race(1);
        // every advance draw succeeds, no fall draw does
        let mut draws = ReplayDraws::new(vec![0.0, 0.99]);
        let outcome = race.run_to_end(&mut draws, 10).unwrap().unwrap();
        match outcome {
            RaceOutcome::Won { lane, name, .. } => {
                assert_eq!(lane, 1);
                assert_eq!(name, "Alpha");
            }
            RaceOutcome::AllFallen => panic!("expected a winner"),
        }
        // all three were stepped before the win check
        assert!(race.participants().iter().all(|p| p.position() == 1.0));
        assert_eq!(race.snapshot().tick(), 1);
        assert_eq!(race.participants()[0].victories(), 1);
        assert_eq!(race.participants()[1].victories(), 0);
    }

    #[test]
    fn test_all_fallen_has_no_winner() {
        let mut race = three_horse_race(10);
        // never advance, always fall
        let mut draws = ReplayDraws::new(vec![0.999, 0.0]);
        let outcome = race.run_to_end(&mut draws, 10).unwrap().unwrap();
        assert_eq!(outcome, RaceOutcome::AllFallen);
        assert_eq!(outcome.winner(), None);
        assert!(race.participants().iter().all(Participant::has_fallen));
        assert!(race.participants().iter().all(|p| p.position() == 0.0));
    }

    #[test]
    fn test_restart_resets_state_and_counts_competitions() {
        let mut race = three_horse_race(2);
        let mut rng = StdRng::seed_from_u64(3);
        race.run_to_end(&mut rng, 10_000).unwrap();
        race.run_to_end(&mut rng, 10_000).unwrap();
        assert!(race.participants().iter().all(|p| p.competitions() == 2));

        race.start().unwrap();
        assert!(race
            .participants()
            .iter()
            .all(|p| p.position() == 0.0 && !p.has_fallen()));
    }

    #[test]
    fn test_replayed_draws_reproduce_the_race() {
        let mut first = three_horse_race(15);
        let mut recording = RecordingDraws::new(StdRng::seed_from_u64(2024));
        first.start().unwrap();
        let mut first_ticks = Vec::new();
        let first_outcome = loop {
            let outcome = first.step(&mut recording).unwrap();
            first_ticks.push(first.snapshot());
            if let Some(outcome) = outcome {
                break outcome;
            }
        };

        let mut second = three_horse_race(15);
        let mut replay = recording.into_replay();
        second.start().unwrap();
        let mut second_ticks = Vec::new();
        let second_outcome = loop {
            let outcome = second.step(&mut replay).unwrap();
            second_ticks.push(second.snapshot());
            if let Some(outcome) = outcome {
                break outcome;
            }
        };

        assert_eq!(first_outcome, second_outcome);
        assert_eq!(first_ticks, second_ticks);
    }

    #[test]
    fn test_tick_limit_leaves_race_running() {
        let mut race = Race::new(5, RaceVariant::Classic).unwrap();
        race.add(horse("Statue", dec!(0.0))).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(race.run_to_end(&mut rng, 50).unwrap(), None);
        assert!(race.state().is_running());

        race.abandon();
        assert_eq!(race.state(), &RaceState::NotStarted);
        race.start().unwrap();
    }
}
