//! Race participants and the per-tick stepping rule.
//!
//! A participant carries its identity, its travelled distance, its fall
//! state and a confidence scalar in `[0, 1]`. Confidence gates both the
//! chance to advance on a tick and (squared) the chance to fall.
//!
//! Confidence is held as a `Decimal` so that repeated penalties such as
//! `0.9 - 0.1 - 0.1` land exactly on `0.7`; the draw comparison happens in
//! `f64` at the boundary.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::draw::UnitDraw;
use super::gear::{Gear, Species};

/// Confidence lost on every successful classic advance.
pub const PERFORMANCE_PENALTY: Decimal = dec!(0.01);

/// Confidence lost permanently on a classic fall.
pub const FALL_PENALTY: Decimal = dec!(0.1);

/// Scale `k` in the fall chance `k × confidence²`.
pub const FALL_RISK_SCALE: f64 = 0.1;

/// The wagering variant covers the track in about this many strides.
pub const STRIDES_PER_TRACK: f64 = 15.0;

/// Stable identity of a participant, independent of its lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Probability scalar clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Confidence(Decimal);

impl Confidence {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    /// Clamp `value` into `[0, 1]`.
    pub fn new(value: Decimal) -> Self {
        Self(value.clamp(Decimal::ZERO, Decimal::ONE))
    }

    /// Clamp an `f64` into `[0, 1]`. NaN maps to zero.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            return Self::ZERO;
        }
        let clamped = value.clamp(0.0, 1.0);
        Self::new(Decimal::from_f64(clamped).unwrap_or(Decimal::ZERO))
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Lower by `amount`, floored at zero.
    pub fn lowered_by(self, amount: Decimal) -> Self {
        Self::new(self.0 - amount)
    }

    /// Chance of falling on a single tick: `k × c²`.
    pub fn fall_chance(self) -> f64 {
        let c = self.as_f64();
        FALL_RISK_SCALE * c * c
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.as_f64())
    }
}

/// Which movement rule a race applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceVariant {
    /// Unit steps, performance penalty, confidence loss on falls.
    #[default]
    Classic,
    /// Gear-scaled strides, no confidence adjustments.
    Wagering,
}

/// What happened to one participant on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepEvent {
    /// Distance gained this tick (0 when the advance draw failed).
    pub advanced: f64,
    /// Whether the participant fell this tick.
    pub fell: bool,
}

/// A horse entered in races.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    id: ParticipantId,
    name: String,
    symbol: String,
    species: Option<Species>,
    gear: BTreeSet<Gear>,
    confidence: Confidence,
    position: f64,
    fallen: bool,
    victories: u32,
    competitions: u32,
}

impl Participant {
    /// Create a participant at the start line. Confidence is clamped.
    pub fn new(
        id: ParticipantId,
        name: impl Into<String>,
        symbol: impl Into<String>,
        confidence: Confidence,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            symbol: symbol.into(),
            species: None,
            gear: BTreeSet::new(),
            confidence,
            position: 0.0,
            fallen: false,
            victories: 0,
            competitions: 0,
        }
    }

    pub fn with_species(mut self, species: Species) -> Self {
        self.species = Some(species);
        self
    }

    pub fn with_gear(mut self, gear: impl IntoIterator<Item = Gear>) -> Self {
        self.gear.extend(gear);
        self
    }

    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ParticipantId) {
        self.id = id;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn set_symbol(&mut self, symbol: impl Into<String>) {
        self.symbol = symbol.into();
    }

    pub fn species(&self) -> Option<Species> {
        self.species
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    /// Store a new confidence, clamped into `[0, 1]`.
    pub fn set_confidence(&mut self, confidence: Decimal) {
        self.confidence = Confidence::new(confidence);
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn has_fallen(&self) -> bool {
        self.fallen
    }

    pub fn victories(&self) -> u32 {
        self.victories
    }

    pub fn competitions(&self) -> u32 {
        self.competitions
    }

    pub fn gear(&self) -> &BTreeSet<Gear> {
        &self.gear
    }

    /// Equip an item. Returns false if it was already equipped.
    pub fn add_gear(&mut self, item: Gear) -> bool {
        self.gear.insert(item)
    }

    /// Unequip an item. Returns false if it was not equipped.
    pub fn remove_gear(&mut self, item: Gear) -> bool {
        self.gear.remove(&item)
    }

    /// Confidence compounded by every equipped gear multiplier.
    ///
    /// May exceed 1.0; it scales stride length, not probability.
    pub fn effective_velocity(&self) -> Decimal {
        self.gear
            .iter()
            .fold(self.confidence.value(), |v, g| v * g.multiplier())
    }

    /// Move forward by `distance`, never past `track_length`.
    /// Fallen participants stay where they fell.
    pub fn move_forward(&mut self, distance: f64, track_length: u32) {
        if self.fallen {
            return;
        }
        self.position = (self.position + distance).min(f64::from(track_length));
    }

    /// Back to the start line. Idempotent.
    pub fn go_back_to_start(&mut self) {
        self.position = 0.0;
    }

    /// Classic fall: out of the race and a permanent confidence penalty.
    pub fn fall(&mut self) {
        self.fallen = true;
        self.confidence = self.confidence.lowered_by(FALL_PENALTY);
    }

    /// Wagering stumble: out of the race, confidence untouched.
    pub fn stumble(&mut self) {
        self.fallen = true;
    }

    /// Clear position and fall state ahead of a new race.
    pub fn reset_for_new_race(&mut self) {
        self.go_back_to_start();
        self.fallen = false;
    }

    pub(crate) fn record_competition(&mut self) {
        self.competitions += 1;
    }

    pub(crate) fn record_victory(&mut self) {
        self.victories += 1;
    }

    /// Whether the participant sits on the finish line.
    pub fn has_finished(&self, track_length: u32) -> bool {
        self.position >= f64::from(track_length)
    }

    /// Examine this participant once for the current tick.
    ///
    /// Two draws are always consumed for a standing participant: the
    /// advance draw and the fall draw. Fallen participants consume none.
    pub fn try_advance<D: UnitDraw + ?Sized>(
        &mut self,
        variant: RaceVariant,
        track_length: u32,
        draws: &mut D,
    ) -> StepEvent {
        if self.fallen {
            return StepEvent::default();
        }

        let mut event = StepEvent::default();
        let before = self.position;

        if draws.next_unit() < self.confidence.as_f64() {
            match variant {
                RaceVariant::Classic => {
                    self.move_forward(1.0, track_length);
                    self.confidence = self.confidence.lowered_by(PERFORMANCE_PENALTY);
                }
                RaceVariant::Wagering => {
                    let velocity = self.effective_velocity().to_f64().unwrap_or(0.0);
                    let stride = f64::from(track_length) / STRIDES_PER_TRACK * velocity;
                    self.move_forward(stride, track_length);
                }
            }
            event.advanced = self.position - before;
        }

        if draws.next_unit() < self.confidence.fall_chance() {
            match variant {
                RaceVariant::Classic => self.fall(),
                RaceVariant::Wagering => self.stumble(),
            }
            event.fell = true;
        }

        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::draw::ReplayDraws;

    fn shadowfax() -> Participant {
        Participant::new(ParticipantId(1), "Shadowfax", "S", Confidence::new(dec!(0.9)))
    }

    #[test]
    fn test_new_participant_defaults() {
        let steed = shadowfax();
        assert_eq!(steed.name(), "Shadowfax");
        assert_eq!(steed.symbol(), "S");
        assert_eq!(steed.confidence().value(), dec!(0.9));
        assert!(!steed.has_fallen());
        assert_eq!(steed.position(), 0.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut steed = shadowfax();
        steed.set_confidence(dec!(0.6));
        assert_eq!(steed.confidence().value(), dec!(0.6));
        steed.set_confidence(dec!(-0.2));
        assert_eq!(steed.confidence().value(), dec!(0.0));
        steed.set_confidence(dec!(1.2));
        assert_eq!(steed.confidence().value(), dec!(1.0));
        assert_eq!(Confidence::from_f64(f64::NAN), Confidence::ZERO);
    }

    #[test]
    fn test_fall_twice_lowers_confidence_exactly() {
        let mut steed = shadowfax();
        steed.move_forward(1.0, 10);
        assert_eq!(steed.position(), 1.0);
        steed.fall();
        assert!(steed.has_fallen());
        assert_eq!(steed.confidence().value(), dec!(0.8));
        steed.fall();
        assert_eq!(steed.confidence().value(), dec!(0.7));
    }

    #[test]
    fn test_fall_floors_at_zero() {
        let mut steed =
            Participant::new(ParticipantId(2), "Dobbin", "D", Confidence::new(dec!(0.05)));
        steed.fall();
        assert_eq!(steed.confidence(), Confidence::ZERO);
    }

    #[test]
    fn test_go_back_to_start_is_idempotent() {
        let mut steed = shadowfax();
        steed.move_forward(3.0, 10);
        steed.go_back_to_start();
        steed.go_back_to_start();
        assert_eq!(steed.position(), 0.0);
    }

    #[test]
    fn test_set_symbol() {
        let mut steed = shadowfax();
        steed.set_symbol("R");
        assert_eq!(steed.symbol(), "R");
    }

    #[test]
    fn test_classic_advance_applies_performance_penalty() {
        let mut steed = shadowfax();
        // advance (0.0 < 0.9), no fall (0.99 >= 0.1 × 0.89²)
        let mut draws = ReplayDraws::new(vec![0.0, 0.99]);
        let event = steed.try_advance(RaceVariant::Classic, 10, &mut draws);
        assert_eq!(event.advanced, 1.0);
        assert!(!event.fell);
        assert_eq!(steed.confidence().value(), dec!(0.89));
        assert_eq!(draws.consumed(), 2);
    }

    #[test]
    fn test_fall_draw_happens_without_advance() {
        let mut steed = shadowfax();
        // no advance (0.95 >= 0.9), fall (0.0 < 0.081)
        let mut draws = ReplayDraws::new(vec![0.95, 0.0]);
        let event = steed.try_advance(RaceVariant::Classic, 10, &mut draws);
        assert_eq!(event.advanced, 0.0);
        assert!(event.fell);
        assert_eq!(draws.consumed(), 2);
        assert_eq!(steed.confidence().value(), dec!(0.8));
    }

    #[test]
    fn test_fallen_participant_is_frozen() {
        let mut steed = shadowfax();
        steed.move_forward(2.0, 10);
        steed.fall();
        let mut draws = ReplayDraws::new(vec![0.0]);
        for _ in 0..10 {
            let event = steed.try_advance(RaceVariant::Classic, 10, &mut draws);
            assert_eq!(event, StepEvent::default());
        }
        steed.move_forward(5.0, 10);
        assert_eq!(steed.position(), 2.0);
        assert!(steed.has_fallen());
        assert_eq!(draws.consumed(), 0);
    }

    #[test]
    fn test_wagering_stride_uses_gear_and_clamps() {
        let mut steed = Participant::new(
            ParticipantId(3),
            "Epona",
            "E",
            Confidence::new(dec!(0.5)),
        )
        .with_gear([Gear::Saddle, Gear::Bridle]);
        assert_eq!(steed.effective_velocity(), dec!(0.715));

        let mut draws = ReplayDraws::new(vec![0.0, 0.99]);
        let event = steed.try_advance(RaceVariant::Wagering, 300, &mut draws);
        assert!((event.advanced - 300.0 / 15.0 * 0.715).abs() < 1e-9);
        // wagering never touches confidence
        assert_eq!(steed.confidence().value(), dec!(0.5));

        for _ in 0..100 {
            steed.try_advance(RaceVariant::Wagering, 300, &mut draws);
        }
        assert_eq!(steed.position(), 300.0);
        assert!(steed.has_finished(300));
    }

    #[test]
    fn test_wagering_stumble_keeps_confidence() {
        let mut steed = shadowfax();
        let mut draws = ReplayDraws::new(vec![0.99, 0.0]);
        let event = steed.try_advance(RaceVariant::Wagering, 300, &mut draws);
        assert!(event.fell);
        assert_eq!(steed.confidence().value(), dec!(0.9));
    }

    #[test]
    fn test_gear_add_remove() {
        let mut steed = shadowfax();
        assert!(steed.add_gear(Gear::Horseshoes));
        assert!(!steed.add_gear(Gear::Horseshoes));
        assert_eq!(steed.effective_velocity(), dec!(1.08));
        assert!(steed.remove_gear(Gear::Horseshoes));
        assert!(!steed.remove_gear(Gear::Horseshoes));
        assert_eq!(steed.effective_velocity(), dec!(0.9));
    }
}
