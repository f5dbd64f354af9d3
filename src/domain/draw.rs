//! Uniform draw sources for the stepping algorithm.
//!
//! Every random decision in a race goes through [`UnitDraw`], so a race can
//! be driven by a seeded `rand` generator, replayed from a recorded
//! sequence, or scripted in tests.

use rand::{Rng, RngCore};

/// A source of uniform samples in `[0, 1)`.
pub trait UnitDraw {
    /// Next sample in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

impl<R: RngCore> UnitDraw for R {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Replays a fixed sequence of samples, cycling when exhausted.
///
/// Values are clamped into `[0, 1)`. An empty script always yields `0.0`.
#[derive(Debug, Clone)]
pub struct ReplayDraws {
    samples: Vec<f64>,
    cursor: usize,
}

impl ReplayDraws {
    pub fn new(samples: Vec<f64>) -> Self {
        let samples = samples
            .into_iter()
            .map(|s| if s.is_nan() { 0.0 } else { s.clamp(0.0, 1.0 - f64::EPSILON) })
            .collect();
        Self { samples, cursor: 0 }
    }

    /// Number of samples handed out so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }
}

impl UnitDraw for ReplayDraws {
    fn next_unit(&mut self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let value = self.samples[self.cursor % self.samples.len()];
        self.cursor += 1;
        value
    }
}

/// Wraps another source and keeps every sample it hands out.
#[derive(Debug, Clone)]
pub struct RecordingDraws<D> {
    inner: D,
    recorded: Vec<f64>,
}

impl<D: UnitDraw> RecordingDraws<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            recorded: Vec::new(),
        }
    }

    /// Samples drawn so far, in order.
    pub fn recorded(&self) -> &[f64] {
        &self.recorded
    }

    /// Turn the recording into a replayable source.
    pub fn into_replay(self) -> ReplayDraws {
        ReplayDraws::new(self.recorded)
    }
}

impl<D: UnitDraw> UnitDraw for RecordingDraws<D> {
    fn next_unit(&mut self) -> f64 {
        let value = self.inner.next_unit();
        self.recorded.push(value);
        value
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_seeded_rng_is_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let v = rng.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_replay_cycles_and_clamps() {
        let mut draws = ReplayDraws::new(vec![0.25, 1.5, -3.0]);
        assert_eq!(draws.next_unit(), 0.25);
        assert!(draws.next_unit() < 1.0);
        assert_eq!(draws.next_unit(), 0.0);
        assert_eq!(draws.next_unit(), 0.25);
        assert_eq!(draws.consumed(), 4);
    }

    #[test]
    fn test_recording_round_trips_into_replay() {
        let mut recording = RecordingDraws::new(StdRng::seed_from_u64(99));
        let first: Vec<f64> = (0..5).map(|_| recording.next_unit()).collect();
        let mut replay = recording.into_replay();
        let second: Vec<f64> = (0..5).map(|_| replay.next_unit()).collect();
        assert_eq!(first, second);
    }
}
