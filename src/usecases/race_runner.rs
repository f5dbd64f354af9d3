//! Race Runner - Paced Race Loop
//!
//! Drives a `Race` tick by tick on a single task:
//! 1. Check for a shutdown signal
//! 2. Step every participant once
//! 3. Publish the snapshot (watch channel + observer)
//! 4. Stop on a terminal state, otherwise sleep for the tick interval
//!
//! The runner is the only writer of race state. Readers get owned
//! snapshots through `snapshots()` or the observer port.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use crate::config::SimulatorConfig;
use crate::domain::draw::UnitDraw;
use crate::domain::race::{Race, RaceError, RaceOutcome, RaceSnapshot};
use crate::ports::observer::RaceObserver;

/// Why a run could not produce a result.
#[derive(Debug, Error)]
pub enum RunnerError {
  #[error(transparent)]
  Race(#[from] RaceError),
  /// The race never reached a terminal state (e.g. every confidence is 0).
  #[error("race did not finish within {max_ticks} ticks")]
  TickLimit { max_ticks: u64 },
}

/// Summary of a finished race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceReport {
  pub outcome: RaceOutcome,
  pub ticks: u64,
  pub elapsed_ms: u64,
  pub final_snapshot: RaceSnapshot,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
  Finished(RaceReport),
  /// Shutdown was requested before the race finished.
  Cancelled { tick: u64 },
}

/// Paced race loop with cooperative cancellation.
pub struct RaceRunner<O: RaceObserver + ?Sized> {
  observer: Arc<O>,
  tick_interval: Duration,
  max_ticks: u64,
  snapshot_tx: watch::Sender<Option<RaceSnapshot>>,
}

impl<O: RaceObserver + ?Sized> RaceRunner<O> {
  /// Create a runner. A zero `tick_interval` runs unpaced.
  pub fn new(observer: Arc<O>, tick_interval: Duration, max_ticks: u64) -> Self {
    let (snapshot_tx, _) = watch::channel(None);
    Self {
      observer,
      tick_interval,
      max_ticks,
      snapshot_tx,
    }
  }

  /// Create a runner with pacing and tick limit taken from config.
  pub fn from_config(observer: Arc<O>, config: &SimulatorConfig) -> Self {
    Self::new(observer, config.tick_interval(), config.max_ticks)
  }

  /// Subscribe to per-tick snapshots. `None` until the first race starts.
  pub fn snapshots(&self) -> watch::Receiver<Option<RaceSnapshot>> {
    self.snapshot_tx.subscribe()
  }

  /// Start `race` and run it to a terminal state.
  ///
  /// The shutdown receiver is checked before every tick and raced against
  /// every inter-tick sleep. A cancelled or stalled race is abandoned so
  /// it can be started again.
  #[instrument(skip_all, name = "race_loop", fields(track = race.track_length()))]
  pub async fn run<D: UnitDraw + Send + ?Sized>(
    &self,
    race: &mut Race,
    draws: &mut D,
    shutdown_rx: &mut broadcast::Receiver<()>,
  ) -> Result<RunOutcome, RunnerError> {
    race.start()?;
    let started = Instant::now();
    self.publish(race.snapshot());

    info!(
      participants = race.participants().len(),
      variant = ?race.variant(),
      "Race started"
    );

    let mut tick = 0u64;
    loop {
      if shutdown_requested(shutdown_rx) {
        return Ok(self.cancel(race, tick));
      }
      if tick >= self.max_ticks {
        race.abandon();
        warn!(max_ticks = self.max_ticks, "Race abandoned at tick limit");
        return Err(RunnerError::TickLimit {
          max_ticks: self.max_ticks,
        });
      }

      let outcome = race.step(draws)?;
      tick += 1;

      let snapshot = race.snapshot();
      if let Err(e) = self.observer.on_tick(&snapshot).await {
        warn!(error = %e, tick, "Observer failed to handle tick");
      }
      self.publish(snapshot);

      if let Some(outcome) = outcome {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let report = RaceReport {
          outcome,
          ticks: tick,
          elapsed_ms,
          final_snapshot: race.snapshot(),
        };
        match &report.outcome {
          RaceOutcome::Won { name, lane, .. } => {
            info!(winner = %name, lane, ticks = tick, "Race won");
          }
          RaceOutcome::AllFallen => {
            info!(ticks = tick, "All participants fell, no winner");
          }
        }
        if let Err(e) = self.observer.on_finish(&report).await {
          warn!(error = %e, "Observer failed to handle race result");
        }
        return Ok(RunOutcome::Finished(report));
      }

      if self.tick_interval.is_zero() {
        tokio::task::yield_now().await;
        continue;
      }

      tokio::select! {
        biased;
        () = wait_for_shutdown(shutdown_rx) => {
          return Ok(self.cancel(race, tick));
        }
        () = tokio::time::sleep(self.tick_interval) => {
          debug!(tick, "Tick complete");
        }
      }
    }
  }

  fn publish(&self, snapshot: RaceSnapshot) {
    self.snapshot_tx.send_replace(Some(snapshot));
  }

  fn cancel(&self, race: &mut Race, tick: u64) -> RunOutcome {
    race.abandon();
    info!(tick, "Race cancelled by shutdown signal");
    RunOutcome::Cancelled { tick }
  }
}

/// Non-blocking check. A closed channel means nobody can cancel us.
fn shutdown_requested(rx: &mut broadcast::Receiver<()>) -> bool {
  match rx.try_recv() {
    Ok(()) | Err(TryRecvError::Lagged(_)) => true,
    Err(TryRecvError::Empty | TryRecvError::Closed) => false,
  }
}

/// Resolves on a shutdown signal; never resolves once the sender is gone.
async fn wait_for_shutdown(rx: &mut broadcast::Receiver<()>) {
  match rx.recv().await {
    Ok(()) | Err(RecvError::Lagged(_)) => {}
    Err(RecvError::Closed) => std::future::pending::<()>().await,
  }
}
