//! Race Observer Port - Presentation Interface
//!
//! Renderers, recorders and metrics sinks watch a race through this trait.
//! They only ever see owned snapshots, never the live race, so the race
//! loop stays the single writer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::race::RaceSnapshot;
use crate::usecases::race_runner::RaceReport;

/// Trait for anything that wants to follow a race tick by tick.
#[async_trait]
pub trait RaceObserver: Send + Sync + 'static {
  /// Called once per tick, after every participant has stepped.
  async fn on_tick(&self, snapshot: &RaceSnapshot) -> anyhow::Result<()>;

  /// Called once when the race reaches a terminal state.
  async fn on_finish(&self, report: &RaceReport) -> anyhow::Result<()>;
}

/// Observer that ignores everything (headless runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

#[async_trait]
impl RaceObserver for NullObserver {
  async fn on_tick(&self, _snapshot: &RaceSnapshot) -> anyhow::Result<()> {
    Ok(())
  }

  async fn on_finish(&self, _report: &RaceReport) -> anyhow::Result<()> {
    Ok(())
  }
}

/// Fans every event out to several observers in order.
///
/// A failing observer does not stop the others; the first error is
/// returned after all of them have run.
#[derive(Default, Clone)]
pub struct ObserverSet {
  observers: Vec<Arc<dyn RaceObserver>>,
}

impl ObserverSet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, observer: Arc<dyn RaceObserver>) -> Self {
    self.observers.push(observer);
    self
  }

  pub fn len(&self) -> usize {
    self.observers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.observers.is_empty()
  }
}

#[async_trait]
impl RaceObserver for ObserverSet {
  async fn on_tick(&self, snapshot: &RaceSnapshot) -> anyhow::Result<()> {
    let mut first_err = None;
    for observer in &self.observers {
      if let Err(e) = observer.on_tick(snapshot).await {
        first_err.get_or_insert(e);
      }
    }
    first_err.map_or(Ok(()), Err)
  }

  async fn on_finish(&self, report: &RaceReport) -> anyhow::Result<()> {
    let mut first_err = None;
    for observer in &self.observers {
      if let Err(e) = observer.on_finish(report).await {
        first_err.get_or_insert(e);
      }
    }
    first_err.map_or(Ok(()), Err)
  }
}
