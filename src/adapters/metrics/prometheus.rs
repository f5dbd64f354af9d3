//! Prometheus Metrics Registry - Race Observability
//!
//! Registers race and wagering metrics under the `equine_sim_*` prefix.
//! The registry is also a `RaceObserver`, so attaching it to the runner
//! is enough to count races and ticks. Wager metrics are fed by the
//! betting session caller.

use async_trait::async_trait;
use prometheus::{
    Counter, CounterVec, Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec,
    Opts, Registry, TextEncoder,
};
use rust_decimal::prelude::*;

use crate::domain::bettor::{Bettor, WagerError};
use crate::domain::race::{RaceOutcome, RaceSnapshot};
use crate::ports::observer::RaceObserver;
use crate::usecases::race_runner::RaceReport;
use crate::usecases::settlement::SettlementReport;

/// Centralized Prometheus metrics for the simulator.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Finished races by outcome (`won` / `all_fallen`).
    pub races_total: IntCounterVec,
    /// Ticks needed to reach a terminal state.
    pub race_ticks: Histogram,
    /// Wagers accepted.
    pub wagers_placed: IntCounter,
    /// Wagers refused, by reason.
    pub wagers_rejected: IntCounterVec,
    /// Money paid out on top of returned stakes.
    pub payouts: Counter,
    /// Settled wagers by status.
    pub settlements: CounterVec,
    /// Current balance per bettor.
    pub bettor_balance: GaugeVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let races_total = IntCounterVec::new(
            Opts::new("equine_sim_races_total", "Finished races by outcome"),
            &["outcome"],
        )?;

        let race_ticks = Histogram::with_opts(
            HistogramOpts::new("equine_sim_race_ticks", "Ticks per finished race")
                .buckets(vec![5.0, 10.0, 20.0, 50.0, 100.0, 250.0, 1000.0]),
        )?;

        let wagers_placed =
            IntCounter::new("equine_sim_wagers_placed_total", "Total wagers accepted")?;

        let wagers_rejected = IntCounterVec::new(
            Opts::new("equine_sim_wagers_rejected_total", "Total wagers refused"),
            &["reason"],
        )?;

        let payouts = Counter::new(
            "equine_sim_payouts_total",
            "Winnings credited on top of returned stakes",
        )?;

        let settlements = CounterVec::new(
            Opts::new("equine_sim_settlements_total", "Settled wagers by status"),
            &["status"],
        )?;

        let bettor_balance = GaugeVec::new(
            Opts::new("equine_sim_bettor_balance", "Current bettor balance"),
            &["bettor"],
        )?;

        registry.register(Box::new(races_total.clone()))?;
        registry.register(Box::new(race_ticks.clone()))?;
        registry.register(Box::new(wagers_placed.clone()))?;
        registry.register(Box::new(wagers_rejected.clone()))?;
        registry.register(Box::new(payouts.clone()))?;
        registry.register(Box::new(settlements.clone()))?;
        registry.register(Box::new(bettor_balance.clone()))?;

        Ok(Self {
            registry,
            races_total,
            race_ticks,
            wagers_placed,
            wagers_rejected,
            payouts,
            settlements,
            bettor_balance,
        })
    }

    pub fn record_wager_rejected(&self, error: &WagerError) {
        self.wagers_rejected
            .with_label_values(&[error.reason()])
            .inc();
    }

    /// Count settled wagers and the money paid out.
    pub fn record_settlement(&self, report: &SettlementReport) {
        for settlement in &report.settlements {
            self.settlements
                .with_label_values(&[settlement.status.as_str()])
                .inc();
        }
        self.payouts
            .inc_by(report.total_paid_out.to_f64().unwrap_or(0.0));
    }

    pub fn set_balances(&self, bettors: &[Bettor]) {
        for bettor in bettors {
            self.bettor_balance
                .with_label_values(&[bettor.name()])
                .set(bettor.balance_f64());
        }
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[async_trait]
impl RaceObserver for MetricsRegistry {
    async fn on_tick(&self, _snapshot: &RaceSnapshot) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_finish(&self, report: &RaceReport) -> anyhow::Result<()> {
        let outcome = match report.outcome {
            RaceOutcome::Won { .. } => "won",
            RaceOutcome::AllFallen => "all_fallen",
        };
        self.races_total.with_label_values(&[outcome]).inc();
        self.race_ticks.observe(report.ticks as f64);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::participant::{Confidence, Participant, ParticipantId};
    use crate::usecases::settlement::settle_wagers;

    #[test]
    fn test_wager_metrics_exposed() {
        let metrics = MetricsRegistry::new().unwrap();
        let arrow = Participant::new(ParticipantId(1), "Arrow", "A", Confidence::ONE);
        let mut bettors = vec![Bettor::new("Ann", dec!(100))];

        bettors[0].place_wager(&arrow, dec!(10)).unwrap();
        metrics.wagers_placed.inc();
        if let Err(e) = bettors[0].place_wager(&arrow, dec!(500)) {
            metrics.record_wager_rejected(&e);
        }

        let outcome = RaceOutcome::Won {
            participant: arrow.id(),
            lane: 1,
            name: "Arrow".to_string(),
        };
        metrics.record_settlement(&settle_wagers(&mut bettors, &outcome));
        metrics.set_balances(&bettors);

        let text = metrics.encode().unwrap();
        assert!(text.contains("equine_sim_wagers_placed_total 1"));
        assert!(text.contains("equine_sim_wagers_rejected_total{reason=\"insufficient_balance\"} 1"));
        assert!(text.contains("equine_sim_settlements_total{status=\"won\"} 1"));
        assert!(text.contains("equine_sim_payouts_total 1000"));
        assert!(text.contains("equine_sim_bettor_balance{bettor=\"Ann\"} 1100"));
    }
}
