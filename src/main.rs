//! Equine Race Simulator — Entry Point
//!
//! Wiring sequence:
//! 1. Load config (first CLI argument, default `config.toml`) + validate
//! 2. Init tracing on stderr (plain or JSON)
//! 3. Build the race: prompt on stdin (classic, nothing configured) or config
//! 4. Attach observers: ASCII track renderer, Prometheus metrics
//! 5. Install the Ctrl-C listener (broadcast shutdown)
//! 6. Spawn the race loop task (classic) or the betting session (wagering)
//! 7. Print the winner / JSON session report, dump metrics

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use equine_race_sim::adapters::console::{AsciiTrackRenderer, LinePrompt, write_session_report};
use equine_race_sim::adapters::metrics::MetricsRegistry;
use equine_race_sim::config::{self, AppConfig, CLASSIC_FIELD_SIZE};
use equine_race_sim::domain::participant::RaceVariant;
use equine_race_sim::domain::race::Race;
use equine_race_sim::ports::observer::ObserverSet;
use equine_race_sim::usecases::betting_session::BettingSession;
use equine_race_sim::usecases::race_runner::{RaceRunner, RunOutcome, RunnerError};
use equine_race_sim::usecases::setup::{prompt_classic_race, race_from_config};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize logging on stderr ─────────────────────
    init_tracing(&config);

    info!(
        name = %config.simulator.name,
        version = env!("CARGO_PKG_VERSION"),
        mode = ?config.simulator.mode,
        seed = ?config.simulator.seed,
        "Starting equine race simulator"
    );

    // ── 3. Build the race (classic may prompt) ──────────────
    let race = match config.simulator.mode {
        RaceVariant::Classic => Some(build_classic_race(&config).await?),
        RaceVariant::Wagering => None,
    };

    // ── 4. Observers ────────────────────────────────────────
    let metrics = if config.metrics.enabled {
        Some(Arc::new(MetricsRegistry::new().context("Failed to register metrics")?))
    } else {
        None
    };
    let mut observers = ObserverSet::new();
    if config.simulator.render {
        observers = observers.with(Arc::new(AsciiTrackRenderer::new(
            io::stdout(),
            config.simulator.clear_screen,
        )));
    }
    if let Some(metrics) = &metrics {
        observers = observers.with(metrics.clone());
    }
    if observers.is_empty() {
        info!("No observers attached, running headless");
    } else {
        info!(observers = observers.len(), "Observers attached");
    }
    let runner = RaceRunner::from_config(Arc::new(observers), &config.simulator);

    // ── 5. Shutdown signal ──────────────────────────────────
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
    let signal_tx = shutdown_tx.clone();
    let signal_handle = tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("SIGINT received, stopping the race");
            let _ = signal_tx.send(());
        }
    });

    let draws = match config.simulator.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    // ── 6. Race loop task ───────────────────────────────────
    let task_metrics = metrics.clone();
    let handle = match race {
        Some(race) => tokio::spawn(run_classic(runner, race, draws, shutdown_rx)),
        None => tokio::spawn(run_wagering(
            runner,
            config.clone(),
            draws,
            shutdown_rx,
            task_metrics,
        )),
    };

    let result = handle.await.context("Race task panicked")?;
    signal_handle.abort();
    drop(shutdown_tx);

    // ── 7. Metrics dump ─────────────────────────────────────
    if let Some(metrics) = metrics {
        match metrics.encode() {
            Ok(text) => eprint!("{text}"),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
    }

    if let Err(e) = &result {
        error!(error = %e, "Simulation failed");
    }
    info!("Shutdown complete");
    result
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.simulator.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if config.simulator.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Configured roster, or three horses entered on stdin.
async fn build_classic_race(config: &AppConfig) -> Result<Race> {
    if !config.participants.is_empty() {
        return race_from_config(config);
    }
    let track_length = config.track.as_ref().map(|t| t.length);
    tokio::task::spawn_blocking(move || {
        let mut prompt = LinePrompt::stdio();
        prompt_classic_race(&mut prompt, CLASSIC_FIELD_SIZE, track_length)
    })
    .await
    .context("Setup prompt panicked")?
}

async fn run_classic(
    runner: RaceRunner<ObserverSet>,
    mut race: Race,
    mut draws: StdRng,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    println!("Starting the race...");
    match runner.run(&mut race, &mut draws, &mut shutdown_rx).await? {
        RunOutcome::Finished(report) => {
            info!(
                ticks = report.ticks,
                elapsed_ms = report.elapsed_ms,
                "Race finished"
            );
        }
        RunOutcome::Cancelled { tick } => {
            warn!(tick, "Race interrupted before a winner was decided");
        }
    }
    Ok(())
}

async fn run_wagering(
    runner: RaceRunner<ObserverSet>,
    config: AppConfig,
    mut draws: StdRng,
    mut shutdown_rx: broadcast::Receiver<()>,
    metrics: Option<Arc<MetricsRegistry>>,
) -> Result<()> {
    let mut session = BettingSession::from_config(&config)?;

    for race_no in 1..=config.simulator.races {
        let (placed, rejected) = session.place_standing_wagers();
        if let Some(metrics) = &metrics {
            metrics.wagers_placed.inc_by(placed.len() as u64);
            for e in &rejected {
                metrics.record_wager_rejected(e);
            }
        }

        info!(race = race_no, wagers = placed.len(), "Race starting");
        match session.run_race(&runner, &mut draws, &mut shutdown_rx).await {
            Ok(Some(settlement)) => {
                if let Some(metrics) = &metrics {
                    metrics.record_settlement(&settlement);
                    metrics.set_balances(session.bettors());
                }
            }
            Ok(None) => break,
            Err(e @ RunnerError::TickLimit { .. }) => {
                warn!(race = race_no, error = %e, "Race abandoned, wagers stay pending");
            }
            Err(e) => return Err(e.into()),
        }
    }

    write_session_report(&mut io::stdout().lock(), &session.report())
}
