//! ASCII Track Renderer - Terminal Race View
//!
//! Redraws the whole track every tick:
//!
//! ```text
//! ===============
//! |   S         | Shadowfax (Confidence: 0.87)
//! |      ❌      | Brego (Horse has stumbled)
//! ===============
//! ```
//!
//! Classic tracks are drawn one column per unit. Wagering tracks longer
//! than `max_columns` are scaled down so a 500-unit track still fits a
//! terminal.

use std::io::Write;
use std::sync::Mutex;

use anyhow::anyhow;
use async_trait::async_trait;

use crate::domain::participant::RaceVariant;
use crate::domain::race::{LaneSnapshot, RaceOutcome, RaceSnapshot};
use crate::ports::observer::RaceObserver;
use crate::usecases::race_runner::RaceReport;

/// Glyph drawn in place of a fallen participant.
pub const FALLEN_GLYPH: &str = "❌";

/// Default upper bound on wagering track columns.
pub const DEFAULT_MAX_COLUMNS: u32 = 100;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Observer that prints the track to a writer (stdout in the binary).
pub struct AsciiTrackRenderer<W: Write + Send + 'static> {
    out: Mutex<W>,
    clear_screen: bool,
    max_columns: u32,
}

impl<W: Write + Send + 'static> AsciiTrackRenderer<W> {
    pub fn new(out: W, clear_screen: bool) -> Self {
        Self {
            out: Mutex::new(out),
            clear_screen,
            max_columns: DEFAULT_MAX_COLUMNS,
        }
    }

    pub fn with_max_columns(mut self, max_columns: u32) -> Self {
        self.max_columns = max_columns.max(1);
        self
    }

    /// Give the writer back (tests read what was printed).
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self, text: &str) -> anyhow::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow!("renderer output lock poisoned"))?;
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// Build one full frame of the track.
pub fn render_frame(snapshot: &RaceSnapshot, max_columns: u32, clear_screen: bool) -> String {
    let columns = match snapshot.variant {
        RaceVariant::Classic => snapshot.track_length,
        RaceVariant::Wagering => snapshot.track_length.min(max_columns.max(1)),
    };
    let border = "=".repeat(columns as usize + 3);

    let mut frame = String::new();
    if clear_screen {
        frame.push_str(CLEAR_SCREEN);
    }
    frame.push_str(&border);
    frame.push('\n');
    for lane in &snapshot.lanes {
        frame.push_str(&render_lane(lane, snapshot.track_length, columns));
        frame.push('\n');
    }
    frame.push_str(&border);
    frame.push('\n');
    frame
}

fn render_lane(lane: &LaneSnapshot, track_length: u32, columns: u32) -> String {
    let offset = column_for(lane.position, track_length, columns);
    let glyph = if lane.fallen {
        FALLEN_GLYPH
    } else {
        lane.symbol.as_str()
    };
    let trailer = if lane.fallen {
        format!("{} (Horse has stumbled)", lane.name)
    } else {
        format!("{} (Confidence: {:.2})", lane.name, lane.confidence)
    };
    format!(
        "|{}{}{}| {}",
        " ".repeat(offset),
        glyph,
        " ".repeat(columns as usize - offset),
        trailer
    )
}

/// Map a travelled distance onto `0..=columns`.
fn column_for(position: f64, track_length: u32, columns: u32) -> usize {
    if track_length == 0 {
        return 0;
    }
    let ratio = (position / f64::from(track_length)).clamp(0.0, 1.0);
    let column = (ratio * f64::from(columns)).floor();
    (column as usize).min(columns as usize)
}

/// Closing line for a finished race.
pub fn finish_message(outcome: &RaceOutcome, variant: RaceVariant) -> String {
    match (outcome, variant) {
        (RaceOutcome::Won { name, .. }, RaceVariant::Classic) => {
            format!("The winning horse is {name}")
        }
        (RaceOutcome::Won { name, lane, .. }, RaceVariant::Wagering) => {
            format!("{name} wins from lane {lane}!")
        }
        (RaceOutcome::AllFallen, RaceVariant::Classic) => {
            "All horses have fallen. The contest concludes.".to_string()
        }
        (RaceOutcome::AllFallen, RaceVariant::Wagering) => {
            "All Equines have stumbled. The race has ended.".to_string()
        }
    }
}

#[async_trait]
impl<W: Write + Send + 'static> RaceObserver for AsciiTrackRenderer<W> {
    async fn on_tick(&self, snapshot: &RaceSnapshot) -> anyhow::Result<()> {
        self.write(&render_frame(snapshot, self.max_columns, self.clear_screen))
    }

    async fn on_finish(&self, report: &RaceReport) -> anyhow::Result<()> {
        let variant = report.final_snapshot.variant;
        self.write(&format!("{}\n", finish_message(&report.outcome, variant)))
    }
}
