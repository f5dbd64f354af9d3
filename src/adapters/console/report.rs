//! Session Report Writer - JSON summary of a wagering session.

use std::io::Write;

use anyhow::Context;
use tracing::info;

use crate::usecases::betting_session::SessionReport;

/// Write `report` as pretty JSON followed by a newline.
pub fn write_session_report<W: Write>(out: &mut W, report: &SessionReport) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, report).context("Failed to serialize session report")?;
    writeln!(out)?;
    out.flush()?;

    info!(
        races = report.races_run,
        bettors = report.bettors.len(),
        wagers = report.history.len(),
        "Session report written"
    );
    Ok(())
}
