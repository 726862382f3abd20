//! Aggregate command implementation.
//!
//! Replays a recorded CSV tick file through the aggregation engine and
//! writes the resulting bar series.

use anyhow::{Context, Result, ensure};
use chrono::{NaiveDate, TimeDelta};
use quilla_lib::prelude::*;
use quilla_lib::read_ticks;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::display::{Format, write_bars};

#[allow(clippy::too_many_arguments)]
pub(crate) fn aggregate(
    input: &Path,
    sessions: &str,
    date: Option<&str>,
    interval: i64,
    output: Option<PathBuf>,
    format: Format,
    gap_fill: bool,
) -> Result<()> {
    let file = File::open(input).with_context(|| format!("Cannot open {}", input.display()))?;
    let ticks = read_ticks(file).with_context(|| format!("Cannot parse {}", input.display()))?;
    ensure!(!ticks.is_empty(), "No ticks in {}", input.display());

    let day: NaiveDate = match date {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid date: {raw}"))?,
        None => ticks[0].trading_day,
    };

    let schedule: SessionSchedule = sessions
        .parse()
        .with_context(|| format!("Invalid session windows: {sessions}"))?;
    let table = schedule.slice_table(day, TimeDelta::seconds(interval))?;
    info!(slices = table.len(), %day, "slice table built");

    let mut aggregator = BarAggregator::new(
        table,
        AggregatorConfig {
            gap_fill,
            live_mode: false,
        },
    );

    let mut rejected = 0usize;
    for tick in &ticks {
        if aggregator.add_tick(tick) == ChangeState::Invalid {
            rejected += 1;
        }
    }
    info!(
        ticks = ticks.len(),
        bars = aggregator.series().len(),
        rejected,
        "aggregation complete"
    );

    let output = output.unwrap_or_else(|| input.with_extension(format.extension()));
    write_bars(aggregator.series(), &output, format)?;
    println!(
        "Wrote {} bars to {} ({} of {} ticks rejected)",
        aggregator.series().len(),
        output.display(),
        rejected,
        ticks.len()
    );

    Ok(())
}
