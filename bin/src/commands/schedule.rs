//! Schedule command implementation.
//!
//! Prints the slice table a session schedule produces for one trading
//! day, so window boundaries can be inspected before aggregating.

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeDelta};
use quilla_lib::prelude::*;

pub(crate) fn schedule(sessions: &str, date: &str, interval: i64) -> Result<()> {
    let day: NaiveDate = date
        .parse()
        .with_context(|| format!("Invalid date: {date}"))?;
    let schedule: SessionSchedule = sessions
        .parse()
        .with_context(|| format!("Invalid session windows: {sessions}"))?;
    let table = schedule.slice_table(day, TimeDelta::seconds(interval))?;

    println!("Sessions:   {sessions}");
    println!("Day:        {day}");
    println!("Interval:   {interval}s");
    println!("Slices:     {}", table.len());
    println!();
    println!("{:<6} {:<22} {:<22} {:>10}", "INDEX", "BEGIN", "END", "LENGTH");
    println!("{}", "-".repeat(62));

    for (index, slice) in table.iter().enumerate() {
        println!(
            "{:<6} {:<22} {:<22} {:>9}s",
            index,
            slice.begin_time.format("%Y-%m-%d %H:%M:%S"),
            slice.end_time.format("%Y-%m-%d %H:%M:%S"),
            slice.duration().num_seconds()
        );
    }

    Ok(())
}
