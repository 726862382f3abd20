//! Day-cumulative counter to per-bar delta conversion.

use chrono::NaiveDate;
use quilla_types::Tick;

/// One tick's incremental contribution to the bar it lands in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickDelta {
    /// Volume traded since the previous tick.
    pub volume: f64,
    /// Turnover traded since the previous tick.
    pub turnover: f64,
}

/// Tracks the cumulative-counter baseline across ticks.
///
/// Futures feeds report volume and turnover as running day totals. The
/// tracker subtracts the previous tick's counters to obtain this tick's
/// increment and resets the baseline to zero when the trading day
/// changes. Skipping that reset would silently corrupt every delta for
/// the rest of the session, so the tracker owns the rollover check.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeltaTracker {
    trading_day: Option<NaiveDate>,
    last_volume: f64,
    last_turnover: f64,
}

impl DeltaTracker {
    /// Creates a tracker with no baseline.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            trading_day: None,
            last_volume: 0.0,
            last_turnover: 0.0,
        }
    }

    /// Returns the trading day of the current baseline.
    #[must_use]
    pub const fn trading_day(&self) -> Option<NaiveDate> {
        self.trading_day
    }

    /// Consumes one tick, returning its incremental contribution.
    ///
    /// The tick's own cumulative counters become the baseline for the
    /// next call.
    pub fn advance(&mut self, tick: &Tick) -> TickDelta {
        if self.trading_day != Some(tick.trading_day) {
            self.trading_day = Some(tick.trading_day);
            self.last_volume = 0.0;
            self.last_turnover = 0.0;
        }
        let delta = TickDelta {
            volume: tick.volume - self.last_volume,
            turnover: tick.turnover - self.last_turnover,
        };
        self.last_volume = tick.volume;
        self.last_turnover = tick.turnover;
        delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Utc};

    fn tick(day: u32, volume: f64, turnover: f64) -> Tick {
        Tick::new(
            Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            100.0,
            volume,
            turnover,
        )
    }

    #[test]
    fn test_deltas_within_one_day() {
        let mut tracker = DeltaTracker::new();
        assert_relative_eq!(tracker.advance(&tick(14, 5.0, 500.0)).volume, 5.0);
        assert_relative_eq!(tracker.advance(&tick(14, 8.0, 800.0)).volume, 3.0);
        let last = tracker.advance(&tick(14, 12.0, 1300.0));
        assert_relative_eq!(last.volume, 4.0);
        assert_relative_eq!(last.turnover, 500.0);
    }

    #[test]
    fn test_conservation() {
        // The sum of deltas equals the final cumulative value exactly.
        let mut tracker = DeltaTracker::new();
        let cumulative = [3.0, 7.0, 7.0, 15.0, 42.0];
        let total: f64 = cumulative
            .iter()
            .map(|v| tracker.advance(&tick(14, *v, 0.0)).volume)
            .sum();
        assert_relative_eq!(total, 42.0);
    }

    #[test]
    fn test_day_rollover_resets_baseline() {
        let mut tracker = DeltaTracker::new();
        tracker.advance(&tick(14, 900.0, 90_000.0));

        // First tick of the next trading day must not inherit day 14's
        // counters as baseline.
        let delta = tracker.advance(&tick(15, 6.0, 600.0));
        assert_relative_eq!(delta.volume, 6.0);
        assert_relative_eq!(delta.turnover, 600.0);
        assert_eq!(
            tracker.trading_day(),
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }
}
