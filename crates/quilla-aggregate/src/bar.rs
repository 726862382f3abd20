//! OHLCV bar aggregate.

use chrono::{DateTime, NaiveDate, Utc};
use quilla_types::Tick;
use serde::{Deserialize, Serialize};

/// One OHLCV bar over a single time slice.
///
/// A bar is open while `end_time` is `None`; [`Bar::close`] seals it.
/// `volume` and `turnover` hold per-bar deltas, never the feed's
/// day-cumulative counters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading day the bar belongs to.
    pub trading_day: NaiveDate,
    /// Slice begin time.
    pub begin_time: DateTime<Utc>,
    /// Slice end time; `None` while the bar is still open.
    pub end_time: Option<DateTime<Utc>>,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing (most recent) price.
    pub close: f64,
    /// Reference close of the preceding bar or session.
    pub pre_close: f64,
    /// Traded volume within the bar.
    pub volume: f64,
    /// Traded turnover within the bar.
    pub turnover: f64,
    /// Open interest after the last update.
    pub open_interest: f64,
}

impl Bar {
    /// Opens a bar from the first tick landing in a slice.
    ///
    /// Without a previous bar, `pre_close` and `open_interest` are
    /// seeded from the tick's previous-session references (settlement
    /// preferred over close when positive).
    #[must_use]
    pub fn open_with_tick(begin_time: DateTime<Utc>, tick: &Tick, previous: Option<&Self>) -> Self {
        let (pre_close, open_interest) = match previous {
            Some(prev) => (prev.close, prev.open_interest),
            None => (tick.reference_price(), tick.pre_open_interest),
        };
        Self {
            trading_day: tick.trading_day,
            begin_time,
            end_time: None,
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            pre_close,
            volume: 0.0,
            turnover: 0.0,
            open_interest,
        }
    }

    /// Opens a coarser bar from the first finer bar landing in a slice.
    #[must_use]
    pub fn open_with_bar(begin_time: DateTime<Utc>, sub: &Self, previous: Option<&Self>) -> Self {
        let pre_close = previous.map_or(sub.pre_close, |prev| prev.close);
        Self {
            trading_day: sub.trading_day,
            begin_time,
            end_time: None,
            open: sub.open,
            high: sub.high,
            low: sub.low,
            close: sub.close,
            pre_close,
            volume: sub.volume,
            turnover: sub.turnover,
            open_interest: sub.open_interest,
        }
    }

    /// Creates a zero-volume filler bar for a slice that saw no data.
    #[must_use]
    pub const fn filler(
        begin_time: DateTime<Utc>,
        trading_day: NaiveDate,
        price: f64,
        open_interest: f64,
    ) -> Self {
        Self {
            trading_day,
            begin_time,
            end_time: None,
            open: price,
            high: price,
            low: price,
            close: price,
            pre_close: price,
            volume: 0.0,
            turnover: 0.0,
            open_interest,
        }
    }

    /// Applies a tick to an open bar.
    ///
    /// `volume_delta`/`turnover_delta` are this tick's increments as
    /// produced by [`crate::DeltaTracker`], not the tick's cumulative
    /// counters.
    pub fn apply_tick(&mut self, tick: &Tick, volume_delta: f64, turnover_delta: f64) {
        self.high = self.high.max(tick.price);
        self.low = self.low.min(tick.price);
        self.close = tick.price;
        self.volume += volume_delta;
        self.turnover += turnover_delta;
        self.open_interest = tick.open_interest;
    }

    /// Merges a finer closed bar into this open coarser bar.
    pub fn merge_bar(&mut self, sub: &Self) {
        self.high = self.high.max(sub.high);
        self.low = self.low.min(sub.low);
        self.close = sub.close;
        self.volume += sub.volume;
        self.turnover += sub.turnover;
        self.open_interest = sub.open_interest;
        self.trading_day = sub.trading_day;
    }

    /// Seals the bar at the slice end; terminal for ordinary mutation.
    pub fn close(&mut self, end_time: DateTime<Utc>) {
        self.end_time = Some(end_time);
    }

    /// Returns true once the bar has been closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns true if this is a bullish (close above open) bar.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, h, m, s).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    fn tick(h: u32, m: u32, s: u32, price: f64) -> Tick {
        Tick::new(at(h, m, s), day(), price, 0.0, 0.0)
    }

    #[test]
    fn test_open_with_tick_seeds_from_references() {
        let first = tick(9, 0, 1, 3050.0)
            .with_references(3040.0, 3045.0, 15_000.0)
            .with_open_interest(15_100.0);
        let bar = Bar::open_with_tick(at(9, 0, 0), &first, None);

        assert_relative_eq!(bar.open, 3050.0);
        assert_relative_eq!(bar.pre_close, 3045.0);
        assert_relative_eq!(bar.open_interest, 15_000.0);
        assert!(!bar.is_closed());
    }

    #[test]
    fn test_open_with_tick_seeds_from_previous_bar() {
        let first = tick(9, 0, 1, 3050.0);
        let mut prev = Bar::open_with_tick(at(8, 59, 0), &tick(8, 59, 1, 3048.0), None);
        prev.open_interest = 15_200.0;
        prev.close(at(9, 0, 0));

        let bar = Bar::open_with_tick(at(9, 0, 0), &first, Some(&prev));
        assert_relative_eq!(bar.pre_close, 3048.0);
        assert_relative_eq!(bar.open_interest, 15_200.0);
    }

    #[test]
    fn test_apply_tick_updates_extremes_and_deltas() {
        let mut bar = Bar::open_with_tick(at(9, 0, 0), &tick(9, 0, 1, 100.0), None);
        bar.apply_tick(&tick(9, 0, 2, 103.0).with_open_interest(5.0), 2.0, 200.0);
        bar.apply_tick(&tick(9, 0, 3, 99.0), 1.0, 100.0);

        assert_relative_eq!(bar.open, 100.0);
        assert_relative_eq!(bar.high, 103.0);
        assert_relative_eq!(bar.low, 99.0);
        assert_relative_eq!(bar.close, 99.0);
        assert_relative_eq!(bar.volume, 3.0);
        assert_relative_eq!(bar.turnover, 300.0);
    }

    #[test]
    fn test_merge_bar() {
        let mut coarse = Bar::open_with_tick(at(9, 0, 0), &tick(9, 0, 1, 100.0), None);
        coarse.apply_tick(&tick(9, 0, 30, 101.0), 5.0, 500.0);

        let mut sub = Bar::open_with_tick(at(9, 1, 0), &tick(9, 1, 1, 98.0), Some(&coarse));
        sub.apply_tick(&tick(9, 1, 30, 104.0), 3.0, 300.0);
        sub.close(at(9, 2, 0));

        coarse.merge_bar(&sub);
        assert_relative_eq!(coarse.open, 100.0);
        assert_relative_eq!(coarse.high, 104.0);
        assert_relative_eq!(coarse.low, 98.0);
        assert_relative_eq!(coarse.close, 104.0);
        assert_relative_eq!(coarse.volume, 8.0);
        assert_relative_eq!(coarse.turnover, 800.0);
    }

    #[test]
    fn test_filler_is_flat_and_empty() {
        let bar = Bar::filler(at(10, 0, 0), day(), 3050.0, 15_000.0);
        assert_relative_eq!(bar.open, bar.close);
        assert_relative_eq!(bar.range(), 0.0);
        assert_relative_eq!(bar.volume, 0.0);
        assert!(!bar.is_bullish());
    }
}
