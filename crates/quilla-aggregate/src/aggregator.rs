//! Slice navigation and the bar open/close state machine.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use quilla_session::SliceTable;
use quilla_types::{ChangeState, Tick, Transition};
use tracing::{debug, warn};

use crate::{Bar, DeltaTracker};

/// A tick arriving within this window after the final slice's end is
/// still attributed to that slice; anything later is past session close.
const LAST_SLICE_GRACE_SECS: i64 = 59;

/// Engine construction options.
///
/// Both flags are explicit constructor configuration; nothing in the
/// engine reads the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregatorConfig {
    /// Synthesize zero-volume bars for slices that received no data.
    pub gap_fill: bool,
    /// Track the offset between tick time and wall clock. Purely
    /// observational; never affects aggregation.
    pub live_mode: bool,
}

/// Where a timestamp landed relative to the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    /// Before the cursor's slice: stale or out-of-order data.
    Rejected,
    /// Inside (or tie-broken into) the slice at this index.
    Slice(usize),
    /// Beyond the last slice and its grace window.
    PastEnd,
}

/// Seed values for filler bars when no previous bar exists yet.
#[derive(Debug, Clone, Copy)]
struct FillSeed {
    price: f64,
    open_interest: f64,
    trading_day: NaiveDate,
}

/// Streaming session-aligned bar aggregator.
///
/// Owns a [`SliceTable`] and an append-only bar series. Each
/// [`add_tick`](Self::add_tick) or [`add_bar`](Self::add_bar) call
/// advances the cursor monotonically, closes zero or more completed
/// bars, opens at most one new bar and reports the aggregate
/// [`ChangeState`]; [`last_transitions`](Self::last_transitions) carries
/// the per-slice detail of the most recent call.
///
/// The engine performs no I/O and signals rejected input through
/// [`ChangeState::Invalid`] rather than errors: stale and out-of-session
/// ticks are an expected, high-frequency occurrence on a live feed.
#[derive(Debug)]
pub struct BarAggregator {
    table: SliceTable,
    config: AggregatorConfig,
    series: Vec<Bar>,
    /// Index of the slice the cursor currently considers current.
    slice_pos: usize,
    /// Index into the series of the currently open bar, if any. The open
    /// bar always belongs to the slice at `slice_pos`.
    open_bar: Option<usize>,
    last_tick: Option<Tick>,
    delta: DeltaTracker,
    transitions: Vec<Transition>,
    clock_offset: Option<TimeDelta>,
}

impl BarAggregator {
    /// Creates an engine bound to a validated slice table.
    #[must_use]
    pub fn new(table: SliceTable, config: AggregatorConfig) -> Self {
        Self {
            table,
            config,
            series: Vec::new(),
            slice_pos: 0,
            open_bar: None,
            last_tick: None,
            delta: DeltaTracker::new(),
            transitions: Vec::new(),
            clock_offset: None,
        }
    }

    /// Returns the slice table the engine aggregates against.
    #[must_use]
    pub const fn table(&self) -> &SliceTable {
        &self.table
    }

    /// Returns the bars produced so far; the series is append-only.
    #[must_use]
    pub fn series(&self) -> &[Bar] {
        &self.series
    }

    /// Returns the per-slice transitions of the most recent call.
    #[must_use]
    pub fn last_transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Returns the cursor's slice index; `table().len()` once terminal.
    #[must_use]
    pub const fn slice_position(&self) -> usize {
        self.slice_pos
    }

    /// Returns true once the cursor has moved past the last slice.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.slice_pos >= self.table.len()
    }

    /// Returns the most recently accepted tick.
    #[must_use]
    pub const fn last_tick(&self) -> Option<&Tick> {
        self.last_tick.as_ref()
    }

    /// Returns `tick time - wall clock` of the most recently accepted
    /// tick, when running with `live_mode`.
    #[must_use]
    pub const fn clock_offset(&self) -> Option<TimeDelta> {
        self.clock_offset
    }

    /// Ingests one tick, advancing the cursor and mutating the series.
    ///
    /// Returns [`ChangeState::Invalid`] without any mutation for stale
    /// ticks and for ticks arriving after the table is exhausted.
    pub fn add_tick(&mut self, tick: &Tick) -> ChangeState {
        self.transitions.clear();
        if self.is_exhausted() {
            warn!(date_time = %tick.date_time, "tick after session close, dropped");
            return ChangeState::Invalid;
        }

        let seed = FillSeed {
            price: tick.reference_price(),
            open_interest: tick.pre_open_interest,
            trading_day: tick.trading_day,
        };

        let mut opened = 0usize;
        let mut closed = 0usize;
        match self.locate(tick.date_time) {
            Location::Rejected => {
                warn!(
                    date_time = %tick.date_time,
                    cursor = self.slice_pos,
                    "out-of-order tick, dropped"
                );
                return ChangeState::Invalid;
            }
            Location::PastEnd => {
                // Close out the rest of the session; a tick this late
                // with nothing left to close is plain out-of-session
                // data.
                self.advance_to(self.table.len(), seed, &mut closed);
                if closed == 0 {
                    return ChangeState::Invalid;
                }
            }
            Location::Slice(target) => {
                self.advance_to(target, seed, &mut closed);
                let slice = self.table[target];

                // The baseline only advances when the tick lands in a
                // bar, so an ignored late print does not leak volume.
                if let Some(index) = self.open_bar {
                    let delta = self.delta.advance(tick);
                    self.series[index].apply_tick(tick, delta.volume, delta.turnover);
                } else if self.slice_already_closed(slice.begin_time) {
                    // Late print inside a window that a single earlier
                    // input both opened and closed; bars never reopen.
                } else {
                    let delta = self.delta.advance(tick);
                    let mut bar = Bar::open_with_tick(slice.begin_time, tick, self.series.last());
                    bar.apply_tick(tick, delta.volume, delta.turnover);
                    let index = self.series.len();
                    self.series.push(bar);
                    self.open_bar = Some(index);
                    self.transitions.push(Transition::Opened(index));
                    opened += 1;
                    debug!(index, begin = %slice.begin_time, "bar opened");
                }

                if tick.date_time >= slice.end_time {
                    self.close_open_bar(slice.end_time, &mut closed);
                }
            }
        }

        self.last_tick = Some(*tick);
        if self.config.live_mode {
            self.clock_offset = Some(tick.date_time - Utc::now());
        }
        ChangeState::from_counts(opened, closed)
    }

    /// Ingests one finer-grained closed bar (down-sampling path).
    ///
    /// Sub-bar volume and turnover are already per-bar deltas and are
    /// merged without the cumulative baseline.
    pub fn add_bar(&mut self, sub: &Bar) -> ChangeState {
        self.transitions.clear();
        if self.is_exhausted() {
            warn!(begin = %sub.begin_time, "sub-bar after session close, dropped");
            return ChangeState::Invalid;
        }

        let seed = FillSeed {
            price: if sub.pre_close > 0.0 {
                sub.pre_close
            } else {
                sub.open
            },
            open_interest: sub.open_interest,
            trading_day: sub.trading_day,
        };
        let sub_end = sub.end_time.unwrap_or(sub.begin_time);

        let mut opened = 0usize;
        let mut closed = 0usize;
        match self.locate(sub.begin_time) {
            Location::Rejected => {
                warn!(
                    begin = %sub.begin_time,
                    cursor = self.slice_pos,
                    "out-of-order sub-bar, dropped"
                );
                return ChangeState::Invalid;
            }
            Location::PastEnd => {
                self.advance_to(self.table.len(), seed, &mut closed);
                if closed == 0 {
                    return ChangeState::Invalid;
                }
            }
            Location::Slice(target) => {
                self.advance_to(target, seed, &mut closed);
                let slice = self.table[target];

                if let Some(index) = self.open_bar {
                    self.series[index].merge_bar(sub);
                } else if self.slice_already_closed(slice.begin_time) {
                    // Bars never reopen.
                } else {
                    let bar = Bar::open_with_bar(slice.begin_time, sub, self.series.last());
                    let index = self.series.len();
                    self.series.push(bar);
                    self.open_bar = Some(index);
                    self.transitions.push(Transition::Opened(index));
                    opened += 1;
                    debug!(index, begin = %slice.begin_time, "bar opened from sub-bar");
                }

                if sub_end >= slice.end_time {
                    self.close_open_bar(slice.end_time, &mut closed);
                }
            }
        }

        ChangeState::from_counts(opened, closed)
    }

    /// Maps a timestamp onto the slice table, scanning forward from the
    /// cursor.
    ///
    /// Inside a gap between two slices the timestamp is attributed to
    /// whichever boundary it is closer to, ties favoring the earlier
    /// slice. After the final slice a grace window of
    /// [`LAST_SLICE_GRACE_SECS`] still maps to that slice.
    fn locate(&self, at: DateTime<Utc>) -> Location {
        if at < self.table[self.slice_pos].begin_time {
            return Location::Rejected;
        }

        let mut index = self.slice_pos;
        while index < self.table.len() - 1 {
            let current = self.table[index];
            let next = self.table[index + 1];
            if at < current.end_time {
                return Location::Slice(index);
            }
            if at < next.begin_time {
                let to_current = at - current.end_time;
                let to_next = next.begin_time - at;
                return if to_next < to_current {
                    Location::Slice(index + 1)
                } else {
                    Location::Slice(index)
                };
            }
            index += 1;
        }

        let last = self.table[index];
        if at < last.end_time + TimeDelta::seconds(LAST_SLICE_GRACE_SECS) {
            Location::Slice(index)
        } else {
            Location::PastEnd
        }
    }

    /// Advances the cursor to `target`, closing the open bar and, with
    /// gap filling enabled, synthesizing a closed zero-volume bar for
    /// every silent slice passed over.
    fn advance_to(&mut self, target: usize, seed: FillSeed, closed: &mut usize) {
        while self.slice_pos < target {
            let slice = self.table[self.slice_pos];
            if self.open_bar.is_some() {
                self.close_open_bar(slice.end_time, closed);
            } else if self.config.gap_fill && !self.slice_already_closed(slice.begin_time) {
                let bar = match self.series.last() {
                    Some(prev) => Bar::filler(
                        slice.begin_time,
                        prev.trading_day,
                        prev.close,
                        prev.open_interest,
                    ),
                    None => Bar::filler(
                        slice.begin_time,
                        seed.trading_day,
                        seed.price,
                        seed.open_interest,
                    ),
                };
                let index = self.series.len();
                self.series.push(bar);
                self.series[index].close(slice.end_time);
                self.transitions.push(Transition::Opened(index));
                self.transitions.push(Transition::Closed(index));
                *closed += 1;
                debug!(index, begin = %slice.begin_time, "filler bar for silent slice");
            }
            self.slice_pos += 1;
        }
    }

    /// Closes the currently open bar, if any.
    fn close_open_bar(&mut self, end_time: DateTime<Utc>, closed: &mut usize) {
        if let Some(index) = self.open_bar.take() {
            self.series[index].close(end_time);
            self.transitions.push(Transition::Closed(index));
            *closed += 1;
            debug!(index, end = %end_time, "bar closed");
        }
    }

    /// True if the slice beginning at `begin_time` already produced a
    /// bar that has been closed (idempotent-close guard).
    fn slice_already_closed(&self, begin_time: DateTime<Utc>) -> bool {
        self.series
            .last()
            .is_some_and(|bar| bar.begin_time == begin_time && bar.is_closed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use quilla_session::TimeSlice;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    /// Table from (begin, end) second offsets relative to 09:00.
    fn table(windows: &[(i64, i64)]) -> SliceTable {
        let slices = windows
            .iter()
            .map(|(b, e)| {
                TimeSlice::new(
                    base() + TimeDelta::seconds(*b),
                    base() + TimeDelta::seconds(*e),
                )
                .unwrap()
            })
            .collect();
        SliceTable::new(slices).unwrap()
    }

    fn tick(secs: i64, price: f64, volume: f64) -> Tick {
        Tick::new(
            base() + TimeDelta::seconds(secs),
            day(),
            price,
            volume,
            volume * price,
        )
    }

    fn engine(windows: &[(i64, i64)]) -> BarAggregator {
        BarAggregator::new(table(windows), AggregatorConfig::default())
    }

    #[test]
    fn test_two_slice_scenario() {
        let mut agg = engine(&[(0, 60), (60, 120)]);

        assert_eq!(agg.add_tick(&tick(10, 100.0, 5.0)), ChangeState::BarOpened);
        assert_eq!(agg.series().len(), 1);
        assert_relative_eq!(agg.series()[0].open, 100.0);
        assert_relative_eq!(agg.series()[0].volume, 5.0);

        assert_eq!(agg.add_tick(&tick(50, 102.0, 8.0)), ChangeState::Unchanged);
        let bar = agg.series()[0];
        assert_relative_eq!(bar.high, 102.0);
        assert_relative_eq!(bar.low, 100.0);
        assert_relative_eq!(bar.close, 102.0);
        assert_relative_eq!(bar.volume, 8.0);
        assert!(!bar.is_closed());

        // Crosses into the second slice: close + open collapse into one
        // reported state, with the detail in the transition list.
        assert_eq!(
            agg.add_tick(&tick(65, 99.0, 12.0)),
            ChangeState::BarOpenedAndClosed
        );
        assert_eq!(
            agg.last_transitions(),
            &[Transition::Closed(0), Transition::Opened(1)]
        );
        let closed = agg.series()[0];
        assert!(closed.is_closed());
        assert_relative_eq!(closed.close, 102.0);
        assert_relative_eq!(closed.volume, 8.0);
        let open = agg.series()[1];
        assert_relative_eq!(open.open, 99.0);
        assert_relative_eq!(open.volume, 4.0);
    }

    #[test]
    fn test_stale_tick_rejected_without_mutation() {
        let mut agg = engine(&[(0, 60), (60, 120)]);
        agg.add_tick(&tick(10, 100.0, 5.0));
        agg.add_tick(&tick(65, 99.0, 12.0));
        let position = agg.slice_position();

        assert_eq!(agg.add_tick(&tick(30, 101.0, 13.0)), ChangeState::Invalid);
        assert!(agg.last_transitions().is_empty());
        assert_eq!(agg.slice_position(), position);
        assert_eq!(agg.series().len(), 2);

        // The rejected tick must not have advanced the delta baseline:
        // the next delta is 14 - 12, not 14 - 13.
        agg.add_tick(&tick(70, 99.5, 14.0));
        assert_relative_eq!(agg.series()[1].volume, 9.0);
    }

    #[test]
    fn test_tick_before_table_rejected() {
        let mut agg = engine(&[(0, 60)]);
        assert_eq!(agg.add_tick(&tick(-10, 100.0, 1.0)), ChangeState::Invalid);
        assert!(agg.series().is_empty());
    }

    #[test]
    fn test_gap_tie_break() {
        // Slices [0,10) and [20,30). A tick at t=14 is 4s past the first
        // slice's close and 6s short of the next open: it stays with the
        // earlier slice. At t=16 the distances flip.
        let mut agg = engine(&[(0, 10), (20, 30)]);
        agg.add_tick(&tick(14, 100.0, 1.0));
        assert_eq!(agg.series()[0].begin_time, base());

        let mut agg = engine(&[(0, 10), (20, 30)]);
        agg.add_tick(&tick(16, 100.0, 1.0));
        assert_eq!(
            agg.series()[0].begin_time,
            base() + TimeDelta::seconds(20)
        );

        // Equidistant ticks favor the earlier slice.
        let mut agg = engine(&[(0, 10), (20, 30)]);
        agg.add_tick(&tick(15, 100.0, 1.0));
        assert_eq!(agg.series()[0].begin_time, base());
    }

    #[test]
    fn test_in_gap_tick_past_slice_end_opens_and_closes() {
        let mut agg = engine(&[(0, 10), (20, 30)]);
        assert_eq!(
            agg.add_tick(&tick(14, 100.0, 1.0)),
            ChangeState::BarOpenedAndClosed
        );
        assert!(agg.series()[0].is_closed());
    }

    #[test]
    fn test_idempotent_close() {
        let mut agg = engine(&[(0, 10), (20, 30)]);
        agg.add_tick(&tick(14, 100.0, 1.0));

        // A later print tie-broken into the same already-closed slice is
        // ignored: no reopen, no mutation, no baseline movement.
        assert_eq!(agg.add_tick(&tick(15, 105.0, 3.0)), ChangeState::Unchanged);
        assert_eq!(agg.series().len(), 1);
        assert_relative_eq!(agg.series()[0].close, 100.0);

        agg.add_tick(&tick(21, 101.0, 4.0));
        assert_relative_eq!(agg.series()[1].volume, 3.0);
    }

    #[test]
    fn test_terminal_grace_window() {
        let mut agg = engine(&[(0, 60)]);
        assert_eq!(
            agg.add_tick(&tick(90, 100.0, 1.0)),
            ChangeState::BarOpenedAndClosed
        );
        assert!(agg.series()[0].is_closed());

        let mut agg = engine(&[(0, 60)]);
        assert_eq!(agg.add_tick(&tick(150, 100.0, 1.0)), ChangeState::Invalid);
        assert!(agg.series().is_empty());
        assert!(agg.is_exhausted());
        assert_eq!(agg.add_tick(&tick(160, 100.0, 2.0)), ChangeState::Invalid);
    }

    #[test]
    fn test_past_end_closes_open_bar() {
        let mut agg = engine(&[(0, 60)]);
        agg.add_tick(&tick(10, 100.0, 1.0));
        assert_eq!(agg.add_tick(&tick(150, 101.0, 2.0)), ChangeState::BarClosed);
        assert!(agg.series()[0].is_closed());
        assert!(agg.is_exhausted());
    }

    #[test]
    fn test_monotonic_cursor() {
        let mut agg = engine(&[(0, 60), (60, 120), (120, 180)]);
        let mut last_position = agg.slice_position();
        for secs in [10, 70, 30, 65, 130, 5, 175] {
            agg.add_tick(&tick(i64::from(secs), 100.0, 1.0));
            assert!(agg.slice_position() >= last_position);
            last_position = agg.slice_position();
        }
    }

    #[test]
    fn test_day_rollover_resets_baseline() {
        let mut agg = engine(&[(0, 60), (60, 120)]);
        agg.add_tick(&tick(10, 100.0, 900.0));

        let mut next_day = tick(70, 101.0, 6.0);
        next_day.trading_day = day().succ_opt().unwrap();
        agg.add_tick(&next_day);

        assert_relative_eq!(agg.series()[1].volume, 6.0);
    }

    #[test]
    fn test_gap_fill_synthesizes_closed_bars() {
        let mut agg = BarAggregator::new(
            table(&[(0, 60), (60, 120), (120, 180)]),
            AggregatorConfig {
                gap_fill: true,
                live_mode: false,
            },
        );
        agg.add_tick(&tick(10, 100.0, 5.0));

        // The second slice saw no data: one close for the first bar, one
        // synthesized closed bar, one fresh open.
        assert_eq!(agg.add_tick(&tick(130, 105.0, 9.0)), ChangeState::BarClosed);
        assert_eq!(
            agg.last_transitions(),
            &[
                Transition::Closed(0),
                Transition::Opened(1),
                Transition::Closed(1),
                Transition::Opened(2),
            ]
        );

        let filler = agg.series()[1];
        assert!(filler.is_closed());
        assert_relative_eq!(filler.volume, 0.0);
        assert_relative_eq!(filler.open, 100.0);
        assert_relative_eq!(filler.close, 100.0);
        assert_relative_eq!(agg.series()[2].open, 105.0);
    }

    #[test]
    fn test_no_gap_fill_skips_silent_slices() {
        let mut agg = engine(&[(0, 60), (60, 120), (120, 180)]);
        agg.add_tick(&tick(10, 100.0, 5.0));
        agg.add_tick(&tick(130, 105.0, 9.0));
        assert_eq!(agg.series().len(), 2);
    }

    fn sub_bar(begin_secs: i64, end_secs: i64, prices: (f64, f64, f64, f64), volume: f64) -> Bar {
        let (open, high, low, close) = prices;
        Bar {
            trading_day: day(),
            begin_time: base() + TimeDelta::seconds(begin_secs),
            end_time: Some(base() + TimeDelta::seconds(end_secs)),
            open,
            high,
            low,
            close,
            pre_close: open,
            volume,
            turnover: volume * open,
            open_interest: 0.0,
        }
    }

    #[test]
    fn test_add_bar_downsamples() {
        // Two-minute slices fed from a one-minute series.
        let mut agg = engine(&[(0, 120), (120, 240)]);

        let first = sub_bar(0, 60, (100.0, 101.0, 99.0, 100.5), 5.0);
        assert_eq!(agg.add_bar(&first), ChangeState::BarOpened);

        let second = sub_bar(60, 120, (100.5, 103.0, 100.0, 102.0), 3.0);
        assert_eq!(agg.add_bar(&second), ChangeState::BarClosed);

        let coarse = agg.series()[0];
        assert!(coarse.is_closed());
        assert_relative_eq!(coarse.open, 100.0);
        assert_relative_eq!(coarse.high, 103.0);
        assert_relative_eq!(coarse.low, 99.0);
        assert_relative_eq!(coarse.close, 102.0);
        assert_relative_eq!(coarse.volume, 8.0);

        let third = sub_bar(120, 180, (102.0, 102.5, 101.0, 101.5), 4.0);
        assert_eq!(agg.add_bar(&third), ChangeState::BarOpened);
        assert_relative_eq!(agg.series()[1].pre_close, 102.0);
    }

    #[test]
    fn test_add_bar_rejects_stale() {
        let mut agg = engine(&[(0, 120), (120, 240)]);
        agg.add_bar(&sub_bar(120, 180, (100.0, 100.0, 100.0, 100.0), 1.0));
        assert_eq!(
            agg.add_bar(&sub_bar(0, 60, (100.0, 100.0, 100.0, 100.0), 1.0)),
            ChangeState::Invalid
        );
    }

    #[test]
    fn test_live_mode_tracks_clock_offset() {
        let begin = Utc::now() - TimeDelta::seconds(30);
        let slice = TimeSlice::new(begin, begin + TimeDelta::seconds(120)).unwrap();
        let live_table = SliceTable::new(vec![slice]).unwrap();
        let mut agg = BarAggregator::new(
            live_table,
            AggregatorConfig {
                gap_fill: false,
                live_mode: true,
            },
        );
        assert!(agg.clock_offset().is_none());

        let lagged = Tick::new(
            Utc::now() - TimeDelta::seconds(5),
            Utc::now().date_naive(),
            100.0,
            1.0,
            100.0,
        );
        assert_eq!(agg.add_tick(&lagged), ChangeState::BarOpened);

        let offset = agg.clock_offset().unwrap();
        assert!(offset <= TimeDelta::zero());
        assert!(offset > -TimeDelta::seconds(60));
    }
}
