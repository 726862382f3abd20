//! Tick data representation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single market update from a futures feed.
///
/// `volume` and `turnover` are **cumulative for the trading day**, not
/// per-tick deltas. Consumers that need per-bar increments must subtract
/// the previous tick's counters and reset the baseline when
/// `trading_day` changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Timestamp of the tick (UTC).
    pub date_time: DateTime<Utc>,
    /// Trading day the tick belongs to (night sessions map to the next day).
    pub trading_day: NaiveDate,
    /// Last traded price.
    pub price: f64,
    /// Day-cumulative traded volume.
    pub volume: f64,
    /// Day-cumulative traded turnover.
    pub turnover: f64,
    /// Open interest after this trade.
    pub open_interest: f64,
    /// Previous session's closing price.
    pub pre_close_price: f64,
    /// Previous session's settlement price.
    pub pre_settlement_price: f64,
    /// Open interest at the previous session's close.
    pub pre_open_interest: f64,
}

impl Tick {
    /// Creates a new tick with zeroed open-interest and reference fields.
    #[must_use]
    pub const fn new(
        date_time: DateTime<Utc>,
        trading_day: NaiveDate,
        price: f64,
        volume: f64,
        turnover: f64,
    ) -> Self {
        Self {
            date_time,
            trading_day,
            price,
            volume,
            turnover,
            open_interest: 0.0,
            pre_close_price: 0.0,
            pre_settlement_price: 0.0,
            pre_open_interest: 0.0,
        }
    }

    /// Sets the open interest.
    #[must_use]
    pub const fn with_open_interest(mut self, open_interest: f64) -> Self {
        self.open_interest = open_interest;
        self
    }

    /// Sets the previous-session reference fields.
    #[must_use]
    pub const fn with_references(
        mut self,
        pre_close_price: f64,
        pre_settlement_price: f64,
        pre_open_interest: f64,
    ) -> Self {
        self.pre_close_price = pre_close_price;
        self.pre_settlement_price = pre_settlement_price;
        self.pre_open_interest = pre_open_interest;
        self
    }

    /// Returns the reference price for seeding a first bar.
    ///
    /// Futures feeds report a settlement price that is preferred over the
    /// plain close when present; a zero settlement means "not provided".
    #[must_use]
    pub fn reference_price(&self) -> f64 {
        if self.pre_settlement_price > 0.0 {
            self.pre_settlement_price
        } else {
            self.pre_close_price
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_tick() -> Tick {
        let date_time = Utc.with_ymd_and_hms(2024, 3, 14, 9, 30, 0).unwrap();
        let trading_day = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        Tick::new(date_time, trading_day, 3050.0, 120.0, 3_660_000.0)
    }

    #[test]
    fn test_reference_price_prefers_settlement() {
        let tick = make_tick().with_references(3040.0, 3045.0, 15_000.0);
        assert!((tick.reference_price() - 3045.0).abs() < 1e-10);
    }

    #[test]
    fn test_reference_price_falls_back_to_close() {
        let tick = make_tick().with_references(3040.0, 0.0, 15_000.0);
        assert!((tick.reference_price() - 3040.0).abs() < 1e-10);
    }

    #[test]
    fn test_builder_fields() {
        let tick = make_tick().with_open_interest(18_500.0);
        assert!((tick.open_interest - 18_500.0).abs() < 1e-10);
        assert!((tick.volume - 120.0).abs() < 1e-10);
    }
}
