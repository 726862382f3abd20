//! Time-slice aggregation window.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::TableError;

/// One aggregation window `[begin_time, end_time)`.
///
/// Slices are immutable values; a [`crate::SliceTable`] orders them
/// chronologically with optional gaps (trading recesses) in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlice {
    /// Window start (inclusive).
    pub begin_time: DateTime<Utc>,
    /// Window end (exclusive).
    pub end_time: DateTime<Utc>,
}

impl TimeSlice {
    /// Creates a new slice, validating that `begin_time < end_time`.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty or inverted window.
    pub fn new(begin_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Result<Self, TableError> {
        if begin_time >= end_time {
            return Err(TableError::EmptySlice {
                begin: begin_time,
                end: end_time,
            });
        }
        Ok(Self {
            begin_time,
            end_time,
        })
    }

    /// Returns the window duration.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end_time - self.begin_time
    }

    /// Returns true if the timestamp falls inside `[begin_time, end_time)`.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp >= self.begin_time && timestamp < self.end_time
    }
}

impl std::fmt::Display for TimeSlice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} .. {})",
            self.begin_time.format("%Y-%m-%d %H:%M:%S"),
            self.end_time.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, h, m, 0).unwrap()
    }

    #[test]
    fn test_new_valid() {
        let slice = TimeSlice::new(at(9, 0), at(9, 1)).unwrap();
        assert_eq!(slice.duration(), TimeDelta::minutes(1));
    }

    #[test]
    fn test_new_rejects_inverted() {
        assert!(TimeSlice::new(at(9, 1), at(9, 0)).is_err());
        assert!(TimeSlice::new(at(9, 0), at(9, 0)).is_err());
    }

    #[test]
    fn test_contains_half_open() {
        let slice = TimeSlice::new(at(9, 0), at(9, 1)).unwrap();
        assert!(slice.contains(at(9, 0)));
        assert!(!slice.contains(at(9, 1)));
    }
}
