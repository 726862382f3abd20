//! Session schedule to slice-table builder.

use chrono::{NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use quilla_types::QuillaError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{SliceTable, TableError, TimeSlice};

/// Errors from schedule construction and slice building.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The schedule contained no sessions.
    #[error("Schedule must contain at least one session")]
    EmptySchedule,

    /// Two day sessions overlapped.
    #[error("Session {index} opens at {open} before the previous session closes at {previous_close}")]
    Overlap {
        /// Index of the offending session.
        index: usize,
        /// Open time of the offending session.
        open: NaiveTime,
        /// Close time of the preceding session.
        previous_close: NaiveTime,
    },

    /// The bar interval was zero or negative.
    #[error("Bar interval must be positive, got {0} seconds")]
    ZeroInterval(i64),

    /// A session string could not be parsed.
    #[error("Invalid session string '{0}', expected HH:MM-HH:MM[,HH:MM-HH:MM...]")]
    Parse(String),

    /// The generated slices failed table validation.
    #[error(transparent)]
    Table(#[from] TableError),
}

impl From<ScheduleError> for QuillaError {
    fn from(err: ScheduleError) -> Self {
        Self::Session(err.to_string())
    }
}

/// One trading session within a day.
///
/// A close at or before the open means the session crosses midnight
/// (e.g. a 21:00-02:30 night session) and closes on the next calendar
/// day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session open time.
    pub open: NaiveTime,
    /// Session close time.
    pub close: NaiveTime,
}

impl Session {
    /// Creates a new session.
    #[must_use]
    pub const fn new(open: NaiveTime, close: NaiveTime) -> Self {
        Self { open, close }
    }

    /// Returns true if the session closes on the following calendar day.
    #[must_use]
    pub fn crosses_midnight(&self) -> bool {
        self.close <= self.open
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}-{}",
            self.open.format("%H:%M"),
            self.close.format("%H:%M")
        )
    }
}

/// An ordered list of trading sessions for one instrument.
///
/// The schedule is the external collaborator that produces the
/// [`SliceTable`] consumed by the aggregation engine: each session is
/// split into fixed-interval windows, and a trailing remainder shorter
/// than the interval is folded into the session's final window (so a
/// 09:00-10:15 session at 30-minute bars yields 09:00, 09:30 and a
/// 45-minute 10:00 window).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSchedule {
    sessions: Vec<Session>,
}

impl SessionSchedule {
    /// Creates a schedule, validating ordering of day sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the schedule is empty or two same-day
    /// sessions overlap.
    pub fn new(sessions: Vec<Session>) -> Result<Self, ScheduleError> {
        if sessions.is_empty() {
            return Err(ScheduleError::EmptySchedule);
        }
        for (index, pair) in sessions.windows(2).enumerate() {
            // Overnight sessions roll to the next day and are exempt
            // from the same-day ordering check.
            if pair[0].crosses_midnight() || pair[1].crosses_midnight() {
                continue;
            }
            if pair[1].open < pair[0].close {
                return Err(ScheduleError::Overlap {
                    index: index + 1,
                    open: pair[1].open,
                    previous_close: pair[0].close,
                });
            }
        }
        Ok(Self { sessions })
    }

    /// Returns the sessions in order.
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Builds the slice table for one calendar date at a fixed interval.
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive interval or if the generated
    /// windows fail table validation.
    pub fn slice_table(
        &self,
        date: NaiveDate,
        interval: TimeDelta,
    ) -> Result<SliceTable, ScheduleError> {
        if interval <= TimeDelta::zero() {
            return Err(ScheduleError::ZeroInterval(interval.num_seconds()));
        }

        let mut slices = Vec::new();
        for session in &self.sessions {
            let begin = Utc.from_utc_datetime(&date.and_time(session.open));
            let close_date = if session.crosses_midnight() {
                date.succ_opt()
                    .ok_or_else(|| ScheduleError::Parse(format!("date overflow after {date}")))?
            } else {
                date
            };
            let end = Utc.from_utc_datetime(&close_date.and_time(session.close));

            let session_start = slices.len();
            let mut cursor = begin;
            while cursor + interval <= end {
                slices.push(TimeSlice::new(cursor, cursor + interval)?);
                cursor += interval;
            }
            if cursor < end {
                let in_session = slices.len() > session_start;
                match slices.last_mut() {
                    // Fold the remainder into the session's final window.
                    Some(last) if in_session => last.end_time = end,
                    _ => slices.push(TimeSlice::new(cursor, end)?),
                }
            }
        }

        Ok(SliceTable::new(slices)?)
    }
}

impl std::str::FromStr for SessionSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut sessions = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            let (open, close) = part
                .split_once('-')
                .ok_or_else(|| ScheduleError::Parse(part.to_string()))?;
            sessions.push(Session::new(parse_time(open)?, parse_time(close)?));
        }
        Self::new(sessions)
    }
}

fn parse_time(s: &str) -> Result<NaiveTime, ScheduleError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| ScheduleError::Parse(s.to_string()))
}
