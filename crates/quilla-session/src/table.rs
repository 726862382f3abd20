//! Validated, gap-aware slice table.

use chrono::{DateTime, TimeDelta, Utc};
use quilla_types::QuillaError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TimeSlice;

/// Errors from slice and table construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// A slice window was empty or inverted.
    #[error("Empty slice window: {begin} >= {end}")]
    EmptySlice {
        /// The offending window start.
        begin: DateTime<Utc>,
        /// The offending window end.
        end: DateTime<Utc>,
    },

    /// The table contained no slices.
    #[error("Slice table must not be empty")]
    EmptyTable,

    /// Consecutive slices were out of order or overlapping.
    #[error("Slice {index} begins at {begin}, before the previous slice ends at {previous_end}")]
    Unordered {
        /// Index of the offending slice.
        index: usize,
        /// Begin time of the offending slice.
        begin: DateTime<Utc>,
        /// End time of the preceding slice.
        previous_end: DateTime<Utc>,
    },
}

impl From<TableError> for QuillaError {
    fn from(err: TableError) -> Self {
        Self::Session(err.to_string())
    }
}

/// A non-empty, chronologically ordered sequence of [`TimeSlice`]s.
///
/// Consecutive slices are either contiguous or separated by a gap (a
/// trading recess). The table is immutable once constructed; the
/// aggregation engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceTable {
    slices: Vec<TimeSlice>,
}

impl SliceTable {
    /// Creates a table, validating non-emptiness and chronological order.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty or any slice begins before
    /// the previous one ends. These indicate a programming error in the
    /// table builder rather than a data-quality issue.
    pub fn new(slices: Vec<TimeSlice>) -> Result<Self, TableError> {
        if slices.is_empty() {
            return Err(TableError::EmptyTable);
        }
        for (index, pair) in slices.windows(2).enumerate() {
            if pair[1].begin_time < pair[0].end_time {
                return Err(TableError::Unordered {
                    index: index + 1,
                    begin: pair[1].begin_time,
                    previous_end: pair[0].end_time,
                });
            }
        }
        Ok(Self { slices })
    }

    /// Returns the number of slices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// Always false; the constructor rejects empty tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Returns the slice at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&TimeSlice> {
        self.slices.get(index)
    }

    /// Returns the first slice.
    #[must_use]
    pub fn first(&self) -> &TimeSlice {
        &self.slices[0]
    }

    /// Returns the last slice.
    #[must_use]
    pub fn last(&self) -> &TimeSlice {
        &self.slices[self.slices.len() - 1]
    }

    /// Returns the slices as a contiguous view.
    #[must_use]
    pub fn slices(&self) -> &[TimeSlice] {
        &self.slices
    }

    /// Returns the gap between slice `index` and its successor.
    ///
    /// `Some(TimeDelta::zero())` means the slices are contiguous; `None`
    /// means `index` is the last slice.
    #[must_use]
    pub fn gap_after(&self, index: usize) -> Option<TimeDelta> {
        let current = self.slices.get(index)?;
        let next = self.slices.get(index + 1)?;
        Some(next.begin_time - current.end_time)
    }

    /// Returns an iterator over the slices.
    pub fn iter(&self) -> std::slice::Iter<'_, TimeSlice> {
        self.slices.iter()
    }
}

impl std::ops::Index<usize> for SliceTable {
    type Output = TimeSlice;

    fn index(&self, index: usize) -> &TimeSlice {
        &self.slices[index]
    }
}

impl<'a> IntoIterator for &'a SliceTable {
    type Item = &'a TimeSlice;
    type IntoIter = std::slice::Iter<'a, TimeSlice>;

    fn into_iter(self) -> Self::IntoIter {
        self.slices.iter()
    }
}
