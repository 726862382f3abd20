//! Trading session and time-slice model for quilla bar aggregation.
//!
//! This crate provides the window model consumed by the aggregation
//! engine:
//!
//! - [`TimeSlice`] - One half-open aggregation window `[begin, end)`
//! - [`SliceTable`] - Non-empty, ordered, gap-aware sequence of slices
//! - [`SessionSchedule`] - Builds a [`SliceTable`] from trading sessions

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quilla/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod schedule;
mod slice;
mod table;

pub use schedule::{ScheduleError, Session, SessionSchedule};
pub use slice::TimeSlice;
pub use table::{SliceTable, TableError};
