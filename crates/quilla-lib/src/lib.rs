//! Session-aligned OHLCV bar aggregation for futures tick streams.
//!
//! This is a facade crate that re-exports functionality from the quilla
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```
//! use quilla_lib::prelude::*;
//! use chrono::NaiveDate;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let schedule: SessionSchedule = "09:00-11:30,13:30-15:00".parse()?;
//!     let day = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
//!     let table = schedule.slice_table(day, chrono::TimeDelta::minutes(1))?;
//!
//!     let mut aggregator = BarAggregator::new(table, AggregatorConfig::default());
//!     // feed ticks: aggregator.add_tick(&tick)
//!     assert!(aggregator.series().is_empty());
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quilla/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use quilla_types::*;

// Re-export session schedules and slice tables
pub use quilla_session::{
    ScheduleError, Session, SessionSchedule, SliceTable, TableError, TimeSlice,
};

// Re-export aggregation
#[cfg(feature = "aggregate")]
pub use quilla_aggregate::{
    AggregatorConfig, Bar, BarAggregator, DeltaTracker, SharedAggregator, TickDelta,
};

// Re-export formatters
#[cfg(feature = "format")]
pub use quilla_format::{
    read_ticks, CsvFormatter, FormatError, Formatter, JsonFormatter, OutputFormat,
};

/// Prelude module for convenient imports.
///
/// ```
/// use quilla_lib::prelude::*;
/// ```
pub mod prelude {
    pub use quilla_types::{ChangeState, QuillaError, Result, Tick, Transition};

    pub use quilla_session::{Session, SessionSchedule, SliceTable, TimeSlice};

    #[cfg(feature = "aggregate")]
    pub use quilla_aggregate::{AggregatorConfig, Bar, BarAggregator, SharedAggregator};

    #[cfg(feature = "format")]
    pub use quilla_format::{CsvFormatter, Formatter, JsonFormatter, OutputFormat};
}
