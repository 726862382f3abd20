//! Session-aligned OHLCV bar aggregation engine.
//!
//! This crate turns a stream of futures ticks (or finer bars) into a
//! series of OHLCV bars aligned to a precomputed
//! [`SliceTable`](quilla_session::SliceTable):
//!
//! - [`Bar`] - Mutable OHLCV aggregate with open/update/merge/close
//! - [`DeltaTracker`] - Day-cumulative counter to per-bar delta conversion
//! - [`BarAggregator`] - The slice-navigation and open/close state machine
//! - [`SharedAggregator`] - Mutex-wrapped handle for concurrent producers

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quilla/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod bar;
mod delta;
mod shared;

pub use aggregator::{AggregatorConfig, BarAggregator};
pub use bar::Bar;
pub use delta::{DeltaTracker, TickDelta};
pub use shared::SharedAggregator;
