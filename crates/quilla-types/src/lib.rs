//! Core types for quilla session-aligned bar aggregation.
//!
//! This crate provides the fundamental data structures used throughout quilla:
//!
//! - [`Tick`] - A single market update with day-cumulative volume/turnover
//! - [`ChangeState`] - Aggregate outcome of one ingestion call
//! - [`Transition`] - Per-slice open/close detail behind a [`ChangeState`]
//! - [`QuillaError`] - Shared error taxonomy

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/quilla/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod state;
mod tick;

pub use error::{QuillaError, Result};
pub use state::{ChangeState, Transition};
pub use tick::Tick;
