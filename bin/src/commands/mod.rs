//! CLI command implementations.

pub(crate) mod aggregate;
pub(crate) mod formats;
pub(crate) mod schedule;
