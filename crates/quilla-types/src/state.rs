//! Ingestion outcome enums reported by the aggregation engine.

use serde::{Deserialize, Serialize};

/// Aggregate outcome of one `add_tick`/`add_bar` call.
///
/// When gap filling closes several empty slices in one call the counts
/// are collapsed into the dominant direction; the per-slice detail is
/// available as a [`Transition`] list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChangeState {
    /// The tick extended an already-open bar (or was silently ignored).
    #[default]
    Unchanged,
    /// One or more bars were closed, none opened.
    BarClosed,
    /// A bar was opened (possibly after closing fewer bars).
    BarOpened,
    /// A single bar was opened and immediately closed by the same input.
    BarOpenedAndClosed,
    /// The input was rejected: stale, past session close, or malformed.
    Invalid,
}

impl ChangeState {
    /// Returns the state as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::BarClosed => "bar_closed",
            Self::BarOpened => "bar_opened",
            Self::BarOpenedAndClosed => "bar_opened_and_closed",
            Self::Invalid => "invalid",
        }
    }

    /// Returns true if the input was accepted (possibly without effect).
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// Derives the aggregate state from per-call open/close counts.
    #[must_use]
    pub const fn from_counts(opened: usize, closed: usize) -> Self {
        match (opened, closed) {
            (0, 0) => Self::Unchanged,
            (0, _) => Self::BarClosed,
            (_, 0) => Self::BarOpened,
            (1, 1) => Self::BarOpenedAndClosed,
            (o, c) => {
                if o > c {
                    Self::BarOpened
                } else {
                    Self::BarClosed
                }
            }
        }
    }
}

impl std::fmt::Display for ChangeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One bar-series mutation performed during an ingestion call.
///
/// The index refers to the position of the affected bar in the series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// A bar was appended to the series at this index.
    Opened(usize),
    /// The bar at this index was closed.
    Closed(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_counts() {
        assert_eq!(ChangeState::from_counts(0, 0), ChangeState::Unchanged);
        assert_eq!(ChangeState::from_counts(1, 0), ChangeState::BarOpened);
        assert_eq!(ChangeState::from_counts(0, 1), ChangeState::BarClosed);
        assert_eq!(
            ChangeState::from_counts(1, 1),
            ChangeState::BarOpenedAndClosed
        );
        // Gap fill across three empty slices then a fresh open: 1 open, 3 closes.
        assert_eq!(ChangeState::from_counts(1, 3), ChangeState::BarClosed);
        assert_eq!(ChangeState::from_counts(2, 1), ChangeState::BarOpened);
    }

    #[test]
    fn test_accepted() {
        assert!(ChangeState::Unchanged.is_accepted());
        assert!(!ChangeState::Invalid.is_accepted());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ChangeState::BarOpenedAndClosed.to_string(),
            "bar_opened_and_closed"
        );
    }
}
