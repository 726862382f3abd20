//! Mutex-wrapped aggregator handle for concurrent producers.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::TimeDelta;
use quilla_types::{ChangeState, Tick, Transition};

use crate::{Bar, BarAggregator};

/// Cloneable handle sharing one [`BarAggregator`] across threads.
///
/// Every ingestion call acquires the lock before reading any engine
/// state and releases it only after the full mutation has been applied,
/// so no interleaving can observe a half-advanced cursor or a bar that
/// is opened but not yet recorded. Two producers racing on the same
/// handle serialize; whichever loses the race and carries older data is
/// rejected by the engine's ordering check rather than corrupting the
/// series.
#[derive(Debug, Clone)]
pub struct SharedAggregator {
    inner: Arc<Mutex<BarAggregator>>,
}

impl SharedAggregator {
    /// Wraps an engine for shared use.
    #[must_use]
    pub fn new(aggregator: BarAggregator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(aggregator)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BarAggregator> {
        // A panic while holding the lock leaves the engine in a
        // consistent state (mutations are applied whole), so poisoning
        // is recoverable.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Ingests one tick under the lock. See [`BarAggregator::add_tick`].
    pub fn add_tick(&self, tick: &Tick) -> ChangeState {
        self.lock().add_tick(tick)
    }

    /// Ingests one finer bar under the lock. See
    /// [`BarAggregator::add_bar`].
    pub fn add_bar(&self, bar: &Bar) -> ChangeState {
        self.lock().add_bar(bar)
    }

    /// Returns a snapshot of the bars produced so far.
    #[must_use]
    pub fn series(&self) -> Vec<Bar> {
        self.lock().series().to_vec()
    }

    /// Returns the per-slice transitions of the most recent call.
    #[must_use]
    pub fn last_transitions(&self) -> Vec<Transition> {
        self.lock().last_transitions().to_vec()
    }

    /// Returns true once the cursor has moved past the last slice.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.lock().is_exhausted()
    }

    /// Returns the most recent tick-time-to-wall-clock offset.
    #[must_use]
    pub fn clock_offset(&self) -> Option<TimeDelta> {
        self.lock().clock_offset()
    }

    /// Runs `f` with exclusive access to the engine.
    ///
    /// Useful for compound reads that must observe one consistent
    /// state, such as pairing the series with the cursor position.
    pub fn with<R>(&self, f: impl FnOnce(&mut BarAggregator) -> R) -> R {
        f(&mut self.lock())
    }
}
