// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Injectable time source.
//!
//! The scheduler never reads a system clock directly. It asks its [`Clock`]
//! for `now` whenever it timestamps a stage or compares against a deadline,
//! so tests can drive it with [`ManualClock`] and hosts can plug in a real
//! monotonic clock.

use alloc::rc::Rc;
use core::cell::Cell;

use crate::time::{Duration, HostTime};

/// A monotonic time source.
pub trait Clock {
    /// Returns the current time. Successive calls must never go backwards.
    fn now(&self) -> HostTime;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> HostTime {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> HostTime {
        (**self).now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the scheduler.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<HostTime>>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: HostTime) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Sets the current time.
    ///
    /// Moving the clock backwards is a test bug.
    pub fn set(&self, now: HostTime) {
        debug_assert!(now >= self.now.get(), "ManualClock moved backwards");
        self.now.set(now);
    }

    /// Advances the current time by `by`.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> HostTime {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = ManualClock::new(HostTime(10));
        let handle = clock.clone();
        handle.advance(Duration(5));
        assert_eq!(clock.now(), HostTime(15), "advance is visible to clones");
        clock.set(HostTime(40));
        assert_eq!(handle.now(), HostTime(40), "set is visible to clones");
    }

    #[test]
    fn references_are_clocks() {
        fn read(clock: impl Clock) -> HostTime {
            clock.now()
        }
        let clock = ManualClock::new(HostTime(7));
        assert_eq!(read(&clock), HostTime(7));
        assert_eq!(read(Rc::new(clock)), HostTime(7));
    }
}
