// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-shot deadline timer abstraction.
//!
//! The scheduler arms at most one deadline at a time through a
//! [`DeadlineTimer`]. Arming returns a [`TimerHandle`]; when the timer fires,
//! the host calls
//! [`FrameScheduler::on_deadline_timer`](crate::scheduler::FrameScheduler::on_deadline_timer)
//! with that handle. The scheduler ignores handles it has since cancelled or
//! replaced, so a host that races a cancellation is harmless.

use crate::time::HostTime;

/// Identifies one arming of a [`DeadlineTimer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// A cancellable, single-shot timer owned by the host.
pub trait DeadlineTimer {
    /// Arms the timer to fire at `at`, returning a handle for this arming.
    ///
    /// `at` may already be in the past; the timer should then fire as soon
    /// as possible.
    fn arm(&mut self, at: HostTime) -> TimerHandle;

    /// Cancels the arming identified by `handle`. Cancelling an arming that
    /// already fired or was cancelled is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// A [`DeadlineTimer`] that just remembers what it was asked to do.
///
/// Hosts poll it with [`take_due`](Self::take_due) and deliver the returned
/// handle to the scheduler.
#[derive(Clone, Debug, Default)]
pub struct ManualTimer {
    next_id: u64,
    armed: Option<(TimerHandle, HostTime)>,
    arm_count: u64,
}

impl ManualTimer {
    /// Creates an idle timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently armed handle and fire time.
    #[must_use]
    pub fn armed(&self) -> Option<(TimerHandle, HostTime)> {
        self.armed
    }

    /// The currently armed fire time.
    #[must_use]
    pub fn armed_at(&self) -> Option<HostTime> {
        self.armed.map(|(_, at)| at)
    }

    /// Total number of times the timer was armed.
    #[must_use]
    pub fn arm_count(&self) -> u64 {
        self.arm_count
    }

    /// Disarms and returns the handle if its fire time is at or before `now`.
    pub fn take_due(&mut self, now: HostTime) -> Option<TimerHandle> {
        match self.armed {
            Some((handle, at)) if at <= now => {
                self.armed = None;
                Some(handle)
            }
            _ => None,
        }
    }
}

impl DeadlineTimer for ManualTimer {
    fn arm(&mut self, at: HostTime) -> TimerHandle {
        self.next_id += 1;
        self.arm_count += 1;
        let handle = TimerHandle(self.next_id);
        self.armed = Some((handle, at));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if matches!(self.armed, Some((armed, _)) if armed == handle) {
            self.armed = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_due_fires_once() {
        let mut timer = ManualTimer::new();
        let handle = timer.arm(HostTime(100));
        assert_eq!(timer.take_due(HostTime(99)), None, "not yet due");
        assert_eq!(timer.take_due(HostTime(100)), Some(handle));
        assert_eq!(timer.take_due(HostTime(200)), None, "single shot");
    }

    #[test]
    fn stale_cancel_is_ignored() {
        let mut timer = ManualTimer::new();
        let first = timer.arm(HostTime(10));
        let second = timer.arm(HostTime(20));
        assert_ne!(first, second, "each arming gets a fresh handle");
        timer.cancel(first);
        assert_eq!(timer.armed_at(), Some(HostTime(20)), "newer arming kept");
        timer.cancel(second);
        assert_eq!(timer.armed(), None);
        assert_eq!(timer.arm_count(), 2);
    }
}
