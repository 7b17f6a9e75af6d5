// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Begin-frame sources.
//!
//! A [`BeginFrameSource`] is the scheduler's view of whatever produces frame
//! timing: a display link, a compositor callback, or one of the synthetic
//! sources in this module. The scheduler only subscribes, unsubscribes, and
//! acknowledges frames; delivering [`FrameArgs`] is the host's job (it calls
//! [`FrameScheduler::on_begin_frame`](crate::scheduler::FrameScheduler::on_begin_frame)).
//!
//! Every frame delivered to the scheduler is acknowledged with exactly one
//! [`BeginFrameSource::did_finish_frame`] call, whether it was drawn, queued
//! and later handled, or dropped.
//!
//! The synthetic sources implement [`SyntheticBeginFrameSource`], which a
//! polling run loop uses to find out when to wake and what to deliver.

use alloc::rc::Rc;
use core::cell::RefCell;

use crate::args::FrameArgs;
use crate::time::{Duration, HostTime};

/// Nominal frame interval when nothing better is known (60 Hz at nanosecond
/// ticks).
pub const DEFAULT_INTERVAL: Duration = Duration(16_666_667);

/// The scheduler-side handle to a frame timing source.
pub trait BeginFrameSource {
    /// Starts delivering frames to the scheduler.
    fn add_observer(&mut self);

    /// Stops delivering frames to the scheduler.
    fn remove_observer(&mut self);

    /// Whether frames are paced by real time. Unthrottled sources issue the
    /// next frame as soon as the previous one is finished, so consumer
    /// latency recovery has nothing to gain from skipping one.
    fn is_throttled(&self) -> bool;

    /// The scheduler is done with the most recently delivered frame.
    fn did_finish_frame(&mut self);
}

impl<T: BeginFrameSource + ?Sized> BeginFrameSource for Rc<RefCell<T>> {
    fn add_observer(&mut self) {
        self.borrow_mut().add_observer();
    }

    fn remove_observer(&mut self) {
        self.borrow_mut().remove_observer();
    }

    fn is_throttled(&self) -> bool {
        self.borrow().is_throttled()
    }

    fn did_finish_frame(&mut self) {
        self.borrow_mut().did_finish_frame();
    }
}

/// A source the host polls for frames instead of receiving callbacks.
pub trait SyntheticBeginFrameSource: BeginFrameSource {
    /// When the next frame becomes available, or `None` if nothing will be
    /// issued until the observer state changes.
    fn next_tick_time(&self, now: HostTime) -> Option<HostTime>;

    /// Issues the frame due at `now`, if any.
    fn poll(&mut self, now: HostTime) -> Option<FrameArgs>;
}

/// Observer and in-flight accounting shared by the synthetic sources.
#[derive(Clone, Copy, Debug, Default)]
struct Observation {
    observers: u32,
    in_flight: u32,
}

impl Observation {
    fn add(&mut self) {
        self.observers += 1;
    }

    fn remove(&mut self) {
        debug_assert!(self.observers > 0, "remove_observer without add_observer");
        self.observers = self.observers.saturating_sub(1);
        if self.observers == 0 {
            self.in_flight = 0;
        }
    }

    fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    fn observed(self) -> bool {
        self.observers > 0
    }
}

// ---------------------------------------------------------------------------
// DelayBasedBeginFrameSource
// ---------------------------------------------------------------------------

/// Issues frames on a fixed grid `origin + k * interval`.
///
/// Each frame's deadline is `frame_time + deadline_fraction * interval`.
/// Polling after a tick's deadline still issues that tick, marked
/// [`Missed`](crate::args::FrameArgsKind::Missed); ticks skipped entirely
/// (the host slept through several) are never issued.
#[derive(Clone, Debug)]
pub struct DelayBasedBeginFrameSource {
    origin: HostTime,
    interval: Duration,
    deadline_offset: Duration,
    last_tick: Option<HostTime>,
    sequence: u64,
    observation: Observation,
}

impl DelayBasedBeginFrameSource {
    /// Creates a source ticking every `interval` from time zero.
    ///
    /// `deadline_fraction` is clamped to `0.0..=1.0`.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    #[must_use]
    pub fn new(interval: Duration, deadline_fraction: f64) -> Self {
        assert!(interval > Duration::ZERO, "frame interval must not be zero");
        Self {
            origin: HostTime(0),
            interval,
            deadline_offset: fraction_of(interval, deadline_fraction),
            last_tick: None,
            sequence: 0,
            observation: Observation::default(),
        }
    }

    /// Re-aligns the grid to a new vsync timebase and interval.
    ///
    /// A zero interval is ignored. The deadline keeps its fraction of the
    /// interval.
    pub fn update_vsync_parameters(&mut self, origin: HostTime, interval: Duration) {
        if interval == Duration::ZERO {
            return;
        }
        let fraction_ticks = self.deadline_offset.ticks();
        let old_interval = self.interval.ticks();
        self.deadline_offset = Duration(
            (u128::from(fraction_ticks) * u128::from(interval.ticks()) / u128::from(old_interval))
                .try_into()
                .unwrap_or(u64::MAX),
        );
        self.origin = origin;
        self.interval = interval;
    }

    /// The current frame interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of issued frames not yet finished by the observer.
    #[must_use]
    pub fn frames_in_flight(&self) -> u32 {
        self.observation.in_flight
    }

    /// Whether an observer is subscribed.
    #[must_use]
    pub fn has_observer(&self) -> bool {
        self.observation.observed()
    }

    /// The latest grid tick at or before `now`.
    fn tick_at_or_before(&self, now: HostTime) -> HostTime {
        let since_origin = now.saturating_duration_since(self.origin).ticks();
        let whole = since_origin / self.interval.ticks() * self.interval.ticks();
        self.origin + Duration(whole)
    }
}

impl BeginFrameSource for DelayBasedBeginFrameSource {
    fn add_observer(&mut self) {
        self.observation.add();
    }

    fn remove_observer(&mut self) {
        self.observation.remove();
    }

    fn is_throttled(&self) -> bool {
        true
    }

    fn did_finish_frame(&mut self) {
        self.observation.finish();
    }
}

impl SyntheticBeginFrameSource for DelayBasedBeginFrameSource {
    fn next_tick_time(&self, now: HostTime) -> Option<HostTime> {
        if !self.observation.observed() {
            return None;
        }
        let tick = self.tick_at_or_before(now);
        match self.last_tick {
            Some(last) if last >= tick => Some(tick + self.interval),
            _ => Some(tick),
        }
    }

    fn poll(&mut self, now: HostTime) -> Option<FrameArgs> {
        if !self.observation.observed() || now < self.origin {
            return None;
        }
        let tick = self.tick_at_or_before(now);
        if self.last_tick.is_some_and(|last| last >= tick) {
            return None;
        }
        self.last_tick = Some(tick);
        self.sequence += 1;
        self.observation.in_flight += 1;
        let args = FrameArgs::new(
            self.sequence,
            tick,
            tick + self.deadline_offset,
            self.interval,
        );
        Some(if now > args.deadline { args.missed() } else { args })
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "the clamped fraction keeps the product within the interval"
)]
fn fraction_of(interval: Duration, fraction: f64) -> Duration {
    let fraction = if fraction.is_nan() { 1.0 } else { fraction.clamp(0.0, 1.0) };
    let ticks = interval.ticks() as f64 * fraction;
    Duration((ticks as u64).min(interval.ticks()))
}

// ---------------------------------------------------------------------------
// BackToBackBeginFrameSource
// ---------------------------------------------------------------------------

/// Issues a new frame as soon as the previous one is finished.
///
/// Frame time is the poll time and the deadline is one nominal interval
/// later. Useful for benchmarks and headless rendering.
#[derive(Clone, Debug)]
pub struct BackToBackBeginFrameSource {
    interval: Duration,
    sequence: u64,
    observation: Observation,
}

impl Default for BackToBackBeginFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl BackToBackBeginFrameSource {
    /// Creates a source using [`DEFAULT_INTERVAL`] as the nominal interval.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            sequence: 0,
            observation: Observation::default(),
        }
    }

    /// Number of issued frames not yet finished by the observer.
    #[must_use]
    pub fn frames_in_flight(&self) -> u32 {
        self.observation.in_flight
    }
}

impl BeginFrameSource for BackToBackBeginFrameSource {
    fn add_observer(&mut self) {
        self.observation.add();
    }

    fn remove_observer(&mut self) {
        self.observation.remove();
    }

    fn is_throttled(&self) -> bool {
        false
    }

    fn did_finish_frame(&mut self) {
        self.observation.finish();
    }
}

impl SyntheticBeginFrameSource for BackToBackBeginFrameSource {
    fn next_tick_time(&self, now: HostTime) -> Option<HostTime> {
        (self.observation.observed() && self.observation.in_flight == 0).then_some(now)
    }

    fn poll(&mut self, now: HostTime) -> Option<FrameArgs> {
        if !self.observation.observed() || self.observation.in_flight > 0 {
            return None;
        }
        self.sequence += 1;
        self.observation.in_flight += 1;
        Some(FrameArgs::new(
            self.sequence,
            now,
            now + self.interval,
            self.interval,
        ))
    }
}
