// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A polling run loop for synthetic frame sources.
//!
//! [`RunLoop`] owns a [`FrameScheduler`] wired to a
//! [`SyntheticBeginFrameSource`], a [`ManualTimer`], and a clock (the
//! [`MonotonicClock`] by default). Each [`run_once`](RunLoop::run_once)
//! iteration:
//!
//! 1. delivers queued [`HostSignal`](crate::signal::HostSignal)s,
//! 2. fires the deadline timer if it is due,
//! 3. polls the source and delivers a frame if one is due,
//!
//! and reports when the loop next has something to do. Between iterations
//! [`run_until`](RunLoop::run_until) sleeps on the signal queue, so a
//! signal posted from another thread wakes the loop early.

use tracing::{debug, trace};

use cadence_core::client::SchedulerClient;
use cadence_core::clock::Clock;
use cadence_core::scheduler::{FrameScheduler, SchedulerSettings};
use cadence_core::source::SyntheticBeginFrameSource;
use cadence_core::time::{Duration, HostTime};
use cadence_core::timer::ManualTimer;

use crate::signal::{SignalQueue, SignalSender};
use crate::time::{MonotonicClock, to_std};

/// What a [`RunLoop::run_once`] iteration did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Iteration {
    /// Signals delivered.
    pub signals: usize,
    /// Whether the deadline timer fired.
    pub fired_deadline: bool,
    /// Sequence number of the frame delivered, if any.
    pub delivered_frame: Option<u64>,
    /// When the loop next has work, or `None` if it only waits for signals.
    pub next_wake: Option<HostTime>,
}

/// Drives a [`FrameScheduler`] from a polled frame source.
pub struct RunLoop<C, S, K = MonotonicClock>
where
    C: SchedulerClient,
    S: SyntheticBeginFrameSource,
    K: Clock,
{
    scheduler: FrameScheduler<C, S, ManualTimer, K>,
    signals: SignalQueue,
}

impl<C, S, K> core::fmt::Debug for RunLoop<C, S, K>
where
    C: SchedulerClient,
    S: SyntheticBeginFrameSource,
    K: Clock,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunLoop")
            .field("stopped", &self.scheduler.is_stopped())
            .field("observing", &self.scheduler.is_observing())
            .field("armed_deadline", &self.scheduler.timer().armed_at())
            .field("queued_signals", &self.signals.len())
            .finish_non_exhaustive()
    }
}

impl<C, S> RunLoop<C, S>
where
    C: SchedulerClient,
    S: SyntheticBeginFrameSource,
{
    /// Creates a loop timed by the monotonic clock.
    #[must_use]
    pub fn new(settings: SchedulerSettings, client: C, source: S) -> Self {
        Self::with_clock(settings, client, source, MonotonicClock::new())
    }
}

impl<C, S, K> RunLoop<C, S, K>
where
    C: SchedulerClient,
    S: SyntheticBeginFrameSource,
    K: Clock,
{
    /// Creates a loop timed by `clock`.
    #[must_use]
    pub fn with_clock(settings: SchedulerSettings, client: C, source: S, clock: K) -> Self {
        Self {
            scheduler: FrameScheduler::new(settings, client, source, ManualTimer::new(), clock),
            signals: SignalQueue::new(),
        }
    }

    /// The scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler<C, S, ManualTimer, K> {
        &self.scheduler
    }

    /// The scheduler, for direct calls from the loop's own thread.
    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler<C, S, ManualTimer, K> {
        &mut self.scheduler
    }

    /// A sender for posting signals from other threads.
    #[must_use]
    pub fn sender(&self) -> SignalSender {
        self.signals.sender()
    }

    /// Runs one iteration without blocking.
    pub fn run_once(&mut self) -> Iteration {
        let mut iteration = Iteration {
            signals: self.signals.drain_into(&mut self.scheduler),
            ..Iteration::default()
        };

        let now = self.scheduler.clock().now();
        if let Some(handle) = self.scheduler.timer_mut().take_due(now) {
            trace!(target: "cadence_host", ?now, "deadline due");
            self.scheduler.on_deadline_timer(handle);
            iteration.fired_deadline = true;
        }

        let now = self.scheduler.clock().now();
        if let Some(args) = self.scheduler.begin_frame_source_mut().poll(now) {
            if args.is_missed() {
                debug!(target: "cadence_host", sequence = args.sequence, "delivering missed frame");
            }
            iteration.delivered_frame = Some(args.sequence);
            self.scheduler.on_begin_frame(args);
        }

        iteration.next_wake = self.next_wake();
        iteration
    }

    /// The earlier of the armed deadline and the source's next tick.
    #[must_use]
    pub fn next_wake(&self) -> Option<HostTime> {
        let now = self.scheduler.clock().now();
        let deadline = self.scheduler.timer().armed_at();
        let tick = self.scheduler.begin_frame_source().next_tick_time(now);
        match (deadline, tick) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// How long the loop may sleep before its next wake, or `None` to wait
    /// for a signal indefinitely.
    #[must_use]
    pub fn sleep_duration(&self) -> Option<Duration> {
        let now = self.scheduler.clock().now();
        self.next_wake()
            .map(|wake| wake.saturating_duration_since(now))
    }

    /// Runs iterations until `done` returns `true` or the scheduler stops,
    /// sleeping on the signal queue in between.
    ///
    /// With nothing scheduled the loop blocks until a signal is posted, so
    /// `done` should become true from a state some iteration reaches.
    pub fn run_until<F>(&mut self, mut done: F)
    where
        F: FnMut(&FrameScheduler<C, S, ManualTimer, K>) -> bool,
    {
        loop {
            self.run_once();
            if done(&self.scheduler) || self.scheduler.is_stopped() {
                break;
            }
            let timeout = self.sleep_duration();
            trace!(target: "cadence_host", ?timeout, "sleeping");
            self.signals
                .wait_and_drain_into(&mut self.scheduler, timeout.map(to_std));
        }
        debug!(
            target: "cadence_host",
            stopped = self.scheduler.is_stopped(),
            "run loop finished"
        );
    }

    /// Consumes the loop and returns the scheduler.
    pub fn into_scheduler(self) -> FrameScheduler<C, S, ManualTimer, K> {
        self.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::HostSignal;
    use cadence_core::clock::ManualClock;
    use cadence_core::source::{BackToBackBeginFrameSource, DelayBasedBeginFrameSource};
    use cadence_core::{DrawResult, FrameArgs, Requests};

    const INTERVAL: Duration = Duration::from_millis(16);

    /// A host whose producer and tile work complete on "other threads" by
    /// posting signals back to the loop. It animates: every draw requests
    /// another.
    #[derive(Debug)]
    struct SignallingClient {
        sender: Option<SignalSender>,
        commits: u32,
        activations: u32,
        draws: u32,
    }

    impl SignallingClient {
        fn new() -> Self {
            Self {
                sender: None,
                commits: 0,
                activations: 0,
                draws: 0,
            }
        }

        fn post(&self, signal: HostSignal) {
            if let Some(sender) = &self.sender {
                sender.send(signal);
            }
        }
    }

    impl SchedulerClient for SignallingClient {
        fn scheduled_action_send_begin_main_frame(&mut self, args: &FrameArgs, _: &mut Requests) {
            self.post(HostSignal::BeginMainFrameStarted(args.frame_time));
            self.post(HostSignal::ReadyToCommit);
        }

        fn scheduled_action_commit(&mut self, _: &mut Requests) {
            self.commits += 1;
            self.post(HostSignal::DidCommit);
            self.post(HostSignal::ReadyToActivate);
        }

        fn scheduled_action_activate_sync_tree(&mut self, _: &mut Requests) {
            self.activations += 1;
        }

        fn scheduled_action_draw_if_possible(&mut self, requests: &mut Requests) -> DrawResult {
            self.draws += 1;
            requests.set_needs_redraw();
            DrawResult::Success
        }

        fn scheduled_action_draw_forced(&mut self, requests: &mut Requests) -> DrawResult {
            self.scheduled_action_draw_if_possible(requests)
        }

        fn scheduled_action_prepare_tiles(&mut self, _: &mut Requests) {}

        fn scheduled_action_begin_surface_creation(&mut self, _: &mut Requests) {}
    }

    fn start<S, K>(run_loop: &mut RunLoop<SignallingClient, S, K>)
    where
        S: SyntheticBeginFrameSource,
        K: Clock,
    {
        let sender = run_loop.sender();
        let scheduler = run_loop.scheduler_mut();
        scheduler.client_mut().sender = Some(sender);
        scheduler.set_can_draw(true);
        scheduler.set_visible(true);
        scheduler.did_create_and_initialize_surface();
        scheduler.set_needs_begin_main_frame();
        scheduler.set_needs_redraw();
    }

    fn manual_loop() -> (RunLoop<SignallingClient, DelayBasedBeginFrameSource, ManualClock>, ManualClock) {
        let clock = ManualClock::new(HostTime(0));
        let run_loop = RunLoop::with_clock(
            SchedulerSettings::new(),
            SignallingClient::new(),
            DelayBasedBeginFrameSource::new(INTERVAL, 1.0),
            clock.clone(),
        );
        (run_loop, clock)
    }

    #[test]
    fn idle_loop_waits_for_signals() {
        let (run_loop, _clock) = manual_loop();
        assert!(!run_loop.scheduler().is_observing(), "nothing requested");
        assert_eq!(run_loop.next_wake(), None);
        assert_eq!(run_loop.sleep_duration(), None);
    }

    #[test]
    fn first_iteration_delivers_the_due_tick() {
        let (mut run_loop, _clock) = manual_loop();
        start(&mut run_loop);
        assert!(run_loop.scheduler().is_observing(), "work requested");

        let iteration = run_loop.run_once();
        assert_eq!(iteration.delivered_frame, Some(1));
        assert!(!iteration.fired_deadline, "no deadline armed before the frame");
        let armed = run_loop.scheduler().timer().armed_at();
        assert!(armed.is_some(), "frame armed a deadline");
        assert_eq!(
            iteration.next_wake,
            armed.map(|at| at.min(HostTime(0) + INTERVAL)),
            "wake at the deadline or the next tick, whichever is first"
        );
    }

    #[test]
    fn signals_drive_frames_to_draws() {
        let (mut run_loop, clock) = manual_loop();
        start(&mut run_loop);

        for _ in 0..200 {
            let iteration = run_loop.run_once();
            if run_loop.scheduler().client().draws >= 3 {
                break;
            }
            if let Some(wake) = iteration.next_wake {
                clock.set(wake.max(clock.now()));
            }
        }

        let client = run_loop.scheduler().client();
        assert!(client.commits >= 1, "producer committed");
        assert!(client.activations >= 1, "pending tree activated");
        assert!(client.draws >= 3, "animation kept drawing: {client:?}");
        assert!(
            clock.now() <= HostTime(0) + Duration(INTERVAL.ticks() * 4),
            "one draw per tick"
        );
    }

    #[test]
    fn sleep_duration_counts_down_to_the_next_wake() {
        let (mut run_loop, clock) = manual_loop();
        start(&mut run_loop);
        let iteration = run_loop.run_once();
        let wake = iteration.next_wake.expect("something scheduled");
        clock.set(HostTime(1_000));
        assert_eq!(
            run_loop.sleep_duration(),
            Some(wake.saturating_duration_since(HostTime(1_000)))
        );
    }

    #[test]
    fn run_until_stops_with_the_scheduler() {
        let (mut run_loop, _clock) = manual_loop();
        start(&mut run_loop);
        run_loop.scheduler_mut().stop();
        run_loop.run_until(|_| false);
        assert!(run_loop.scheduler().is_stopped(), "loop exited on stop");
        assert_eq!(run_loop.scheduler().client().draws, 0);
    }

    #[test]
    fn run_until_draws_in_real_time() {
        let mut run_loop = RunLoop::new(
            SchedulerSettings::new(),
            SignallingClient::new(),
            BackToBackBeginFrameSource::new(),
        );
        start(&mut run_loop);

        let mut iterations = 0_u32;
        run_loop.run_until(|scheduler| {
            iterations += 1;
            scheduler.client().draws >= 2 || iterations > 10_000
        });
        assert!(
            run_loop.scheduler().client().draws >= 2,
            "back-to-back frames drew"
        );
    }
}
