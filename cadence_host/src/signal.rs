// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marshalling pipeline notifications onto the scheduler thread.
//!
//! A [`FrameScheduler`] is driven through `&mut self` and does no locking.
//! Producer and consumer threads therefore never touch it directly: they
//! hold a [`SignalSender`] and post [`HostSignal`]s, and the scheduler
//! thread delivers them in order with [`SignalQueue::drain_into`].

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::trace;

use cadence_core::client::{CommitEarlyOutReason, SchedulerClient};
use cadence_core::clock::Clock;
use cadence_core::scheduler::FrameScheduler;
use cadence_core::source::BeginFrameSource;
use cadence_core::time::HostTime;
use cadence_core::timer::DeadlineTimer;

/// A notification raised off the scheduler thread.
///
/// Each variant maps to one [`FrameScheduler`] method of the same name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostSignal {
    /// [`FrameScheduler::set_needs_begin_main_frame`].
    SetNeedsBeginMainFrame,
    /// [`FrameScheduler::set_needs_redraw`].
    SetNeedsRedraw,
    /// [`FrameScheduler::set_needs_prepare_tiles`].
    SetNeedsPrepareTiles,
    /// [`FrameScheduler::notify_begin_main_frame_started`].
    BeginMainFrameStarted(HostTime),
    /// [`FrameScheduler::notify_ready_to_commit`].
    ReadyToCommit,
    /// [`FrameScheduler::begin_main_frame_aborted`].
    BeginMainFrameAborted(CommitEarlyOutReason),
    /// [`FrameScheduler::did_commit`].
    DidCommit,
    /// [`FrameScheduler::notify_ready_to_activate`].
    ReadyToActivate,
    /// [`FrameScheduler::notify_ready_to_draw`].
    ReadyToDraw,
    /// [`FrameScheduler::did_prepare_tiles`].
    DidPrepareTiles,
    /// [`FrameScheduler::did_submit_compositor_frame`], for frames
    /// submitted outside a draw callback.
    DidSubmitCompositorFrame,
    /// [`FrameScheduler::did_receive_compositor_frame_ack`].
    CompositorFrameAck,
    /// [`FrameScheduler::set_visible`].
    SetVisible(bool),
    /// [`FrameScheduler::set_can_draw`].
    SetCanDraw(bool),
    /// [`FrameScheduler::did_lose_surface`].
    DidLoseSurface,
}

impl HostSignal {
    /// Calls the matching scheduler method.
    pub fn deliver<C, S, T, K>(self, scheduler: &mut FrameScheduler<C, S, T, K>)
    where
        C: SchedulerClient,
        S: BeginFrameSource,
        T: DeadlineTimer,
        K: Clock,
    {
        match self {
            Self::SetNeedsBeginMainFrame => scheduler.set_needs_begin_main_frame(),
            Self::SetNeedsRedraw => scheduler.set_needs_redraw(),
            Self::SetNeedsPrepareTiles => scheduler.set_needs_prepare_tiles(),
            Self::BeginMainFrameStarted(at) => scheduler.notify_begin_main_frame_started(at),
            Self::ReadyToCommit => scheduler.notify_ready_to_commit(),
            Self::BeginMainFrameAborted(reason) => scheduler.begin_main_frame_aborted(reason),
            Self::DidCommit => scheduler.did_commit(),
            Self::ReadyToActivate => scheduler.notify_ready_to_activate(),
            Self::ReadyToDraw => scheduler.notify_ready_to_draw(),
            Self::DidPrepareTiles => scheduler.did_prepare_tiles(),
            Self::DidSubmitCompositorFrame => scheduler.did_submit_compositor_frame(),
            Self::CompositorFrameAck => scheduler.did_receive_compositor_frame_ack(),
            Self::SetVisible(visible) => scheduler.set_visible(visible),
            Self::SetCanDraw(can_draw) => scheduler.set_can_draw(can_draw),
            Self::DidLoseSurface => scheduler.did_lose_surface(),
        }
    }
}

/// The posting end of a [`SignalQueue`]. Cheap to clone and `Send`.
#[derive(Clone, Debug)]
pub struct SignalSender {
    tx: Sender<HostSignal>,
}

impl SignalSender {
    /// Posts a signal. Returns `false` if the queue has been dropped, in
    /// which case the scheduler is gone and the signal is moot.
    pub fn send(&self, signal: HostSignal) -> bool {
        self.tx.send(signal).is_ok()
    }
}

/// The scheduler-thread end of the signal channel.
#[derive(Debug)]
pub struct SignalQueue {
    tx: Sender<HostSignal>,
    rx: Receiver<HostSignal>,
}

impl Default for SignalQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalQueue {
    /// Creates an empty, unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Returns a sender for another thread.
    #[must_use]
    pub fn sender(&self) -> SignalSender {
        SignalSender {
            tx: self.tx.clone(),
        }
    }

    /// Number of signals waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no signals are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Delivers every queued signal in posting order. Returns how many were
    /// delivered.
    pub fn drain_into<C, S, T, K>(&self, scheduler: &mut FrameScheduler<C, S, T, K>) -> usize
    where
        C: SchedulerClient,
        S: BeginFrameSource,
        T: DeadlineTimer,
        K: Clock,
    {
        let mut delivered = 0;
        while let Ok(signal) = self.rx.try_recv() {
            trace!(target: "cadence_host", ?signal, "delivering signal");
            signal.deliver(scheduler);
            delivered += 1;
        }
        delivered
    }

    /// Blocks until a signal arrives or `timeout` passes (forever when
    /// `None`), then delivers everything queued. Returns how many signals
    /// were delivered.
    pub fn wait_and_drain_into<C, S, T, K>(
        &self,
        scheduler: &mut FrameScheduler<C, S, T, K>,
        timeout: Option<std::time::Duration>,
    ) -> usize
    where
        C: SchedulerClient,
        S: BeginFrameSource,
        T: DeadlineTimer,
        K: Clock,
    {
        let first = match timeout {
            Some(timeout) => match self.rx.recv_timeout(timeout) {
                Ok(signal) => signal,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return 0,
            },
            // The queue holds a sender of its own, so this only returns
            // once something is posted.
            None => match self.rx.recv() {
                Ok(signal) => signal,
                Err(_) => return 0,
            },
        };
        trace!(target: "cadence_host", signal = ?first, "woken by signal");
        first.deliver(scheduler);
        1 + self.drain_into(scheduler)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use cadence_core::clock::ManualClock;
    use cadence_core::state_machine::BeginMainFrameState;
    use cadence_core::timer::ManualTimer;
    use cadence_core::{DrawResult, FrameArgs, Requests, SchedulerSettings};

    #[derive(Debug, Default)]
    struct NullClient;

    impl SchedulerClient for NullClient {
        fn scheduled_action_send_begin_main_frame(&mut self, _: &FrameArgs, _: &mut Requests) {}
        fn scheduled_action_commit(&mut self, _: &mut Requests) {}
        fn scheduled_action_activate_sync_tree(&mut self, _: &mut Requests) {}
        fn scheduled_action_draw_if_possible(&mut self, _: &mut Requests) -> DrawResult {
            DrawResult::Success
        }
        fn scheduled_action_draw_forced(&mut self, _: &mut Requests) -> DrawResult {
            DrawResult::Success
        }
        fn scheduled_action_prepare_tiles(&mut self, _: &mut Requests) {}
        fn scheduled_action_begin_surface_creation(&mut self, _: &mut Requests) {}
    }

    #[derive(Debug, Default)]
    struct NullSource;

    impl BeginFrameSource for NullSource {
        fn add_observer(&mut self) {}
        fn remove_observer(&mut self) {}
        fn is_throttled(&self) -> bool {
            true
        }
        fn did_finish_frame(&mut self) {}
    }

    type Scheduler = FrameScheduler<NullClient, NullSource, ManualTimer, ManualClock>;

    fn make_scheduler() -> Scheduler {
        FrameScheduler::new(
            SchedulerSettings::new(),
            NullClient,
            NullSource,
            ManualTimer::new(),
            ManualClock::new(HostTime(0)),
        )
    }

    #[test]
    fn signals_from_other_threads_arrive_in_order() {
        let queue = SignalQueue::new();
        let mut scheduler = make_scheduler();

        let sender = queue.sender();
        let worker = thread::spawn(move || {
            assert!(sender.send(HostSignal::SetCanDraw(true)), "queue alive");
            assert!(sender.send(HostSignal::SetVisible(true)), "queue alive");
            assert!(sender.send(HostSignal::SetVisible(false)), "queue alive");
        });
        worker.join().unwrap();

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain_into(&mut scheduler), 3);
        assert!(queue.is_empty(), "drained");
        assert!(scheduler.state().snapshot().can_draw, "can_draw delivered");
        assert!(!scheduler.state().visible(), "last visibility wins");
    }

    #[test]
    fn producer_signals_reach_the_state_machine() {
        let queue = SignalQueue::new();
        let mut scheduler = make_scheduler();
        let sender = queue.sender();

        sender.send(HostSignal::SetNeedsBeginMainFrame);
        sender.send(HostSignal::SetNeedsRedraw);
        queue.drain_into(&mut scheduler);
        assert!(scheduler.state().needs_begin_main_frame(), "request delivered");
        assert!(scheduler.state().needs_redraw(), "request delivered");
        assert_eq!(
            scheduler.state().begin_main_frame_state(),
            BeginMainFrameState::Idle
        );
    }

    #[test]
    fn worker_submissions_count_against_the_limit() {
        let queue = SignalQueue::new();
        let mut scheduler = make_scheduler();
        let sender = queue.sender();
        let worker = thread::spawn(move || {
            sender.send(HostSignal::DidSubmitCompositorFrame);
        });
        worker.join().unwrap();

        queue.drain_into(&mut scheduler);
        assert_eq!(scheduler.state().pending_submit_frames(), 1);
        assert!(scheduler.state().is_draw_throttled(), "limit of one reached");

        assert!(queue.sender().send(HostSignal::CompositorFrameAck), "queue alive");
        queue.drain_into(&mut scheduler);
        assert_eq!(scheduler.state().pending_submit_frames(), 0, "acknowledged");
    }

    #[test]
    fn wait_times_out_without_signals() {
        let queue = SignalQueue::new();
        let mut scheduler = make_scheduler();
        let delivered = queue.wait_and_drain_into(
            &mut scheduler,
            Some(std::time::Duration::from_millis(1)),
        );
        assert_eq!(delivered, 0);
    }

    #[test]
    fn wait_wakes_on_a_posted_signal() {
        let queue = SignalQueue::new();
        let mut scheduler = make_scheduler();
        let sender = queue.sender();
        let worker = thread::spawn(move || {
            sender.send(HostSignal::SetCanDraw(true));
            sender.send(HostSignal::SetNeedsRedraw);
        });

        let mut delivered = 0;
        while delivered < 2 {
            delivered += queue.wait_and_drain_into(
                &mut scheduler,
                Some(std::time::Duration::from_secs(5)),
            );
        }
        worker.join().unwrap();
        assert!(scheduler.state().snapshot().can_draw, "first signal delivered");
        assert!(scheduler.state().needs_redraw(), "second signal delivered");
    }

    #[test]
    fn sender_reports_a_dropped_queue() {
        let queue = SignalQueue::new();
        let sender = queue.sender();
        drop(queue);
        assert!(!sender.send(HostSignal::ReadyToDraw), "no receiver");
    }
}
