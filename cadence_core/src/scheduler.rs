// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deadline-driven frame scheduling.
//!
//! [`FrameScheduler`] owns a [`PipelineStateMachine`] and a
//! [`TimingHistory`], observes a [`BeginFrameSource`], and drives the host
//! pipeline through a [`SchedulerClient`]. For every accepted BeginFrame it:
//!
//! 1. derives an adjusted deadline from the draw estimate,
//! 2. estimates whether a producer update could activate before it,
//! 3. decides on latency recovery (skip the producer update, or the whole
//!    frame),
//! 4. drains the state machine's actions through the client,
//! 5. arms the deadline timer according to the current [`DeadlineMode`],
//! 6. subscribes to or unsubscribes from the source.
//!
//! Every host-facing method ends with the same drain / arm / observe pass,
//! so work the host reports is acted on immediately.

use core::fmt;

use crate::args::FrameArgs;
use crate::client::{CommitEarlyOutReason, DrawResult, Requests, SchedulerClient};
use crate::clock::Clock;
use crate::source::{BeginFrameSource, DEFAULT_INTERVAL};
use crate::state_machine::{
    Action, BeginImplFrameState, BeginMainFrameState, DeadlineMode, PipelineStateMachine,
    ScrollHandlerState, StateSnapshot, TreePriority,
};
use crate::time::{Duration, HostTime};
use crate::timer::{DeadlineTimer, TimerHandle};
use crate::timing_history::{Estimates, MainFrameSample, Stage, StageSample, TimingHistory};
use crate::trace::{
    ActionEvent, BeginFrameDisposition, BeginFrameEvent, DeadlineArmedEvent, DeadlinePlanEvent,
    FrameSummaryBuilder, LatencyRecovery, ObservationEvent, Scope, ScopeBeginEvent, ScopeEndEvent,
    StageSampleEvent, Tracer,
};

/// Configuration for the [`FrameScheduler`] and its state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Run each frame inline without a deadline (for embedders that draw
    /// synchronously when asked).
    pub synchronous: bool,
    /// Allow the next producer update while a pending tree awaits activation.
    pub main_frame_before_activation_enabled: bool,
    /// Commit directly into the active tree.
    pub commit_to_active_tree: bool,
    /// Hold the deadline until the active tree reports ready to draw.
    pub wait_for_ready_to_draw: bool,
    /// Force a draw after repeated checkerboarded animation frames.
    pub timeout_and_draw_when_animation_checkerboards: bool,
    /// Checkerboarded draws tolerated before the next one is forced.
    pub max_failed_draws_before_draw_is_forced: u32,
    /// Submitted frames allowed to await acknowledgement.
    pub max_pending_submit_frames: u32,
    /// Subtracted from every deadline to absorb dispatch jitter.
    pub deadline_fudge: Duration,
}

impl SchedulerSettings {
    /// Deadline scheduling with a separate pending tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            synchronous: false,
            main_frame_before_activation_enabled: false,
            commit_to_active_tree: false,
            wait_for_ready_to_draw: false,
            timeout_and_draw_when_animation_checkerboards: true,
            max_failed_draws_before_draw_is_forced: 3,
            max_pending_submit_frames: 1,
            // 1ms at 1ns tick resolution.
            deadline_fudge: Duration(1_000_000),
        }
    }

    /// Synchronous (non-deadline) scheduling.
    #[must_use]
    pub const fn synchronous() -> Self {
        Self {
            synchronous: true,
            ..Self::new()
        }
    }

    /// Commits straight into the active tree and waits for ready-to-draw.
    #[must_use]
    pub const fn commit_to_active_tree() -> Self {
        Self {
            commit_to_active_tree: true,
            wait_for_ready_to_draw: true,
            ..Self::new()
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain diagnostic dump of a [`FrameScheduler`].
///
/// Not a stable format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    /// Whether [`FrameScheduler::stop`] was called.
    pub stopped: bool,
    /// Whether the scheduler observes its frame source.
    pub observing: bool,
    /// Deadline mode for the current state.
    pub deadline_mode: DeadlineMode,
    /// When the armed deadline fires.
    pub armed_deadline: Option<HostTime>,
    /// A BeginFrame queued behind the current consumer frame.
    pub pending_begin_frame: Option<FrameArgs>,
    /// Args of the consumer frame in progress.
    pub begin_impl_frame_args: Option<FrameArgs>,
    /// Adjusted deadline of the consumer frame in progress.
    pub adjusted_deadline: Option<HostTime>,
    /// Whether the last planned frame skipped its producer update.
    pub producer_skipped_last_frame: bool,
    /// Whether stage durations are recorded.
    pub recording_enabled: bool,
    /// State machine fields.
    pub state: StateSnapshot,
    /// Current estimates.
    pub estimates: Estimates,
}

#[derive(Clone, Copy, Debug)]
struct ImplFrame {
    /// Args as issued by the source.
    args: FrameArgs,
    adjusted_deadline: HostTime,
    summary: FrameSummaryBuilder,
}

#[derive(Clone, Copy, Debug)]
struct ArmedDeadline {
    handle: TimerHandle,
    at: HostTime,
}

/// Orchestrates the pipeline against a periodic frame signal.
///
/// `C` receives actions, `S` is the scheduler's handle to its frame source,
/// `T` arms deadlines, and `K` reads the time.
///
/// # Usage
///
/// ```rust,ignore
/// scheduler.set_visible(true);
/// scheduler.set_can_draw(true);
/// scheduler.set_needs_begin_main_frame();
/// // host loop:
/// scheduler.on_begin_frame(args);
/// if let Some(handle) = scheduler.timer_mut().take_due(now) {
///     scheduler.on_deadline_timer(handle);
/// }
/// ```
pub struct FrameScheduler<C: SchedulerClient, S: BeginFrameSource, T: DeadlineTimer, K: Clock> {
    settings: SchedulerSettings,
    client: C,
    source: S,
    timer: T,
    clock: K,
    state: PipelineStateMachine,
    timing: TimingHistory,
    tracer: Tracer,

    stopped: bool,
    observing: bool,
    inside_drain: bool,
    producer_skipped_last_frame: bool,

    impl_frame: Option<ImplFrame>,
    pending_begin_frame: Option<FrameArgs>,
    begin_main_frame_args: Option<FrameArgs>,
    armed_deadline: Option<ArmedDeadline>,
    scheduled_deadline_mode: Option<DeadlineMode>,
}

impl<C: SchedulerClient, S: BeginFrameSource, T: DeadlineTimer, K: Clock> fmt::Debug
    for FrameScheduler<C, S, T, K>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("stopped", &self.stopped)
            .field("observing", &self.observing)
            .field("impl_frame", &self.impl_frame)
            .field("pending_begin_frame", &self.pending_begin_frame)
            .field("armed_deadline", &self.armed_deadline)
            .finish_non_exhaustive()
    }
}

impl<C: SchedulerClient, S: BeginFrameSource, T: DeadlineTimer, K: Clock> FrameScheduler<C, S, T, K> {
    /// Creates a scheduler. Nothing happens until the host makes the output
    /// visible.
    #[must_use]
    pub fn new(settings: SchedulerSettings, client: C, source: S, timer: T, clock: K) -> Self {
        Self {
            settings,
            client,
            source,
            timer,
            clock,
            state: PipelineStateMachine::new(settings),
            timing: TimingHistory::new(),
            tracer: Tracer::none(),
            stopped: false,
            observing: false,
            inside_drain: false,
            producer_skipped_last_frame: false,
            impl_frame: None,
            pending_begin_frame: None,
            begin_main_frame_args: None,
            armed_deadline: None,
            scheduled_deadline_mode: None,
        }
    }

    /// Installs a tracer, replacing the previous one.
    pub fn set_tracer(&mut self, tracer: Tracer) {
        self.tracer = tracer;
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The client, mutably.
    pub fn client_mut(&mut self) -> &mut C {
        &mut self.client
    }

    /// The frame source handle.
    #[must_use]
    pub fn begin_frame_source(&self) -> &S {
        &self.source
    }

    /// The frame source handle, mutably (e.g. to poll a synthetic source).
    pub fn begin_frame_source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// The deadline timer.
    #[must_use]
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// The deadline timer, mutably (e.g. to collect a due handle).
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    /// The clock.
    #[must_use]
    pub fn clock(&self) -> &K {
        &self.clock
    }

    /// The state machine.
    #[must_use]
    pub fn state(&self) -> &PipelineStateMachine {
        &self.state
    }

    /// The stage timing history.
    #[must_use]
    pub fn timing_history(&self) -> &TimingHistory {
        &self.timing
    }

    /// The settings the scheduler was created with.
    #[must_use]
    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Whether [`stop`](Self::stop) was called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Whether the scheduler observes its frame source.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Diagnostic dump of the scheduler.
    #[must_use]
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            stopped: self.stopped,
            observing: self.observing,
            deadline_mode: self.state.current_deadline_mode(),
            armed_deadline: self.armed_deadline.map(|d| d.at),
            pending_begin_frame: self.pending_begin_frame,
            begin_impl_frame_args: self.impl_frame.map(|f| f.args),
            adjusted_deadline: self.impl_frame.map(|f| f.adjusted_deadline),
            producer_skipped_last_frame: self.producer_skipped_last_frame,
            recording_enabled: self.timing.recording_enabled(),
            state: self.state.snapshot(),
            estimates: self.timing.estimates(),
        }
    }

    // -----------------------------------------------------------------------
    // Requests
    // -----------------------------------------------------------------------

    /// Requests a producer update.
    pub fn set_needs_begin_main_frame(&mut self) {
        if self.stopped {
            return;
        }
        self.state.set_needs_begin_main_frame();
        self.process_scheduled_actions();
    }

    /// Requests one consumer frame even if nothing else is pending.
    pub fn set_needs_one_begin_impl_frame(&mut self) {
        if self.stopped {
            return;
        }
        self.state.set_needs_one_begin_impl_frame();
        self.process_scheduled_actions();
    }

    /// Requests a redraw.
    pub fn set_needs_redraw(&mut self) {
        if self.stopped {
            return;
        }
        self.state.set_needs_redraw();
        self.process_scheduled_actions();
    }

    /// Requests tile preparation.
    pub fn set_needs_prepare_tiles(&mut self) {
        if self.stopped {
            return;
        }
        self.state.set_needs_prepare_tiles();
        self.process_scheduled_actions();
    }

    // -----------------------------------------------------------------------
    // Producer
    // -----------------------------------------------------------------------

    /// The producer started the update it was sent at
    /// `main_thread_start_time`.
    pub fn notify_begin_main_frame_started(&mut self, main_thread_start_time: HostTime) {
        if self.stopped {
            return;
        }
        self.timing.begin_main_frame_started(main_thread_start_time);
        self.state.notify_begin_main_frame_started();
    }

    /// The producer finished its update and is ready to commit.
    pub fn notify_ready_to_commit(&mut self) {
        if self.stopped {
            return;
        }
        self.state.notify_ready_to_commit();
        self.process_scheduled_actions();
    }

    /// The commit performed by
    /// [`scheduled_action_commit`](SchedulerClient::scheduled_action_commit)
    /// completed.
    pub fn did_commit(&mut self) {
        if self.stopped {
            return;
        }
        let now = self.clock.now();
        let sample = self.timing.did_commit(now);
        self.emit_stage_sample(sample, now);
    }

    /// The producer update ended without a commit.
    pub fn begin_main_frame_aborted(&mut self, reason: CommitEarlyOutReason) {
        if self.stopped {
            return;
        }
        let now = self.clock.now();
        let sample = self.timing.begin_main_frame_aborted(now);
        self.emit_main_frame_sample(sample, now);
        self.state.begin_main_frame_aborted(reason);
        self.process_scheduled_actions();
    }

    // -----------------------------------------------------------------------
    // Consumer
    // -----------------------------------------------------------------------

    /// The pending tree is ready to activate.
    pub fn notify_ready_to_activate(&mut self) {
        if self.stopped {
            return;
        }
        if self.state.has_pending_tree() {
            let now = self.clock.now();
            let sample = self.timing.ready_to_activate(now);
            self.emit_stage_sample(sample, now);
        }
        self.state.notify_ready_to_activate();
        self.process_scheduled_actions();
    }

    /// The active tree is ready to draw.
    pub fn notify_ready_to_draw(&mut self) {
        if self.stopped {
            return;
        }
        self.state.notify_ready_to_draw();
        self.process_scheduled_actions();
    }

    /// The host started preparing tiles on its own.
    ///
    /// Counts as this frame's tile preparation, so no
    /// [`scheduled_action_prepare_tiles`](SchedulerClient::scheduled_action_prepare_tiles)
    /// follows in the same frame.
    pub fn will_prepare_tiles(&mut self) {
        if self.stopped {
            return;
        }
        self.timing.will_prepare_tiles(self.clock.now());
        self.state.will_prepare_tiles();
    }

    /// Host-initiated tile preparation finished.
    pub fn did_prepare_tiles(&mut self) {
        if self.stopped {
            return;
        }
        let now = self.clock.now();
        let sample = self.timing.did_prepare_tiles(now);
        self.emit_stage_sample(sample, now);
        self.state.did_prepare_tiles();
        self.process_scheduled_actions();
    }

    /// A frame was submitted outside a draw callback.
    ///
    /// Draw callbacks report submission through
    /// [`Requests::did_submit_compositor_frame`] instead.
    pub fn did_submit_compositor_frame(&mut self) {
        if self.stopped {
            return;
        }
        let now = self.clock.now();
        self.record_submission(now);
        self.process_scheduled_actions();
    }

    /// The oldest submitted frame was acknowledged.
    pub fn did_receive_compositor_frame_ack(&mut self) {
        if self.stopped {
            return;
        }
        let now = self.clock.now();
        let sample = self.timing.did_receive_compositor_frame_ack(now);
        self.emit_stage_sample(sample, now);
        self.state.did_receive_compositor_frame_ack();
        self.process_scheduled_actions();
    }

    // -----------------------------------------------------------------------
    // External state
    // -----------------------------------------------------------------------

    /// Sets output visibility.
    pub fn set_visible(&mut self, visible: bool) {
        if self.stopped {
            return;
        }
        self.state.set_visible(visible);
        self.update_recording();
        self.process_scheduled_actions();
    }

    /// Sets whether drawing is possible at all.
    pub fn set_can_draw(&mut self, can_draw: bool) {
        if self.stopped {
            return;
        }
        self.state.set_can_draw(can_draw);
        self.process_scheduled_actions();
    }

    /// Defers (or resumes) producer updates.
    pub fn set_defer_commits(&mut self, defer_commits: bool) {
        if self.stopped {
            return;
        }
        self.state.set_defer_commits(defer_commits);
        self.process_scheduled_actions();
    }

    /// Updates tree priority and scroll state.
    pub fn set_tree_priorities_and_scroll_state(
        &mut self,
        tree_priority: TreePriority,
        scroll_handler_state: ScrollHandlerState,
    ) {
        if self.stopped {
            return;
        }
        self.state
            .set_tree_priorities_and_scroll_state(tree_priority, scroll_handler_state);
        self.process_scheduled_actions();
    }

    /// The surface requested by
    /// [`scheduled_action_begin_surface_creation`](SchedulerClient::scheduled_action_begin_surface_creation)
    /// is ready.
    pub fn did_create_and_initialize_surface(&mut self) {
        if self.stopped {
            return;
        }
        self.state.did_create_and_initialize_surface();
        self.update_recording();
        self.process_scheduled_actions();
    }

    /// The surface was lost; a new one is requested once the pipeline drains.
    pub fn did_lose_surface(&mut self) {
        if self.stopped {
            return;
        }
        self.state.did_lose_surface();
        self.timing.clear_pending_submissions();
        self.update_recording();
        self.process_scheduled_actions();
    }

    /// The frame source paused or resumed.
    pub fn on_begin_frame_source_paused_changed(&mut self, paused: bool) {
        if self.stopped {
            return;
        }
        self.state.set_begin_frame_source_paused(paused);
        self.process_scheduled_actions();
    }

    /// Stops the scheduler for good.
    ///
    /// Cancels the deadline, acknowledges any frame still held, and
    /// unsubscribes. Every later call is a no-op.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        let now = self.clock.now();
        self.stopped = true;
        self.cancel_deadline();
        if let Some(args) = self.pending_begin_frame.take() {
            self.tracer.begin_frame(&BeginFrameEvent::new(
                &args,
                BeginFrameDisposition::DroppedStopped,
                now,
            ));
            self.source.did_finish_frame();
        }
        if self.impl_frame.take().is_some() {
            self.source.did_finish_frame();
        }
        if self.observing {
            self.source.remove_observer();
            self.observing = false;
            self.tracer.observation(&ObservationEvent {
                observing: false,
                timestamp: now,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Frame intake
    // -----------------------------------------------------------------------

    /// Delivers a BeginFrame from the source.
    ///
    /// Every delivered frame is eventually acknowledged with
    /// [`BeginFrameSource::did_finish_frame`].
    pub fn on_begin_frame(&mut self, args: FrameArgs) {
        let now = self.clock.now();
        if self.stopped {
            self.drop_begin_frame(&args, BeginFrameDisposition::DroppedStopped, now);
            return;
        }
        if self.state.begin_impl_frame_state() != BeginImplFrameState::Idle {
            if let Some(replaced) = self.pending_begin_frame.replace(args) {
                self.drop_begin_frame(&replaced, BeginFrameDisposition::Replaced, now);
            }
            self.tracer.begin_frame(&BeginFrameEvent::new(
                &args,
                BeginFrameDisposition::Queued,
                now,
            ));
            return;
        }
        self.handle_begin_frame(args, now);
    }

    fn handle_begin_frame(&mut self, args: FrameArgs, now: HostTime) {
        if args.is_missed() && now > args.deadline {
            self.drop_begin_frame(&args, BeginFrameDisposition::DroppedMissed, now);
            self.update_observation();
            return;
        }
        if !self.state.begin_frame_needed() {
            self.drop_begin_frame(&args, BeginFrameDisposition::DroppedNotNeeded, now);
            self.update_observation();
            return;
        }
        if self.settings.synchronous {
            self.begin_impl_frame_synchronous(args, now);
        } else {
            self.begin_impl_frame_with_deadline(args, now);
        }
    }

    fn drop_begin_frame(
        &mut self,
        args: &FrameArgs,
        disposition: BeginFrameDisposition,
        now: HostTime,
    ) {
        self.tracer
            .begin_frame(&BeginFrameEvent::new(args, disposition, now));
        self.source.did_finish_frame();
    }

    fn begin_impl_frame_with_deadline(&mut self, args: FrameArgs, now: HostTime) {
        let plan = self.plan_begin_impl_frame(&args, now);
        self.tracer.deadline_plan(&plan);
        match plan.recovery {
            LatencyRecovery::SkipBeginImplFrame => {
                self.drop_begin_frame(
                    &args,
                    BeginFrameDisposition::SkippedToRecoverImplLatency,
                    now,
                );
                self.update_observation();
                return;
            }
            LatencyRecovery::SkipBeginMainFrameToCatchUp
            | LatencyRecovery::SkipBeginMainFrameDeadlineInfeasible => {
                self.state.set_skip_next_begin_main_frame_to_reduce_latency();
                self.producer_skipped_last_frame = true;
            }
            LatencyRecovery::None => self.producer_skipped_last_frame = false,
        }
        self.tracer.begin_frame(&BeginFrameEvent::new(
            &args,
            BeginFrameDisposition::Started,
            now,
        ));
        self.begin_impl_frame(args, plan.adjusted_deadline, now, Some(&plan));
    }

    fn begin_impl_frame_synchronous(&mut self, args: FrameArgs, now: HostTime) {
        self.state
            .set_critical_begin_main_frame_to_activate_is_fast(false);
        self.tracer.begin_frame(&BeginFrameEvent::new(
            &args,
            BeginFrameDisposition::Started,
            now,
        ));
        self.begin_impl_frame(args, args.deadline, now, None);
        self.on_begin_impl_frame_deadline();
    }

    /// Computes the adjusted deadline, producer estimates, and the latency
    /// recovery decision for a frame about to begin.
    fn plan_begin_impl_frame(&mut self, args: &FrameArgs, now: HostTime) -> DeadlinePlanEvent {
        let draw_estimate = self.timing.draw_estimate();
        let adjusted_deadline = args
            .deadline
            .saturating_sub(draw_estimate.saturating_add(self.settings.deadline_fudge));

        let start_to_activate = self
            .timing
            .begin_main_frame_start_to_commit_estimate()
            .saturating_add(self.timing.commit_to_ready_to_activate_estimate())
            .saturating_add(self.timing.activate_estimate());
        let to_activate_critical = start_to_activate
            .saturating_add(self.timing.begin_main_frame_queue_critical_estimate());
        self.state
            .set_critical_begin_main_frame_to_activate_is_fast(to_activate_critical < args.interval);

        // Evaluated after the fast-path flag, which it depends on.
        let on_critical_path = !self.state.impl_latency_takes_priority();
        let to_activate = if on_critical_path {
            to_activate_critical
        } else {
            start_to_activate
                .saturating_add(self.timing.begin_main_frame_queue_not_critical_estimate())
        };
        let can_finish = now.saturating_add(to_activate) < adjusted_deadline;

        DeadlinePlanEvent {
            frame_number: self.state.current_frame_number() + 1,
            now,
            deadline: args.deadline,
            adjusted_deadline,
            draw_estimate,
            begin_main_frame_to_activate: start_to_activate,
            begin_main_frame_to_activate_with_queue: to_activate,
            on_critical_path,
            can_finish_before_deadline: can_finish,
            recovery: self.latency_recovery(now, adjusted_deadline, can_finish),
        }
    }

    fn latency_recovery(
        &self,
        now: HostTime,
        adjusted_deadline: HostTime,
        can_finish: bool,
    ) -> LatencyRecovery {
        // Outside impl priority every producer update is on the critical path.
        if !self.state.impl_latency_takes_priority() {
            if self.state.main_thread_missed_last_deadline() {
                if can_finish {
                    return LatencyRecovery::SkipBeginMainFrameToCatchUp;
                }
            } else if !can_finish
                && !self.producer_skipped_last_frame
                && self.state.needs_begin_main_frame()
            {
                return LatencyRecovery::SkipBeginMainFrameDeadlineInfeasible;
            }
        }
        if self.should_recover_impl_latency(now, adjusted_deadline, can_finish) {
            return LatencyRecovery::SkipBeginImplFrame;
        }
        LatencyRecovery::None
    }

    fn should_recover_impl_latency(
        &self,
        now: HostTime,
        adjusted_deadline: HostTime,
        can_finish: bool,
    ) -> bool {
        // An unthrottled source delivers the next frame before the ack
        // anyway.
        if !self.source.is_throttled() || !self.state.is_draw_throttled() {
            return false;
        }
        if self.state.impl_latency_takes_priority() || self.state.only_impl_side_updates_expected()
        {
            return now >= adjusted_deadline;
        }
        !can_finish
    }

    fn begin_impl_frame(
        &mut self,
        args: FrameArgs,
        adjusted_deadline: HostTime,
        now: HostTime,
        plan: Option<&DeadlinePlanEvent>,
    ) {
        self.state.on_begin_impl_frame();
        let frame_number = self.state.current_frame_number();

        let mut summary = FrameSummaryBuilder::new(frame_number, &args, now);
        if let Some(plan) = plan {
            summary.plan(plan);
        }
        self.impl_frame = Some(ImplFrame {
            args,
            adjusted_deadline,
            summary,
        });
        self.scheduled_deadline_mode = None;

        let mut frame_args = args.with_deadline(adjusted_deadline);
        frame_args.on_critical_path = !self.state.impl_latency_takes_priority();
        self.begin_main_frame_args = Some(frame_args);

        self.tracer.scope_begin(&ScopeBeginEvent {
            frame_number,
            scope: Scope::BeginImplFrame,
            timestamp: now,
        });
        let mut requests = Requests::new();
        self.client.will_begin_impl_frame(&frame_args, &mut requests);
        self.apply_requests(&requests, now);
        self.process_scheduled_actions();
        self.tracer.scope_end(&ScopeEndEvent {
            frame_number,
            scope: Scope::BeginImplFrame,
            timestamp: self.clock.now(),
        });
    }

    // -----------------------------------------------------------------------
    // Deadline
    // -----------------------------------------------------------------------

    /// Delivers a fired deadline timer. Stale handles are ignored.
    pub fn on_deadline_timer(&mut self, handle: TimerHandle) {
        if self.stopped {
            return;
        }
        match self.armed_deadline {
            Some(armed) if armed.handle == handle => self.armed_deadline = None,
            _ => return,
        }
        self.on_begin_impl_frame_deadline();
    }

    fn on_begin_impl_frame_deadline(&mut self) {
        let now = self.clock.now();
        let frame_number = self.state.current_frame_number();
        self.tracer.scope_begin(&ScopeBeginEvent {
            frame_number,
            scope: Scope::Deadline,
            timestamp: now,
        });
        if let Some(frame) = &mut self.impl_frame {
            frame.summary.deadline_fired(now);
        }
        self.state.on_begin_impl_frame_deadline();
        self.drain_actions();
        self.finish_impl_frame();
        self.tracer.scope_end(&ScopeEndEvent {
            frame_number,
            scope: Scope::Deadline,
            timestamp: self.clock.now(),
        });

        if let Some(args) = self.pending_begin_frame.take() {
            let now = self.clock.now();
            // A queued frame of either kind expires with its deadline.
            if now > args.deadline {
                self.drop_begin_frame(&args, BeginFrameDisposition::DroppedMissed, now);
                self.update_observation();
            } else {
                self.handle_begin_frame(args, now);
            }
        }
    }

    fn finish_impl_frame(&mut self) {
        self.cancel_deadline();
        self.state.on_begin_impl_frame_idle();
        self.drain_actions();

        let now = self.clock.now();
        let mut requests = Requests::new();
        self.client.did_finish_impl_frame(&mut requests);
        self.apply_requests(&requests, now);
        self.source.did_finish_frame();

        if let Some(frame) = self.impl_frame.take() {
            let summary = frame.summary.finish(self.clock.now());
            self.tracer.frame_summary(&summary);
        }
        self.scheduled_deadline_mode = None;
        self.process_scheduled_actions();
    }

    fn schedule_deadline_if_needed(&mut self) {
        if self.state.begin_impl_frame_state() != BeginImplFrameState::InsideBeginFrame {
            return;
        }
        let Some(frame) = self.impl_frame else {
            return;
        };
        let mode = self.state.current_deadline_mode();
        let now = self.clock.now();
        let at = match mode {
            DeadlineMode::None | DeadlineMode::BlockedOnReadyToDraw => None,
            DeadlineMode::Immediate => Some(now),
            DeadlineMode::Regular => Some(frame.adjusted_deadline),
            DeadlineMode::Late => Some(frame.args.next_frame_time()),
        };
        let unchanged = self.scheduled_deadline_mode == Some(mode);
        if unchanged && (self.armed_deadline.is_some() || at.is_none()) {
            return;
        }

        self.cancel_deadline();
        self.scheduled_deadline_mode = Some(mode);
        if let Some(at) = at {
            let handle = self.timer.arm(at);
            self.armed_deadline = Some(ArmedDeadline { handle, at });
        }
        self.tracer.deadline_armed(&DeadlineArmedEvent {
            frame_number: self.state.current_frame_number(),
            mode,
            at,
            now,
        });
    }

    fn cancel_deadline(&mut self) {
        if let Some(armed) = self.armed_deadline.take() {
            self.timer.cancel(armed.handle);
        }
    }

    // -----------------------------------------------------------------------
    // Action drain
    // -----------------------------------------------------------------------

    fn process_scheduled_actions(&mut self) {
        if self.stopped {
            return;
        }
        self.drain_actions();
        self.schedule_deadline_if_needed();
        self.update_observation();
    }

    fn drain_actions(&mut self) {
        debug_assert!(!self.inside_drain, "nested action drain");
        self.inside_drain = true;
        let frame_number = self.state.current_frame_number();
        self.tracer.scope_begin(&ScopeBeginEvent {
            frame_number,
            scope: Scope::DrainActions,
            timestamp: self.clock.now(),
        });
        loop {
            let action = self.state.next_action();
            if action == Action::None {
                break;
            }
            self.perform(action);
        }
        self.tracer.scope_end(&ScopeEndEvent {
            frame_number,
            scope: Scope::DrainActions,
            timestamp: self.clock.now(),
        });
        self.inside_drain = false;
    }

    fn perform(&mut self, action: Action) {
        let started = self.clock.now();
        let mut requests = Requests::new();
        let mut draw_result = None;

        match action {
            Action::None => return,
            Action::SendBeginMainFrame => {
                let args = self.begin_main_frame_args.unwrap_or_else(|| {
                    FrameArgs::new(0, started, started + DEFAULT_INTERVAL, DEFAULT_INTERVAL)
                });
                self.timing
                    .will_begin_main_frame(started, args.on_critical_path);
                self.state.will_send_begin_main_frame();
                self.client
                    .scheduled_action_send_begin_main_frame(&args, &mut requests);
            }
            Action::Commit => {
                let sample = self.timing.will_commit(started);
                self.emit_main_frame_sample(sample, started);
                self.state.will_commit();
                self.client.scheduled_action_commit(&mut requests);
            }
            Action::ActivateSyncTree => {
                self.timing.will_activate(started);
                self.state.will_activate();
                self.client.scheduled_action_activate_sync_tree(&mut requests);
                let now = self.clock.now();
                let sample = self.timing.did_activate(now);
                self.emit_stage_sample(sample, now);
            }
            Action::DrawIfPossible | Action::DrawForced => {
                self.timing.will_draw(started);
                self.state.will_draw();
                let result = if action == Action::DrawForced {
                    self.client.scheduled_action_draw_forced(&mut requests)
                } else {
                    self.client.scheduled_action_draw_if_possible(&mut requests)
                };
                let now = self.clock.now();
                let sample = self.timing.did_draw(now);
                self.emit_stage_sample(sample, now);
                self.state.did_draw(result);
                draw_result = Some(result);
            }
            Action::DrawAbort => {
                self.state.abort_draw();
                self.timing.draw_aborted();
                draw_result = Some(DrawResult::AbortedDrainingPipeline);
            }
            Action::PrepareTiles => {
                // Host tile work from an earlier frame keeps the interval.
                let measured = !self.timing.prepare_tiles_in_flight();
                if measured {
                    self.timing.will_prepare_tiles(started);
                }
                self.state.will_prepare_tiles();
                self.client.scheduled_action_prepare_tiles(&mut requests);
                if measured {
                    let now = self.clock.now();
                    let sample = self.timing.did_prepare_tiles(now);
                    self.emit_stage_sample(sample, now);
                }
            }
            Action::BeginSurfaceCreation => {
                self.state.will_begin_surface_creation();
                self.client
                    .scheduled_action_begin_surface_creation(&mut requests);
            }
            Action::InvalidateSurface => {
                self.state.will_invalidate_surface();
                self.client
                    .scheduled_action_invalidate_surface(&mut requests);
            }
        }

        let finished = self.clock.now();
        self.apply_requests(&requests, finished);

        let event = ActionEvent {
            frame_number: self.state.current_frame_number(),
            action,
            started,
            finished,
            draw_result,
        };
        if let Some(frame) = &mut self.impl_frame {
            frame.summary.action(&event);
        }
        self.tracer.action(&event);
    }

    fn apply_requests(&mut self, requests: &Requests, now: HostTime) {
        if requests.needs_redraw {
            self.state.set_needs_redraw();
        }
        if requests.needs_begin_main_frame {
            self.state.set_needs_begin_main_frame();
        }
        if requests.needs_prepare_tiles {
            self.state.set_needs_prepare_tiles();
        }
        if requests.needs_one_begin_impl_frame {
            self.state.set_needs_one_begin_impl_frame();
        }
        for _ in 0..requests.submitted_frames {
            self.record_submission(now);
        }
    }

    fn record_submission(&mut self, now: HostTime) {
        self.state.did_submit_compositor_frame();
        self.timing.did_submit_compositor_frame(now);
    }

    // -----------------------------------------------------------------------
    // Observation and recording
    // -----------------------------------------------------------------------

    fn update_observation(&mut self) {
        let needed = self.state.begin_frame_needed();
        if needed && !self.observing {
            self.source.add_observer();
            self.observing = true;
            self.tracer.observation(&ObservationEvent {
                observing: true,
                timestamp: self.clock.now(),
            });
        } else if !needed
            && self.observing
            && self.state.begin_impl_frame_state() == BeginImplFrameState::Idle
        {
            self.source.remove_observer();
            self.observing = false;
            self.tracer.observation(&ObservationEvent {
                observing: false,
                timestamp: self.clock.now(),
            });
            if self.state.begin_main_frame_state() == BeginMainFrameState::Idle {
                self.client.send_begin_main_frame_not_expected_soon();
            }
        }
    }

    fn update_recording(&mut self) {
        self.timing
            .set_recording_enabled(self.state.has_initialized_surface() && self.state.visible());
    }

    fn emit_stage_sample(&mut self, sample: Option<StageSample>, timestamp: HostTime) {
        if let Some(sample) = sample {
            self.tracer.stage_sample(&StageSampleEvent {
                frame_number: self.state.current_frame_number(),
                stage: sample.stage,
                duration: sample.duration,
                recorded: sample.recorded,
                timestamp,
            });
        }
    }

    fn emit_main_frame_sample(&mut self, sample: Option<MainFrameSample>, timestamp: HostTime) {
        let Some(sample) = sample else {
            return;
        };
        for (stage, duration) in [
            (Stage::BeginMainFrameQueue, sample.queue),
            (Stage::BeginMainFrameStartToCommit, sample.start_to_commit),
        ] {
            self.emit_stage_sample(
                Some(StageSample {
                    stage,
                    duration,
                    recorded: sample.recorded,
                }),
                timestamp,
            );
        }
    }
}

impl<C: SchedulerClient, S: BeginFrameSource, T: DeadlineTimer, K: Clock> Drop
    for FrameScheduler<C, S, T, K>
{
    fn drop(&mut self) {
        self.cancel_deadline();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
