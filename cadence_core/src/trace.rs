// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structured trace events for the scheduler.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! scheduler calls as it accepts frames, plans deadlines, and performs
//! actions. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed [`TraceSink`]. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing and the sink passed
//! to [`Tracer::new`] is dropped immediately. When **on**, each method
//! performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects what happened during one consumer frame
//! and produces a [`FrameSummary`] when the frame finishes.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use crate::args::FrameArgs;
use crate::client::DrawResult;
use crate::state_machine::{Action, DeadlineMode};
use crate::time::{Duration, HostTime};
use crate::timing_history::Stage;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// A bracketed region of scheduler work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// From accepting a BeginFrame to the end of its first drain.
    BeginImplFrame,
    /// From the deadline firing to the end of the consumer frame.
    Deadline,
    /// One pass of the action drain loop.
    DrainActions,
}

impl Scope {
    /// A stable display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BeginImplFrame => "BeginImplFrame",
            Self::Deadline => "Deadline",
            Self::DrainActions => "DrainActions",
        }
    }
}

/// What the scheduler did with a delivered BeginFrame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BeginFrameDisposition {
    /// A consumer frame started.
    Started,
    /// Queued behind the consumer frame in progress.
    Queued,
    /// Dropped: delivered late and already past its deadline.
    DroppedMissed,
    /// Dropped: nothing needed a frame.
    DroppedNotNeeded,
    /// Dropped: the scheduler is stopped.
    DroppedStopped,
    /// A queued frame was superseded by a newer one.
    Replaced,
    /// Skipped so the consumer can catch up with its submit backlog.
    SkippedToRecoverImplLatency,
}

impl BeginFrameDisposition {
    /// A stable display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Started => "Started",
            Self::Queued => "Queued",
            Self::DroppedMissed => "DroppedMissed",
            Self::DroppedNotNeeded => "DroppedNotNeeded",
            Self::DroppedStopped => "DroppedStopped",
            Self::Replaced => "Replaced",
            Self::SkippedToRecoverImplLatency => "SkippedToRecoverImplLatency",
        }
    }
}

/// Latency recovery decided while planning a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LatencyRecovery {
    /// Proceed normally.
    #[default]
    None,
    /// Skip this frame's producer update so a producer that missed its last
    /// deadline can catch up.
    SkipBeginMainFrameToCatchUp,
    /// Skip this frame's producer update because it cannot finish before the
    /// deadline.
    SkipBeginMainFrameDeadlineInfeasible,
    /// Skip the whole consumer frame.
    SkipBeginImplFrame,
}

impl LatencyRecovery {
    /// A stable display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::SkipBeginMainFrameToCatchUp => "SkipBeginMainFrameToCatchUp",
            Self::SkipBeginMainFrameDeadlineInfeasible => "SkipBeginMainFrameDeadlineInfeasible",
            Self::SkipBeginImplFrame => "SkipBeginImplFrame",
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Marks the beginning of a [`Scope`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeBeginEvent {
    /// Consumer frame number.
    pub frame_number: u64,
    /// Which scope is starting.
    pub scope: Scope,
    /// Host time at the start of the scope.
    pub timestamp: HostTime,
}

/// Marks the end of a [`Scope`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeEndEvent {
    /// Consumer frame number.
    pub frame_number: u64,
    /// Which scope is ending.
    pub scope: Scope,
    /// Host time at the end of the scope.
    pub timestamp: HostTime,
}

/// Emitted for every BeginFrame the scheduler receives or dequeues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeginFrameEvent {
    /// Source sequence number.
    pub sequence: u64,
    /// Frame time.
    pub frame_time: HostTime,
    /// Deadline as issued by the source.
    pub deadline: HostTime,
    /// Frame interval.
    pub interval: Duration,
    /// Whether the frame was delivered late.
    pub missed: bool,
    /// What the scheduler did with it.
    pub disposition: BeginFrameDisposition,
    /// Host time of the decision.
    pub now: HostTime,
}

impl BeginFrameEvent {
    /// Creates an event for `args`.
    #[must_use]
    pub fn new(args: &FrameArgs, disposition: BeginFrameDisposition, now: HostTime) -> Self {
        Self {
            sequence: args.sequence,
            frame_time: args.frame_time,
            deadline: args.deadline,
            interval: args.interval,
            missed: args.is_missed(),
            disposition,
            now,
        }
    }
}

/// The deadline computation for a consumer frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeadlinePlanEvent {
    /// Consumer frame number the plan is for.
    pub frame_number: u64,
    /// Host time of planning.
    pub now: HostTime,
    /// Deadline as issued by the source.
    pub deadline: HostTime,
    /// Deadline after subtracting the draw estimate and fudge.
    pub adjusted_deadline: HostTime,
    /// Draw estimate used.
    pub draw_estimate: Duration,
    /// Estimated producer start-to-activation time, excluding queueing.
    pub begin_main_frame_to_activate: Duration,
    /// The same, including the queue estimate for this frame's path.
    pub begin_main_frame_to_activate_with_queue: Duration,
    /// Whether the producer update is on the critical path.
    pub on_critical_path: bool,
    /// Whether the producer can finish before the adjusted deadline.
    pub can_finish_before_deadline: bool,
    /// Recovery decision.
    pub recovery: LatencyRecovery,
}

/// Emitted after each performed action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionEvent {
    /// Consumer frame number.
    pub frame_number: u64,
    /// The action.
    pub action: Action,
    /// Host time before the client callback.
    pub started: HostTime,
    /// Host time after the client callback.
    pub finished: HostTime,
    /// Draw outcome, for draw actions.
    pub draw_result: Option<DrawResult>,
}

/// Emitted whenever the deadline timer is (re)armed or cleared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeadlineArmedEvent {
    /// Consumer frame number.
    pub frame_number: u64,
    /// Mode that produced the fire time.
    pub mode: DeadlineMode,
    /// Fire time, or `None` if the mode arms nothing.
    pub at: Option<HostTime>,
    /// Host time of the decision.
    pub now: HostTime,
}

/// Emitted for every measured stage duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageSampleEvent {
    /// Consumer frame number current when the stage finished.
    pub frame_number: u64,
    /// Measured stage.
    pub stage: Stage,
    /// Measured duration.
    pub duration: Duration,
    /// Whether the sample entered the estimate history.
    pub recorded: bool,
    /// Host time the stage finished.
    pub timestamp: HostTime,
}

/// Emitted when the scheduler subscribes to or unsubscribes from its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObservationEvent {
    /// Whether the scheduler now observes the source.
    pub observing: bool,
    /// Host time of the change.
    pub timestamp: HostTime,
}

/// Per-consumer-frame summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    /// Consumer frame number.
    pub frame_number: u64,
    /// Source sequence number.
    pub sequence: u64,
    /// Frame time.
    pub frame_time: HostTime,
    /// Deadline as issued by the source.
    pub deadline: HostTime,
    /// Adjusted deadline, if a plan was made (not in synchronous mode).
    pub adjusted_deadline: Option<HostTime>,
    /// Host time the frame began.
    pub began_at: HostTime,
    /// Host time the deadline fired, if it did.
    pub deadline_fired_at: Option<HostTime>,
    /// Host time the frame finished.
    pub finished_at: HostTime,
    /// Latency recovery applied to this frame.
    pub recovery: LatencyRecovery,
    /// Number of actions performed during the frame.
    pub action_count: u32,
    /// Whether a producer update was sent.
    pub sent_begin_main_frame: bool,
    /// Outcome of the frame's draw, if any.
    pub draw_result: Option<DrawResult>,
    /// Whether the draw happened after the source's deadline.
    pub missed_deadline: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the scheduler.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a scope begins.
    fn on_scope_begin(&mut self, e: &ScopeBeginEvent) {
        _ = e;
    }

    /// Called when a scope ends.
    fn on_scope_end(&mut self, e: &ScopeEndEvent) {
        _ = e;
    }

    /// Called for every BeginFrame decision.
    fn on_begin_frame(&mut self, e: &BeginFrameEvent) {
        _ = e;
    }

    /// Called after a consumer frame's deadline is planned.
    fn on_deadline_plan(&mut self, e: &DeadlinePlanEvent) {
        _ = e;
    }

    /// Called after each performed action.
    fn on_action(&mut self, e: &ActionEvent) {
        _ = e;
    }

    /// Called when the deadline timer is armed or cleared.
    fn on_deadline_armed(&mut self, e: &DeadlineArmedEvent) {
        _ = e;
    }

    /// Called with every measured stage duration.
    fn on_stage_sample(&mut self, e: &StageSampleEvent) {
        _ = e;
    }

    /// Called when source observation changes.
    fn on_observation(&mut self, e: &ObservationEvent) {
        _ = e;
    }

    /// Called with a per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

impl<T: TraceSink + ?Sized> TraceSink for Box<T> {
    fn on_scope_begin(&mut self, e: &ScopeBeginEvent) {
        (**self).on_scope_begin(e);
    }
    fn on_scope_end(&mut self, e: &ScopeEndEvent) {
        (**self).on_scope_end(e);
    }
    fn on_begin_frame(&mut self, e: &BeginFrameEvent) {
        (**self).on_begin_frame(e);
    }
    fn on_deadline_plan(&mut self, e: &DeadlinePlanEvent) {
        (**self).on_deadline_plan(e);
    }
    fn on_action(&mut self, e: &ActionEvent) {
        (**self).on_action(e);
    }
    fn on_deadline_armed(&mut self, e: &DeadlineArmedEvent) {
        (**self).on_deadline_armed(e);
    }
    fn on_stage_sample(&mut self, e: &StageSampleEvent) {
        (**self).on_stage_sample(e);
    }
    fn on_observation(&mut self, e: &ObservationEvent) {
        (**self).on_observation(e);
    }
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        (**self).on_frame_summary(s);
    }
}

/// Shared sinks let the host inspect recorded events while the scheduler
/// owns its [`Tracer`].
impl<T: TraceSink + ?Sized> TraceSink for Rc<RefCell<T>> {
    fn on_scope_begin(&mut self, e: &ScopeBeginEvent) {
        self.borrow_mut().on_scope_begin(e);
    }
    fn on_scope_end(&mut self, e: &ScopeEndEvent) {
        self.borrow_mut().on_scope_end(e);
    }
    fn on_begin_frame(&mut self, e: &BeginFrameEvent) {
        self.borrow_mut().on_begin_frame(e);
    }
    fn on_deadline_plan(&mut self, e: &DeadlinePlanEvent) {
        self.borrow_mut().on_deadline_plan(e);
    }
    fn on_action(&mut self, e: &ActionEvent) {
        self.borrow_mut().on_action(e);
    }
    fn on_deadline_armed(&mut self, e: &DeadlineArmedEvent) {
        self.borrow_mut().on_deadline_armed(e);
    }
    fn on_stage_sample(&mut self, e: &StageSampleEvent) {
        self.borrow_mut().on_stage_sample(e);
    }
    fn on_observation(&mut self, e: &ObservationEvent) {
        self.borrow_mut().on_observation(e);
    }
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.borrow_mut().on_frame_summary(s);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional owned [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer {
    fn default() -> Self {
        Self::none()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {}
        }
    }

    /// Whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`ScopeBeginEvent`].
    #[inline]
    pub fn scope_begin(&mut self, e: &ScopeBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_scope_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ScopeEndEvent`].
    #[inline]
    pub fn scope_end(&mut self, e: &ScopeEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_scope_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BeginFrameEvent`].
    #[inline]
    pub fn begin_frame(&mut self, e: &BeginFrameEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_begin_frame(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DeadlinePlanEvent`].
    #[inline]
    pub fn deadline_plan(&mut self, e: &DeadlinePlanEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_deadline_plan(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ActionEvent`].
    #[inline]
    pub fn action(&mut self, e: &ActionEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_action(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DeadlineArmedEvent`].
    #[inline]
    pub fn deadline_armed(&mut self, e: &DeadlineArmedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_deadline_armed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StageSampleEvent`].
    #[inline]
    pub fn stage_sample(&mut self, e: &StageSampleEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_stage_sample(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ObservationEvent`].
    #[inline]
    pub fn observation(&mut self, e: &ObservationEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_observation(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects what happens during one consumer frame and produces a
/// [`FrameSummary`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummaryBuilder {
    frame_number: u64,
    args: FrameArgs,
    began_at: HostTime,
    adjusted_deadline: Option<HostTime>,
    recovery: LatencyRecovery,
    deadline_fired_at: Option<HostTime>,
    action_count: u32,
    sent_begin_main_frame: bool,
    draw_result: Option<DrawResult>,
    drew_at: Option<HostTime>,
}

impl FrameSummaryBuilder {
    /// Starts a summary for the frame described by `args`.
    #[must_use]
    pub fn new(frame_number: u64, args: &FrameArgs, began_at: HostTime) -> Self {
        Self {
            frame_number,
            args: *args,
            began_at,
            adjusted_deadline: None,
            recovery: LatencyRecovery::None,
            deadline_fired_at: None,
            action_count: 0,
            sent_begin_main_frame: false,
            draw_result: None,
            drew_at: None,
        }
    }

    /// Records the frame's deadline plan.
    pub fn plan(&mut self, plan: &DeadlinePlanEvent) {
        self.adjusted_deadline = Some(plan.adjusted_deadline);
        self.recovery = plan.recovery;
    }

    /// Records an action performed during the frame.
    pub fn action(&mut self, e: &ActionEvent) {
        self.action_count += 1;
        match e.action {
            Action::SendBeginMainFrame => self.sent_begin_main_frame = true,
            Action::DrawIfPossible | Action::DrawForced | Action::DrawAbort => {
                self.draw_result = e.draw_result;
                self.drew_at = Some(e.finished);
            }
            _ => {}
        }
    }

    /// Records when the deadline fired.
    pub fn deadline_fired(&mut self, t: HostTime) {
        self.deadline_fired_at = Some(t);
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self, finished_at: HostTime) -> FrameSummary {
        FrameSummary {
            frame_number: self.frame_number,
            sequence: self.args.sequence,
            frame_time: self.args.frame_time,
            deadline: self.args.deadline,
            adjusted_deadline: self.adjusted_deadline,
            began_at: self.began_at,
            deadline_fired_at: self.deadline_fired_at,
            finished_at,
            recovery: self.recovery,
            action_count: self.action_count,
            sent_begin_main_frame: self.sent_begin_main_frame,
            draw_result: self.draw_result,
            missed_deadline: self.drew_at.is_some_and(|t| t > self.args.deadline),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
