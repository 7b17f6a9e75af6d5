// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bridge from [`TraceSink`] to the [`tracing`] ecosystem.
//!
//! [`TracingSink`] turns each scheduler event into a structured `tracing`
//! event under the `cadence` target, so hosts that already install a
//! subscriber see frame pacing next to the rest of their logs. Per-frame
//! detail (plans, actions, samples) is logged at `TRACE`; frame arrivals,
//! observation changes, and summaries at `DEBUG`; summaries of frames that
//! missed their deadline at `WARN`. Times are reported in nanoseconds.

use cadence_core::time::{Duration, HostTime, Timebase};
use cadence_core::trace::{
    ActionEvent, BeginFrameEvent, DeadlineArmedEvent, DeadlinePlanEvent, FrameSummary,
    ObservationEvent, ScopeBeginEvent, ScopeEndEvent, StageSampleEvent, TraceSink,
};
use tracing::{debug, trace, warn};

/// A [`TraceSink`] that forwards events to `tracing`.
#[derive(Clone, Copy, Debug)]
pub struct TracingSink {
    timebase: Timebase,
}

impl TracingSink {
    /// Creates a sink converting ticks with the given timebase.
    #[must_use]
    pub fn new(timebase: Timebase) -> Self {
        Self { timebase }
    }

    fn ns(&self, t: HostTime) -> u64 {
        self.timebase.ticks_to_nanos(t.ticks())
    }

    fn dur_ns(&self, d: Duration) -> u64 {
        self.timebase.ticks_to_nanos(d.ticks())
    }
}

impl TraceSink for TracingSink {
    fn on_scope_begin(&mut self, e: &ScopeBeginEvent) {
        trace!(
            target: "cadence",
            frame = e.frame_number,
            scope = e.scope.name(),
            at_ns = self.ns(e.timestamp),
            "scope begin"
        );
    }

    fn on_scope_end(&mut self, e: &ScopeEndEvent) {
        trace!(
            target: "cadence",
            frame = e.frame_number,
            scope = e.scope.name(),
            at_ns = self.ns(e.timestamp),
            "scope end"
        );
    }

    fn on_begin_frame(&mut self, e: &BeginFrameEvent) {
        debug!(
            target: "cadence",
            sequence = e.sequence,
            frame_time_ns = self.ns(e.frame_time),
            deadline_ns = self.ns(e.deadline),
            interval_ns = self.dur_ns(e.interval),
            missed = e.missed,
            disposition = e.disposition.name(),
            "begin frame"
        );
    }

    fn on_deadline_plan(&mut self, e: &DeadlinePlanEvent) {
        trace!(
            target: "cadence",
            frame = e.frame_number,
            adjusted_deadline_ns = self.ns(e.adjusted_deadline),
            draw_estimate_ns = self.dur_ns(e.draw_estimate),
            to_activate_ns = self.dur_ns(e.begin_main_frame_to_activate_with_queue),
            on_critical_path = e.on_critical_path,
            feasible = e.can_finish_before_deadline,
            recovery = e.recovery.name(),
            "deadline plan"
        );
    }

    fn on_action(&mut self, e: &ActionEvent) {
        trace!(
            target: "cadence",
            frame = e.frame_number,
            action = e.action.name(),
            elapsed_ns = self.dur_ns(e.finished.saturating_duration_since(e.started)),
            draw_result = ?e.draw_result,
            "action"
        );
    }

    fn on_deadline_armed(&mut self, e: &DeadlineArmedEvent) {
        trace!(
            target: "cadence",
            frame = e.frame_number,
            mode = e.mode.name(),
            at_ns = e.at.map(|t| self.ns(t)),
            "deadline armed"
        );
    }

    fn on_stage_sample(&mut self, e: &StageSampleEvent) {
        trace!(
            target: "cadence",
            frame = e.frame_number,
            stage = e.stage.name(),
            duration_ns = self.dur_ns(e.duration),
            recorded = e.recorded,
            "stage sample"
        );
    }

    fn on_observation(&mut self, e: &ObservationEvent) {
        debug!(
            target: "cadence",
            observing = e.observing,
            at_ns = self.ns(e.timestamp),
            "frame source observation changed"
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let span_ns = self.dur_ns(s.finished_at.saturating_duration_since(s.began_at));
        if s.missed_deadline {
            warn!(
                target: "cadence",
                frame = s.frame_number,
                sequence = s.sequence,
                span_ns,
                recovery = s.recovery.name(),
                draw_result = ?s.draw_result,
                "frame missed its deadline"
            );
        } else {
            debug!(
                target: "cadence",
                frame = s.frame_number,
                sequence = s.sequence,
                span_ns,
                actions = s.action_count,
                sent_begin_main_frame = s.sent_begin_main_frame,
                recovery = s.recovery.name(),
                draw_result = ?s.draw_result,
                "frame finished"
            );
        }
    }
}
