// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, one tag byte followed by
//! the event's fields. Enums are stored as their declaration index. [`decode`]
//! reads them back as an iterator of [`RecordedEvent`]; decoding stops at the
//! first unknown tag or truncated record.

use cadence_core::client::DrawResult;
use cadence_core::state_machine::{Action, DeadlineMode};
use cadence_core::time::{Duration, HostTime};
use cadence_core::timing_history::Stage;
use cadence_core::trace::{
    ActionEvent, BeginFrameDisposition, BeginFrameEvent, DeadlineArmedEvent, DeadlinePlanEvent,
    FrameSummary, LatencyRecovery, ObservationEvent, Scope, ScopeBeginEvent, ScopeEndEvent,
    StageSampleEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_SCOPE_BEGIN: u8 = 1;
const TAG_SCOPE_END: u8 = 2;
const TAG_BEGIN_FRAME: u8 = 3;
const TAG_DEADLINE_PLAN: u8 = 4;
const TAG_ACTION: u8 = 5;
const TAG_DEADLINE_ARMED: u8 = 6;
const TAG_STAGE_SAMPLE: u8 = 7;
const TAG_OBSERVATION: u8 = 8;
const TAG_FRAME_SUMMARY: u8 = 9;

// Declaration order; index = stored byte.
const SCOPES: [Scope; 3] = [Scope::BeginImplFrame, Scope::Deadline, Scope::DrainActions];
const DISPOSITIONS: [BeginFrameDisposition; 7] = [
    BeginFrameDisposition::Started,
    BeginFrameDisposition::Queued,
    BeginFrameDisposition::DroppedMissed,
    BeginFrameDisposition::DroppedNotNeeded,
    BeginFrameDisposition::DroppedStopped,
    BeginFrameDisposition::Replaced,
    BeginFrameDisposition::SkippedToRecoverImplLatency,
];
const RECOVERIES: [LatencyRecovery; 4] = [
    LatencyRecovery::None,
    LatencyRecovery::SkipBeginMainFrameToCatchUp,
    LatencyRecovery::SkipBeginMainFrameDeadlineInfeasible,
    LatencyRecovery::SkipBeginImplFrame,
];
const ACTIONS: [Action; 10] = [
    Action::None,
    Action::SendBeginMainFrame,
    Action::Commit,
    Action::ActivateSyncTree,
    Action::DrawIfPossible,
    Action::DrawForced,
    Action::DrawAbort,
    Action::PrepareTiles,
    Action::BeginSurfaceCreation,
    Action::InvalidateSurface,
];
const DRAW_RESULTS: [DrawResult; 5] = [
    DrawResult::Success,
    DrawResult::AbortedCheckerboardAnimations,
    DrawResult::AbortedMissingHighResContent,
    DrawResult::AbortedCantDraw,
    DrawResult::AbortedDrainingPipeline,
];
const DEADLINE_MODES: [DeadlineMode; 5] = [
    DeadlineMode::None,
    DeadlineMode::Immediate,
    DeadlineMode::Regular,
    DeadlineMode::Late,
    DeadlineMode::BlockedOnReadyToDraw,
];
const STAGES: [Stage; 8] = [
    Stage::BeginMainFrameQueue,
    Stage::BeginMainFrameStartToCommit,
    Stage::Commit,
    Stage::CommitToReadyToActivate,
    Stage::Activate,
    Stage::PrepareTiles,
    Stage::Draw,
    Stage::SubmitToAck,
];

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_time(&mut self, t: HostTime) {
        self.write_u64(t.ticks());
    }

    fn write_duration(&mut self, d: Duration) {
        self.write_u64(d.ticks());
    }

    fn write_option_time(&mut self, v: Option<HostTime>) {
        match v {
            Some(t) => {
                self.write_u8(1);
                self.write_time(t);
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    /// `0` for `None`, otherwise the result's index plus one.
    fn write_draw_result(&mut self, v: Option<DrawResult>) {
        self.write_u8(v.map_or(0, |r| r as u8 + 1));
    }
}

impl TraceSink for RecorderSink {
    fn on_scope_begin(&mut self, e: &ScopeBeginEvent) {
        self.write_u8(TAG_SCOPE_BEGIN);
        self.write_u64(e.frame_number);
        self.write_u8(e.scope as u8);
        self.write_time(e.timestamp);
    }

    fn on_scope_end(&mut self, e: &ScopeEndEvent) {
        self.write_u8(TAG_SCOPE_END);
        self.write_u64(e.frame_number);
        self.write_u8(e.scope as u8);
        self.write_time(e.timestamp);
    }

    fn on_begin_frame(&mut self, e: &BeginFrameEvent) {
        self.write_u8(TAG_BEGIN_FRAME);
        self.write_u64(e.sequence);
        self.write_time(e.frame_time);
        self.write_time(e.deadline);
        self.write_duration(e.interval);
        self.write_bool(e.missed);
        self.write_u8(e.disposition as u8);
        self.write_time(e.now);
    }

    fn on_deadline_plan(&mut self, e: &DeadlinePlanEvent) {
        self.write_u8(TAG_DEADLINE_PLAN);
        self.write_u64(e.frame_number);
        self.write_time(e.now);
        self.write_time(e.deadline);
        self.write_time(e.adjusted_deadline);
        self.write_duration(e.draw_estimate);
        self.write_duration(e.begin_main_frame_to_activate);
        self.write_duration(e.begin_main_frame_to_activate_with_queue);
        self.write_bool(e.on_critical_path);
        self.write_bool(e.can_finish_before_deadline);
        self.write_u8(e.recovery as u8);
    }

    fn on_action(&mut self, e: &ActionEvent) {
        self.write_u8(TAG_ACTION);
        self.write_u64(e.frame_number);
        self.write_u8(e.action as u8);
        self.write_time(e.started);
        self.write_time(e.finished);
        self.write_draw_result(e.draw_result);
    }

    fn on_deadline_armed(&mut self, e: &DeadlineArmedEvent) {
        self.write_u8(TAG_DEADLINE_ARMED);
        self.write_u64(e.frame_number);
        self.write_u8(e.mode as u8);
        self.write_option_time(e.at);
        self.write_time(e.now);
    }

    fn on_stage_sample(&mut self, e: &StageSampleEvent) {
        self.write_u8(TAG_STAGE_SAMPLE);
        self.write_u64(e.frame_number);
        self.write_u8(e.stage as u8);
        self.write_duration(e.duration);
        self.write_bool(e.recorded);
        self.write_time(e.timestamp);
    }

    fn on_observation(&mut self, e: &ObservationEvent) {
        self.write_u8(TAG_OBSERVATION);
        self.write_bool(e.observing);
        self.write_time(e.timestamp);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_number);
        self.write_u64(s.sequence);
        self.write_time(s.frame_time);
        self.write_time(s.deadline);
        self.write_option_time(s.adjusted_deadline);
        self.write_time(s.began_at);
        self.write_option_time(s.deadline_fired_at);
        self.write_time(s.finished_at);
        self.write_u8(s.recovery as u8);
        self.write_u32(s.action_count);
        self.write_bool(s.sent_begin_main_frame);
        self.write_draw_result(s.draw_result);
        self.write_bool(s.missed_deadline);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A [`ScopeBeginEvent`].
    ScopeBegin(ScopeBeginEvent),
    /// A [`ScopeEndEvent`].
    ScopeEnd(ScopeEndEvent),
    /// A [`BeginFrameEvent`].
    BeginFrame(BeginFrameEvent),
    /// A [`DeadlinePlanEvent`].
    DeadlinePlan(DeadlinePlanEvent),
    /// An [`ActionEvent`].
    Action(ActionEvent),
    /// A [`DeadlineArmedEvent`].
    DeadlineArmed(DeadlineArmedEvent),
    /// A [`StageSampleEvent`].
    StageSample(StageSampleEvent),
    /// An [`ObservationEvent`].
    Observation(ObservationEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes = self.data.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_duration(&mut self) -> Option<Duration> {
        self.read_u64().map(Duration)
    }

    fn read_option_time(&mut self) -> Option<Option<HostTime>> {
        let present = self.read_u8()?;
        let t = self.read_time()?;
        Some((present != 0).then_some(t))
    }

    fn read_enum<T: Copy, const N: usize>(&mut self, table: &[T; N]) -> Option<T> {
        table.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_draw_result(&mut self) -> Option<Option<DrawResult>> {
        match self.read_u8()? {
            0 => Some(None),
            code => DRAW_RESULTS.get(usize::from(code - 1)).copied().map(Some),
        }
    }

    fn decode_scope_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ScopeBegin(ScopeBeginEvent {
            frame_number: self.read_u64()?,
            scope: self.read_enum(&SCOPES)?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_scope_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ScopeEnd(ScopeEndEvent {
            frame_number: self.read_u64()?,
            scope: self.read_enum(&SCOPES)?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_begin_frame(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::BeginFrame(BeginFrameEvent {
            sequence: self.read_u64()?,
            frame_time: self.read_time()?,
            deadline: self.read_time()?,
            interval: self.read_duration()?,
            missed: self.read_bool()?,
            disposition: self.read_enum(&DISPOSITIONS)?,
            now: self.read_time()?,
        }))
    }

    fn decode_deadline_plan(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::DeadlinePlan(DeadlinePlanEvent {
            frame_number: self.read_u64()?,
            now: self.read_time()?,
            deadline: self.read_time()?,
            adjusted_deadline: self.read_time()?,
            draw_estimate: self.read_duration()?,
            begin_main_frame_to_activate: self.read_duration()?,
            begin_main_frame_to_activate_with_queue: self.read_duration()?,
            on_critical_path: self.read_bool()?,
            can_finish_before_deadline: self.read_bool()?,
            recovery: self.read_enum(&RECOVERIES)?,
        }))
    }

    fn decode_action(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Action(ActionEvent {
            frame_number: self.read_u64()?,
            action: self.read_enum(&ACTIONS)?,
            started: self.read_time()?,
            finished: self.read_time()?,
            draw_result: self.read_draw_result()?,
        }))
    }

    fn decode_deadline_armed(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::DeadlineArmed(DeadlineArmedEvent {
            frame_number: self.read_u64()?,
            mode: self.read_enum(&DEADLINE_MODES)?,
            at: self.read_option_time()?,
            now: self.read_time()?,
        }))
    }

    fn decode_stage_sample(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StageSample(StageSampleEvent {
            frame_number: self.read_u64()?,
            stage: self.read_enum(&STAGES)?,
            duration: self.read_duration()?,
            recorded: self.read_bool()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_observation(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Observation(ObservationEvent {
            observing: self.read_bool()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_number: self.read_u64()?,
            sequence: self.read_u64()?,
            frame_time: self.read_time()?,
            deadline: self.read_time()?,
            adjusted_deadline: self.read_option_time()?,
            began_at: self.read_time()?,
            deadline_fired_at: self.read_option_time()?,
            finished_at: self.read_time()?,
            recovery: self.read_enum(&RECOVERIES)?,
            action_count: self.read_u32()?,
            sent_begin_main_frame: self.read_bool()?,
            draw_result: self.read_draw_result()?,
            missed_deadline: self.read_bool()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_SCOPE_BEGIN => self.decode_scope_begin(),
            TAG_SCOPE_END => self.decode_scope_end(),
            TAG_BEGIN_FRAME => self.decode_begin_frame(),
            TAG_DEADLINE_PLAN => self.decode_deadline_plan(),
            TAG_ACTION => self.decode_action(),
            TAG_DEADLINE_ARMED => self.decode_deadline_armed(),
            TAG_STAGE_SAMPLE => self.decode_stage_sample(),
            TAG_OBSERVATION => self.decode_observation(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
