// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to microseconds using a [`Timebase`]. Write errors are
//! ignored so tracing never disturbs the frame loop.

use std::io::Write;

use cadence_core::time::{Duration, HostTime, Timebase};
use cadence_core::trace::{
    ActionEvent, BeginFrameEvent, DeadlineArmedEvent, DeadlinePlanEvent, FrameSummary,
    ObservationEvent, ScopeBeginEvent, ScopeEndEvent, StageSampleEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
    scopes: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .field("scopes", &self.scopes)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self::with_writer(Box::new(std::io::stderr()), timebase)
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self::with_writer(writer, timebase)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self {
            writer,
            timebase,
            scopes: false,
        }
    }

    /// Also prints scope begin/end lines (off by default; they are noisy).
    #[must_use]
    pub fn with_scopes(mut self, scopes: bool) -> Self {
        self.scopes = scopes;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn us(&self, t: HostTime) -> f64 {
        self.timebase.ticks_to_nanos(t.ticks()) as f64 / 1000.0
    }

    fn dur_us(&self, d: Duration) -> f64 {
        self.timebase.ticks_to_nanos(d.ticks()) as f64 / 1000.0
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_scope_begin(&mut self, e: &ScopeBeginEvent) {
        if !self.scopes {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[scope:begin] frame={} {} at {:.1}µs",
            e.frame_number,
            e.scope.name(),
            self.us(e.timestamp),
        );
    }

    fn on_scope_end(&mut self, e: &ScopeEndEvent) {
        if !self.scopes {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[scope:end] frame={} {} at {:.1}µs",
            e.frame_number,
            e.scope.name(),
            self.us(e.timestamp),
        );
    }

    fn on_begin_frame(&mut self, e: &BeginFrameEvent) {
        let missed = if e.missed { " MISSED" } else { "" };
        let _ = writeln!(
            self.writer,
            "[begin-frame] seq={} time={:.1}µs deadline={:.1}µs{missed} -> {}",
            e.sequence,
            self.us(e.frame_time),
            self.us(e.deadline),
            e.disposition.name(),
        );
    }

    fn on_deadline_plan(&mut self, e: &DeadlinePlanEvent) {
        let _ = writeln!(
            self.writer,
            "[plan] frame={} adjusted={:.1}µs draw={:.1}µs to-activate={:.1}µs \
             critical={} feasible={} recovery={}",
            e.frame_number,
            self.us(e.adjusted_deadline),
            self.dur_us(e.draw_estimate),
            self.dur_us(e.begin_main_frame_to_activate_with_queue),
            e.on_critical_path,
            e.can_finish_before_deadline,
            e.recovery.name(),
        );
    }

    fn on_action(&mut self, e: &ActionEvent) {
        let result = match e.draw_result {
            Some(r) => format!(" result={r:?}"),
            None => String::new(),
        };
        let _ = writeln!(
            self.writer,
            "[action] frame={} {} {:.1}µs..{:.1}µs{result}",
            e.frame_number,
            e.action.name(),
            self.us(e.started),
            self.us(e.finished),
        );
    }

    fn on_deadline_armed(&mut self, e: &DeadlineArmedEvent) {
        match e.at {
            Some(at) => {
                let _ = writeln!(
                    self.writer,
                    "[deadline] frame={} {} at {:.1}µs",
                    e.frame_number,
                    e.mode.name(),
                    self.us(at),
                );
            }
            None => {
                let _ = writeln!(
                    self.writer,
                    "[deadline] frame={} {} unarmed",
                    e.frame_number,
                    e.mode.name(),
                );
            }
        }
    }

    fn on_stage_sample(&mut self, e: &StageSampleEvent) {
        let recorded = if e.recorded { "" } else { " (not recorded)" };
        let _ = writeln!(
            self.writer,
            "[sample] frame={} {}={:.1}µs{recorded}",
            e.frame_number,
            e.stage.name(),
            self.dur_us(e.duration),
        );
    }

    fn on_observation(&mut self, e: &ObservationEvent) {
        let what = if e.observing { "subscribe" } else { "unsubscribe" };
        let _ = writeln!(self.writer, "[source] {what} at {:.1}µs", self.us(e.timestamp));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let missed = if s.missed_deadline { "MISSED" } else { "ok" };
        let draw = s
            .draw_result
            .map_or_else(|| "none".to_owned(), |r| format!("{r:?}"));
        let _ = writeln!(
            self.writer,
            "[summary] frame={} seq={} actions={} main-frame={} draw={draw} \
             recovery={} span={:.1}µs deadline={missed}",
            s.frame_number,
            s.sequence,
            s.action_count,
            s.sent_begin_main_frame,
            s.recovery.name(),
            self.dur_us(s.finished_at.saturating_duration_since(s.began_at)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::args::FrameArgs;
    use cadence_core::client::DrawResult;
    use cadence_core::state_machine::Action;
    use cadence_core::trace::{BeginFrameDisposition, Scope};

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_writer()).unwrap()
    }

    #[test]
    fn begin_frame_line() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::NANOS);
        let args = FrameArgs::new(3, HostTime(1_000_000), HostTime(17_000_000), Duration(16_000_000))
            .missed();
        sink.on_begin_frame(&BeginFrameEvent::new(
            &args,
            BeginFrameDisposition::DroppedMissed,
            HostTime(18_000_000),
        ));
        let out = output(sink);
        assert!(out.starts_with("[begin-frame] seq=3"), "got: {out}");
        assert!(out.contains("MISSED -> DroppedMissed"), "got: {out}");
    }

    #[test]
    fn action_line_includes_draw_result() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::NANOS);
        sink.on_action(&ActionEvent {
            frame_number: 2,
            action: Action::DrawIfPossible,
            started: HostTime(1_000),
            finished: HostTime(3_000),
            draw_result: Some(DrawResult::Success),
        });
        let out = output(sink);
        assert!(out.contains("DrawIfPossible 1.0µs..3.0µs"), "got: {out}");
        assert!(out.contains("result=Success"), "got: {out}");
    }

    #[test]
    fn scopes_are_opt_in() {
        let scope = ScopeBeginEvent {
            frame_number: 1,
            scope: Scope::Deadline,
            timestamp: HostTime(0),
        };
        let mut quiet = PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::NANOS);
        quiet.on_scope_begin(&scope);
        assert!(output(quiet).is_empty(), "scopes hidden by default");

        let mut loud =
            PrettyPrintSink::with_writer(Vec::<u8>::new(), Timebase::NANOS).with_scopes(true);
        loud.on_scope_begin(&scope);
        let out = output(loud);
        assert!(out.contains("[scope:begin] frame=1 Deadline"), "got: {out}");
    }
}
