// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Scopes become duration (`B`/`E`) events and actions become complete
//! (`X`) events on the consumer track. Frame arrivals, deadline plans,
//! arming, stage samples, observation changes, and frame summaries become
//! instant events carrying their fields as `args`.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use cadence_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Track for scopes and actions.
const TID_CONSUMER: u32 = 0;
/// Track for frame source traffic.
const TID_SOURCE: u32 = 1;
/// Track for timing samples.
const TID_TIMING: u32 = 2;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::ScopeBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": e.scope.name(),
                    "cat": "Scheduler",
                    "ts": ticks_to_us(e.timestamp.ticks(), timebase),
                    "pid": 0,
                    "tid": TID_CONSUMER,
                    "args": {
                        "frame_number": e.frame_number,
                    }
                }));
            }
            RecordedEvent::ScopeEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": e.scope.name(),
                    "cat": "Scheduler",
                    "ts": ticks_to_us(e.timestamp.ticks(), timebase),
                    "pid": 0,
                    "tid": TID_CONSUMER,
                    "args": {
                        "frame_number": e.frame_number,
                    }
                }));
            }
            RecordedEvent::BeginFrame(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "BeginFrame",
                    "cat": "Source",
                    "ts": ticks_to_us(e.now.ticks(), timebase),
                    "pid": 0,
                    "tid": TID_SOURCE,
                    "s": "t",
                    "args": {
                        "sequence": e.sequence,
                        "frame_time_us": ticks_to_us(e.frame_time.ticks(), timebase),
                        "deadline_us": ticks_to_us(e.deadline.ticks(), timebase),
                        "interval_us": ticks_to_us(e.interval.ticks(), timebase),
                        "missed": e.missed,
                        "disposition": e.disposition.name(),
                    }
                }));
            }
            RecordedEvent::DeadlinePlan(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "DeadlinePlan",
                    "cat": "Scheduler",
                    "ts": ticks_to_us(e.now.ticks(), timebase),
                    "pid": 0,
                    "tid": TID_CONSUMER,
                    "s": "t",
                    "args": {
                        "frame_number": e.frame_number,
                        "deadline_us": ticks_to_us(e.deadline.ticks(), timebase),
                        "adjusted_deadline_us": ticks_to_us(e.adjusted_deadline.ticks(), timebase),
                        "draw_estimate_us": ticks_to_us(e.draw_estimate.ticks(), timebase),
                        "begin_main_frame_to_activate_us":
                            ticks_to_us(e.begin_main_frame_to_activate.ticks(), timebase),
                        "begin_main_frame_to_activate_with_queue_us":
                            ticks_to_us(e.begin_main_frame_to_activate_with_queue.ticks(), timebase),
                        "on_critical_path": e.on_critical_path,
                        "can_finish_before_deadline": e.can_finish_before_deadline,
                        "recovery": e.recovery.name(),
                    }
                }));
            }
            RecordedEvent::Action(e) => {
                let started = ticks_to_us(e.started.ticks(), timebase);
                let finished = ticks_to_us(e.finished.ticks(), timebase);
                events.push(json!({
                    "ph": "X",
                    "name": e.action.name(),
                    "cat": "Action",
                    "ts": started,
                    "dur": (finished - started).max(0.0),
                    "pid": 0,
                    "tid": TID_CONSUMER,
                    "args": {
                        "frame_number": e.frame_number,
                        "draw_result": e.draw_result.map(|r| format!("{r:?}")),
                    }
                }));
            }
            RecordedEvent::DeadlineArmed(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "DeadlineArmed",
                    "cat": "Scheduler",
                    "ts": ticks_to_us(e.now.ticks(), timebase),
                    "pid": 0,
                    "tid": TID_CONSUMER,
                    "s": "t",
                    "args": {
                        "frame_number": e.frame_number,
                        "mode": e.mode.name(),
                        "at_us": e.at.map(|t| ticks_to_us(t.ticks(), timebase)),
                    }
                }));
            }
            RecordedEvent::StageSample(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": e.stage.name(),
                    "cat": "Timing",
                    "ts": ticks_to_us(e.timestamp.ticks(), timebase),
                    "pid": 0,
                    "tid": TID_TIMING,
                    "s": "t",
                    "args": {
                        "frame_number": e.frame_number,
                        "duration_us": ticks_to_us(e.duration.ticks(), timebase),
                        "recorded": e.recorded,
                    }
                }));
            }
            RecordedEvent::Observation(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": if e.observing { "Subscribe" } else { "Unsubscribe" },
                    "cat": "Source",
                    "ts": ticks_to_us(e.timestamp.ticks(), timebase),
                    "pid": 0,
                    "tid": TID_SOURCE,
                    "s": "p",
                }));
            }
            RecordedEvent::FrameSummary(s) => {
                events.push(json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": ticks_to_us(s.finished_at.ticks(), timebase),
                    "pid": 0,
                    "tid": TID_CONSUMER,
                    "s": "g",
                    "args": {
                        "frame_number": s.frame_number,
                        "sequence": s.sequence,
                        "frame_time_us": ticks_to_us(s.frame_time.ticks(), timebase),
                        "deadline_us": ticks_to_us(s.deadline.ticks(), timebase),
                        "adjusted_deadline_us":
                            s.adjusted_deadline.map(|t| ticks_to_us(t.ticks(), timebase)),
                        "deadline_fired_us":
                            s.deadline_fired_at.map(|t| ticks_to_us(t.ticks(), timebase)),
                        "span_us": ticks_to_us(
                            s.finished_at.saturating_duration_since(s.began_at).ticks(),
                            timebase,
                        ),
                        "recovery": s.recovery.name(),
                        "action_count": s.action_count,
                        "sent_begin_main_frame": s.sent_begin_main_frame,
                        "draw_result": s.draw_result.map(|r| format!("{r:?}")),
                        "missed_deadline": s.missed_deadline,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use cadence_core::client::DrawResult;
    use cadence_core::state_machine::{Action, DeadlineMode};
    use cadence_core::time::HostTime;
    use cadence_core::trace::{
        ActionEvent, DeadlineArmedEvent, Scope, ScopeBeginEvent, ScopeEndEvent, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_scope_begin(&ScopeBeginEvent {
            frame_number: 1,
            scope: Scope::Deadline,
            timestamp: HostTime(1_000_000),
        });
        rec.on_action(&ActionEvent {
            frame_number: 1,
            action: Action::DrawIfPossible,
            started: HostTime(1_000_000),
            finished: HostTime(1_500_000),
            draw_result: Some(DrawResult::Success),
        });
        rec.on_scope_end(&ScopeEndEvent {
            frame_number: 1,
            scope: Scope::Deadline,
            timestamp: HostTime(1_600_000),
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 3);

        assert_eq!(parsed[0]["ph"], "B");
        assert_eq!(parsed[0]["name"], "Deadline");

        assert_eq!(parsed[1]["ph"], "X");
        assert_eq!(parsed[1]["name"], "DrawIfPossible");
        assert_eq!(parsed[1]["ts"], 1000.0);
        assert_eq!(parsed[1]["dur"], 500.0);
        assert_eq!(parsed[1]["args"]["draw_result"], "Success");

        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["name"], "Deadline");
    }

    #[test]
    fn unarmed_deadline_exports_null_time() {
        let mut rec = RecorderSink::new();
        rec.on_deadline_armed(&DeadlineArmedEvent {
            frame_number: 4,
            mode: DeadlineMode::None,
            at: None,
            now: HostTime(2_000),
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), Timebase::NANOS, &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["args"]["mode"], "None");
        assert!(parsed[0]["args"]["at_us"].is_null());
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], Timebase::NANOS, &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
