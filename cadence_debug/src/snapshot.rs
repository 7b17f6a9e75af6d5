// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON rendering of [`SchedulerSnapshot`] for diagnostics dumps.
//!
//! The layout mirrors the snapshot structs field for field. Enum values are
//! rendered with their `Debug` names and times as microseconds. Like the
//! snapshot itself, the output is not a stable format.

use serde_json::{Value, json};

use cadence_core::SchedulerSnapshot;
use cadence_core::args::FrameArgs;
use cadence_core::state_machine::StateSnapshot;
use cadence_core::time::{Duration, HostTime, Timebase};
use cadence_core::timing_history::Estimates;

/// Renders a scheduler snapshot as a JSON object.
#[must_use]
pub fn to_json(snapshot: &SchedulerSnapshot, timebase: Timebase) -> Value {
    json!({
        "stopped": snapshot.stopped,
        "observing": snapshot.observing,
        "deadline_mode": snapshot.deadline_mode.name(),
        "armed_deadline_us": snapshot.armed_deadline.map(|t| time_us(t, timebase)),
        "pending_begin_frame": snapshot.pending_begin_frame.map(|a| args_json(&a, timebase)),
        "begin_impl_frame_args": snapshot.begin_impl_frame_args.map(|a| args_json(&a, timebase)),
        "adjusted_deadline_us": snapshot.adjusted_deadline.map(|t| time_us(t, timebase)),
        "producer_skipped_last_frame": snapshot.producer_skipped_last_frame,
        "recording_enabled": snapshot.recording_enabled,
        "state": state_json(&snapshot.state),
        "estimates": estimates_json(&snapshot.estimates, timebase),
    })
}

fn args_json(args: &FrameArgs, timebase: Timebase) -> Value {
    json!({
        "sequence": args.sequence,
        "frame_time_us": time_us(args.frame_time, timebase),
        "deadline_us": time_us(args.deadline, timebase),
        "interval_us": duration_us(args.interval, timebase),
        "kind": format!("{:?}", args.kind),
        "on_critical_path": args.on_critical_path,
    })
}

fn state_json(s: &StateSnapshot) -> Value {
    json!({
        "begin_impl_frame_state": format!("{:?}", s.begin_impl_frame_state),
        "begin_main_frame_state": format!("{:?}", s.begin_main_frame_state),
        "surface_state": format!("{:?}", s.surface_state),
        "forced_redraw_state": format!("{:?}", s.forced_redraw_state),
        "deadline_mode": s.deadline_mode.name(),
        "current_frame_number": s.current_frame_number,
        "consecutive_checkerboard_animations": s.consecutive_checkerboard_animations,
        "pending_submit_frames": s.pending_submit_frames,
        "needs_redraw": s.needs_redraw,
        "needs_prepare_tiles": s.needs_prepare_tiles,
        "needs_begin_main_frame": s.needs_begin_main_frame,
        "needs_one_begin_impl_frame": s.needs_one_begin_impl_frame,
        "visible": s.visible,
        "begin_frame_source_paused": s.begin_frame_source_paused,
        "can_draw": s.can_draw,
        "defer_commits": s.defer_commits,
        "has_pending_tree": s.has_pending_tree,
        "pending_tree_is_ready_for_activation": s.pending_tree_is_ready_for_activation,
        "active_tree_needs_first_draw": s.active_tree_needs_first_draw,
        "awaiting_ready_to_draw": s.awaiting_ready_to_draw,
        "main_thread_missed_last_deadline": s.main_thread_missed_last_deadline,
        "skip_next_begin_main_frame_to_reduce_latency":
            s.skip_next_begin_main_frame_to_reduce_latency,
        "critical_begin_main_frame_to_activate_is_fast":
            s.critical_begin_main_frame_to_activate_is_fast,
        "tree_priority": format!("{:?}", s.tree_priority),
        "scroll_handler_state": format!("{:?}", s.scroll_handler_state),
    })
}

fn estimates_json(e: &Estimates, timebase: Timebase) -> Value {
    json!({
        "begin_main_frame_queue_critical_us":
            duration_us(e.begin_main_frame_queue_critical, timebase),
        "begin_main_frame_queue_not_critical_us":
            duration_us(e.begin_main_frame_queue_not_critical, timebase),
        "begin_main_frame_start_to_commit_us":
            duration_us(e.begin_main_frame_start_to_commit, timebase),
        "commit_to_ready_to_activate_us": duration_us(e.commit_to_ready_to_activate, timebase),
        "prepare_tiles_us": duration_us(e.prepare_tiles, timebase),
        "activate_us": duration_us(e.activate, timebase),
        "draw_us": duration_us(e.draw, timebase),
        "submit_to_ack_us": duration_us(e.submit_to_ack, timebase),
    })
}

fn time_us(t: HostTime, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(t.ticks()) as f64 / 1000.0
}

fn duration_us(d: Duration, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(d.ticks()) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::SchedulerSettings;
    use cadence_core::state_machine::{DeadlineMode, PipelineStateMachine};
    use cadence_core::timing_history::TimingHistory;

    fn idle_snapshot() -> SchedulerSnapshot {
        SchedulerSnapshot {
            stopped: false,
            observing: true,
            deadline_mode: DeadlineMode::Regular,
            armed_deadline: Some(HostTime(9_000_000)),
            pending_begin_frame: None,
            begin_impl_frame_args: Some(FrameArgs::new(
                5,
                HostTime(1_000_000),
                HostTime(17_000_000),
                Duration(16_000_000),
            )),
            adjusted_deadline: Some(HostTime(9_000_000)),
            producer_skipped_last_frame: false,
            recording_enabled: true,
            state: PipelineStateMachine::new(SchedulerSettings::new()).snapshot(),
            estimates: TimingHistory::new().estimates(),
        }
    }

    #[test]
    fn renders_times_in_microseconds() {
        let json = to_json(&idle_snapshot(), Timebase::NANOS);
        assert_eq!(json["deadline_mode"], "Regular");
        assert_eq!(json["armed_deadline_us"], 9000.0);
        assert_eq!(json["begin_impl_frame_args"]["sequence"], 5);
        assert_eq!(json["begin_impl_frame_args"]["interval_us"], 16000.0);
        assert!(json["pending_begin_frame"].is_null());
    }

    #[test]
    fn includes_state_machine_fields() {
        let json = to_json(&idle_snapshot(), Timebase::NANOS);
        assert_eq!(json["state"]["begin_impl_frame_state"], "Idle");
        assert_eq!(json["state"]["surface_state"], "None");
        assert_eq!(json["state"]["pending_submit_frames"], 0);
        assert_eq!(json["estimates"]["draw_us"], 0.0);
    }
}
