// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame timing arguments delivered by a begin-frame source.

use crate::time::{Duration, HostTime};

/// How a set of [`FrameArgs`] was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FrameArgsKind {
    /// Delivered on time by the source.
    #[default]
    Normal,
    /// Delivered late, after the tick it describes had already passed
    /// (e.g. because the observer subscribed mid-interval). The scheduler
    /// drops missed frames whose deadline is already behind `now`.
    Missed,
}

/// Timing for one frame cycle.
///
/// Issued by a [`BeginFrameSource`](crate::source::BeginFrameSource) and
/// superseded by the next. The scheduler never mutates the args it receives;
/// it derives adjusted copies (see [`FrameArgs::with_deadline`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameArgs {
    /// The time this frame is nominally for (the vsync / tick time).
    pub frame_time: HostTime,
    /// Latest time by which the frame should be drawn.
    pub deadline: HostTime,
    /// Nominal distance between consecutive frames.
    pub interval: Duration,
    /// Whether this frame arrived on time.
    pub kind: FrameArgsKind,
    /// Monotonically increasing frame number assigned by the source.
    pub sequence: u64,
    /// Whether producer work for this frame is on the critical path.
    ///
    /// Sources issue `true`; the scheduler overrides it on the copy passed
    /// to [`scheduled_action_send_begin_main_frame`](crate::client::SchedulerClient::scheduled_action_send_begin_main_frame).
    pub on_critical_path: bool,
}

impl FrameArgs {
    /// Creates on-time args for the given frame.
    #[must_use]
    pub const fn new(
        sequence: u64,
        frame_time: HostTime,
        deadline: HostTime,
        interval: Duration,
    ) -> Self {
        Self {
            frame_time,
            deadline,
            interval,
            kind: FrameArgsKind::Normal,
            sequence,
            on_critical_path: true,
        }
    }

    /// Returns a copy marked as [`FrameArgsKind::Missed`].
    #[must_use]
    pub const fn missed(self) -> Self {
        Self {
            kind: FrameArgsKind::Missed,
            ..self
        }
    }

    /// Returns a copy with a different deadline.
    #[must_use]
    pub const fn with_deadline(self, deadline: HostTime) -> Self {
        Self { deadline, ..self }
    }

    /// The frame time of the frame after this one.
    #[must_use]
    pub const fn next_frame_time(&self) -> HostTime {
        self.frame_time.saturating_add(self.interval)
    }

    /// Whether these args were delivered late.
    #[must_use]
    pub const fn is_missed(&self) -> bool {
        matches!(self.kind, FrameArgsKind::Missed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_copies_keep_identity() {
        let args = FrameArgs::new(
            9,
            HostTime(1_000),
            HostTime(17_000),
            Duration(16_000),
        );
        let late = args.missed();
        assert!(late.is_missed(), "missed() marks the copy");
        assert!(!args.is_missed(), "original is untouched");
        assert_eq!(late.sequence, 9);

        let adjusted = args.with_deadline(HostTime(10_000));
        assert_eq!(adjusted.deadline, HostTime(10_000));
        assert_eq!(adjusted.frame_time, args.frame_time);
        assert_eq!(args.next_frame_time(), HostTime(17_000));
    }
}
