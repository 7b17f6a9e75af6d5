// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-stage duration tracking and percentile estimates.
//!
//! [`TimingHistory`] turns start/end timestamps reported for each pipeline
//! stage into [`RollingTimeDeltaHistory`] samples and answers "how long will
//! this stage probably take" with the [`ESTIMATION_PERCENTILE`]th percentile
//! of recent samples.
//!
//! Stages are reported as `will_*` / `did_*` pairs. A `did_*` without a
//! matching `will_*` (or a second `will_*` before the `did_*`) is a bug in
//! the caller; debug builds assert, release builds ignore the call.
//!
//! Producer work is split into two measured intervals:
//!
//! ```text
//!   will_begin_main_frame ── queue ──► begin_main_frame_started ── start-to-commit ──► will_commit
//!                                                                                         │
//!   ready_to_activate ◄──────────── commit-to-activate ────────────── did_commit ◄────────┘
//! ```
//!
//! Queue durations are additionally split by whether the producer update was
//! on the critical path; see [`TimingHistory::begin_main_frame_queue_critical_estimate`].

use alloc::collections::VecDeque;

use crate::history::RollingTimeDeltaHistory;
use crate::time::{Duration, HostTime};

/// Number of samples retained per stage.
pub const DURATION_HISTORY_SIZE: usize = 60;

/// Percentile used for every stage estimate.
pub const ESTIMATION_PERCENTILE: f64 = 90.0;

/// A measured pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// From sending a producer update to the producer starting it.
    BeginMainFrameQueue,
    /// From the producer starting an update to the commit starting.
    BeginMainFrameStartToCommit,
    /// The commit itself (reported, not estimated).
    Commit,
    /// From commit completion to the pending tree being ready to activate.
    CommitToReadyToActivate,
    /// Pending-tree activation.
    Activate,
    /// Tile preparation.
    PrepareTiles,
    /// Drawing a frame.
    Draw,
    /// From submitting a frame to its acknowledgement.
    SubmitToAck,
}

impl Stage {
    /// A stable display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BeginMainFrameQueue => "BeginMainFrameQueue",
            Self::BeginMainFrameStartToCommit => "BeginMainFrameStartToCommit",
            Self::Commit => "Commit",
            Self::CommitToReadyToActivate => "CommitToReadyToActivate",
            Self::Activate => "Activate",
            Self::PrepareTiles => "PrepareTiles",
            Self::Draw => "Draw",
            Self::SubmitToAck => "SubmitToAck",
        }
    }
}

/// One measured stage duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageSample {
    /// Which stage was measured.
    pub stage: Stage,
    /// Measured duration.
    pub duration: Duration,
    /// Whether the sample was added to a history (recording was enabled and
    /// the stage has one).
    pub recorded: bool,
}

/// Durations measured when a producer update ends (commit or abort).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MainFrameSample {
    /// Time spent queued before the producer started.
    pub queue: Duration,
    /// Time from the producer starting to the commit starting (or the abort).
    pub start_to_commit: Duration,
    /// Whether the update was sent on the critical path.
    pub on_critical_path: bool,
    /// Whether the samples were added to the histories.
    pub recorded: bool,
}

/// Snapshot of every estimate, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Estimates {
    /// [`TimingHistory::begin_main_frame_queue_critical_estimate`].
    pub begin_main_frame_queue_critical: Duration,
    /// [`TimingHistory::begin_main_frame_queue_not_critical_estimate`].
    pub begin_main_frame_queue_not_critical: Duration,
    /// [`TimingHistory::begin_main_frame_start_to_commit_estimate`].
    pub begin_main_frame_start_to_commit: Duration,
    /// [`TimingHistory::commit_to_ready_to_activate_estimate`].
    pub commit_to_ready_to_activate: Duration,
    /// [`TimingHistory::prepare_tiles_estimate`].
    pub prepare_tiles: Duration,
    /// [`TimingHistory::activate_estimate`].
    pub activate: Duration,
    /// [`TimingHistory::draw_estimate`].
    pub draw: Duration,
    /// [`TimingHistory::submit_to_ack_estimate`].
    pub submit_to_ack: Duration,
}

/// Rolling duration histories for every pipeline stage.
#[derive(Clone, Debug)]
pub struct TimingHistory {
    recording_enabled: bool,

    begin_main_frame_queue: RollingTimeDeltaHistory,
    begin_main_frame_queue_critical: RollingTimeDeltaHistory,
    begin_main_frame_queue_not_critical: RollingTimeDeltaHistory,
    begin_main_frame_start_to_commit: RollingTimeDeltaHistory,
    commit_to_ready_to_activate: RollingTimeDeltaHistory,
    prepare_tiles: RollingTimeDeltaHistory,
    activate: RollingTimeDeltaHistory,
    draw: RollingTimeDeltaHistory,
    submit_to_ack: RollingTimeDeltaHistory,

    begin_main_frame_on_critical_path: bool,
    begin_main_frame_sent_time: Option<HostTime>,
    begin_main_frame_start_time: Option<HostTime>,
    commit_start_time: Option<HostTime>,
    commit_end_time: Option<HostTime>,
    activate_start_time: Option<HostTime>,
    prepare_tiles_start_time: Option<HostTime>,
    draw_start_time: Option<HostTime>,
    submit_times: VecDeque<HostTime>,
}

impl Default for TimingHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingHistory {
    /// Creates an empty history with recording disabled.
    #[must_use]
    pub fn new() -> Self {
        let history = || RollingTimeDeltaHistory::new(DURATION_HISTORY_SIZE);
        Self {
            recording_enabled: false,
            begin_main_frame_queue: history(),
            begin_main_frame_queue_critical: history(),
            begin_main_frame_queue_not_critical: history(),
            begin_main_frame_start_to_commit: history(),
            commit_to_ready_to_activate: history(),
            prepare_tiles: history(),
            activate: history(),
            draw: history(),
            submit_to_ack: history(),
            begin_main_frame_on_critical_path: false,
            begin_main_frame_sent_time: None,
            begin_main_frame_start_time: None,
            commit_start_time: None,
            commit_end_time: None,
            activate_start_time: None,
            prepare_tiles_start_time: None,
            draw_start_time: None,
            submit_times: VecDeque::new(),
        }
    }

    /// Enables or disables adding samples to the histories.
    ///
    /// Intervals are still tracked while disabled, so pairing checks keep
    /// working; only the estimates stop moving.
    pub fn set_recording_enabled(&mut self, enabled: bool) {
        self.recording_enabled = enabled;
    }

    /// Whether measured durations are currently recorded.
    #[must_use]
    pub fn recording_enabled(&self) -> bool {
        self.recording_enabled
    }

    // -- estimates ---------------------------------------------------------

    /// Queue estimate for a critical-path producer update.
    ///
    /// `min(critical, overall)`: never slower than what recent frames of any
    /// class achieved.
    #[must_use]
    pub fn begin_main_frame_queue_critical_estimate(&self) -> Duration {
        let critical = self
            .begin_main_frame_queue_critical
            .percentile(ESTIMATION_PERCENTILE);
        let overall = self.begin_main_frame_queue.percentile(ESTIMATION_PERCENTILE);
        critical.min(overall)
    }

    /// Queue estimate for a producer update off the critical path.
    ///
    /// `max(not_critical, overall)`: never faster than the overall trend.
    #[must_use]
    pub fn begin_main_frame_queue_not_critical_estimate(&self) -> Duration {
        let not_critical = self
            .begin_main_frame_queue_not_critical
            .percentile(ESTIMATION_PERCENTILE);
        let overall = self.begin_main_frame_queue.percentile(ESTIMATION_PERCENTILE);
        not_critical.max(overall)
    }

    /// Estimated time from the producer starting to the commit starting.
    #[must_use]
    pub fn begin_main_frame_start_to_commit_estimate(&self) -> Duration {
        self.begin_main_frame_start_to_commit
            .percentile(ESTIMATION_PERCENTILE)
    }

    /// Estimated time from commit completion to ready-to-activate.
    #[must_use]
    pub fn commit_to_ready_to_activate_estimate(&self) -> Duration {
        self.commit_to_ready_to_activate
            .percentile(ESTIMATION_PERCENTILE)
    }

    /// Estimated tile preparation time.
    #[must_use]
    pub fn prepare_tiles_estimate(&self) -> Duration {
        self.prepare_tiles.percentile(ESTIMATION_PERCENTILE)
    }

    /// Estimated activation time.
    #[must_use]
    pub fn activate_estimate(&self) -> Duration {
        self.activate.percentile(ESTIMATION_PERCENTILE)
    }

    /// Estimated draw time.
    #[must_use]
    pub fn draw_estimate(&self) -> Duration {
        self.draw.percentile(ESTIMATION_PERCENTILE)
    }

    /// Estimated submit-to-ack latency.
    #[must_use]
    pub fn submit_to_ack_estimate(&self) -> Duration {
        self.submit_to_ack.percentile(ESTIMATION_PERCENTILE)
    }

    /// All estimates at once.
    #[must_use]
    pub fn estimates(&self) -> Estimates {
        Estimates {
            begin_main_frame_queue_critical: self.begin_main_frame_queue_critical_estimate(),
            begin_main_frame_queue_not_critical: self
                .begin_main_frame_queue_not_critical_estimate(),
            begin_main_frame_start_to_commit: self.begin_main_frame_start_to_commit_estimate(),
            commit_to_ready_to_activate: self.commit_to_ready_to_activate_estimate(),
            prepare_tiles: self.prepare_tiles_estimate(),
            activate: self.activate_estimate(),
            draw: self.draw_estimate(),
            submit_to_ack: self.submit_to_ack_estimate(),
        }
    }

    // -- producer update ---------------------------------------------------

    /// A producer update is being sent.
    pub fn will_begin_main_frame(&mut self, now: HostTime, on_critical_path: bool) {
        debug_assert!(
            self.begin_main_frame_sent_time.is_none(),
            "will_begin_main_frame while a producer update is already in flight"
        );
        self.begin_main_frame_on_critical_path = on_critical_path;
        self.begin_main_frame_sent_time = Some(now);
        self.begin_main_frame_start_time = None;
    }

    /// The producer started working on the update at `main_thread_start_time`.
    pub fn begin_main_frame_started(&mut self, main_thread_start_time: HostTime) {
        debug_assert!(
            self.begin_main_frame_sent_time.is_some(),
            "begin_main_frame_started without will_begin_main_frame"
        );
        self.begin_main_frame_start_time = Some(main_thread_start_time);
    }

    /// The producer finished without a commit.
    pub fn begin_main_frame_aborted(&mut self, now: HostTime) -> Option<MainFrameSample> {
        self.finish_begin_main_frame(now)
    }

    /// The commit of the current producer update is starting.
    pub fn will_commit(&mut self, now: HostTime) -> Option<MainFrameSample> {
        debug_assert!(
            self.commit_start_time.is_none(),
            "will_commit while a commit is already in flight"
        );
        self.commit_start_time = Some(now);
        self.finish_begin_main_frame(now)
    }

    /// The commit finished.
    pub fn did_commit(&mut self, now: HostTime) -> Option<StageSample> {
        debug_assert!(
            self.commit_start_time.is_some(),
            "did_commit without will_commit"
        );
        let start = self.commit_start_time.take()?;
        self.commit_end_time = Some(now);
        Some(StageSample {
            stage: Stage::Commit,
            duration: now.saturating_duration_since(start),
            recorded: false,
        })
    }

    fn finish_begin_main_frame(&mut self, now: HostTime) -> Option<MainFrameSample> {
        debug_assert!(
            self.begin_main_frame_sent_time.is_some(),
            "producer update finished without will_begin_main_frame"
        );
        let sent = self.begin_main_frame_sent_time.take()?;
        // A producer that never reported its start is treated as having
        // started immediately.
        let start = self.begin_main_frame_start_time.take().unwrap_or(sent);
        let queue = start.saturating_duration_since(sent);
        let start_to_commit = now.saturating_duration_since(start);
        let on_critical_path = self.begin_main_frame_on_critical_path;

        if self.recording_enabled {
            self.begin_main_frame_queue.insert_sample(queue);
            if on_critical_path {
                self.begin_main_frame_queue_critical.insert_sample(queue);
            } else {
                self.begin_main_frame_queue_not_critical.insert_sample(queue);
            }
            self.begin_main_frame_start_to_commit
                .insert_sample(start_to_commit);
        }

        Some(MainFrameSample {
            queue,
            start_to_commit,
            on_critical_path,
            recorded: self.recording_enabled,
        })
    }

    // -- activation ----------------------------------------------------------

    /// The pending tree became ready to activate.
    ///
    /// Only the first signal after a commit is measured.
    pub fn ready_to_activate(&mut self, now: HostTime) -> Option<StageSample> {
        let commit_end = self.commit_end_time.take()?;
        let duration = now.saturating_duration_since(commit_end);
        Some(self.record(Stage::CommitToReadyToActivate, duration))
    }

    /// Activation is starting.
    pub fn will_activate(&mut self, now: HostTime) {
        debug_assert!(
            self.activate_start_time.is_none(),
            "will_activate while an activation is in flight"
        );
        self.activate_start_time = Some(now);
    }

    /// Activation finished.
    pub fn did_activate(&mut self, now: HostTime) -> Option<StageSample> {
        debug_assert!(
            self.activate_start_time.is_some(),
            "did_activate without will_activate"
        );
        let start = self.activate_start_time.take()?;
        Some(self.record(Stage::Activate, now.saturating_duration_since(start)))
    }

    // -- tiles ---------------------------------------------------------------

    /// Tile preparation is starting.
    pub fn will_prepare_tiles(&mut self, now: HostTime) {
        debug_assert!(
            self.prepare_tiles_start_time.is_none(),
            "will_prepare_tiles while tile preparation is in flight"
        );
        self.prepare_tiles_start_time = Some(now);
    }

    /// Whether a tile preparation interval is open.
    #[must_use]
    pub fn prepare_tiles_in_flight(&self) -> bool {
        self.prepare_tiles_start_time.is_some()
    }

    /// Tile preparation finished.
    pub fn did_prepare_tiles(&mut self, now: HostTime) -> Option<StageSample> {
        debug_assert!(
            self.prepare_tiles_start_time.is_some(),
            "did_prepare_tiles without will_prepare_tiles"
        );
        let start = self.prepare_tiles_start_time.take()?;
        Some(self.record(Stage::PrepareTiles, now.saturating_duration_since(start)))
    }

    // -- draw ----------------------------------------------------------------

    /// A draw is starting.
    pub fn will_draw(&mut self, now: HostTime) {
        debug_assert!(
            self.draw_start_time.is_none(),
            "will_draw while a draw is in flight"
        );
        self.draw_start_time = Some(now);
    }

    /// The draw finished.
    pub fn did_draw(&mut self, now: HostTime) -> Option<StageSample> {
        debug_assert!(self.draw_start_time.is_some(), "did_draw without will_draw");
        let start = self.draw_start_time.take()?;
        Some(self.record(Stage::Draw, now.saturating_duration_since(start)))
    }

    /// The draw was abandoned; nothing is recorded.
    pub fn draw_aborted(&mut self) {
        self.draw_start_time = None;
    }

    // -- submission ------------------------------------------------------------

    /// A frame was submitted.
    pub fn did_submit_compositor_frame(&mut self, now: HostTime) {
        self.submit_times.push_back(now);
    }

    /// The oldest outstanding submitted frame was acknowledged.
    pub fn did_receive_compositor_frame_ack(&mut self, now: HostTime) -> Option<StageSample> {
        debug_assert!(
            !self.submit_times.is_empty(),
            "frame ack without a submitted frame"
        );
        let submitted = self.submit_times.pop_front()?;
        Some(self.record(Stage::SubmitToAck, now.saturating_duration_since(submitted)))
    }

    /// Forgets outstanding submissions, e.g. after the surface was lost.
    pub fn clear_pending_submissions(&mut self) {
        self.submit_times.clear();
    }

    fn record(&mut self, stage: Stage, duration: Duration) -> StageSample {
        let history = match stage {
            Stage::CommitToReadyToActivate => Some(&mut self.commit_to_ready_to_activate),
            Stage::Activate => Some(&mut self.activate),
            Stage::PrepareTiles => Some(&mut self.prepare_tiles),
            Stage::Draw => Some(&mut self.draw),
            Stage::SubmitToAck => Some(&mut self.submit_to_ack),
            Stage::BeginMainFrameQueue | Stage::BeginMainFrameStartToCommit | Stage::Commit => {
                None
            }
        };
        let recorded = match history {
            Some(history) if self.recording_enabled => {
                history.insert_sample(duration);
                true
            }
            _ => false,
        };
        StageSample {
            stage,
            duration,
            recorded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn at(v: u64) -> HostTime {
        HostTime(0) + ms(v)
    }

    fn recording() -> TimingHistory {
        let mut history = TimingHistory::new();
        history.set_recording_enabled(true);
        history
    }

    /// Runs one producer update: sent at `t`, started after `queue`, commit
    /// after `work`.
    fn producer_update(
        history: &mut TimingHistory,
        t: u64,
        queue: u64,
        work: u64,
        critical: bool,
    ) -> MainFrameSample {
        history.will_begin_main_frame(at(t), critical);
        history.begin_main_frame_started(at(t + queue));
        let sample = history.will_commit(at(t + queue + work));
        history.did_commit(at(t + queue + work));
        sample.expect("paired producer update yields a sample")
    }

    #[test]
    fn empty_history_estimates_zero() {
        let history = TimingHistory::new();
        assert_eq!(history.estimates(), Estimates::default());
    }

    #[test]
    fn producer_update_splits_queue_and_work() {
        let mut history = recording();
        let sample = producer_update(&mut history, 100, 3, 7, true);
        assert_eq!(sample.queue, ms(3));
        assert_eq!(sample.start_to_commit, ms(7));
        assert!(sample.recorded, "recording was enabled");
        assert_eq!(history.begin_main_frame_queue_critical_estimate(), ms(3));
        assert_eq!(history.begin_main_frame_start_to_commit_estimate(), ms(7));
    }

    #[test]
    fn unreported_start_counts_as_immediate() {
        let mut history = recording();
        history.will_begin_main_frame(at(10), true);
        let sample = history.will_commit(at(14)).expect("paired");
        assert_eq!(sample.queue, Duration::ZERO, "no queue time observed");
        assert_eq!(sample.start_to_commit, ms(4));
    }

    #[test]
    fn critical_estimate_is_capped_by_overall() {
        let mut history = recording();
        // A slow critical frame long ago, then many fast non-critical ones.
        producer_update(&mut history, 0, 12, 1, true);
        for i in 0..20 {
            producer_update(&mut history, 100 + i * 20, 1, 1, false);
        }
        // Overall p90 is 1ms (20 of 21 samples), critical-only p90 is 12ms.
        assert_eq!(
            history.begin_main_frame_queue_critical_estimate(),
            ms(1),
            "critical estimate falls back to the faster overall trend"
        );
    }

    #[test]
    fn not_critical_estimate_is_floored_by_overall() {
        let mut history = recording();
        producer_update(&mut history, 0, 1, 1, false);
        for i in 0..20 {
            producer_update(&mut history, 100 + i * 20, 9, 1, true);
        }
        assert_eq!(
            history.begin_main_frame_queue_not_critical_estimate(),
            ms(9),
            "not-critical estimate never undercuts the overall trend"
        );
        assert_eq!(history.begin_main_frame_queue_critical_estimate(), ms(9));
    }

    #[test]
    fn disabled_recording_tracks_but_does_not_record() {
        let mut history = TimingHistory::new();
        history.will_draw(at(0));
        let sample = history.did_draw(at(6)).expect("paired draw");
        assert_eq!(sample.duration, ms(6));
        assert!(!sample.recorded, "recording disabled");
        assert_eq!(history.draw_estimate(), Duration::ZERO);

        history.set_recording_enabled(true);
        history.will_draw(at(10));
        history.did_draw(at(15));
        assert_eq!(history.draw_estimate(), ms(5));
    }

    #[test]
    fn ready_to_activate_measures_from_commit_end_once() {
        let mut history = recording();
        producer_update(&mut history, 0, 1, 2, true);
        let sample = history.ready_to_activate(at(7)).expect("after commit");
        assert_eq!(sample.stage, Stage::CommitToReadyToActivate);
        assert_eq!(sample.duration, ms(4), "commit ended at 3ms");
        assert!(
            history.ready_to_activate(at(9)).is_none(),
            "second readiness signal is ignored"
        );
        assert_eq!(history.commit_to_ready_to_activate_estimate(), ms(4));
    }

    #[test]
    fn activate_prepare_tiles_and_draw_pairs() {
        let mut history = recording();
        history.will_activate(at(0));
        history.did_activate(at(2));
        history.will_prepare_tiles(at(2));
        assert!(history.prepare_tiles_in_flight(), "interval open");
        history.did_prepare_tiles(at(5));
        assert!(!history.prepare_tiles_in_flight(), "interval closed");
        history.will_draw(at(5));
        history.did_draw(at(9));
        let estimates = history.estimates();
        assert_eq!(estimates.activate, ms(2));
        assert_eq!(estimates.prepare_tiles, ms(3));
        assert_eq!(estimates.draw, ms(4));
    }

    #[test]
    fn aborted_draw_records_nothing() {
        let mut history = recording();
        history.will_draw(at(0));
        history.draw_aborted();
        history.will_draw(at(1));
        history.did_draw(at(3));
        assert_eq!(history.draw_estimate(), ms(2), "only the finished draw");
    }

    #[test]
    fn submissions_are_acked_in_order() {
        let mut history = recording();
        history.did_submit_compositor_frame(at(0));
        history.did_submit_compositor_frame(at(16));
        let first = history.did_receive_compositor_frame_ack(at(20)).expect("ack");
        let second = history.did_receive_compositor_frame_ack(at(30)).expect("ack");
        assert_eq!(first.duration, ms(20), "oldest submission acked first");
        assert_eq!(second.duration, ms(14));
    }

    #[test]
    fn aborted_producer_update_is_recorded() {
        let mut history = recording();
        history.will_begin_main_frame(at(0), false);
        history.begin_main_frame_started(at(2));
        let sample = history.begin_main_frame_aborted(at(3)).expect("paired");
        assert_eq!(sample.queue, ms(2));
        assert!(!sample.on_critical_path, "class is carried through");
        assert_eq!(history.begin_main_frame_queue_not_critical_estimate(), ms(2));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "did_draw without will_draw")]
    fn unmatched_did_is_a_contract_violation() {
        let mut history = TimingHistory::new();
        let _ = history.did_draw(at(1));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "will_prepare_tiles while tile preparation is in flight")]
    fn repeated_will_is_a_contract_violation() {
        let mut history = TimingHistory::new();
        history.will_prepare_tiles(at(0));
        history.will_prepare_tiles(at(1));
    }
}
