// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host-facing callback interface.
//!
//! The scheduler drives the pipeline by calling [`SchedulerClient`] methods
//! from inside its action drain. Because the drain holds `&mut` on the
//! scheduler, a callback cannot call back into it. Instead every callback
//! issued from a drain receives a [`Requests`] token; flags set on it are
//! applied to the state machine after the callback returns and before the
//! next action is chosen.

use crate::args::FrameArgs;

/// Outcome of a draw attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawResult {
    /// A frame was drawn and submitted.
    Success,
    /// Drawing would have shown checkerboarded animation content.
    AbortedCheckerboardAnimations,
    /// High-resolution content was not ready.
    AbortedMissingHighResContent,
    /// The host could not draw at all (e.g. no usable surface).
    AbortedCantDraw,
    /// The draw was dropped while the pipeline was draining.
    AbortedDrainingPipeline,
}

/// Why a producer update finished without a commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommitEarlyOutReason {
    /// The surface was lost while the update was in flight.
    AbortedSurfaceLost,
    /// The output became invisible.
    AbortedNotVisible,
    /// Commits are currently deferred.
    AbortedDeferredCommit,
    /// The producer ran but had nothing new to commit.
    FinishedNoUpdates,
}

impl CommitEarlyOutReason {
    /// Whether the producer update actually ran to completion.
    #[must_use]
    pub const fn main_frame_ran(self) -> bool {
        matches!(self, Self::FinishedNoUpdates)
    }
}

/// Work requests raised by a client callback during an action drain.
///
/// Only the scheduler can create one; a callback receives `&mut Requests`
/// and may set any of its flags.
#[derive(Debug)]
pub struct Requests {
    pub(crate) needs_redraw: bool,
    pub(crate) needs_begin_main_frame: bool,
    pub(crate) needs_prepare_tiles: bool,
    pub(crate) needs_one_begin_impl_frame: bool,
    pub(crate) submitted_frames: u32,
}

impl Requests {
    pub(crate) const fn new() -> Self {
        Self {
            needs_redraw: false,
            needs_begin_main_frame: false,
            needs_prepare_tiles: false,
            needs_one_begin_impl_frame: false,
            submitted_frames: 0,
        }
    }

    /// Requests another draw.
    pub fn set_needs_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Requests a producer update.
    pub fn set_needs_begin_main_frame(&mut self) {
        self.needs_begin_main_frame = true;
    }

    /// Requests tile preparation.
    pub fn set_needs_prepare_tiles(&mut self) {
        self.needs_prepare_tiles = true;
    }

    /// Requests one more consumer frame even if nothing else is pending.
    pub fn set_needs_one_begin_impl_frame(&mut self) {
        self.needs_one_begin_impl_frame = true;
    }

    /// Reports that the callback submitted a frame.
    ///
    /// Equivalent to calling
    /// [`FrameScheduler::did_submit_compositor_frame`](crate::scheduler::FrameScheduler::did_submit_compositor_frame)
    /// right after the callback returns.
    pub fn did_submit_compositor_frame(&mut self) {
        self.submitted_frames += 1;
    }

    /// Whether nothing was requested or reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.needs_redraw
            || self.needs_begin_main_frame
            || self.needs_prepare_tiles
            || self.needs_one_begin_impl_frame)
            && self.submitted_frames == 0
    }
}

/// Callbacks through which the scheduler drives the host pipeline.
///
/// `scheduled_action_*` methods run the named pipeline step synchronously.
/// Steps that complete asynchronously (the producer update, tile
/// preparation, submit acknowledgement) are reported back through the
/// corresponding [`FrameScheduler`](crate::scheduler::FrameScheduler)
/// methods once the drain has returned.
pub trait SchedulerClient {
    /// A consumer frame is starting with the given args.
    fn will_begin_impl_frame(&mut self, args: &FrameArgs, requests: &mut Requests) {
        _ = (args, requests);
    }

    /// Send a producer update for `args`.
    ///
    /// `args.on_critical_path` tells the producer whether it is expected to
    /// race the current deadline.
    ///
    /// A synchronous scheduler may send an update before it has seen any
    /// BeginFrame. `args` are then synthetic: sequence 0, frame time now, and
    /// [`DEFAULT_INTERVAL`](crate::source::DEFAULT_INTERVAL).
    fn scheduled_action_send_begin_main_frame(&mut self, args: &FrameArgs, requests: &mut Requests);

    /// Commit the producer's output into a pending tree.
    fn scheduled_action_commit(&mut self, requests: &mut Requests);

    /// Make the pending tree the active tree.
    fn scheduled_action_activate_sync_tree(&mut self, requests: &mut Requests);

    /// Draw and submit the active tree if it is complete enough.
    fn scheduled_action_draw_if_possible(&mut self, requests: &mut Requests) -> DrawResult;

    /// Draw and submit the active tree regardless of missing content.
    fn scheduled_action_draw_forced(&mut self, requests: &mut Requests) -> DrawResult;

    /// Start preparing tiles.
    fn scheduled_action_prepare_tiles(&mut self, requests: &mut Requests);

    /// Create a new output surface; report completion with
    /// [`did_create_and_initialize_surface`](crate::scheduler::FrameScheduler::did_create_and_initialize_surface).
    fn scheduled_action_begin_surface_creation(&mut self, requests: &mut Requests);

    /// Ask the embedder to invalidate the surface (synchronous mode only).
    fn scheduled_action_invalidate_surface(&mut self, requests: &mut Requests) {
        _ = requests;
    }

    /// The current consumer frame is over.
    fn did_finish_impl_frame(&mut self, requests: &mut Requests) {
        _ = requests;
    }

    /// The scheduler stopped observing frames and no producer update is
    /// coming; the producer may idle.
    fn send_begin_main_frame_not_expected_soon(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_start_empty() {
        let mut requests = Requests::new();
        assert!(requests.is_empty(), "fresh token carries nothing");
        requests.set_needs_prepare_tiles();
        assert!(!requests.is_empty(), "flag recorded");
        assert!(requests.needs_prepare_tiles);
        assert!(!requests.needs_redraw, "other flags untouched");

        let mut submitted = Requests::new();
        submitted.did_submit_compositor_frame();
        assert!(!submitted.is_empty(), "a submission is reported");
    }

    #[test]
    fn only_no_updates_counts_as_ran() {
        assert!(CommitEarlyOutReason::FinishedNoUpdates.main_frame_ran());
        assert!(!CommitEarlyOutReason::AbortedNotVisible.main_frame_ran());
        assert!(!CommitEarlyOutReason::AbortedDeferredCommit.main_frame_ran());
    }
}
