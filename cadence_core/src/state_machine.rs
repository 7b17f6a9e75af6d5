// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pipeline state machine.
//!
//! [`PipelineStateMachine`] is a pure state container. Hosts (through the
//! scheduler) report lifecycle events with its setters and `will_*` / `did_*`
//! methods, and [`next_action`](PipelineStateMachine::next_action) answers
//! which single [`Action`] should run next. It performs no I/O and never
//! reads a clock.
//!
//! Every `will_*` transition makes its own action ineligible for the rest of
//! the cycle, so a caller that loops "ask, perform, report" until
//! [`Action::None`] always terminates.
//!
//! Phases tracked:
//!
//! ```text
//! impl frame:   Idle ─► InsideBeginFrame ─► InsideDeadline ─► Idle
//! main frame:   Idle ─► Sent ─► Started ─► ReadyToCommit ─► Idle (commit or abort)
//! surface:      None ─► Creating ─► WaitingForFirstCommit ─► WaitingForFirstActivation ─► Active
//! forced draw:  Idle ─► WaitingForCommit ─► WaitingForActivation ─► WaitingForDraw ─► Idle
//! ```

use crate::client::{CommitEarlyOutReason, DrawResult};
use crate::scheduler::SchedulerSettings;

/// One step of the pipeline, as chosen by
/// [`PipelineStateMachine::next_action`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Nothing left to do this cycle.
    None,
    /// Send a producer update (BeginMainFrame).
    SendBeginMainFrame,
    /// Commit the producer's output.
    Commit,
    /// Activate the pending tree.
    ActivateSyncTree,
    /// Draw the active tree if it is complete enough.
    DrawIfPossible,
    /// Draw the active tree unconditionally.
    DrawForced,
    /// Discard the active tree's draw to keep the pipeline moving.
    DrawAbort,
    /// Prepare tiles.
    PrepareTiles,
    /// Create an output surface.
    BeginSurfaceCreation,
    /// Ask the embedder to invalidate the surface (synchronous mode).
    InvalidateSurface,
}

impl Action {
    /// A stable display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::SendBeginMainFrame => "SendBeginMainFrame",
            Self::Commit => "Commit",
            Self::ActivateSyncTree => "ActivateSyncTree",
            Self::DrawIfPossible => "DrawIfPossible",
            Self::DrawForced => "DrawForced",
            Self::DrawAbort => "DrawAbort",
            Self::PrepareTiles => "PrepareTiles",
            Self::BeginSurfaceCreation => "BeginSurfaceCreation",
            Self::InvalidateSurface => "InvalidateSurface",
        }
    }
}

/// Consumer (impl) frame phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BeginImplFrameState {
    /// Between frames.
    Idle,
    /// After a BeginFrame was accepted, before its deadline.
    InsideBeginFrame,
    /// The deadline fired; drawing happens here.
    InsideDeadline,
}

/// Producer (main frame) phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BeginMainFrameState {
    /// No producer update in flight.
    Idle,
    /// An update was sent but has not started.
    Sent,
    /// The producer is working on the update.
    Started,
    /// The update is done and waiting for a commit.
    ReadyToCommit,
}

/// Output surface lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceState {
    /// No surface (never created, or lost).
    None,
    /// Creation was requested.
    Creating,
    /// Created; waiting for the first commit to fill it.
    WaitingForFirstCommit,
    /// First commit done; waiting for its activation.
    WaitingForFirstActivation,
    /// Ready for drawing.
    Active,
}

/// Progress toward a forced redraw after repeated checkerboarded draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ForcedRedrawOnTimeoutState {
    /// No forced redraw pending.
    Idle,
    /// Waiting for fresh content to be committed.
    WaitingForCommit,
    /// Waiting for that commit to activate.
    WaitingForActivation,
    /// The next draw is forced.
    WaitingForDraw,
}

/// When the current frame's deadline should fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeadlineMode {
    /// No deadline (synchronous mode).
    None,
    /// Fire now.
    Immediate,
    /// Fire at the frame's adjusted deadline.
    Regular,
    /// Fire at the start of the next frame interval.
    Late,
    /// Do not fire until the active tree reports ready to draw.
    BlockedOnReadyToDraw,
}

impl DeadlineMode {
    /// A stable display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Immediate => "Immediate",
            Self::Regular => "Regular",
            Self::Late => "Late",
            Self::BlockedOnReadyToDraw => "BlockedOnReadyToDraw",
        }
    }
}

/// Which tree the host currently favours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TreePriority {
    /// No preference.
    #[default]
    SamePriorityForBothTrees,
    /// Keep drawing smoothly (e.g. during a scroll or pinch).
    SmoothnessTakesPriority,
    /// Prefer showing new content.
    NewContentTakesPriority,
}

/// Whether the current scroll is observed by a producer-side handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ScrollHandlerState {
    /// A producer-side scroll handler reacts to the scroll.
    AffectsScrollHandler,
    /// Nothing on the producer side reacts to the scroll.
    #[default]
    DoesNotAffectScrollHandler,
}

/// Plain copy of every state machine field, for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateSnapshot {
    /// Consumer frame phase.
    pub begin_impl_frame_state: BeginImplFrameState,
    /// Producer phase.
    pub begin_main_frame_state: BeginMainFrameState,
    /// Surface lifecycle.
    pub surface_state: SurfaceState,
    /// Forced redraw progress.
    pub forced_redraw_state: ForcedRedrawOnTimeoutState,
    /// Deadline mode for the current state.
    pub deadline_mode: DeadlineMode,
    /// Consumer frames started so far.
    pub current_frame_number: u64,
    /// Consecutive checkerboarded draws.
    pub consecutive_checkerboard_animations: u32,
    /// Submitted frames awaiting acknowledgement.
    pub pending_submit_frames: u32,
    /// A redraw is requested.
    pub needs_redraw: bool,
    /// Tile preparation is requested.
    pub needs_prepare_tiles: bool,
    /// A producer update is requested.
    pub needs_begin_main_frame: bool,
    /// One more consumer frame is requested.
    pub needs_one_begin_impl_frame: bool,
    /// The output is visible.
    pub visible: bool,
    /// The frame source is paused.
    pub begin_frame_source_paused: bool,
    /// Drawing is possible.
    pub can_draw: bool,
    /// Commits are deferred.
    pub defer_commits: bool,
    /// A pending tree exists.
    pub has_pending_tree: bool,
    /// The pending tree reported ready to activate.
    pub pending_tree_is_ready_for_activation: bool,
    /// The active tree has not been drawn since activation.
    pub active_tree_needs_first_draw: bool,
    /// Waiting for the active tree to report ready to draw.
    pub awaiting_ready_to_draw: bool,
    /// The producer missed the last deadline.
    pub main_thread_missed_last_deadline: bool,
    /// The next producer update is skipped to recover latency.
    pub skip_next_begin_main_frame_to_reduce_latency: bool,
    /// The critical producer path fits in a frame.
    pub critical_begin_main_frame_to_activate_is_fast: bool,
    /// Current tree priority.
    pub tree_priority: TreePriority,
    /// Current scroll handler state.
    pub scroll_handler_state: ScrollHandlerState,
}

/// Decides the next pipeline action from reported lifecycle events.
#[derive(Clone, Debug)]
pub struct PipelineStateMachine {
    settings: SchedulerSettings,

    begin_impl_frame_state: BeginImplFrameState,
    begin_main_frame_state: BeginMainFrameState,
    surface_state: SurfaceState,
    forced_redraw_state: ForcedRedrawOnTimeoutState,

    current_frame_number: u64,
    consecutive_checkerboard_animations: u32,
    pending_submit_frames: u32,

    // Per-frame funnels, reset in `on_begin_impl_frame`.
    did_draw: bool,
    did_send_begin_main_frame_for_current_frame: bool,
    did_prepare_tiles: bool,
    did_invalidate_surface: bool,
    did_submit_in_last_frame: bool,

    needs_redraw: bool,
    needs_prepare_tiles: bool,
    needs_begin_main_frame: bool,
    needs_one_begin_impl_frame: bool,

    visible: bool,
    begin_frame_source_paused: bool,
    can_draw: bool,
    defer_commits: bool,
    has_pending_tree: bool,
    pending_tree_is_ready_for_activation: bool,
    active_tree_needs_first_draw: bool,
    awaiting_ready_to_draw: bool,
    did_create_and_initialize_first_surface: bool,
    last_commit_had_no_updates: bool,

    main_thread_missed_last_deadline: bool,
    skip_next_begin_main_frame_to_reduce_latency: bool,
    critical_begin_main_frame_to_activate_is_fast: bool,
    tree_priority: TreePriority,
    scroll_handler_state: ScrollHandlerState,
}

impl PipelineStateMachine {
    /// Creates a state machine with no surface, invisible and unable to draw.
    #[must_use]
    pub fn new(settings: SchedulerSettings) -> Self {
        Self {
            settings,
            begin_impl_frame_state: BeginImplFrameState::Idle,
            begin_main_frame_state: BeginMainFrameState::Idle,
            surface_state: SurfaceState::None,
            forced_redraw_state: ForcedRedrawOnTimeoutState::Idle,
            current_frame_number: 0,
            consecutive_checkerboard_animations: 0,
            pending_submit_frames: 0,
            did_draw: false,
            did_send_begin_main_frame_for_current_frame: false,
            did_prepare_tiles: false,
            did_invalidate_surface: false,
            did_submit_in_last_frame: false,
            needs_redraw: false,
            needs_prepare_tiles: false,
            needs_begin_main_frame: false,
            needs_one_begin_impl_frame: false,
            visible: false,
            begin_frame_source_paused: false,
            can_draw: false,
            defer_commits: false,
            has_pending_tree: false,
            pending_tree_is_ready_for_activation: false,
            active_tree_needs_first_draw: false,
            awaiting_ready_to_draw: false,
            did_create_and_initialize_first_surface: false,
            last_commit_had_no_updates: false,
            main_thread_missed_last_deadline: false,
            skip_next_begin_main_frame_to_reduce_latency: false,
            critical_begin_main_frame_to_activate_is_fast: true,
            tree_priority: TreePriority::default(),
            scroll_handler_state: ScrollHandlerState::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Action selection
    // -----------------------------------------------------------------------

    /// The next action to perform, or [`Action::None`] once drained.
    #[must_use]
    pub fn next_action(&self) -> Action {
        if self.should_begin_surface_creation() {
            return Action::BeginSurfaceCreation;
        }
        if self.should_activate_pending_tree() {
            return Action::ActivateSyncTree;
        }
        if self.should_commit() {
            return Action::Commit;
        }
        if self.should_draw() {
            if self.pending_draws_should_be_aborted() {
                return Action::DrawAbort;
            }
            if self.forced_redraw_state == ForcedRedrawOnTimeoutState::WaitingForDraw {
                return Action::DrawForced;
            }
            return Action::DrawIfPossible;
        }
        if self.should_prepare_tiles() {
            return Action::PrepareTiles;
        }
        if self.should_send_begin_main_frame() {
            return Action::SendBeginMainFrame;
        }
        if self.should_invalidate_surface() {
            return Action::InvalidateSurface;
        }
        Action::None
    }

    fn should_begin_surface_creation(&self) -> bool {
        // Creation waits for the pipeline to drain so no draw or activation
        // has to be aborted mid-initialization.
        self.visible
            && self.surface_state == SurfaceState::None
            && self.begin_main_frame_state == BeginMainFrameState::Idle
            && self.begin_impl_frame_state == BeginImplFrameState::Idle
            && !self.has_pending_tree
            && !self.active_tree_needs_first_draw
    }

    fn should_activate_pending_tree(&self) -> bool {
        if !self.has_pending_tree || self.active_tree_needs_first_draw {
            return false;
        }
        self.pending_activations_should_be_forced() || self.pending_tree_is_ready_for_activation
    }

    fn should_commit(&self) -> bool {
        if self.begin_main_frame_state != BeginMainFrameState::ReadyToCommit {
            return false;
        }
        if self.has_pending_tree {
            return false;
        }
        !(self.settings.commit_to_active_tree && self.active_tree_needs_first_draw)
    }

    fn should_draw(&self) -> bool {
        // Aborting only makes sense to unblock an undrawn active tree.
        if self.pending_draws_should_be_aborted() {
            return self.active_tree_needs_first_draw;
        }
        if self.did_draw {
            return false;
        }
        if self.surface_state != SurfaceState::Active {
            return false;
        }
        if self.is_draw_throttled() {
            return false;
        }
        if self.begin_impl_frame_state != BeginImplFrameState::InsideDeadline {
            return false;
        }
        if self.awaiting_ready_to_draw {
            return false;
        }
        if self.forced_redraw_state == ForcedRedrawOnTimeoutState::WaitingForDraw {
            return true;
        }
        self.needs_redraw
    }

    fn should_prepare_tiles(&self) -> bool {
        self.has_initialized_surface()
            && !self.did_prepare_tiles
            && self.begin_impl_frame_state == BeginImplFrameState::InsideDeadline
            && self.needs_prepare_tiles
    }

    fn could_send_begin_main_frame(&self) -> bool {
        self.needs_begin_main_frame
            && self.visible
            && !self.begin_frame_source_paused
            && !self.defer_commits
    }

    fn should_send_begin_main_frame(&self) -> bool {
        if !self.could_send_begin_main_frame() {
            return false;
        }
        if self.did_send_begin_main_frame_for_current_frame {
            return false;
        }
        if self.begin_main_frame_state != BeginMainFrameState::Idle {
            return false;
        }
        if self.has_pending_tree && !self.settings.main_frame_before_activation_enabled {
            return false;
        }
        if self.settings.commit_to_active_tree
            && (self.active_tree_needs_first_draw || self.is_draw_throttled())
        {
            return false;
        }
        if self.impl_latency_takes_priority()
            && (self.has_pending_tree || self.active_tree_needs_first_draw)
        {
            return false;
        }
        // New input may still arrive between frames.
        if !self.settings.synchronous && self.begin_impl_frame_state == BeginImplFrameState::Idle {
            return false;
        }
        let just_submitted_in_deadline = self.begin_impl_frame_state
            == BeginImplFrameState::InsideDeadline
            && self.did_submit_in_last_frame;
        if self.is_draw_throttled() && !just_submitted_in_deadline {
            return false;
        }
        if self.skip_next_begin_main_frame_to_reduce_latency {
            return false;
        }
        self.has_initialized_surface()
    }

    fn should_invalidate_surface(&self) -> bool {
        self.settings.synchronous
            && self.begin_impl_frame_state == BeginImplFrameState::InsideBeginFrame
            && !self.did_invalidate_surface
            && (self.needs_redraw || self.needs_prepare_tiles)
    }

    /// Whether activation must happen regardless of tile readiness.
    #[must_use]
    pub fn pending_activations_should_be_forced(&self) -> bool {
        self.surface_state == SurfaceState::None
            || !self.visible
            || self.begin_frame_source_paused
    }

    /// Whether draws must be discarded rather than performed.
    #[must_use]
    pub fn pending_draws_should_be_aborted(&self) -> bool {
        self.pending_activations_should_be_forced() || !self.can_draw
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Whether the scheduler should stay subscribed to its frame source.
    #[must_use]
    pub fn begin_frame_needed(&self) -> bool {
        if !self.has_initialized_surface() || !self.visible {
            return false;
        }
        self.begin_frame_required_for_action() || self.proactive_begin_frame_wanted()
    }

    fn begin_frame_required_for_action(&self) -> bool {
        self.forced_redraw_state == ForcedRedrawOnTimeoutState::WaitingForDraw
            || self.needs_redraw
            || self.needs_one_begin_impl_frame
            || (self.needs_begin_main_frame && !self.defer_commits)
    }

    fn proactive_begin_frame_wanted(&self) -> bool {
        (self.begin_main_frame_state != BeginMainFrameState::Idle && !self.defer_commits)
            || self.has_pending_tree
            || self.needs_prepare_tiles
            || self.did_submit_in_last_frame
            || self.last_commit_had_no_updates
    }

    /// When the current frame's deadline should fire.
    #[must_use]
    pub fn current_deadline_mode(&self) -> DeadlineMode {
        if self.settings.synchronous {
            return DeadlineMode::None;
        }
        if self.should_block_deadline_indefinitely() {
            return DeadlineMode::BlockedOnReadyToDraw;
        }
        if self.should_trigger_deadline_immediately() {
            return DeadlineMode::Immediate;
        }
        if self.needs_redraw {
            return DeadlineMode::Regular;
        }
        DeadlineMode::Late
    }

    fn should_block_deadline_indefinitely(&self) -> bool {
        self.settings.wait_for_ready_to_draw
            && self.surface_state != SurfaceState::None
            && self.visible
            && !self.begin_frame_source_paused
            && self.can_draw
            && self.awaiting_ready_to_draw
    }

    fn should_trigger_deadline_immediately(&self) -> bool {
        // Forced activation already happened; nothing is worth waiting for.
        if self.pending_activations_should_be_forced() && !self.has_pending_tree {
            return true;
        }
        if self.is_draw_throttled() {
            return false;
        }
        if self.active_tree_needs_first_draw {
            return true;
        }
        if !self.needs_redraw {
            return false;
        }
        if self.begin_main_frame_state == BeginMainFrameState::Idle && !self.has_pending_tree {
            return true;
        }
        self.impl_latency_takes_priority()
    }

    /// Whether consumer latency currently outranks producer throughput.
    #[must_use]
    pub fn impl_latency_takes_priority(&self) -> bool {
        // A fast producer that reacts to the scroll is worth synchronizing
        // with.
        if self.scroll_handler_state == ScrollHandlerState::AffectsScrollHandler
            && self.critical_begin_main_frame_to_activate_is_fast
        {
            return false;
        }
        self.tree_priority == TreePriority::SmoothnessTakesPriority
    }

    /// Whether only consumer-side work (a redraw) is pending.
    #[must_use]
    pub fn only_impl_side_updates_expected(&self) -> bool {
        let has_impl_updates = self.needs_redraw || self.needs_one_begin_impl_frame;
        let main_updates_expected = self.needs_begin_main_frame
            || self.begin_main_frame_state != BeginMainFrameState::Idle
            || self.has_pending_tree;
        has_impl_updates && !main_updates_expected
    }

    /// Whether the submit queue is full.
    #[must_use]
    pub fn is_draw_throttled(&self) -> bool {
        self.pending_submit_frames >= self.settings.max_pending_submit_frames
    }

    /// Whether a surface exists and finished initialization.
    #[must_use]
    pub fn has_initialized_surface(&self) -> bool {
        !matches!(self.surface_state, SurfaceState::None | SurfaceState::Creating)
    }

    /// Whether a producer update is in flight.
    #[must_use]
    pub fn commit_pending(&self) -> bool {
        self.begin_main_frame_state != BeginMainFrameState::Idle
    }

    /// Whether the producer still had work outstanding when the last frame
    /// ended.
    #[must_use]
    pub fn main_thread_missed_last_deadline(&self) -> bool {
        self.main_thread_missed_last_deadline
    }

    /// Whether a pending tree exists.
    #[must_use]
    pub fn has_pending_tree(&self) -> bool {
        self.has_pending_tree
    }

    /// Whether the active tree has not been drawn since it activated.
    #[must_use]
    pub fn active_tree_needs_first_draw(&self) -> bool {
        self.active_tree_needs_first_draw
    }

    /// Whether a redraw is requested.
    #[must_use]
    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Whether a producer update is requested.
    #[must_use]
    pub fn needs_begin_main_frame(&self) -> bool {
        self.needs_begin_main_frame
    }

    /// Whether the output is visible.
    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Consumer frame phase.
    #[must_use]
    pub fn begin_impl_frame_state(&self) -> BeginImplFrameState {
        self.begin_impl_frame_state
    }

    /// Producer phase.
    #[must_use]
    pub fn begin_main_frame_state(&self) -> BeginMainFrameState {
        self.begin_main_frame_state
    }

    /// Surface lifecycle state.
    #[must_use]
    pub fn surface_state(&self) -> SurfaceState {
        self.surface_state
    }

    /// Forced redraw progress.
    #[must_use]
    pub fn forced_redraw_state(&self) -> ForcedRedrawOnTimeoutState {
        self.forced_redraw_state
    }

    /// Number of consumer frames started.
    #[must_use]
    pub fn current_frame_number(&self) -> u64 {
        self.current_frame_number
    }

    /// Submitted frames awaiting acknowledgement.
    #[must_use]
    pub fn pending_submit_frames(&self) -> u32 {
        self.pending_submit_frames
    }

    /// Copies every field for diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            begin_impl_frame_state: self.begin_impl_frame_state,
            begin_main_frame_state: self.begin_main_frame_state,
            surface_state: self.surface_state,
            forced_redraw_state: self.forced_redraw_state,
            deadline_mode: self.current_deadline_mode(),
            current_frame_number: self.current_frame_number,
            consecutive_checkerboard_animations: self.consecutive_checkerboard_animations,
            pending_submit_frames: self.pending_submit_frames,
            needs_redraw: self.needs_redraw,
            needs_prepare_tiles: self.needs_prepare_tiles,
            needs_begin_main_frame: self.needs_begin_main_frame,
            needs_one_begin_impl_frame: self.needs_one_begin_impl_frame,
            visible: self.visible,
            begin_frame_source_paused: self.begin_frame_source_paused,
            can_draw: self.can_draw,
            defer_commits: self.defer_commits,
            has_pending_tree: self.has_pending_tree,
            pending_tree_is_ready_for_activation: self.pending_tree_is_ready_for_activation,
            active_tree_needs_first_draw: self.active_tree_needs_first_draw,
            awaiting_ready_to_draw: self.awaiting_ready_to_draw,
            main_thread_missed_last_deadline: self.main_thread_missed_last_deadline,
            skip_next_begin_main_frame_to_reduce_latency: self
                .skip_next_begin_main_frame_to_reduce_latency,
            critical_begin_main_frame_to_activate_is_fast: self
                .critical_begin_main_frame_to_activate_is_fast,
            tree_priority: self.tree_priority,
            scroll_handler_state: self.scroll_handler_state,
        }
    }

    // -----------------------------------------------------------------------
    // Requests and external state
    // -----------------------------------------------------------------------

    /// Requests a producer update.
    pub fn set_needs_begin_main_frame(&mut self) {
        self.needs_begin_main_frame = true;
    }

    /// Requests one consumer frame even if nothing else is pending.
    pub fn set_needs_one_begin_impl_frame(&mut self) {
        self.needs_one_begin_impl_frame = true;
    }

    /// Requests a redraw.
    pub fn set_needs_redraw(&mut self) {
        self.needs_redraw = true;
    }

    /// Requests tile preparation.
    pub fn set_needs_prepare_tiles(&mut self) {
        self.needs_prepare_tiles = true;
    }

    /// Sets output visibility.
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;
        if visible {
            self.main_thread_missed_last_deadline = false;
        }
    }

    /// Sets whether drawing is possible at all.
    pub fn set_can_draw(&mut self, can_draw: bool) {
        self.can_draw = can_draw;
    }

    /// Defers (or resumes) producer updates.
    pub fn set_defer_commits(&mut self, defer_commits: bool) {
        self.defer_commits = defer_commits;
    }

    /// Records that the frame source paused or resumed.
    pub fn set_begin_frame_source_paused(&mut self, paused: bool) {
        self.begin_frame_source_paused = paused;
    }

    /// Updates tree priority and scroll state.
    pub fn set_tree_priorities_and_scroll_state(
        &mut self,
        tree_priority: TreePriority,
        scroll_handler_state: ScrollHandlerState,
    ) {
        self.tree_priority = tree_priority;
        self.scroll_handler_state = scroll_handler_state;
    }

    /// Records whether the critical producer path fits within a frame.
    pub fn set_critical_begin_main_frame_to_activate_is_fast(&mut self, is_fast: bool) {
        self.critical_begin_main_frame_to_activate_is_fast = is_fast;
    }

    /// Skips the producer update for the rest of this frame.
    pub fn set_skip_next_begin_main_frame_to_reduce_latency(&mut self) {
        self.skip_next_begin_main_frame_to_reduce_latency = true;
    }

    // -----------------------------------------------------------------------
    // Consumer frame phases
    // -----------------------------------------------------------------------

    /// A consumer frame begins.
    pub fn on_begin_impl_frame(&mut self) {
        debug_assert_eq!(
            self.begin_impl_frame_state,
            BeginImplFrameState::Idle,
            "consumer frame began while another was in progress"
        );
        self.begin_impl_frame_state = BeginImplFrameState::InsideBeginFrame;
        self.current_frame_number += 1;

        self.did_draw = false;
        self.did_send_begin_main_frame_for_current_frame = false;
        self.did_prepare_tiles = false;
        self.did_invalidate_surface = false;
        self.did_submit_in_last_frame = false;
        self.needs_one_begin_impl_frame = false;
        self.last_commit_had_no_updates = false;
    }

    /// The consumer frame's deadline fired.
    pub fn on_begin_impl_frame_deadline(&mut self) {
        debug_assert_eq!(
            self.begin_impl_frame_state,
            BeginImplFrameState::InsideBeginFrame,
            "deadline outside a consumer frame"
        );
        self.begin_impl_frame_state = BeginImplFrameState::InsideDeadline;
    }

    /// The consumer frame ended.
    pub fn on_begin_impl_frame_idle(&mut self) {
        self.begin_impl_frame_state = BeginImplFrameState::Idle;
        self.main_thread_missed_last_deadline = self.commit_pending()
            || self.has_pending_tree
            || self.active_tree_needs_first_draw;
        self.skip_next_begin_main_frame_to_reduce_latency = false;
    }

    // -----------------------------------------------------------------------
    // Producer
    // -----------------------------------------------------------------------

    /// A producer update is being sent.
    pub fn will_send_begin_main_frame(&mut self) {
        debug_assert!(
            !self.has_pending_tree || self.settings.main_frame_before_activation_enabled,
            "producer update sent while a pending tree blocks it"
        );
        debug_assert!(
            !self.did_send_begin_main_frame_for_current_frame,
            "second producer update in one frame"
        );
        debug_assert_eq!(
            self.begin_main_frame_state,
            BeginMainFrameState::Idle,
            "producer update sent while one is in flight"
        );
        self.begin_main_frame_state = BeginMainFrameState::Sent;
        self.needs_begin_main_frame = false;
        self.did_send_begin_main_frame_for_current_frame = true;
    }

    /// The producer started the update.
    pub fn notify_begin_main_frame_started(&mut self) {
        debug_assert_eq!(
            self.begin_main_frame_state,
            BeginMainFrameState::Sent,
            "producer start without a sent update"
        );
        self.begin_main_frame_state = BeginMainFrameState::Started;
    }

    /// The producer finished and is ready to commit.
    pub fn notify_ready_to_commit(&mut self) {
        debug_assert!(
            matches!(
                self.begin_main_frame_state,
                BeginMainFrameState::Sent | BeginMainFrameState::Started
            ),
            "ready to commit without a producer update"
        );
        self.begin_main_frame_state = BeginMainFrameState::ReadyToCommit;
    }

    /// The producer update ended without a commit.
    ///
    /// An existing pending tree is kept.
    pub fn begin_main_frame_aborted(&mut self, reason: CommitEarlyOutReason) {
        debug_assert!(
            matches!(
                self.begin_main_frame_state,
                BeginMainFrameState::Sent | BeginMainFrameState::Started
            ),
            "abort without a producer update in flight"
        );
        if reason.main_frame_ran() {
            self.commit_internal(true);
        } else {
            self.begin_main_frame_state = BeginMainFrameState::Idle;
            self.needs_begin_main_frame = true;
        }
    }

    /// The commit is starting.
    pub fn will_commit(&mut self) {
        debug_assert_eq!(
            self.begin_main_frame_state,
            BeginMainFrameState::ReadyToCommit,
            "commit outside ReadyToCommit"
        );
        self.commit_internal(false);
    }

    fn commit_internal(&mut self, commit_had_no_updates: bool) {
        self.begin_main_frame_state = BeginMainFrameState::Idle;
        self.last_commit_had_no_updates = commit_had_no_updates;

        if !commit_had_no_updates {
            self.has_pending_tree = true;
            // Committing straight to the active tree leaves nothing to wait
            // for before activation.
            self.pending_tree_is_ready_for_activation = self.settings.commit_to_active_tree;
        }

        if self.forced_redraw_state == ForcedRedrawOnTimeoutState::WaitingForCommit {
            self.forced_redraw_state = if self.has_pending_tree {
                ForcedRedrawOnTimeoutState::WaitingForActivation
            } else {
                ForcedRedrawOnTimeoutState::WaitingForDraw
            };
        }

        if self.surface_state == SurfaceState::WaitingForFirstCommit {
            self.surface_state = if self.has_pending_tree {
                SurfaceState::WaitingForFirstActivation
            } else {
                SurfaceState::Active
            };
        }
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    /// The pending tree is ready to activate.
    pub fn notify_ready_to_activate(&mut self) {
        if self.has_pending_tree {
            self.pending_tree_is_ready_for_activation = true;
        }
    }

    /// The pending tree is being activated.
    pub fn will_activate(&mut self) {
        debug_assert!(self.has_pending_tree, "activation without a pending tree");
        if self.surface_state == SurfaceState::WaitingForFirstActivation {
            self.surface_state = SurfaceState::Active;
        }
        if self.forced_redraw_state == ForcedRedrawOnTimeoutState::WaitingForActivation {
            self.forced_redraw_state = ForcedRedrawOnTimeoutState::WaitingForDraw;
        }
        self.has_pending_tree = false;
        self.pending_tree_is_ready_for_activation = false;
        self.active_tree_needs_first_draw = true;
        self.needs_redraw = true;
        self.awaiting_ready_to_draw = self.settings.wait_for_ready_to_draw;
    }

    /// The active tree is ready to draw.
    pub fn notify_ready_to_draw(&mut self) {
        self.awaiting_ready_to_draw = false;
    }

    // -----------------------------------------------------------------------
    // Draw and submit
    // -----------------------------------------------------------------------

    /// A draw (forced or not) is starting.
    pub fn will_draw(&mut self) {
        debug_assert!(!self.did_draw, "second draw in one frame");
        self.will_draw_internal();
    }

    fn will_draw_internal(&mut self) {
        self.did_draw = true;
        self.needs_redraw = false;
        self.active_tree_needs_first_draw = false;
        if self.forced_redraw_state == ForcedRedrawOnTimeoutState::WaitingForDraw {
            self.forced_redraw_state = ForcedRedrawOnTimeoutState::Idle;
        }
    }

    /// The draw finished with `result`.
    pub fn did_draw(&mut self, result: DrawResult) {
        match result {
            DrawResult::Success => {
                self.consecutive_checkerboard_animations = 0;
                self.forced_redraw_state = ForcedRedrawOnTimeoutState::Idle;
            }
            DrawResult::AbortedCheckerboardAnimations => {
                self.needs_begin_main_frame = true;
                self.needs_redraw = true;
                self.consecutive_checkerboard_animations += 1;
                if self.settings.timeout_and_draw_when_animation_checkerboards
                    && self.consecutive_checkerboard_animations
                        >= self.settings.max_failed_draws_before_draw_is_forced
                    && self.forced_redraw_state == ForcedRedrawOnTimeoutState::Idle
                {
                    // Forcing only helps once new content has arrived.
                    self.forced_redraw_state = ForcedRedrawOnTimeoutState::WaitingForCommit;
                }
            }
            DrawResult::AbortedMissingHighResContent => {
                self.needs_begin_main_frame = true;
            }
            DrawResult::AbortedCantDraw | DrawResult::AbortedDrainingPipeline => {}
        }
    }

    /// Discards the active tree's draw.
    pub fn abort_draw(&mut self) {
        self.will_draw_internal();
        self.did_draw(DrawResult::AbortedDrainingPipeline);
    }

    /// A frame was submitted.
    pub fn did_submit_compositor_frame(&mut self) {
        debug_assert!(
            self.pending_submit_frames < self.settings.max_pending_submit_frames,
            "submitted past the pending frame limit"
        );
        self.pending_submit_frames += 1;
        self.did_submit_in_last_frame = true;
    }

    /// The oldest submitted frame was acknowledged.
    pub fn did_receive_compositor_frame_ack(&mut self) {
        debug_assert!(self.pending_submit_frames > 0, "ack without a submitted frame");
        self.pending_submit_frames = self.pending_submit_frames.saturating_sub(1);
    }

    // -----------------------------------------------------------------------
    // Tiles
    // -----------------------------------------------------------------------

    /// Tile preparation is starting.
    pub fn will_prepare_tiles(&mut self) {
        self.did_prepare_tiles = true;
        self.needs_prepare_tiles = false;
    }

    /// Tile preparation finished.
    pub fn did_prepare_tiles(&mut self) {
        self.did_prepare_tiles = true;
        self.needs_prepare_tiles = false;
    }

    // -----------------------------------------------------------------------
    // Surface
    // -----------------------------------------------------------------------

    /// Surface creation is starting.
    pub fn will_begin_surface_creation(&mut self) {
        debug_assert_eq!(
            self.surface_state,
            SurfaceState::None,
            "surface creation while a surface exists"
        );
        debug_assert!(
            !self.has_pending_tree && !self.active_tree_needs_first_draw,
            "surface creation with trees in flight"
        );
        self.surface_state = SurfaceState::Creating;
    }

    /// The surface was created and initialized.
    pub fn did_create_and_initialize_surface(&mut self) {
        debug_assert_eq!(
            self.surface_state,
            SurfaceState::Creating,
            "surface initialized without creation"
        );
        self.surface_state = SurfaceState::WaitingForFirstCommit;
        if self.did_create_and_initialize_first_surface {
            // A replacement surface starts empty.
            self.needs_begin_main_frame = true;
        }
        self.did_create_and_initialize_first_surface = true;
        self.pending_submit_frames = 0;
        self.main_thread_missed_last_deadline = false;
    }

    /// The surface was lost.
    pub fn did_lose_surface(&mut self) {
        if matches!(self.surface_state, SurfaceState::None | SurfaceState::Creating) {
            return;
        }
        self.surface_state = SurfaceState::None;
        self.needs_redraw = false;
        self.awaiting_ready_to_draw = false;
    }

    /// The surface invalidation is being requested.
    pub fn will_invalidate_surface(&mut self) {
        debug_assert!(!self.did_invalidate_surface, "second invalidation in one frame");
        self.did_invalidate_surface = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn make_machine(settings: SchedulerSettings) -> PipelineStateMachine {
        let mut sm = PipelineStateMachine::new(settings);
        sm.set_visible(true);
        sm.set_can_draw(true);
        assert_eq!(sm.next_action(), Action::BeginSurfaceCreation);
        sm.will_begin_surface_creation();
        sm.did_create_and_initialize_surface();
        sm
    }

    /// Applies the `will_*` transition for `action`, treating draws as
    /// successful.
    fn perform(sm: &mut PipelineStateMachine, action: Action) {
        match action {
            Action::None => {}
            Action::SendBeginMainFrame => sm.will_send_begin_main_frame(),
            Action::Commit => sm.will_commit(),
            Action::ActivateSyncTree => sm.will_activate(),
            Action::DrawIfPossible | Action::DrawForced => {
                sm.will_draw();
                sm.did_draw(DrawResult::Success);
            }
            Action::DrawAbort => sm.abort_draw(),
            Action::PrepareTiles => sm.will_prepare_tiles(),
            Action::BeginSurfaceCreation => sm.will_begin_surface_creation(),
            Action::InvalidateSurface => sm.will_invalidate_surface(),
        }
    }

    /// Performs actions until drained, returning them in order.
    fn drain(sm: &mut PipelineStateMachine) -> Vec<Action> {
        let mut actions = Vec::new();
        loop {
            let action = sm.next_action();
            if action == Action::None {
                return actions;
            }
            assert!(actions.len() < 32, "drain did not terminate: {actions:?}");
            perform(sm, action);
            actions.push(action);
        }
    }

    /// Runs a producer update through commit and activation so the surface
    /// becomes active with a drawn tree.
    fn make_active(settings: SchedulerSettings) -> PipelineStateMachine {
        let mut sm = make_machine(settings);
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        assert_eq!(drain(&mut sm), [Action::SendBeginMainFrame]);
        sm.notify_begin_main_frame_started();
        sm.notify_ready_to_commit();
        assert_eq!(drain(&mut sm), [Action::Commit]);
        sm.notify_ready_to_activate();
        assert_eq!(drain(&mut sm), [Action::ActivateSyncTree]);
        sm.on_begin_impl_frame_deadline();
        assert_eq!(drain(&mut sm), [Action::DrawIfPossible]);
        sm.on_begin_impl_frame_idle();
        assert_eq!(sm.surface_state(), SurfaceState::Active);
        sm
    }

    #[test]
    fn fresh_machine_creates_surface_only_when_visible() {
        let mut sm = PipelineStateMachine::new(SchedulerSettings::new());
        assert_eq!(sm.next_action(), Action::None, "invisible: nothing to do");
        sm.set_visible(true);
        assert_eq!(sm.next_action(), Action::BeginSurfaceCreation);
        sm.will_begin_surface_creation();
        assert_eq!(sm.next_action(), Action::None, "creation in progress");
        assert!(!sm.begin_frame_needed(), "no frames before initialization");
    }

    #[test]
    fn full_cycle_order() {
        let sm = make_active(SchedulerSettings::new());
        assert!(!sm.main_thread_missed_last_deadline(), "everything finished");
        assert!(!sm.begin_frame_needed(), "idle pipeline stops ticking");
    }

    #[test]
    fn producer_update_waits_for_begin_frame() {
        let mut sm = make_machine(SchedulerSettings::new());
        sm.set_needs_begin_main_frame();
        assert!(sm.begin_frame_needed(), "producer need subscribes");
        assert_eq!(sm.next_action(), Action::None, "not outside a frame");
        sm.on_begin_impl_frame();
        assert_eq!(sm.next_action(), Action::SendBeginMainFrame);
    }

    #[test]
    fn one_producer_update_per_frame() {
        let mut sm = make_active(SchedulerSettings::new());
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        assert_eq!(drain(&mut sm), [Action::SendBeginMainFrame]);
        sm.begin_main_frame_aborted(CommitEarlyOutReason::AbortedDeferredCommit);
        assert!(sm.needs_begin_main_frame(), "abort re-requests the update");
        assert_eq!(drain(&mut sm), [], "funnel holds for the rest of the frame");
        sm.on_begin_impl_frame_deadline();
        sm.on_begin_impl_frame_idle();
        sm.on_begin_impl_frame();
        assert_eq!(drain(&mut sm), [Action::SendBeginMainFrame]);
    }

    #[test]
    fn commit_waits_for_pending_tree_activation() {
        let settings = SchedulerSettings {
            main_frame_before_activation_enabled: true,
            ..SchedulerSettings::new()
        };
        let mut sm = make_active(settings);
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        assert_eq!(drain(&mut sm), [Action::SendBeginMainFrame]);
        sm.notify_begin_main_frame_started();
        sm.notify_ready_to_commit();
        assert_eq!(drain(&mut sm), [Action::Commit]);

        // Second update races ahead of activation.
        sm.on_begin_impl_frame_deadline();
        drain(&mut sm);
        sm.on_begin_impl_frame_idle();
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        assert_eq!(drain(&mut sm), [Action::SendBeginMainFrame]);
        sm.notify_begin_main_frame_started();
        sm.notify_ready_to_commit();
        assert_eq!(drain(&mut sm), [], "commit withheld behind the pending tree");

        sm.notify_ready_to_activate();
        assert_eq!(
            drain(&mut sm),
            [Action::ActivateSyncTree, Action::Commit],
            "commit follows as soon as the pending tree is free"
        );
        sm.notify_ready_to_activate();
        assert_eq!(
            drain(&mut sm),
            [],
            "second activation waits for the first tree to be drawn"
        );
        sm.on_begin_impl_frame_deadline();
        assert_eq!(
            drain(&mut sm),
            [Action::DrawIfPossible, Action::ActivateSyncTree],
            "drawing the first tree unblocks the second activation"
        );
    }

    #[test]
    fn abort_keeps_pending_tree() {
        let settings = SchedulerSettings {
            main_frame_before_activation_enabled: true,
            ..SchedulerSettings::new()
        };
        let mut sm = make_active(settings);
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        drain(&mut sm);
        sm.notify_begin_main_frame_started();
        sm.notify_ready_to_commit();
        assert_eq!(drain(&mut sm), [Action::Commit]);
        sm.on_begin_impl_frame_deadline();
        sm.on_begin_impl_frame_idle();

        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        assert_eq!(drain(&mut sm), [Action::SendBeginMainFrame]);
        sm.begin_main_frame_aborted(CommitEarlyOutReason::FinishedNoUpdates);
        assert!(sm.has_pending_tree(), "earlier commit survives the abort");
        assert!(!sm.needs_begin_main_frame(), "no-update abort is complete");
    }

    #[test]
    fn invisible_never_needs_frames() {
        let mut sm = make_active(SchedulerSettings::new());
        sm.set_visible(false);
        sm.set_needs_redraw();
        assert!(!sm.begin_frame_needed(), "invisible output does not tick");
        sm.set_visible(true);
        assert!(sm.begin_frame_needed(), "visible again");
    }

    #[test]
    fn submit_throttling_blocks_draws_until_ack() {
        let mut sm = make_active(SchedulerSettings::new());
        sm.did_submit_compositor_frame();
        assert!(sm.is_draw_throttled(), "one frame is the limit");
        sm.set_needs_redraw();
        sm.on_begin_impl_frame();
        sm.on_begin_impl_frame_deadline();
        assert_eq!(drain(&mut sm), [], "no draw while throttled");
        sm.did_receive_compositor_frame_ack();
        assert_eq!(drain(&mut sm), [Action::DrawIfPossible], "ack releases the draw");
    }

    #[test]
    fn repeated_checkerboards_force_a_draw() {
        let mut sm = make_active(SchedulerSettings::new());
        for _ in 0..3 {
            sm.set_needs_redraw();
            sm.on_begin_impl_frame();
            sm.on_begin_impl_frame_deadline();
            assert_eq!(sm.next_action(), Action::DrawIfPossible);
            sm.will_draw();
            sm.did_draw(DrawResult::AbortedCheckerboardAnimations);
            assert!(sm.needs_begin_main_frame(), "checkerboard asks for content");
            sm.on_begin_impl_frame_idle();
        }
        assert_eq!(
            sm.forced_redraw_state(),
            ForcedRedrawOnTimeoutState::WaitingForCommit
        );

        sm.on_begin_impl_frame();
        assert_eq!(drain(&mut sm), [Action::SendBeginMainFrame]);
        sm.notify_begin_main_frame_started();
        sm.notify_ready_to_commit();
        assert_eq!(drain(&mut sm), [Action::Commit]);
        assert_eq!(
            sm.forced_redraw_state(),
            ForcedRedrawOnTimeoutState::WaitingForActivation
        );
        sm.notify_ready_to_activate();
        assert_eq!(drain(&mut sm), [Action::ActivateSyncTree]);
        sm.on_begin_impl_frame_deadline();
        assert_eq!(drain(&mut sm), [Action::DrawForced]);
        assert_eq!(sm.forced_redraw_state(), ForcedRedrawOnTimeoutState::Idle);
    }

    #[test]
    fn becoming_invisible_forces_activation_and_aborts_draw() {
        let mut sm = make_active(SchedulerSettings::new());
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        drain(&mut sm);
        sm.notify_begin_main_frame_started();
        sm.notify_ready_to_commit();
        assert_eq!(drain(&mut sm), [Action::Commit]);
        sm.on_begin_impl_frame_deadline();
        sm.on_begin_impl_frame_idle();

        sm.set_visible(false);
        assert_eq!(
            drain(&mut sm),
            [Action::ActivateSyncTree, Action::DrawAbort],
            "tiles never reported ready"
        );
        assert!(!sm.has_pending_tree());
        assert!(!sm.active_tree_needs_first_draw());
    }

    #[test]
    fn lost_surface_is_recreated_after_drain() {
        let mut sm = make_active(SchedulerSettings::new());
        sm.set_needs_redraw();
        sm.on_begin_impl_frame();
        sm.did_lose_surface();
        assert!(!sm.needs_redraw(), "nothing to draw into");
        assert_eq!(sm.next_action(), Action::None, "frame still in progress");
        sm.on_begin_impl_frame_deadline();
        sm.on_begin_impl_frame_idle();
        assert_eq!(drain(&mut sm), [Action::BeginSurfaceCreation]);
        sm.did_create_and_initialize_surface();
        assert!(
            sm.needs_begin_main_frame(),
            "replacement surface requests content"
        );
        assert_eq!(sm.surface_state(), SurfaceState::WaitingForFirstCommit);
    }

    #[test]
    fn deadline_modes() {
        let mut sm = make_active(SchedulerSettings::new());
        sm.on_begin_impl_frame();
        assert_eq!(sm.current_deadline_mode(), DeadlineMode::Late, "nothing to draw");

        sm.set_needs_redraw();
        assert_eq!(
            sm.current_deadline_mode(),
            DeadlineMode::Immediate,
            "redraw with an idle producer"
        );

        sm.set_needs_begin_main_frame();
        drain(&mut sm);
        assert_eq!(
            sm.current_deadline_mode(),
            DeadlineMode::Regular,
            "redraw while a producer update is in flight"
        );

        sm.set_tree_priorities_and_scroll_state(
            TreePriority::SmoothnessTakesPriority,
            ScrollHandlerState::DoesNotAffectScrollHandler,
        );
        assert_eq!(
            sm.current_deadline_mode(),
            DeadlineMode::Immediate,
            "smoothness prioritizes the draw"
        );

        let sync = PipelineStateMachine::new(SchedulerSettings::synchronous());
        assert_eq!(sync.current_deadline_mode(), DeadlineMode::None);
    }

    #[test]
    fn ready_to_draw_blocks_deadline() {
        let settings = SchedulerSettings {
            wait_for_ready_to_draw: true,
            ..SchedulerSettings::new()
        };
        let mut sm = make_machine(settings);
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        drain(&mut sm);
        sm.notify_begin_main_frame_started();
        sm.notify_ready_to_commit();
        assert_eq!(drain(&mut sm), [Action::Commit]);
        sm.notify_ready_to_activate();
        assert_eq!(drain(&mut sm), [Action::ActivateSyncTree]);
        assert_eq!(
            sm.current_deadline_mode(),
            DeadlineMode::BlockedOnReadyToDraw
        );
        sm.notify_ready_to_draw();
        assert_eq!(sm.current_deadline_mode(), DeadlineMode::Immediate);
    }

    #[test]
    fn commit_to_active_tree_activates_right_after_commit() {
        let mut sm = make_machine(SchedulerSettings::commit_to_active_tree());
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        drain(&mut sm);
        sm.notify_begin_main_frame_started();
        sm.notify_ready_to_commit();
        assert_eq!(
            drain(&mut sm),
            [Action::Commit, Action::ActivateSyncTree],
            "no readiness signal needed"
        );
    }

    #[test]
    fn impl_latency_priority_yields_to_fast_scroll_handler() {
        let mut sm = PipelineStateMachine::new(SchedulerSettings::new());
        sm.set_tree_priorities_and_scroll_state(
            TreePriority::SmoothnessTakesPriority,
            ScrollHandlerState::AffectsScrollHandler,
        );
        assert!(!sm.impl_latency_takes_priority(), "fast handler: stay in sync");
        sm.set_critical_begin_main_frame_to_activate_is_fast(false);
        assert!(sm.impl_latency_takes_priority(), "slow handler: prioritize draws");
    }

    #[test]
    fn only_impl_side_updates() {
        let mut sm = make_active(SchedulerSettings::new());
        assert!(!sm.only_impl_side_updates_expected(), "nothing pending");
        sm.set_needs_redraw();
        assert!(sm.only_impl_side_updates_expected(), "just a redraw");
        sm.set_needs_begin_main_frame();
        assert!(!sm.only_impl_side_updates_expected(), "producer work expected");
    }

    #[test]
    fn missed_deadline_tracks_unfinished_work() {
        let mut sm = make_active(SchedulerSettings::new());
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        drain(&mut sm);
        sm.on_begin_impl_frame_deadline();
        sm.set_skip_next_begin_main_frame_to_reduce_latency();
        sm.on_begin_impl_frame_idle();
        assert!(
            sm.main_thread_missed_last_deadline(),
            "producer still running at frame end"
        );
        assert!(
            !sm.snapshot().skip_next_begin_main_frame_to_reduce_latency,
            "skip lasts one frame"
        );
    }

    #[test]
    fn synchronous_mode_invalidates_inside_begin_frame() {
        let mut sm = make_machine(SchedulerSettings::synchronous());
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        assert_eq!(drain(&mut sm), [Action::SendBeginMainFrame]);
        sm.notify_begin_main_frame_started();
        sm.notify_ready_to_commit();
        assert_eq!(drain(&mut sm), [Action::Commit]);
        sm.notify_ready_to_activate();
        assert_eq!(
            drain(&mut sm),
            [Action::ActivateSyncTree, Action::InvalidateSurface],
            "new active tree needs a redraw"
        );
        sm.on_begin_impl_frame_deadline();
        assert_eq!(drain(&mut sm), [Action::DrawIfPossible]);
    }

    #[test]
    fn paused_source_stops_producer_updates() {
        let mut sm = make_active(SchedulerSettings::new());
        sm.set_begin_frame_source_paused(true);
        sm.set_needs_begin_main_frame();
        sm.on_begin_impl_frame();
        assert_eq!(drain(&mut sm), [], "paused source");
        assert!(sm.pending_activations_should_be_forced());
    }

    #[test]
    fn deferred_commits_drop_producer_need() {
        let mut sm = make_active(SchedulerSettings::new());
        sm.set_defer_commits(true);
        sm.set_needs_begin_main_frame();
        assert!(!sm.begin_frame_needed(), "deferred producer need does not tick");
        sm.set_defer_commits(false);
        assert!(sm.begin_frame_needed());
    }
}
