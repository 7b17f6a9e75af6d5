// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deadline-driven frame pacing for two-stage rendering pipelines.
//!
//! `cadence_core` decides, for every periodic BeginFrame signal, which
//! pipeline steps a host should run and when. The host has a *producer*
//! (a "main thread" that builds new content) and a *consumer* (an "impl
//! thread" that activates and draws it). The scheduler keeps both busy
//! without missing display deadlines, and sheds work when either side falls
//! behind. It is `no_std` compatible (with `alloc`) and never reads a global
//! clock: time comes from a [`Clock`](clock::Clock) and deadlines go to a
//! [`DeadlineTimer`](timer::DeadlineTimer), so the whole loop can run in
//! virtual time.
//!
//! # Architecture
//!
//! ```text
//!   BeginFrameSource ──► FrameScheduler::on_begin_frame(FrameArgs)
//!                              │
//!                              ├─► TimingHistory estimates ─► deadline plan
//!                              │
//!                              ▼
//!                    PipelineStateMachine::next_action()
//!                              │
//!                              ▼
//!                    SchedulerClient::scheduled_action_*(&mut Requests)
//!                              │
//!                              ▼
//!   DeadlineTimer ──► FrameScheduler::on_deadline_timer() ─► draw, finish
//! ```
//!
//! **[`scheduler`]**: [`FrameScheduler`](scheduler::FrameScheduler), the
//! orchestrator. Plans deadlines, applies latency recovery, drains actions,
//! and manages frame-source observation.
//!
//! **[`state_machine`]**: the pure decision core. Records lifecycle events
//! and answers "what next?" and "when should the deadline fire?".
//!
//! **[`timing_history`]** and **[`history`]**: rolling per-stage duration
//! samples and their percentile estimates.
//!
//! **[`source`]**: the [`BeginFrameSource`](source::BeginFrameSource) seam
//! plus delay-based and back-to-back synthetic sources.
//!
//! **[`client`]**: the host callback trait and the [`Requests`](client::Requests)
//! token through which callbacks ask for more work.
//!
//! **[`args`]**, **[`time`]**, **[`clock`]**, **[`timer`]**: frame arguments,
//! tick-based time types, and the time seams.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) and the event types the
//! scheduler emits, behind a zero-cost [`Tracer`](trace::Tracer).
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod args;
pub mod client;
pub mod clock;
pub mod history;
pub mod scheduler;
pub mod source;
pub mod state_machine;
pub mod time;
pub mod timer;
pub mod timing_history;
pub mod trace;

pub use args::{FrameArgs, FrameArgsKind};
pub use client::{CommitEarlyOutReason, DrawResult, Requests, SchedulerClient};
pub use scheduler::{FrameScheduler, SchedulerSettings, SchedulerSnapshot};
pub use state_machine::{Action, DeadlineMode, PipelineStateMachine};
pub use time::{Duration, HostTime};
