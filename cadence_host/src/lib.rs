// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host plumbing for running a cadence scheduler against real time.
//!
//! - [`time`]: `CLOCK_MONOTONIC` reads and the [`MonotonicClock`](time::MonotonicClock).
//! - [`signal`]: a cross-thread queue that marshals pipeline notifications
//!   onto the scheduler thread.
//! - [`run_loop`]: a polling loop for
//!   [`SyntheticBeginFrameSource`](cadence_core::source::SyntheticBeginFrameSource)s
//!   that fires deadlines and sleeps on the signal queue.
//!
//! ```text
//!  producer thread ──┐
//!                    ├─ SignalSender ─▶ SignalQueue ─┐
//!  consumer thread ──┘                               ▼
//!                          RunLoop ──▶ FrameScheduler ──▶ SchedulerClient
//!                            │ poll          ▲
//!                            ▼               │ deadline
//!                 SyntheticBeginFrameSource  ManualTimer
//! ```

pub mod run_loop;
pub mod signal;
pub mod time;

pub use run_loop::{Iteration, RunLoop};
pub use signal::{HostSignal, SignalQueue, SignalSender};
pub use time::MonotonicClock;
