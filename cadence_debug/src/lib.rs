// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, recording, Chrome trace export, and a `tracing` bridge
//! for cadence diagnostics.
//!
//! This crate provides [`TraceSink`](cadence_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//! - [`tracing_sink::TracingSink`]: forwards events to the `tracing` crate.
//! - [`fanout::FanoutSink`]: feeds several of the above from one tracer.
//!
//! [`snapshot::to_json`] renders a
//! [`SchedulerSnapshot`](cadence_core::scheduler::SchedulerSnapshot) as JSON.

pub mod chrome;
pub mod fanout;
pub mod pretty;
pub mod recorder;
pub mod snapshot;
pub mod tracing_sink;
