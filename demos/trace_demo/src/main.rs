// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated frame loop that exercises the scheduler and its diagnostics.
//!
//! Drives a [`FrameScheduler`] in virtual time against a 60 Hz
//! [`DelayBasedBeginFrameSource`]. A simulated producer answers each
//! producer update after a few milliseconds, except every twelfth one, which
//! overruns the frame so latency recovery kicks in. Events go to a
//! [`PrettyPrintSink`] on stdout, a [`RecorderSink`], and a
//! [`TracingSink`] (filter with `RUST_LOG`, e.g. `RUST_LOG=cadence=debug`).
//! At the end the recording is exported as `trace.json` in Chrome Trace
//! Event Format and the final scheduler snapshot is printed as JSON.

use std::cell::RefCell;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{self, BufWriter};
use std::rc::Rc;

use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use cadence_core::clock::{Clock, ManualClock};
use cadence_core::source::{DelayBasedBeginFrameSource, SyntheticBeginFrameSource};
use cadence_core::time::{Duration, HostTime, Timebase};
use cadence_core::timer::ManualTimer;
use cadence_core::trace::Tracer;
use cadence_core::{
    DrawResult, FrameArgs, FrameScheduler, Requests, SchedulerClient, SchedulerSettings,
};
use cadence_debug::fanout::FanoutSink;
use cadence_debug::pretty::PrettyPrintSink;
use cadence_debug::recorder::RecorderSink;
use cadence_debug::tracing_sink::TracingSink;

const FRAME_COUNT: u64 = 60;
const INTERVAL: Duration = Duration(16_666_667);
const SLOW_MAIN_FRAME_EVERY: u64 = 12;

const MAIN_FRAME_QUEUE: Duration = Duration::from_micros(300);
const MAIN_FRAME_FAST: Duration = Duration::from_millis(6);
const MAIN_FRAME_SLOW: Duration = Duration::from_millis(22);
const COMMIT_COST: Duration = Duration::from_millis(1);
const RASTER_COST: Duration = Duration::from_millis(2);
const ACTIVATE_COST: Duration = Duration::from_micros(500);
const DRAW_COST: Duration = Duration::from_millis(3);
const PREPARE_TILES_COST: Duration = Duration::from_micros(200);
const SURFACE_CREATION_COST: Duration = Duration::from_millis(1);
const SUBMIT_TO_ACK: Duration = Duration::from_millis(4);

/// Work that completes "on another thread" at a later virtual time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum HostEvent {
    SurfaceReady,
    MainFrameStarted,
    ReadyToCommit,
    DidCommit,
    ReadyToActivate,
    CompositorFrameAck,
}

/// A host whose stage costs advance the shared virtual clock.
#[derive(Debug)]
struct SimulatedHost {
    clock: ManualClock,
    events: BinaryHeap<Reverse<(HostTime, u64, HostEvent)>>,
    posted: u64,
    main_frames: u64,
    draws: u64,
}

impl SimulatedHost {
    fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            events: BinaryHeap::new(),
            posted: 0,
            main_frames: 0,
            draws: 0,
        }
    }

    fn post(&mut self, after: Duration, event: HostEvent) {
        self.posted += 1;
        let at = self.clock.now() + after;
        self.events.push(Reverse((at, self.posted, event)));
    }

    fn next_event_time(&self) -> Option<HostTime> {
        self.events.peek().map(|Reverse((at, _, _))| *at)
    }

    fn pop_due(&mut self, now: HostTime) -> Option<HostEvent> {
        match self.events.peek() {
            Some(Reverse((at, _, _))) if *at <= now => {
                self.events.pop().map(|Reverse((_, _, event))| event)
            }
            _ => None,
        }
    }
}

impl SchedulerClient for SimulatedHost {
    fn scheduled_action_send_begin_main_frame(&mut self, _: &FrameArgs, _: &mut Requests) {
        self.main_frames += 1;
        let cost = if self.main_frames.is_multiple_of(SLOW_MAIN_FRAME_EVERY) {
            MAIN_FRAME_SLOW
        } else {
            MAIN_FRAME_FAST
        };
        self.post(MAIN_FRAME_QUEUE, HostEvent::MainFrameStarted);
        self.post(MAIN_FRAME_QUEUE + cost, HostEvent::ReadyToCommit);
    }

    fn scheduled_action_commit(&mut self, _: &mut Requests) {
        self.clock.advance(COMMIT_COST);
        self.post(Duration::ZERO, HostEvent::DidCommit);
        self.post(RASTER_COST, HostEvent::ReadyToActivate);
    }

    fn scheduled_action_activate_sync_tree(&mut self, _: &mut Requests) {
        self.clock.advance(ACTIVATE_COST);
    }

    fn scheduled_action_draw_if_possible(&mut self, requests: &mut Requests) -> DrawResult {
        self.clock.advance(DRAW_COST);
        self.draws += 1;
        requests.did_submit_compositor_frame();
        requests.set_needs_redraw();
        self.post(SUBMIT_TO_ACK, HostEvent::CompositorFrameAck);
        DrawResult::Success
    }

    fn scheduled_action_draw_forced(&mut self, requests: &mut Requests) -> DrawResult {
        self.scheduled_action_draw_if_possible(requests)
    }

    fn scheduled_action_prepare_tiles(&mut self, _: &mut Requests) {
        self.clock.advance(PREPARE_TILES_COST);
    }

    fn scheduled_action_begin_surface_creation(&mut self, _: &mut Requests) {
        self.post(SURFACE_CREATION_COST, HostEvent::SurfaceReady);
    }
}

type DemoScheduler = FrameScheduler<SimulatedHost, DelayBasedBeginFrameSource, ManualTimer, ManualClock>;

fn deliver(scheduler: &mut DemoScheduler, event: HostEvent, now: HostTime) {
    match event {
        HostEvent::SurfaceReady => {
            scheduler.did_create_and_initialize_surface();
            scheduler.set_needs_begin_main_frame();
        }
        HostEvent::MainFrameStarted => scheduler.notify_begin_main_frame_started(now),
        HostEvent::ReadyToCommit => scheduler.notify_ready_to_commit(),
        HostEvent::DidCommit => {
            scheduler.did_commit();
            // The producer animates too: every commit asks for the next.
            scheduler.set_needs_begin_main_frame();
        }
        HostEvent::ReadyToActivate => scheduler.notify_ready_to_activate(),
        HostEvent::CompositorFrameAck => scheduler.did_receive_compositor_frame_ack(),
    }
}

fn main() -> io::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cadence=info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .init();

    let timebase = Timebase::NANOS;
    let clock = ManualClock::new(HostTime(1_000_000_000));

    // -- sinks -------------------------------------------------------------
    let recorder = Rc::new(RefCell::new(RecorderSink::new()));
    let sinks = FanoutSink::new()
        .with(PrettyPrintSink::new(Box::new(io::stdout()), timebase))
        .with(Rc::clone(&recorder))
        .with(TracingSink::new(timebase));

    // -- scheduler ---------------------------------------------------------
    let mut source = DelayBasedBeginFrameSource::new(INTERVAL, 1.0);
    source.update_vsync_parameters(clock.now(), INTERVAL);
    let mut scheduler = FrameScheduler::new(
        SchedulerSettings::new(),
        SimulatedHost::new(clock.clone()),
        source,
        ManualTimer::new(),
        clock.clone(),
    );
    scheduler.set_tracer(Tracer::new(Box::new(sinks)));
    scheduler.set_can_draw(true);
    scheduler.set_visible(true);
    scheduler.set_needs_redraw();

    // -- simulated loop ----------------------------------------------------
    let mut delivered = 0;
    while delivered < FRAME_COUNT {
        let now = clock.now();
        let wake = [
            scheduler.timer().armed_at(),
            scheduler.begin_frame_source().next_tick_time(now),
            scheduler.client().next_event_time(),
        ]
        .into_iter()
        .flatten()
        .min();
        let Some(wake) = wake else {
            info!(target: "cadence", "nothing scheduled; stopping early");
            break;
        };
        clock.set(wake.max(now));

        while let Some(event) = scheduler.client_mut().pop_due(clock.now()) {
            deliver(&mut scheduler, event, clock.now());
        }
        if let Some(handle) = scheduler.timer_mut().take_due(clock.now()) {
            scheduler.on_deadline_timer(handle);
        }
        if let Some(args) = scheduler.begin_frame_source_mut().poll(clock.now()) {
            delivered += 1;
            scheduler.on_begin_frame(args);
        }
    }

    let snapshot = scheduler.snapshot();
    let client = scheduler.client();
    info!(
        target: "cadence",
        frames = delivered,
        main_frames = client.main_frames,
        draws = client.draws,
        "simulation finished"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&cadence_debug::snapshot::to_json(&snapshot, timebase))?
    );
    scheduler.stop();
    debug_assert!(
        !scheduler.begin_frame_source().has_observer(),
        "stop unsubscribes from the source"
    );

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let mut writer = BufWriter::new(File::create(path)?);
    cadence_debug::chrome::export(recorder.borrow().as_bytes(), timebase, &mut writer)?;

    println!("Wrote {path} ({delivered} frames)");
    Ok(())
}
