// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatch to several sinks at once.

use cadence_core::trace::{
    ActionEvent, BeginFrameEvent, DeadlineArmedEvent, DeadlinePlanEvent, FrameSummary,
    ObservationEvent, ScopeBeginEvent, ScopeEndEvent, StageSampleEvent, TraceSink,
};

/// A [`TraceSink`] that forwards every event to each of its sinks in
/// insertion order.
///
/// A scheduler owns a single [`Tracer`](cadence_core::trace::Tracer); this
/// lets it feed, say, a pretty printer and a recorder together.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn TraceSink>>,
}

impl core::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FanoutSink {
    /// Creates a fanout with no sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    #[must_use]
    pub fn with(mut self, sink: impl TraceSink + 'static) -> Self {
        self.push(sink);
        self
    }

    /// Adds a sink.
    pub fn push(&mut self, sink: impl TraceSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Number of sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TraceSink for FanoutSink {
    fn on_scope_begin(&mut self, e: &ScopeBeginEvent) {
        for sink in &mut self.sinks {
            sink.on_scope_begin(e);
        }
    }

    fn on_scope_end(&mut self, e: &ScopeEndEvent) {
        for sink in &mut self.sinks {
            sink.on_scope_end(e);
        }
    }

    fn on_begin_frame(&mut self, e: &BeginFrameEvent) {
        for sink in &mut self.sinks {
            sink.on_begin_frame(e);
        }
    }

    fn on_deadline_plan(&mut self, e: &DeadlinePlanEvent) {
        for sink in &mut self.sinks {
            sink.on_deadline_plan(e);
        }
    }

    fn on_action(&mut self, e: &ActionEvent) {
        for sink in &mut self.sinks {
            sink.on_action(e);
        }
    }

    fn on_deadline_armed(&mut self, e: &DeadlineArmedEvent) {
        for sink in &mut self.sinks {
            sink.on_deadline_armed(e);
        }
    }

    fn on_stage_sample(&mut self, e: &StageSampleEvent) {
        for sink in &mut self.sinks {
            sink.on_stage_sample(e);
        }
    }

    fn on_observation(&mut self, e: &ObservationEvent) {
        for sink in &mut self.sinks {
            sink.on_observation(e);
        }
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        for sink in &mut self.sinks {
            sink.on_frame_summary(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::recorder::{RecordedEvent, RecorderSink, decode};
    use cadence_core::time::HostTime;

    #[test]
    fn every_sink_sees_every_event() {
        let first = Rc::new(RefCell::new(RecorderSink::new()));
        let second = Rc::new(RefCell::new(RecorderSink::new()));
        let mut fanout = FanoutSink::new()
            .with(Rc::clone(&first))
            .with(Rc::clone(&second));
        assert_eq!(fanout.len(), 2);

        fanout.on_observation(&ObservationEvent {
            observing: true,
            timestamp: HostTime(7),
        });

        for sink in [&first, &second] {
            let events: Vec<_> = decode(sink.borrow().as_bytes()).collect();
            assert_eq!(
                events,
                [RecordedEvent::Observation(ObservationEvent {
                    observing: true,
                    timestamp: HostTime(7),
                })]
            );
        }
    }

    #[test]
    fn empty_fanout_discards() {
        let mut fanout = FanoutSink::new();
        assert!(fanout.is_empty(), "no sinks");
        fanout.on_observation(&ObservationEvent {
            observing: false,
            timestamp: HostTime(0),
        });
    }
}
