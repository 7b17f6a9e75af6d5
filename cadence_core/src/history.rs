// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixed-capacity sliding window of durations with percentile queries.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::time::Duration;

/// A sliding window over the most recent `capacity` duration samples.
///
/// Samples are kept twice: in arrival order (to know which one to evict) and
/// in sorted order (so a percentile is a single index). Both stay at most
/// `capacity` long, so insertion is `O(capacity)` in the worst case and a
/// percentile query is `O(1)`.
#[derive(Clone, Debug)]
pub struct RollingTimeDeltaHistory {
    capacity: usize,
    arrivals: VecDeque<Duration>,
    sorted: Vec<Duration>,
}

impl RollingTimeDeltaHistory {
    /// Creates an empty history holding at most `capacity` samples.
    ///
    /// A capacity of zero is promoted to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            arrivals: VecDeque::with_capacity(capacity),
            sorted: Vec::with_capacity(capacity),
        }
    }

    /// Appends a sample, evicting the oldest one once the window is full.
    pub fn insert_sample(&mut self, sample: Duration) {
        if self.arrivals.len() == self.capacity
            && let Some(oldest) = self.arrivals.pop_front()
        {
            self.remove_sorted(oldest);
        }
        self.arrivals.push_back(sample);
        let at = self.sorted.partition_point(|&d| d <= sample);
        self.sorted.insert(at, sample);
    }

    /// Returns the sample at the given percentile (`0.0..=100.0`).
    ///
    /// The result is the sample with rank `ceil(percent / 100 * len)` in
    /// ascending order. Out-of-range percentages clamp to the smallest or
    /// largest sample. An empty history reports [`Duration::ZERO`].
    #[must_use]
    pub fn percentile(&self, percent: f64) -> Duration {
        let len = self.sorted.len();
        if len == 0 {
            return Duration::ZERO;
        }
        let fraction = percent / 100.0;
        if fraction.is_nan() || fraction <= 0.0 {
            return self.sorted[0];
        }
        if fraction >= 1.0 {
            return self.sorted[len - 1];
        }
        let index = ceil_rank(fraction, len).saturating_sub(1).min(len - 1);
        self.sorted[index]
    }

    /// Number of samples currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    /// Whether no samples have been recorded since creation or the last
    /// [`clear`](Self::clear).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    /// Maximum number of samples held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates over samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = Duration> + '_ {
        self.arrivals.iter().copied()
    }

    /// Drops every sample.
    pub fn clear(&mut self) {
        self.arrivals.clear();
        self.sorted.clear();
    }

    fn remove_sorted(&mut self, sample: Duration) {
        if let Ok(at) = self.sorted.binary_search(&sample) {
            self.sorted.remove(at);
        }
    }
}

/// `ceil(fraction * len)` without `f64::ceil`, which `core` does not provide.
#[expect(
    clippy::cast_possible_truncation,
    reason = "fraction is in (0, 1) so the product is below len"
)]
fn ceil_rank(fraction: f64, len: usize) -> usize {
    let exact = fraction * len as f64;
    let floor = exact as usize;
    if (floor as f64) < exact { floor + 1 } else { floor }
}
