// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host clock reads.

use rustix::time::{ClockId, Timespec, clock_gettime};

use cadence_core::clock::Clock;
use cadence_core::time::{Duration, HostTime, Timebase};

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Returns the host [`Timebase`]: host ticks are nanoseconds.
#[must_use]
pub const fn timebase() -> Timebase {
    Timebase::NANOS
}

/// Returns the current monotonic host time in nanoseconds.
#[must_use]
pub fn now() -> HostTime {
    timespec_to_host_time(clock_gettime(ClockId::Monotonic))
}

/// A [`Clock`] reading `CLOCK_MONOTONIC`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonotonicClock;

impl MonotonicClock {
    /// Creates the clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> HostTime {
        now()
    }
}

/// Converts a host duration to a [`std::time::Duration`].
#[must_use]
pub fn to_std(duration: Duration) -> std::time::Duration {
    std::time::Duration::from_nanos(duration.to_nanos(timebase()))
}

fn timespec_to_host_time(timespec: Timespec) -> HostTime {
    let seconds = u64::try_from(timespec.tv_sec).unwrap_or(0);
    let nanos = u64::try_from(timespec.tv_nsec)
        .unwrap_or(0)
        .min(999_999_999);

    let ticks_u128 = u128::from(seconds)
        .saturating_mul(NANOS_PER_SECOND)
        .saturating_add(u128::from(nanos));
    let ticks = u64::try_from(ticks_u128).unwrap_or(u64::MAX);
    HostTime(ticks)
}

#[cfg(test)]
mod tests {
    use super::{MonotonicClock, timebase, timespec_to_host_time, to_std};
    use cadence_core::clock::Clock;
    use cadence_core::time::{Duration, HostTime, Timebase};
    use rustix::time::Timespec;

    #[test]
    fn timebase_is_nanos_identity() {
        assert_eq!(timebase(), Timebase::NANOS);
    }

    #[test]
    fn clock_is_monotonic_non_decreasing() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first, "monotonic clock should not go backwards");
        assert!(first.ticks() > 0, "clock_gettime(monotonic) should be positive");
    }

    #[test]
    fn timespec_conversion_builds_nanosecond_ticks() {
        let input = Timespec {
            tv_sec: 12,
            tv_nsec: 345_678_901,
        };
        let expected = HostTime(12 * 1_000_000_000 + 345_678_901);
        assert_eq!(timespec_to_host_time(input), expected);
    }

    #[test]
    fn timespec_conversion_saturates_on_large_values() {
        let input = Timespec {
            tv_sec: i64::MAX,
            tv_nsec: 999_999_999,
        };
        assert_eq!(timespec_to_host_time(input), HostTime(u64::MAX));
    }

    #[test]
    fn negative_seconds_clamp_to_zero() {
        let input = Timespec {
            tv_sec: -5,
            tv_nsec: 10,
        };
        assert_eq!(timespec_to_host_time(input), HostTime(10));
    }

    #[test]
    fn std_conversion_keeps_nanoseconds() {
        assert_eq!(
            to_std(Duration::from_millis(3)),
            std::time::Duration::from_millis(3)
        );
    }
}
