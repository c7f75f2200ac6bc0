// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A source of time for metrics which need to age or rate their
/// measurements. Substituting the clock makes decay behavior fully
/// deterministic in tests.
pub trait Clock: Send + Sync {
    /// A monotonic tick in nanoseconds from an unspecified epoch which is
    /// consistent within the process.
    fn tick(&self) -> u64;

    /// Wall-clock time in milliseconds since the unix epoch.
    fn time(&self) -> u64;
}

/// The default clock, backed by the high-resolution system timers.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn tick(&self) -> u64 {
        time::precise_time_ns()
    }

    fn time(&self) -> u64 {
        let now = time::get_time();
        now.sec as u64 * 1_000 + (now.nsec / 1_000_000) as u64
    }
}

/// A clock which only moves when told to. Both the tick and the wall
/// clock advance together.
pub struct ManualClock {
    tick: AtomicU64,
    time_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            tick: AtomicU64::new(0),
            time_ms: AtomicU64::new(0),
        }
    }

    /// Move the clock forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.tick
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
        self.time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    fn time(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.time(), 0);
        clock.advance(Duration::from_millis(1_500));
        assert_eq!(clock.tick(), 1_500_000_000);
        assert_eq!(clock.time(), 1_500);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.tick();
        let b = clock.tick();
        assert!(b >= a);
    }
}
