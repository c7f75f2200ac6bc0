// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::histogram::Histogram;
use crate::meter::Meter;
use crate::reservoir::{ExponentiallyDecayingReservoir, Reservoir};
use crate::snapshot::Snapshot;

/// Measures both the distribution of event durations, through a histogram
/// of nanosecond values, and the rate at which events occur, through a
/// meter marked once per recorded duration.
pub struct Timer {
    histogram: Histogram,
    meter: Meter,
    clock: Arc<dyn Clock>,
}

impl Timer {
    /// A timer sampling durations with the default exponentially decaying
    /// reservoir and the system clock.
    pub fn new() -> Self {
        Self::with(
            Box::new(ExponentiallyDecayingReservoir::default()),
            Arc::new(SystemClock),
        )
    }

    /// A timer with a caller-chosen reservoir and clock.
    pub fn with(reservoir: Box<dyn Reservoir>, clock: Arc<dyn Clock>) -> Self {
        Self {
            histogram: Histogram::with_reservoir(reservoir),
            meter: Meter::with_clock(clock.clone()),
            clock,
        }
    }

    /// Add a recorded duration.
    pub fn update(&self, duration: Duration) {
        self.update_nanos(duration.as_nanos() as i64);
    }

    // A negative duration means the clock ran backwards between start and
    // stop; drop it rather than corrupting the distribution.
    pub(crate) fn update_nanos(&self, nanos: i64) {
        if nanos >= 0 {
            self.histogram.update(nanos);
            self.meter.mark(1);
        }
    }

    /// Begin timing an event. The returned context records the elapsed
    /// time when stopped or dropped, so the duration lands in the timer
    /// on every exit path.
    pub fn time(&self) -> Context<'_> {
        Context {
            timer: self,
            start_tick: self.clock.tick(),
            stopped: false,
        }
    }

    /// Time the execution of `f`, recording its duration even if it
    /// panics, and return its result.
    pub fn time_fn<T>(&self, f: impl FnOnce() -> T) -> T {
        let _context = self.time();
        f()
    }

    /// The total number of durations recorded.
    pub fn count(&self) -> i64 {
        self.histogram.count()
    }

    /// A snapshot of the sampled durations, in nanoseconds.
    pub fn snapshot(&self) -> Snapshot {
        self.histogram.snapshot()
    }

    /// The mean rate in events per second since the timer was created.
    pub fn mean_rate(&self) -> f64 {
        self.meter.mean_rate()
    }

    /// The one-minute moving average rate in events per second.
    pub fn one_minute_rate(&self) -> f64 {
        self.meter.one_minute_rate()
    }

    /// The five-minute moving average rate in events per second.
    pub fn five_minute_rate(&self) -> f64 {
        self.meter.five_minute_rate()
    }

    /// The fifteen-minute moving average rate in events per second.
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.meter.fifteen_minute_rate()
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer").finish()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-flight timing measurement. Dropping the context records the
/// elapsed time; [`stop`](Context::stop) does the same and also returns
/// the elapsed nanoseconds.
pub struct Context<'a> {
    timer: &'a Timer,
    start_tick: u64,
    stopped: bool,
}

impl Context<'_> {
    /// Stop the measurement, record it, and return the elapsed time in
    /// nanoseconds.
    pub fn stop(mut self) -> i64 {
        self.record()
    }

    fn record(&mut self) -> i64 {
        self.stopped = true;
        let elapsed = self.timer.clock.tick() as i64 - self.start_tick as i64;
        self.timer.update_nanos(elapsed);
        elapsed
    }
}

impl Drop for Context<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            self.record();
        }
    }
}
