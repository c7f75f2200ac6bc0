// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::counter::Counter;
use crate::reservoir::{ExponentiallyDecayingReservoir, Reservoir};
use crate::snapshot::Snapshot;

/// Measures the distribution of a stream of values with a bounded
/// reservoir sample.
///
/// The counter is the authoritative total number of observations and is
/// independent of whatever the reservoir has evicted.
pub struct Histogram {
    reservoir: Box<dyn Reservoir>,
    count: Counter,
}

impl Histogram {
    /// A histogram sampling with the default exponentially decaying
    /// reservoir, biased toward recent values.
    pub fn new() -> Self {
        Self::with_reservoir(Box::new(ExponentiallyDecayingReservoir::default()))
    }

    /// A histogram sampling with a caller-chosen reservoir.
    pub fn with_reservoir(reservoir: Box<dyn Reservoir>) -> Self {
        Self {
            reservoir,
            count: Counter::new(),
        }
    }

    /// Add a recorded value.
    pub fn update(&self, value: i64) {
        self.count.incr(1);
        self.reservoir.update(value);
    }

    /// The total number of values recorded.
    pub fn count(&self) -> i64 {
        self.count.count()
    }

    /// A snapshot of the sampled distribution.
    pub fn snapshot(&self) -> Snapshot {
        self.reservoir.snapshot()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}
