// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::atomic::AtomicF64;

const INTERVAL_SECS: u64 = 5;
const SECONDS_PER_MINUTE: f64 = 60.0;

/// An exponentially-weighted moving average rate estimator.
///
/// Updates accumulate into a pending buffer which may be written from any
/// number of threads; the owner drains the buffer with [`tick`](Ewma::tick)
/// at a fixed nominal interval and folds the instantaneous rate into the
/// decayed rate.
pub struct Ewma {
    alpha: f64,
    interval_nanos: f64,
    uncounted: AtomicU64,
    rate: AtomicF64,
    initialized: AtomicBool,
}

impl Ewma {
    /// Create an EWMA with a given decay constant and tick interval.
    pub fn new(alpha: f64, interval: Duration) -> Self {
        Self {
            alpha,
            interval_nanos: interval.as_nanos() as f64,
            uncounted: AtomicU64::new(0),
            rate: AtomicF64::new(0.0),
            initialized: AtomicBool::new(false),
        }
    }

    /// An EWMA equivalent to the one-minute load average.
    ///
    /// The decay constant assumes [`tick`](Ewma::tick) is called every
    /// five seconds; ticking at another cadence biases the decay.
    pub fn one_minute() -> Self {
        Self::minutes(1.0)
    }

    /// An EWMA equivalent to the five-minute load average. Assumes a
    /// five-second tick cadence.
    pub fn five_minute() -> Self {
        Self::minutes(5.0)
    }

    /// An EWMA equivalent to the fifteen-minute load average. Assumes a
    /// five-second tick cadence.
    pub fn fifteen_minute() -> Self {
        Self::minutes(15.0)
    }

    fn minutes(minutes: f64) -> Self {
        let alpha = 1.0 - (-(INTERVAL_SECS as f64) / SECONDS_PER_MINUTE / minutes).exp();
        Self::new(alpha, Duration::from_secs(INTERVAL_SECS))
    }

    /// Add `n` events to the pending buffer.
    pub fn update(&self, n: u64) {
        self.uncounted.fetch_add(n, Ordering::Relaxed);
    }

    /// Drain the pending buffer and decay the rate by one interval.
    ///
    /// The very first tick seeds the rate with the instantaneous rate
    /// directly instead of blending with the zero initial value.
    pub fn tick(&self) {
        let count = self.uncounted.swap(0, Ordering::Relaxed) as f64;
        let instant_rate = count / self.interval_nanos;
        if self.initialized.load(Ordering::Acquire) {
            let rate = self.rate.load(Ordering::Relaxed);
            self.rate
                .store(rate + self.alpha * (instant_rate - rate), Ordering::Relaxed);
        } else {
            self.rate.store(instant_rate, Ordering::Relaxed);
            self.initialized.store(true, Ordering::Release);
        }
    }

    /// The decayed rate in events per `unit`.
    pub fn rate(&self, unit: Duration) -> f64 {
        self.rate.load(Ordering::Relaxed) * unit.as_nanos() as f64
    }
}
