// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::ewma::Ewma;

const TICK_INTERVAL: u64 = 5_000_000_000; // five seconds
const SECOND: Duration = Duration::from_secs(1);

/// Measures the rate at which events occur: a total count, the mean rate
/// since creation, and 1/5/15 minute exponentially-weighted moving
/// average rates.
///
/// Decay is applied lazily on the calling thread: marks and rate reads
/// first catch the EWMAs up on however many five-second intervals have
/// elapsed, so a meter that goes quiet still reports correctly decayed
/// rates when next queried.
pub struct Meter {
    m1_rate: Ewma,
    m5_rate: Ewma,
    m15_rate: Ewma,
    count: AtomicU64,
    start_tick: u64,
    last_tick: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl Meter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let start_tick = clock.tick();
        Self {
            m1_rate: Ewma::one_minute(),
            m5_rate: Ewma::five_minute(),
            m15_rate: Ewma::fifteen_minute(),
            count: AtomicU64::new(0),
            start_tick,
            last_tick: AtomicU64::new(start_tick),
            clock,
        }
    }

    /// Mark the occurrence of `n` events.
    pub fn mark(&self, n: u64) {
        self.tick_if_necessary();
        self.count.fetch_add(n, Ordering::Relaxed);
        self.m1_rate.update(n);
        self.m5_rate.update(n);
        self.m15_rate.update(n);
    }

    /// The number of events which have been marked.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// The mean rate in events per second since the meter was created.
    /// Computed directly from the count with no decay; zero until the
    /// first event.
    pub fn mean_rate(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            return 0.0;
        }
        let elapsed = self.clock.tick().saturating_sub(self.start_tick);
        if elapsed == 0 {
            return 0.0;
        }
        count as f64 / elapsed as f64 * 1e9
    }

    /// The one-minute moving average rate in events per second.
    pub fn one_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m1_rate.rate(SECOND)
    }

    /// The five-minute moving average rate in events per second.
    pub fn five_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m5_rate.rate(SECOND)
    }

    /// The fifteen-minute moving average rate in events per second.
    pub fn fifteen_minute_rate(&self) -> f64 {
        self.tick_if_necessary();
        self.m15_rate.rate(SECOND)
    }

    // Apply one tick's worth of decay per elapsed five-second interval.
    // The compare-and-swap on the last tick marker means concurrent
    // callers racing through here apply the elapsed intervals exactly
    // once between them.
    fn tick_if_necessary(&self) {
        let old_tick = self.last_tick.load(Ordering::SeqCst);
        let new_tick = self.clock.tick();
        let age = new_tick.saturating_sub(old_tick);
        if age > TICK_INTERVAL {
            let latest = new_tick - age % TICK_INTERVAL;
            if self
                .last_tick
                .compare_exchange(old_tick, latest, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                let required_ticks = age / TICK_INTERVAL;
                for _ in 0..required_ticks {
                    self.m1_rate.tick();
                    self.m5_rate.tick();
                    self.m15_rate.tick();
                }
            }
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn starts_out_with_no_rates_or_count() {
        let meter = Meter::new();
        assert_eq!(meter.count(), 0);
        assert_eq!(meter.mean_rate(), 0.0);
        assert_eq!(meter.one_minute_rate(), 0.0);
        assert_eq!(meter.five_minute_rate(), 0.0);
        assert_eq!(meter.fifteen_minute_rate(), 0.0);
    }

    #[test]
    fn marks_events_and_updates_rates() {
        let clock = Arc::new(ManualClock::new());
        let meter = Meter::with_clock(clock.clone());
        meter.mark(1);
        meter.mark(2);
        clock.advance(Duration::from_secs(10));

        assert_eq!(meter.count(), 3);
        assert!((meter.mean_rate() - 0.3).abs() < 1e-9);
        // two ticks elapsed: the first seeds 0.6/s, the second decays
        // with no new events
        let m1_alpha = 1.0 - (-5.0 / 60.0f64).exp();
        let expected = 0.6 * (1.0 - m1_alpha);
        assert!((meter.one_minute_rate() - expected).abs() < 1e-9);
    }

    #[test]
    fn windowed_rates_need_a_full_interval() {
        let clock = Arc::new(ManualClock::new());
        let meter = Meter::with_clock(clock.clone());
        meter.mark(5);
        // less than one tick interval: the marks are still pending
        clock.advance(Duration::from_secs(4));
        assert_eq!(meter.one_minute_rate(), 0.0);
        // crossing the interval drains them
        clock.advance(Duration::from_secs(2));
        assert!((meter.one_minute_rate() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn idle_meter_decays_toward_zero_on_read() {
        let clock = Arc::new(ManualClock::new());
        let meter = Meter::with_clock(clock.clone());
        meter.mark(1_000);
        clock.advance(Duration::from_secs(10));
        let busy = meter.one_minute_rate();
        assert!(busy > 0.0);

        clock.advance(Duration::from_secs(30 * 60));
        let idle = meter.one_minute_rate();
        assert!(idle < 1e-6);
        assert!(idle < busy);
    }

    #[test]
    fn mean_rate_ignores_decay() {
        let clock = Arc::new(ManualClock::new());
        let meter = Meter::with_clock(clock.clone());
        meter.mark(60);
        clock.advance(Duration::from_secs(60));
        assert!((meter.mean_rate() - 1.0).abs() < 1e-9);
        clock.advance(Duration::from_secs(60));
        assert!((meter.mean_rate() - 0.5).abs() < 1e-9);
    }
}
