// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::cmp::min;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::Rng;

use super::Reservoir;
use crate::clock::{Clock, SystemClock};
use crate::snapshot::Snapshot;

const DEFAULT_SIZE: usize = 1028;
const DEFAULT_ALPHA: f64 = 0.015;
const RESCALE_THRESHOLD: u64 = 60 * 60 * 1_000_000_000; // one hour

/// A reservoir which is exponentially biased toward recent values, using
/// Cormode et al's forward-decay priority sampling.
///
/// Each observation is stored under the priority
/// `exp(alpha * (t - landmark)) / u` where `u` is a fresh uniform draw in
/// `(0, 1]`; when full, a new observation displaces the current minimum
/// only if its priority is higher. Because the weight grows without bound
/// as time passes, the landmark is moved forward once per hour and every
/// stored priority is rescaled by a constant factor, which changes the
/// floating point representation but not the relative order or weight
/// ratios of the entries.
pub struct ExponentiallyDecayingReservoir {
    // priorities are always positive, so the IEEE-754 bit pattern of the
    // priority orders identically to its numeric value
    values: Mutex<BTreeMap<u64, i64>>,
    // updates and snapshots share this lock; rescale and clear take it
    // exclusively
    lock: RwLock<()>,
    alpha: f64,
    capacity: usize,
    count: AtomicU64,
    start_time: AtomicI64,
    next_scale_time: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl ExponentiallyDecayingReservoir {
    /// Create a reservoir holding up to `capacity` values, where `alpha`
    /// is the exponential decay factor: the higher it is, the more the
    /// reservoir is biased toward newer values.
    pub fn new(capacity: usize, alpha: f64) -> Self {
        Self::with_clock(capacity, alpha, Arc::new(SystemClock))
    }

    /// Create a reservoir which timestamps samples and schedules rescales
    /// against the supplied clock.
    pub fn with_clock(capacity: usize, alpha: f64, clock: Arc<dyn Clock>) -> Self {
        assert!(capacity > 0);
        let start_time = current_time_seconds(&*clock);
        let next_scale_time = clock.tick() + RESCALE_THRESHOLD;
        Self {
            values: Mutex::new(BTreeMap::new()),
            lock: RwLock::new(()),
            alpha,
            capacity,
            count: AtomicU64::new(0),
            start_time: AtomicI64::new(start_time),
            next_scale_time: AtomicU64::new(next_scale_time),
            clock,
        }
    }

    /// Add a value with a caller-supplied timestamp, for replaying aged
    /// samples. `timestamp` is seconds since the unix epoch.
    pub fn update_at(&self, value: i64, timestamp: i64) {
        self.rescale_if_needed();
        let _shared = self.lock.read();

        let weight = self.weight(timestamp - self.start_time.load(Ordering::SeqCst));
        // a fresh draw in (0, 1] per insertion keeps the priority finite
        // and turns highest-decayed-weight into a statistically valid
        // sample rather than a deterministic top-k
        let divisor: f64 = 1.0 - rand::thread_rng().gen::<f64>();
        let priority = (weight / divisor).to_bits();

        self.offer(priority, value);
    }

    fn offer(&self, priority: u64, value: i64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let mut values = self.values.lock();
        if values.len() < self.capacity {
            values.insert(priority, value);
        } else if let Some((&first, _)) = values.iter().next() {
            // evict the minimum only when the new entry actually lands;
            // on a priority collision the sample already stored under
            // that priority survives and the newcomer is dropped
            if first < priority {
                if let Entry::Vacant(vacant) = values.entry(priority) {
                    vacant.insert(value);
                    values.remove(&first);
                }
            }
        }
    }

    /// Reset the reservoir: all samples are dropped, the landmark moves
    /// to the present, and the next rescale is rescheduled.
    pub fn clear(&self) {
        let _exclusive = self.lock.write();
        self.values.lock().clear();
        self.count.store(0, Ordering::SeqCst);
        self.start_time
            .store(current_time_seconds(&*self.clock), Ordering::SeqCst);
        self.next_scale_time
            .store(self.clock.tick() + RESCALE_THRESHOLD, Ordering::SeqCst);
    }

    fn weight(&self, age_seconds: i64) -> f64 {
        (self.alpha * age_seconds as f64).exp()
    }

    fn rescale_if_needed(&self) {
        let now = self.clock.tick();
        let next = self.next_scale_time.load(Ordering::SeqCst);
        if now >= next {
            self.rescale(now, next);
        }
    }

    // Move the landmark forward and multiply every stored priority by
    // exp(-alpha * (L' - L)). Relative order and relative weight ratios
    // are unchanged; only the floating point magnitudes shrink back into
    // range. Linear pass over at most `capacity` entries, under the
    // exclusive lock.
    fn rescale(&self, now: u64, next: u64) {
        if self
            .next_scale_time
            .compare_exchange(next, now + RESCALE_THRESHOLD, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // another thread has already rescaled this window
            return;
        }

        let _exclusive = self.lock.write();
        let old_start_time = self.start_time.load(Ordering::SeqCst);
        let new_start_time = current_time_seconds(&*self.clock);
        self.start_time.store(new_start_time, Ordering::SeqCst);
        let scaling_factor = (-self.alpha * (new_start_time - old_start_time) as f64).exp();

        let mut values = self.values.lock();
        let old = std::mem::take(&mut *values);
        for (priority, value) in old {
            let scaled = f64::from_bits(priority) * scaling_factor;
            values.insert(scaled.to_bits(), value);
        }
        // keep the counter in sync with the number of stored samples
        self.count.store(values.len() as u64, Ordering::SeqCst);

        trace!(
            "rescaled reservoir: landmark {} -> {} factor {}",
            old_start_time,
            new_start_time,
            scaling_factor
        );
    }
}

impl Default for ExponentiallyDecayingReservoir {
    /// A reservoir of 1028 values with an alpha of 0.015, which heavily
    /// biases the sample toward the past five minutes of measurements.
    fn default() -> Self {
        Self::new(DEFAULT_SIZE, DEFAULT_ALPHA)
    }
}

impl Reservoir for ExponentiallyDecayingReservoir {
    fn size(&self) -> usize {
        min(self.count.load(Ordering::Relaxed), self.capacity as u64) as usize
    }

    fn update(&self, value: i64) {
        self.update_at(value, current_time_seconds(&*self.clock));
    }

    fn snapshot(&self) -> Snapshot {
        let _shared = self.lock.read();
        let values = self.values.lock();
        Snapshot::new(values.values().copied().collect())
    }
}

fn current_time_seconds(clock: &dyn Clock) -> i64 {
    (clock.time() / 1_000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn holds_everything_below_capacity() {
        let reservoir = ExponentiallyDecayingReservoir::new(100, 0.99);
        for i in 0..50 {
            reservoir.update(i);
        }
        assert_eq!(reservoir.size(), 50);

        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.size(), 50);
        assert_eq!(snapshot.min(), 0);
        assert_eq!(snapshot.max(), 49);
    }

    #[test]
    fn is_bounded_by_capacity() {
        let reservoir = ExponentiallyDecayingReservoir::new(100, 0.99);
        for i in 0..1_000 {
            reservoir.update(i);
            assert!(reservoir.size() <= 100);
        }
        assert_eq!(reservoir.size(), 100);

        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.size(), 100);
        for value in snapshot.values() {
            assert!((0..1_000).contains(value));
        }
    }

    #[test]
    fn rescale_preserves_sample_membership() {
        let clock = Arc::new(ManualClock::new());
        let reservoir = ExponentiallyDecayingReservoir::with_clock(1_000, 0.015, clock.clone());
        for i in 1..=100 {
            reservoir.update(i);
        }

        // cross the one-hour rescale deadline; the next update triggers
        // the landmark advance
        clock.advance(Duration::from_secs(2 * 60 * 60));
        reservoir.update(101);

        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.size(), 101);
        let expected: Vec<i64> = (1..=101).collect();
        assert_eq!(snapshot.values(), expected.as_slice());
    }

    #[test]
    fn favors_recent_values_over_spaced_out_updates() {
        let clock = Arc::new(ManualClock::new());
        let reservoir = ExponentiallyDecayingReservoir::with_clock(10, 0.015, clock.clone());
        // old batch, then a long quiet period, then a new batch
        for i in 0..1_000 {
            reservoir.update(i);
        }
        clock.advance(Duration::from_secs(15 * 60));
        for i in 2_000..3_000 {
            reservoir.update(i);
        }

        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.size(), 10);
        assert!(snapshot.min() >= 2_000);
    }

    #[test]
    fn clear_resets_the_sample() {
        let reservoir = ExponentiallyDecayingReservoir::new(10, 0.015);
        for i in 0..100 {
            reservoir.update(i);
        }
        reservoir.clear();
        assert_eq!(reservoir.size(), 0);
        assert_eq!(reservoir.snapshot().size(), 0);
        reservoir.update(7);
        assert_eq!(reservoir.snapshot().values(), &[7]);
    }

    #[test]
    fn priority_collision_keeps_the_stored_sample() {
        let reservoir = ExponentiallyDecayingReservoir::new(2, 0.015);
        reservoir.offer(1, 10);
        reservoir.offer(2, 20);

        // at capacity, a colliding priority drops the newcomer
        reservoir.offer(2, 99);
        assert_eq!(reservoir.snapshot().values(), &[10, 20]);

        // a fresh higher priority still evicts the minimum
        reservoir.offer(3, 30);
        assert_eq!(reservoir.snapshot().values(), &[20, 30]);
    }

    #[test]
    fn replayed_timestamps_land_in_the_sample() {
        let clock = Arc::new(ManualClock::new());
        let reservoir = ExponentiallyDecayingReservoir::with_clock(10, 0.015, clock);
        reservoir.update_at(42, 0);
        assert_eq!(reservoir.snapshot().values(), &[42]);
    }

    #[test]
    fn concurrent_updates_stay_bounded() {
        let reservoir = Arc::new(ExponentiallyDecayingReservoir::new(64, 0.015));

        let mut threads = Vec::new();
        for t in 0..4 {
            let reservoir = reservoir.clone();
            threads.push(thread::spawn(move || {
                for i in 0..10_000 {
                    reservoir.update(t * 10_000 + i);
                }
            }));
        }
        // snapshot concurrently with the writers
        for _ in 0..100 {
            assert!(reservoir.snapshot().size() <= 64);
        }
        for thread in threads {
            thread.join().expect("failed to join child thread");
        }

        assert_eq!(reservoir.size(), 64);
        assert_eq!(reservoir.snapshot().size(), 64);
    }
}
