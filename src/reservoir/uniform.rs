// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::cmp::min;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use rand::Rng;

use super::Reservoir;
use crate::snapshot::Snapshot;

const DEFAULT_SIZE: usize = 1028;

/// A random sample of a stream using Vitter's Algorithm R.
///
/// Every value seen so far has equal probability of residing in the
/// reservoir regardless of arrival order, which makes the derived
/// statistics valid over the full lifetime of the stream rather than a
/// recent window.
pub struct UniformReservoir {
    count: AtomicU64,
    values: Vec<AtomicI64>,
}

impl UniformReservoir {
    /// Create a reservoir holding up to `capacity` values.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0);
        Self {
            count: AtomicU64::new(0),
            values: (0..capacity).map(|_| AtomicI64::new(0)).collect(),
        }
    }
}

impl Default for UniformReservoir {
    /// A reservoir of 1028 values, which offers a 99.9% confidence level
    /// with a 5% margin of error assuming a normal distribution.
    fn default() -> Self {
        Self::new(DEFAULT_SIZE)
    }
}

impl Reservoir for UniformReservoir {
    fn size(&self) -> usize {
        min(self.count.load(Ordering::Relaxed), self.values.len() as u64) as usize
    }

    fn update(&self, value: i64) {
        let count = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        if count <= self.values.len() as u64 {
            self.values[(count - 1) as usize].store(value, Ordering::Relaxed);
        } else {
            // replace a random slot with probability capacity / count
            let slot = rand::thread_rng().gen_range(0..count);
            if (slot as usize) < self.values.len() {
                self.values[slot as usize].store(value, Ordering::Relaxed);
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        let size = self.size();
        Snapshot::new(
            self.values[..size]
                .iter()
                .map(|value| value.load(Ordering::Relaxed))
                .collect(),
        )
    }
}
