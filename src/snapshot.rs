// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::MetricError;

/// An immutable, sorted view of the values held by a reservoir at the
/// moment it was read. Produced once, queried many times.
pub struct Snapshot {
    values: Vec<i64>,
}

impl Snapshot {
    /// Create a snapshot from an unordered set of sampled values.
    pub fn new(mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self { values }
    }

    /// The value at the given quantile, for `quantile` in `[0, 1]`.
    ///
    /// Fractional ranks are resolved by linear interpolation between the
    /// two bracketing order statistics, not by nearest rank. An empty
    /// snapshot reads as zero at every quantile.
    pub fn quantile(&self, quantile: f64) -> Result<f64, MetricError> {
        if !(0.0..=1.0).contains(&quantile) {
            return Err(MetricError::InvalidQuantile(quantile));
        }
        Ok(self.value_at(quantile))
    }

    // caller has validated the quantile
    fn value_at(&self, quantile: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }

        let pos = quantile * (self.values.len() + 1) as f64;
        let index = pos as usize;

        if index < 1 {
            return self.values[0] as f64;
        }
        if index >= self.values.len() {
            return self.values[self.values.len() - 1] as f64;
        }

        let lower = self.values[index - 1] as f64;
        let upper = self.values[index] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }

    /// The median of the snapshot.
    pub fn median(&self) -> f64 {
        self.value_at(0.5)
    }

    /// The 75th percentile of the snapshot.
    pub fn p75(&self) -> f64 {
        self.value_at(0.75)
    }

    /// The 95th percentile of the snapshot.
    pub fn p95(&self) -> f64 {
        self.value_at(0.95)
    }

    /// The 98th percentile of the snapshot.
    pub fn p98(&self) -> f64 {
        self.value_at(0.98)
    }

    /// The 99th percentile of the snapshot.
    pub fn p99(&self) -> f64 {
        self.value_at(0.99)
    }

    /// The 99.9th percentile of the snapshot.
    pub fn p999(&self) -> f64 {
        self.value_at(0.999)
    }

    /// The number of values in the snapshot.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    /// The entire set of values, ascending.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// The lowest value in the snapshot, zero when empty.
    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    /// The highest value in the snapshot, zero when empty.
    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// The arithmetic mean of the values, zero when empty.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.values.iter().map(|v| *v as f64).sum();
        sum / self.values.len() as f64
    }

    /// The sample standard deviation of the values, zero for fewer than
    /// two values.
    pub fn std_dev(&self) -> f64 {
        // two-pass algorithm for variance, avoids numeric overflow
        if self.values.len() <= 1 {
            return 0.0;
        }
        let mean = self.mean();
        let sum: f64 = self
            .values
            .iter()
            .map(|v| {
                let diff = *v as f64 - mean;
                diff * diff
            })
            .sum();
        (sum / (self.values.len() - 1) as f64).sqrt()
    }
}
