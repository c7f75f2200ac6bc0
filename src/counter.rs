// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::sync::atomic::{AtomicI64, Ordering};

/// A signed atomic counter which can be shared across threads with many
/// writers. The value is the algebraic sum of all increments and
/// decrements since creation or the last [`clear`](Counter::clear).
#[derive(Default)]
pub struct Counter {
    count: AtomicI64,
}

impl Counter {
    /// Create a new zeroed counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the counter by `count`.
    pub fn incr(&self, count: i64) {
        self.count.fetch_add(count, Ordering::Relaxed);
    }

    /// Decrement the counter by `count`.
    pub fn decr(&self, count: i64) {
        self.count.fetch_sub(count, Ordering::Relaxed);
    }

    /// The current value.
    pub fn count(&self) -> i64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Reset the value to zero.
    pub fn clear(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}
