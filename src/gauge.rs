// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

/// An instantaneous measurement supplied by the caller, for example queue
/// depth or cache occupancy. The library never interprets the value; it
/// only reads it on behalf of reporters.
pub trait Gauge: Send + Sync {
    /// The current value.
    fn value(&self) -> f64;
}

/// A [`Gauge`] backed by a closure.
pub struct FunctionGauge<F> {
    function: F,
}

impl<F> FunctionGauge<F>
where
    F: Fn() -> f64 + Send + Sync,
{
    pub fn new(function: F) -> Self {
        Self { function }
    }
}

impl<F> Gauge for FunctionGauge<F>
where
    F: Fn() -> f64 + Send + Sync,
{
    fn value(&self) -> f64 {
        (self.function)()
    }
}
