// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A library for instrumenting running code with named measurement
//! primitives: counters, gauges, histograms, meters, and timers.
//!
//! # Overview
//!
//! ## Registry
//! Application code creates metrics through a [`MetricRegistry`], a
//! concurrent namespace which hands out exactly one instance per name.
//! Reporters walk the registry and read each metric through its value
//! surface: a count, a set of rates, or a [`Snapshot`] of a sampled
//! distribution.
//!
//! ## Sampling
//! Histograms and timers keep a bounded [`Reservoir`] of observed values.
//! [`UniformReservoir`] holds an unweighted random sample of the whole
//! stream; [`ExponentiallyDecayingReservoir`] biases the sample toward
//! recent observations using forward-decay priority sampling.
//!
//! ## Rates
//! Meters and timers estimate throughput with exponentially-weighted
//! moving averages over 1/5/15 minute windows, decayed lazily on the
//! calling thread. No background threads are spawned by this library.

#[macro_use]
extern crate log;

mod atomic;
mod clock;
mod counter;
mod error;
mod ewma;
mod gauge;
mod histogram;
mod meter;
mod registry;
mod reservoir;
mod snapshot;
mod timer;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::counter::Counter;
pub use crate::error::MetricError;
pub use crate::ewma::Ewma;
pub use crate::gauge::{FunctionGauge, Gauge};
pub use crate::histogram::Histogram;
pub use crate::meter::Meter;
pub use crate::registry::{
    global, match_all, name_of, Metric, MetricKind, MetricRegistry, MetricRegistryListener,
    MetricSet,
};
pub use crate::reservoir::{ExponentiallyDecayingReservoir, Reservoir, UniformReservoir};
pub use crate::snapshot::Snapshot;
pub use crate::timer::{Context, Timer};
