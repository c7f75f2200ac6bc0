// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

mod decaying;
mod uniform;

pub use self::decaying::ExponentiallyDecayingReservoir;
pub use self::uniform::UniformReservoir;

use crate::snapshot::Snapshot;

/// A bounded, statistically representative sample of a much larger
/// (possibly unbounded) stream of values.
pub trait Reservoir: Send + Sync {
    /// The number of values currently held.
    fn size(&self) -> usize;

    /// Add a new value to the sample.
    fn update(&self, value: i64);

    /// A snapshot of the current sample.
    fn snapshot(&self) -> Snapshot;
}
