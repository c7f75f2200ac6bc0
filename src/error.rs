// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use thiserror::Error;

use crate::registry::MetricKind;

/// Errors surfaced synchronously at the call site. There is no
/// asynchronous error channel in this library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    /// An explicit `register` found the name occupied.
    #[error("a metric named {0} already exists")]
    NameAlreadyUsed(String),

    /// A get-or-create accessor found a metric of a different kind under
    /// the requested name.
    #[error("{name} is already registered as a {existing}")]
    TypeConflict {
        name: String,
        existing: MetricKind,
    },

    /// A quantile query outside of `[0, 1]`.
    #[error("{0} is not in [0..1]")]
    InvalidQuantile(f64),
}
