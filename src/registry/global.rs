// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A process-wide default registry, so libraries can record metrics
//! without threading a registry handle through every call site.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::MetricRegistry;

static DEFAULT: Lazy<RwLock<Option<Arc<MetricRegistry>>>> = Lazy::new(|| RwLock::new(None));

/// Install `registry` as the process-wide default, replacing any
/// previous default.
pub fn init(registry: Arc<MetricRegistry>) {
    *DEFAULT.write() = Some(registry);
    info!("default metric registry installed");
}

/// The process-wide default registry, if one has been installed.
pub fn registry() -> Option<Arc<MetricRegistry>> {
    DEFAULT.read().clone()
}

/// Uninstall the process-wide default. Handles already cloned out of
/// [`registry`] stay valid.
pub fn teardown() {
    *DEFAULT.write() = None;
}
