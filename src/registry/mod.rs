// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod global;

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::counter::Counter;
use crate::error::MetricError;
use crate::gauge::Gauge;
use crate::histogram::Histogram;
use crate::meter::Meter;
use crate::timer::Timer;

/// A registered metric instance of any kind.
#[derive(Clone)]
pub enum Metric {
    Gauge(Arc<dyn Gauge>),
    Counter(Arc<Counter>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Meter(_) => MetricKind::Meter,
            Metric::Timer(_) => MetricKind::Timer,
        }
    }
}

impl From<Arc<dyn Gauge>> for Metric {
    fn from(gauge: Arc<dyn Gauge>) -> Self {
        Metric::Gauge(gauge)
    }
}

impl From<Arc<Counter>> for Metric {
    fn from(counter: Arc<Counter>) -> Self {
        Metric::Counter(counter)
    }
}

impl From<Arc<Histogram>> for Metric {
    fn from(histogram: Arc<Histogram>) -> Self {
        Metric::Histogram(histogram)
    }
}

impl From<Arc<Meter>> for Metric {
    fn from(meter: Arc<Meter>) -> Self {
        Metric::Meter(meter)
    }
}

impl From<Arc<Timer>> for Metric {
    fn from(timer: Arc<Timer>) -> Self {
        Metric::Timer(timer)
    }
}

/// The kind of a registered metric.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
    Histogram,
    Meter,
    Timer,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Histogram => write!(f, "histogram"),
            MetricKind::Meter => write!(f, "meter"),
            MetricKind::Timer => write!(f, "timer"),
        }
    }
}

/// Notified synchronously, in subscription order, from whichever thread
/// registers or removes a metric. Every method has a no-op default body,
/// so listeners implement only the events they care about.
pub trait MetricRegistryListener: Send + Sync {
    fn on_gauge_added(&self, _name: &str, _gauge: &Arc<dyn Gauge>) {}
    fn on_gauge_removed(&self, _name: &str) {}
    fn on_counter_added(&self, _name: &str, _counter: &Arc<Counter>) {}
    fn on_counter_removed(&self, _name: &str) {}
    fn on_histogram_added(&self, _name: &str, _histogram: &Arc<Histogram>) {}
    fn on_histogram_removed(&self, _name: &str) {}
    fn on_meter_added(&self, _name: &str, _meter: &Arc<Meter>) {}
    fn on_meter_removed(&self, _name: &str) {}
    fn on_timer_added(&self, _name: &str, _timer: &Arc<Timer>) {}
    fn on_timer_removed(&self, _name: &str) {}
}

/// A named bundle of metrics which registers as a unit under a common
/// prefix.
pub trait MetricSet {
    /// The member metrics, keyed by name relative to the set.
    fn metrics(&self) -> Vec<(String, Metric)>;
}

/// Concatenate name segments with `.`, skipping empty segments.
pub fn name_of(parts: &[&str]) -> String {
    let mut name = String::new();
    for part in parts {
        if part.is_empty() {
            continue;
        }
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(part);
    }
    name
}

/// A filter which matches every metric.
pub fn match_all(_name: &str, _metric: &Metric) -> bool {
    true
}

macro_rules! filtered_view {
    ($(#[$attr:meta])* $fn_name:ident, $variant:ident, $ty:ty) => {
        $(#[$attr])*
        pub fn $fn_name(&self, filter: impl Fn(&str, &Metric) -> bool) -> BTreeMap<String, $ty> {
            self.metrics
                .read()
                .iter()
                .filter(|(name, metric)| filter(name, metric))
                .filter_map(|(name, metric)| match metric {
                    Metric::$variant(inner) => Some((name.clone(), inner.clone())),
                    _ => None,
                })
                .collect()
        }
    };
}

/// A concurrent namespace of uniquely named metrics with get-or-create
/// semantics: at most one metric instance exists per name at any time.
pub struct MetricRegistry {
    metrics: RwLock<HashMap<String, Metric>>,
    listeners: Mutex<Vec<Arc<dyn MetricRegistryListener>>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Register `metric` under `name`, failing loudly if the name is
    /// already in use.
    pub fn register<M: Into<Metric>>(&self, name: &str, metric: M) -> Result<(), MetricError> {
        let metric = metric.into();
        {
            let mut metrics = self.metrics.write();
            match metrics.entry(name.to_string()) {
                Entry::Occupied(_) => {
                    return Err(MetricError::NameAlreadyUsed(name.to_string()));
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(metric.clone());
                }
            }
        }
        debug!("register metric: {} kind: {}", name, metric.kind());
        self.notify_added(name, &metric);
        Ok(())
    }

    /// Register every member of `set` under `prefix`, joined with dots.
    /// Fails on the first member whose name is already in use; members
    /// registered before the failure stay registered.
    pub fn register_set(&self, prefix: &str, set: &dyn MetricSet) -> Result<(), MetricError> {
        for (suffix, metric) in set.metrics() {
            self.register(&name_of(&[prefix, &suffix]), metric)?;
        }
        Ok(())
    }

    /// The counter registered under `name`, created if absent.
    pub fn counter(&self, name: &str) -> Result<Arc<Counter>, MetricError> {
        self.get_or_add(
            name,
            |metric| match metric {
                Metric::Counter(counter) => Some(counter.clone()),
                _ => None,
            },
            || {
                let counter = Arc::new(Counter::new());
                (counter.clone(), Metric::Counter(counter))
            },
        )
    }

    /// The histogram registered under `name`, created if absent with the
    /// default exponentially decaying reservoir.
    pub fn histogram(&self, name: &str) -> Result<Arc<Histogram>, MetricError> {
        self.get_or_add(
            name,
            |metric| match metric {
                Metric::Histogram(histogram) => Some(histogram.clone()),
                _ => None,
            },
            || {
                let histogram = Arc::new(Histogram::new());
                (histogram.clone(), Metric::Histogram(histogram))
            },
        )
    }

    /// The meter registered under `name`, created if absent.
    pub fn meter(&self, name: &str) -> Result<Arc<Meter>, MetricError> {
        self.get_or_add(
            name,
            |metric| match metric {
                Metric::Meter(meter) => Some(meter.clone()),
                _ => None,
            },
            || {
                let meter = Arc::new(Meter::new());
                (meter.clone(), Metric::Meter(meter))
            },
        )
    }

    /// The timer registered under `name`, created if absent.
    pub fn timer(&self, name: &str) -> Result<Arc<Timer>, MetricError> {
        self.get_or_add(
            name,
            |metric| match metric {
                Metric::Timer(timer) => Some(timer.clone()),
                _ => None,
            },
            || {
                let timer = Arc::new(Timer::new());
                (timer.clone(), Metric::Timer(timer))
            },
        )
    }

    /// The metric registered under `name`, if any.
    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.read().get(name).cloned()
    }

    /// Remove the metric with the given name, notifying listeners.
    /// Returns whether anything was removed.
    pub fn remove(&self, name: &str) -> bool {
        let removed = self.metrics.write().remove(name);
        if let Some(metric) = removed {
            debug!("remove metric: {}", name);
            self.notify_removed(name, &metric);
            true
        } else {
            false
        }
    }

    /// Remove every metric matching the filter.
    pub fn remove_matching(&self, filter: impl Fn(&str, &Metric) -> bool) {
        let matched: Vec<String> = self
            .metrics
            .read()
            .iter()
            .filter(|(name, metric)| filter(name, metric))
            .map(|(name, _)| name.clone())
            .collect();
        for name in matched {
            self.remove(&name);
        }
    }

    /// Subscribe a listener. It is immediately replayed an added event
    /// for every currently registered metric, so it must not assume it
    /// only sees future registrations.
    pub fn add_listener(&self, listener: Arc<dyn MetricRegistryListener>) {
        self.listeners.lock().push(listener.clone());
        let current: BTreeMap<String, Metric> = self
            .metrics
            .read()
            .iter()
            .map(|(name, metric)| (name.clone(), metric.clone()))
            .collect();
        for (name, metric) in &current {
            dispatch_added(&*listener, name, metric);
        }
    }

    /// Unsubscribe a previously added listener.
    pub fn remove_listener(&self, listener: &Arc<dyn MetricRegistryListener>) {
        self.listeners
            .lock()
            .retain(|subscribed| !Arc::ptr_eq(subscribed, listener));
    }

    /// The names of all registered metrics, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// The number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    filtered_view!(
        /// A name-sorted snapshot of the registered gauges matching the
        /// filter.
        gauges,
        Gauge,
        Arc<dyn Gauge>
    );
    filtered_view!(
        /// A name-sorted snapshot of the registered counters matching the
        /// filter.
        counters,
        Counter,
        Arc<Counter>
    );
    filtered_view!(
        /// A name-sorted snapshot of the registered histograms matching
        /// the filter.
        histograms,
        Histogram,
        Arc<Histogram>
    );
    filtered_view!(
        /// A name-sorted snapshot of the registered meters matching the
        /// filter.
        meters,
        Meter,
        Arc<Meter>
    );
    filtered_view!(
        /// A name-sorted snapshot of the registered timers matching the
        /// filter.
        timers,
        Timer,
        Arc<Timer>
    );

    // Get-or-create: the fast path is a shared read; on miss, the write
    // lock makes the insert atomic with respect to concurrent creators,
    // so exactly one caller builds the instance and the rest observe it.
    fn get_or_add<R>(
        &self,
        name: &str,
        cast: impl Fn(&Metric) -> Option<R>,
        build: impl FnOnce() -> (R, Metric),
    ) -> Result<R, MetricError> {
        if let Some(existing) = self.metrics.read().get(name) {
            return cast(existing).ok_or_else(|| type_conflict(name, existing));
        }

        let (result, metric) = {
            let mut metrics = self.metrics.write();
            match metrics.entry(name.to_string()) {
                Entry::Occupied(occupied) => {
                    // a concurrent creator won the race
                    return cast(occupied.get()).ok_or_else(|| type_conflict(name, occupied.get()));
                }
                Entry::Vacant(vacant) => {
                    let (result, metric) = build();
                    vacant.insert(metric.clone());
                    (result, metric)
                }
            }
        };
        debug!("register metric: {} kind: {}", name, metric.kind());
        self.notify_added(name, &metric);
        Ok(result)
    }

    // Dispatch against a cloned snapshot of the subscription list, with
    // the lock released, so a listener may register or remove metrics
    // from inside its callback without deadlocking.
    fn notify_added(&self, name: &str, metric: &Metric) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            dispatch_added(&*listener, name, metric);
        }
    }

    fn notify_removed(&self, name: &str, metric: &Metric) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            match metric.kind() {
                MetricKind::Gauge => listener.on_gauge_removed(name),
                MetricKind::Counter => listener.on_counter_removed(name),
                MetricKind::Histogram => listener.on_histogram_removed(name),
                MetricKind::Meter => listener.on_meter_removed(name),
                MetricKind::Timer => listener.on_timer_removed(name),
            }
        }
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch_added(listener: &dyn MetricRegistryListener, name: &str, metric: &Metric) {
    match metric {
        Metric::Gauge(gauge) => listener.on_gauge_added(name, gauge),
        Metric::Counter(counter) => listener.on_counter_added(name, counter),
        Metric::Histogram(histogram) => listener.on_histogram_added(name, histogram),
        Metric::Meter(meter) => listener.on_meter_added(name, meter),
        Metric::Timer(timer) => listener.on_timer_added(name, timer),
    }
}

fn type_conflict(name: &str, existing: &Metric) -> MetricError {
    MetricError::TypeConflict {
        name: name.to_string(),
        existing: existing.kind(),
    }
}
