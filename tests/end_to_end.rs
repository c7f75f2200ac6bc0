// Copyright 2020 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use metrics::{match_all, FunctionGauge, Gauge, MetricRegistry, Reservoir, Timer, UniformReservoir};

#[test]
fn timing_real_work_lands_in_the_distribution() {
    let timer = Timer::new();
    timer.time_fn(|| thread::sleep(Duration::from_millis(10)));

    assert_eq!(timer.count(), 1);
    let snapshot = timer.snapshot();
    assert_eq!(snapshot.size(), 1);
    // sleep guarantees at least the requested duration
    assert!(snapshot.max() >= 10_000_000);
}

#[test]
fn uniform_sampling_shows_no_strong_bias() {
    // Feed the values 1..=5 round-robin into a 3-slot reservoir many
    // times over and total up how often each survives. A uniform sample
    // keeps each value with the same probability, so no value should
    // dominate or vanish over enough trials.
    let mut kept: HashMap<i64, u64> = HashMap::new();
    let trials = 1_000;
    for _ in 0..trials {
        let reservoir = UniformReservoir::new(3);
        for _ in 0..100 {
            for value in 1..=5 {
                reservoir.update(value);
            }
        }
        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.size(), 3);
        for value in snapshot.values() {
            *kept.entry(*value).or_insert(0) += 1;
        }
    }

    // 3000 kept slots over 5 values: 600 each in expectation
    for value in 1..=5 {
        let count = *kept.get(&value).unwrap_or(&0);
        assert!(
            (300..=900).contains(&count),
            "value {} kept {} times",
            value,
            count
        );
    }
}

#[test]
fn a_reporter_can_walk_a_live_registry() {
    let registry = Arc::new(MetricRegistry::new());

    registry
        .register(
            "process.uptime",
            Arc::new(FunctionGauge::new(|| 12.5)) as Arc<dyn Gauge>,
        )
        .unwrap();
    let requests = registry.counter("server.requests").unwrap();
    let latency = registry.timer("server.latency").unwrap();
    let payload_sizes = registry.histogram("server.payload_bytes").unwrap();
    let responses = registry.meter("server.responses").unwrap();

    // simulate some traffic from worker threads
    let mut workers = Vec::new();
    for _ in 0..4 {
        let requests = requests.clone();
        let latency = latency.clone();
        let payload_sizes = payload_sizes.clone();
        let responses = responses.clone();
        workers.push(thread::spawn(move || {
            for i in 0..100 {
                requests.incr(1);
                latency.update(Duration::from_micros(100 + i));
                payload_sizes.update(512 + i as i64);
                responses.mark(1);
            }
        }));
    }
    for worker in workers {
        worker.join().expect("failed to join worker thread");
    }

    // a reporter pass: read every metric by kind
    for (name, gauge) in registry.gauges(match_all) {
        assert_eq!(name, "process.uptime");
        assert!((gauge.value() - 12.5).abs() < 1e-9);
    }
    for (_, counter) in registry.counters(match_all) {
        assert_eq!(counter.count(), 400);
    }
    for (_, timer) in registry.timers(match_all) {
        assert_eq!(timer.count(), 400);
        let snapshot = timer.snapshot();
        assert!(snapshot.min() >= 100_000);
        assert!(snapshot.max() <= 199_000);
        assert!(snapshot.quantile(0.5).unwrap() > 0.0);
    }
    for (_, histogram) in registry.histograms(match_all) {
        assert_eq!(histogram.count(), 400);
        assert!(histogram.snapshot().mean() >= 512.0);
    }
    for (_, meter) in registry.meters(match_all) {
        assert_eq!(meter.count(), 400);
    }

    assert_eq!(registry.len(), 5);
}
