use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use reflow_core::signal::Runtime;
use reflow_core::stream::Subject;
use reflow_core::timer::TimerService;

/// Write at the root of a linear computed chain and pull the tail.
fn chain_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_propagation");
    for depth in [8usize, 64, 256] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let rt = Runtime::new();
            let root = rt.cell(0i64);
            let mut tail = rt.computed({
                let root = root.clone();
                move |scope| scope.get(&root) + 1
            });
            for _ in 1..depth {
                let prev = tail.clone();
                tail = rt.computed(move |scope| scope.get(&prev) + 1);
            }
            let _pin = rt.effect({
                let tail = tail.clone();
                move |scope| {
                    let _ = scope.get(&tail);
                }
            });

            let mut n = 0i64;
            b.iter(|| {
                n += 1;
                root.set(n);
                tail.get()
            });
        });
    }
    group.finish();
}

/// A wide fan-out: one cell feeding many independent computeds.
fn fanout_propagation(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout_propagation");
    for width in [16usize, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let rt = Runtime::new();
            let root = rt.cell(0i64);
            let leaves: Vec<_> = (0..width as i64)
                .map(|offset| {
                    rt.computed({
                        let root = root.clone();
                        move |scope| scope.get(&root) + offset
                    })
                })
                .collect();
            let _pins: Vec<_> = leaves
                .iter()
                .map(|leaf| {
                    let leaf = leaf.clone();
                    rt.effect(move |scope| {
                        let _ = scope.get(&leaf);
                    })
                })
                .collect();

            let mut n = 0i64;
            b.iter(|| {
                n += 1;
                root.set(n);
            });
        });
    }
    group.finish();
}

/// Debounce under a burst of emissions, then drain the timer queue.
fn debounce_drain(c: &mut Criterion) {
    c.bench_function("debounce_burst_drain", |b| {
        b.iter(|| {
            let timers = TimerService::new();
            let subject = Subject::new();
            let debounced = subject
                .as_observable()
                .debounce_time(Duration::from_millis(10), &timers);
            let _sub = debounced.subscribe_next(|_v: i64| {});

            for v in 0..100 {
                subject.next(v);
                timers.advance(Duration::from_millis(1));
            }
            timers.advance(Duration::from_millis(10));
        });
    });
}

criterion_group!(benches, chain_propagation, fanout_propagation, debounce_drain);
criterion_main!(benches);
