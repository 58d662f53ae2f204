//! Core ring buffer benchmarks
//!
//! Tests fundamental throughput:
//! - SPSC single-item hand-off vs batched `process_events`
//! - MPSC with 1, 2 and 4 producers
//!
//! Run: cargo bench --bench bench_core

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::thread;

use ringlane::constants::DEFAULT_BATCH_SIZE;
use ringlane::{mpsc, spsc};

const RING_SIZE: usize = 64 * 1024;
const TOTAL_EVENTS: u64 = 1_000_000;

// ============================================================================
// SPSC
// ============================================================================

fn bench_spsc(events: u64, batched: bool) -> u64 {
    let (mut producer, mut consumer) = spsc::channel::<u64>(RING_SIZE).unwrap();

    let consumer = thread::spawn(move || {
        let mut received = 0u64;
        let mut sum = 0u64;
        while received < events {
            if batched {
                let n = consumer.process_events(
                    &mut |value: u64, _seq: u64, _end: bool| sum = sum.wrapping_add(value),
                    DEFAULT_BATCH_SIZE,
                );
                if n == 0 {
                    std::hint::spin_loop();
                }
                received += n as u64;
            } else {
                match consumer.try_read() {
                    Ok(value) => {
                        sum = sum.wrapping_add(value);
                        received += 1;
                    }
                    Err(_) => std::hint::spin_loop(),
                }
            }
        }
        black_box(sum)
    });

    for i in 0..events {
        let mut item = i;
        while let Err(full) = producer.try_write(item) {
            item = full.into_inner();
            std::hint::spin_loop();
        }
    }

    consumer.join().unwrap();
    events
}

// ============================================================================
// MPSC
// ============================================================================

fn bench_mpsc(events: u64, producers: usize) -> u64 {
    let (producer, mut consumer) = mpsc::channel::<u64>(RING_SIZE).unwrap();
    let per_producer = events / producers as u64;

    let handles: Vec<_> = (0..producers)
        .map(|_| {
            let producer = producer.clone();
            thread::spawn(move || {
                for i in 0..per_producer {
                    let mut item = i;
                    while let Err(full) = producer.try_write(item) {
                        item = full.into_inner();
                        std::hint::spin_loop();
                    }
                }
            })
        })
        .collect();
    drop(producer);

    let total = per_producer * producers as u64;
    let mut received = 0u64;
    let mut sum = 0u64;
    while received < total {
        let n = consumer.process_events(
            &mut |value: u64, _seq: u64, _end: bool| sum = sum.wrapping_add(value),
            DEFAULT_BATCH_SIZE,
        );
        if n == 0 {
            std::hint::spin_loop();
        }
        received += n as u64;
    }
    black_box(sum);

    for handle in handles {
        handle.join().unwrap();
    }
    total
}

// ============================================================================
// Benchmarks
// ============================================================================

fn benchmark_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("SPSC Throughput (1M events)");
    group.throughput(Throughput::Elements(TOTAL_EVENTS));
    group.sample_size(20);

    group.bench_function("try_read", |b| b.iter(|| bench_spsc(TOTAL_EVENTS, false)));
    group.bench_function("process_events", |b| b.iter(|| bench_spsc(TOTAL_EVENTS, true)));

    group.finish();
}

fn benchmark_mpsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("MPSC Throughput (1M events)");
    group.throughput(Throughput::Elements(TOTAL_EVENTS));
    group.sample_size(20);

    for producers in [1usize, 2, 4] {
        group.bench_with_input(
            BenchmarkId::new("producers", producers),
            &producers,
            |b, &producers| b.iter(|| bench_mpsc(TOTAL_EVENTS, producers)),
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_spsc, benchmark_mpsc);
criterion_main!(benches);
