//! Memory Ordering Tests for the SPSC ring
//!
//! These tests verify that the ring buffer correctly hands items across
//! threads under concurrent access, including heap-owning payloads whose
//! contents would be torn by a missing release/acquire edge.

use ringlane::{spsc, Empty};
use ringlane_test_support::{print_summary, run_spsc, StressConfig};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(60);

#[test]
fn test_spsc_ordering_small_rings() {
    for capacity in [1, 2, 4, 64] {
        let config = StressConfig::new(200_000)
            .with_capacity(capacity)
            .with_timeout(TIMEOUT);
        let report = run_spsc(&config).unwrap();
        print_summary(&format!("SPSC ordering, capacity {capacity}"), &report);
        assert!(report.is_clean(), "capacity {capacity}: {report:?}");
        assert_eq!(report.ring.full_rejections, report.full_rejections);
    }
}

#[test]
fn test_spsc_ordering_single_reads() {
    let config = StressConfig::new(200_000)
        .with_capacity(16)
        .with_batch_size(0)
        .with_yield_probability(0.01)
        .with_timeout(TIMEOUT);
    let report = run_spsc(&config).unwrap();
    print_summary("SPSC ordering, try_read", &report);
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.ring.empty_polls, report.empty_polls);
}

/// Payloads own heap memory; the consumer checks the contents, not just the
/// arrival order.
#[test]
fn test_spsc_heap_payloads_arrive_intact() {
    const COUNT: usize = 50_000;
    let (mut tx, mut rx) = spsc::channel::<Vec<u64>>(32).unwrap();

    let producer = thread::spawn(move || {
        for i in 0..COUNT {
            let mut item: Vec<u64> = (0..(i % 7) as u64 + 1).map(|k| i as u64 * 10 + k).collect();
            loop {
                match tx.try_write(item) {
                    Ok(()) => break,
                    Err(full) => {
                        item = full.into_inner();
                        thread::yield_now();
                    }
                }
            }
        }
    });

    let mut expected = 0usize;
    while expected < COUNT {
        match rx.try_read() {
            Ok(item) => {
                assert_eq!(item.len(), expected % 7 + 1);
                for (k, value) in item.iter().enumerate() {
                    assert_eq!(*value, expected as u64 * 10 + k as u64);
                }
                expected += 1;
            }
            Err(Empty) => thread::yield_now(),
        }
    }
    producer.join().unwrap();
    assert_eq!(rx.try_read(), Err(Empty));
}

/// `len` is sampled from both sides while items flow; it must never leave
/// `[0, capacity]`.
#[test]
fn test_spsc_len_stays_in_bounds() {
    const CAPACITY: usize = 8;
    let (mut tx, mut rx) = spsc::channel::<u64>(CAPACITY).unwrap();
    let running = Arc::new(AtomicBool::new(true));
    let violations = Arc::new(AtomicU64::new(0));

    let running_prod = running.clone();
    let violations_prod = violations.clone();
    let producer = thread::spawn(move || {
        let mut next = 0u64;
        while running_prod.load(Ordering::Relaxed) {
            if tx.try_write(next).is_ok() {
                next += 1;
            }
            if tx.len() > CAPACITY {
                violations_prod.fetch_add(1, Ordering::Relaxed);
            }
        }
        next
    });

    let mut received = 0u64;
    let deadline = std::time::Instant::now() + Duration::from_millis(500);
    while std::time::Instant::now() < deadline {
        if let Ok(value) = rx.try_read() {
            assert_eq!(value, received);
            received += 1;
        }
        if rx.len() > CAPACITY {
            violations.fetch_add(1, Ordering::Relaxed);
        }
    }
    running.store(false, Ordering::Relaxed);
    let written = producer.join().unwrap();

    while let Ok(value) = rx.try_read() {
        assert_eq!(value, received);
        received += 1;
    }
    assert_eq!(received, written);
    assert_eq!(violations.load(Ordering::Relaxed), 0);
}
