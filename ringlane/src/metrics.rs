//! Metrics for ringlane ring buffers.
//!
//! Relaxed counters for the failure and retry paths. A successful
//! `try_write`/`try_read` never touches them. Producer-side and
//! consumer-side counters sit on separate cache lines.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::CachePadded;

/// Counters written by producers
#[derive(Debug)]
struct ProducerCounters {
    full_rejections: AtomicU64,
    /// Failed head CASes. Stale head snapshots are retried without a CAS
    /// and are not counted.
    cas_retries: AtomicU64,
    yields: AtomicU64,
}

/// Per-ring counters
#[derive(Debug)]
pub struct Metrics {
    producer: CachePadded<ProducerCounters>,
    empty_polls: CachePadded<AtomicU64>,
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            producer: CachePadded::new(ProducerCounters {
                full_rejections: AtomicU64::new(0),
                cas_retries: AtomicU64::new(0),
                yields: AtomicU64::new(0),
            }),
            empty_polls: CachePadded::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    pub fn record_full(&self) {
        self.producer.full_rejections.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_empty(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Failed CAS attempts on the MPSC head.
    #[inline]
    pub fn record_cas_retries(&self, retries: u64) {
        self.producer.cas_retries.fetch_add(retries, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_yield(&self) {
        self.producer.yields.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            full_rejections: self.producer.full_rejections.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            cas_retries: self.producer.cas_retries.load(Ordering::Relaxed),
            yields: self.producer.yields.load(Ordering::Relaxed),
        }
    }

    /// Not atomic across counters: increments racing the reset may survive.
    pub fn reset(&self) {
        self.producer.full_rejections.store(0, Ordering::Relaxed);
        self.empty_polls.store(0, Ordering::Relaxed);
        self.producer.cas_retries.store(0, Ordering::Relaxed);
        self.producer.yields.store(0, Ordering::Relaxed);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub full_rejections: u64,
    pub empty_polls: u64,
    /// Failed MPSC head CASes; always 0 for SPSC
    pub cas_retries: u64,
    pub yields: u64,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "full={} empty={} cas_retries={} yields={}",
            self.full_rejections, self.empty_polls, self.cas_retries, self.yields
        )
    }
}
