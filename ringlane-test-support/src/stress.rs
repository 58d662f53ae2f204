//! Stress harness: real threads over the real rings.
//!
//! Producers write tagged `u64`s (see `verify::encode`), the calling thread
//! consumes and checks ordering as it goes. Runs are count-based with a
//! timeout so a lost item shows up as a timed-out, unclean report instead of
//! a hung test.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::Rng;
use ringlane::{
    mpsc, spsc, ConfigError, Empty, MetricsSnapshot, MpscConsumer, RingConsumer, RingProducer,
    SpscConsumer, WaitStrategy, Yielding,
};

use crate::verify::{encode, ProducerOrderChecker, VerifyStats};

/// Configuration for stress tests
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of producer threads (SPSC runs always use one)
    pub producers: usize,
    /// Items each producer writes
    pub messages_per_producer: u64,
    /// Ring capacity (power of 2)
    pub capacity: usize,
    /// Max items per `process_events` call; 0 reads one at a time with `try_read`
    pub batch_size: usize,
    /// Chance a producer yields after each write, to shuffle interleavings
    pub yield_probability: f64,
    /// Give up and report after this long
    pub timeout: Duration,
    /// Empty polls the consumer spins through before it starts yielding
    pub idle_spins: u32,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            producers: 1,
            messages_per_producer: 100_000,
            capacity: 1024,
            batch_size: 256,
            yield_probability: 0.0,
            timeout: Duration::from_secs(30),
            idle_spins: 64,
        }
    }
}

impl StressConfig {
    pub fn new(messages_per_producer: u64) -> Self {
        Self {
            messages_per_producer,
            ..Default::default()
        }
    }

    pub fn with_producers(mut self, n: usize) -> Self {
        self.producers = n.max(1);
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_yield_probability(mut self, p: f64) -> Self {
        self.yield_probability = p.clamp(0.0, 1.0);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_idle_spins(mut self, spins: u32) -> Self {
        self.idle_spins = spins;
        self
    }
}

/// Shared counters for stress testing
pub struct StressCounters {
    pub sent: AtomicU64,
    pub received: AtomicU64,
    pub full_rejections: AtomicU64,
    pub empty_polls: AtomicU64,
    pub running: AtomicBool,
}

impl StressCounters {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_send(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_receive(&self, count: usize) {
        self.received.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_full(&self) {
        self.full_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Default for StressCounters {
    fn default() -> Self {
        Self {
            sent: AtomicU64::new(0),
            received: AtomicU64::new(0),
            full_rejections: AtomicU64::new(0),
            empty_polls: AtomicU64::new(0),
            running: AtomicBool::new(true),
        }
    }
}

/// Outcome of one stress run
#[derive(Debug, Clone)]
pub struct StressReport {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub full_rejections: u64,
    pub empty_polls: u64,
    pub duration: Duration,
    pub timed_out: bool,
    /// Producer threads that panicked instead of returning a count
    pub producer_panics: u64,
    pub verify: VerifyStats,
    /// Counters kept by the ring itself
    pub ring: MetricsSnapshot,
}

impl StressReport {
    pub fn receive_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.messages_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.timed_out
            && self.producer_panics == 0
            && self.messages_sent == self.messages_received
            && self.verify.is_clean()
    }
}

/// Batch drain over either consumer type.
pub trait Drain {
    fn drain(&mut self, max: usize, sink: &mut dyn FnMut(u64)) -> usize;
}

impl Drain for SpscConsumer<u64> {
    fn drain(&mut self, max: usize, sink: &mut dyn FnMut(u64)) -> usize {
        self.process_events(&mut |value: u64, _seq: u64, _end: bool| sink(value), max)
    }
}

impl Drain for MpscConsumer<u64> {
    fn drain(&mut self, max: usize, sink: &mut dyn FnMut(u64)) -> usize {
        self.process_events(&mut |value: u64, _seq: u64, _end: bool| sink(value), max)
    }
}

fn produce<P: RingProducer<u64>>(
    producer: &mut P,
    id: usize,
    config: &StressConfig,
    counters: &StressCounters,
) -> u64 {
    let mut rng = rand::thread_rng();
    let mut sent = 0;
    for sequence in 0..config.messages_per_producer {
        let mut item = encode(id, sequence);
        while let Err(full) = producer.try_write(item) {
            item = full.into_inner();
            counters.record_full();
            if !counters.is_running() {
                return sent;
            }
            thread::yield_now();
        }
        sent += 1;
        counters.record_send();
        if config.yield_probability > 0.0 && rng.gen_bool(config.yield_probability) {
            thread::yield_now();
        }
    }
    sent
}

fn consume<C: Drain + RingConsumer<u64>>(
    consumer: &mut C,
    config: &StressConfig,
    counters: &StressCounters,
    producers: usize,
) -> (ProducerOrderChecker, bool) {
    let total = producers as u64 * config.messages_per_producer;
    let start = Instant::now();
    let mut checker = ProducerOrderChecker::new(producers);
    let backoff = Yielding::new(config.idle_spins);
    let mut idle = 0u32;

    while (checker.received() as u64) < total {
        let got = if config.batch_size == 0 {
            match consumer.try_read() {
                Ok(value) => {
                    checker.record(value);
                    1
                }
                Err(Empty) => 0,
            }
        } else {
            consumer.drain(config.batch_size, &mut |value: u64| {
                checker.record(value);
            })
        };

        if got == 0 {
            counters.record_empty();
            if start.elapsed() > config.timeout {
                counters.stop();
                return (checker, true);
            }
            // past `idle_spins` polls, yield so a producer on this core can run
            backoff.wait(idle);
            idle = idle.saturating_add(1);
        } else {
            idle = 0;
            counters.record_receive(got);
        }
    }
    (checker, false)
}

/// Sum of what the producers sent, and how many of them panicked.
pub fn join_producers(handles: Vec<JoinHandle<u64>>) -> (u64, u64) {
    let mut sent = 0;
    let mut panics = 0;
    for handle in handles {
        match handle.join() {
            Ok(count) => sent += count,
            Err(_) => panics += 1,
        }
    }
    (sent, panics)
}

fn report(
    counters: &StressCounters,
    checker: ProducerOrderChecker,
    per_producer: u64,
    (sent, producer_panics): (u64, u64),
    timed_out: bool,
    duration: Duration,
    ring: MetricsSnapshot,
) -> StressReport {
    StressReport {
        messages_sent: sent,
        messages_received: counters.received.load(Ordering::Relaxed),
        full_rejections: counters.full_rejections.load(Ordering::Relaxed),
        empty_polls: counters.empty_polls.load(Ordering::Relaxed),
        duration,
        timed_out,
        producer_panics,
        verify: checker.finish(per_producer),
        ring,
    }
}

/// One producer thread, consumer on the calling thread.
pub fn run_spsc(config: &StressConfig) -> Result<StressReport, ConfigError> {
    let (mut producer, mut consumer) = spsc::channel::<u64>(config.capacity)?;
    let counters = StressCounters::new();
    let start = Instant::now();

    let handle = {
        let counters = counters.clone();
        let config = config.clone();
        thread::spawn(move || produce(&mut producer, 0, &config, &counters))
    };

    let (checker, timed_out) = consume(&mut consumer, config, &counters, 1);
    counters.stop();
    let joined = join_producers(vec![handle]);

    Ok(report(
        &counters,
        checker,
        config.messages_per_producer,
        joined,
        timed_out,
        start.elapsed(),
        consumer.metrics(),
    ))
}

/// `config.producers` threads sharing clones of one producer handle.
pub fn run_mpsc(config: &StressConfig) -> Result<StressReport, ConfigError> {
    let (producer, mut consumer) = mpsc::channel::<u64>(config.capacity)?;
    let counters = StressCounters::new();
    let start = Instant::now();

    let handles: Vec<_> = (0..config.producers)
        .map(|id| {
            let mut producer = producer.clone();
            let counters = counters.clone();
            let config = config.clone();
            thread::spawn(move || produce(&mut producer, id, &config, &counters))
        })
        .collect();
    drop(producer);

    let (checker, timed_out) = consume(&mut consumer, config, &counters, config.producers);
    counters.stop();
    let joined = join_producers(handles);

    Ok(report(
        &counters,
        checker,
        config.messages_per_producer,
        joined,
        timed_out,
        start.elapsed(),
        consumer.metrics(),
    ))
}

/// Print a summary of stress test results
pub fn print_summary(name: &str, report: &StressReport) {
    eprintln!("\n=== {} ===", name);
    eprintln!("  Duration:        {:>10.3}s", report.duration.as_secs_f64());
    eprintln!("  Messages Sent:   {:>10}", report.messages_sent);
    eprintln!("  Messages Recv:   {:>10}", report.messages_received);
    eprintln!("  Receive Rate:    {:>10.0} msg/s", report.receive_rate());
    eprintln!("  Full rejections: {:>10}", report.full_rejections);
    eprintln!("  Empty polls:     {:>10}", report.empty_polls);
    eprintln!("  Ring metrics:    {}", report.ring);
    eprintln!("  Verify:          {:?}", report.verify);

    if report.is_clean() {
        eprintln!("  ✅ PASSED");
    } else if report.timed_out {
        eprintln!("  ❌ FAILED: timed out");
    } else if report.producer_panics > 0 {
        eprintln!("  ❌ FAILED: {} producer(s) panicked", report.producer_panics);
    } else {
        eprintln!("  ❌ FAILED: delivery errors");
    }
}
