//! Wait strategies for callers that want blocking semantics
//!
//! The rings themselves never block. These helpers retry `try_write` /
//! `try_read` and hand each failed attempt to a `WaitStrategy`, which decides
//! how to burn the time in between: spin, yield or sleep.

use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Empty, Full};
use crate::ring::{RingConsumer, RingProducer};

/// Backoff policy between failed attempts
pub trait WaitStrategy: Send + Sync {
    /// Called after the `attempt`-th consecutive failure (starting at 0).
    fn wait(&self, attempt: u32);
}

/// Busy spin - lowest latency, pins a core while waiting.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusySpin;

impl WaitStrategy for BusySpin {
    #[inline]
    fn wait(&self, _attempt: u32) {
        std::hint::spin_loop();
    }
}

/// Spin for `spin_tries` attempts, then yield the thread.
#[derive(Debug, Clone, Copy)]
pub struct Yielding {
    pub spin_tries: u32,
}

impl Yielding {
    pub fn new(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for Yielding {
    fn default() -> Self {
        Self::new(100)
    }
}

impl WaitStrategy for Yielding {
    #[inline]
    fn wait(&self, attempt: u32) {
        if attempt < self.spin_tries {
            std::hint::spin_loop();
        } else {
            thread::yield_now();
        }
    }
}

/// Spin briefly, then sleep `pause` per attempt. Lowest CPU, highest latency.
#[derive(Debug, Clone, Copy)]
pub struct Sleeping {
    pub spin_tries: u32,
    pub pause: Duration,
}

impl Sleeping {
    pub fn new(pause: Duration) -> Self {
        Self {
            spin_tries: 10,
            pause,
        }
    }
}

impl Default for Sleeping {
    fn default() -> Self {
        Self::new(Duration::from_micros(50))
    }
}

impl WaitStrategy for Sleeping {
    fn wait(&self, attempt: u32) {
        if attempt < self.spin_tries {
            std::hint::spin_loop();
        } else {
            thread::sleep(self.pause);
        }
    }
}

fn deadline(timeout: Option<Duration>) -> Option<Instant> {
    timeout.and_then(|t| Instant::now().checked_add(t))
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Write `item`, waiting out a full ring.
///
/// With `timeout = None` this retries until a slot frees up. On timeout the
/// item comes back in `Full`.
pub fn write_blocking<T, P, W>(
    producer: &mut P,
    mut item: T,
    strategy: &W,
    timeout: Option<Duration>,
) -> Result<(), Full<T>>
where
    P: RingProducer<T> + ?Sized,
    W: WaitStrategy + ?Sized,
{
    let deadline = deadline(timeout);
    let mut attempt = 0u32;
    loop {
        match producer.try_write(item) {
            Ok(()) => return Ok(()),
            Err(Full(rejected)) => {
                if expired(deadline) {
                    return Err(Full(rejected));
                }
                item = rejected;
                strategy.wait(attempt);
                attempt = attempt.saturating_add(1);
            }
        }
    }
}

/// Read one item, waiting out an empty ring. `Empty` on timeout.
pub fn read_blocking<T, C, W>(
    consumer: &mut C,
    strategy: &W,
    timeout: Option<Duration>,
) -> Result<T, Empty>
where
    C: RingConsumer<T> + ?Sized,
    W: WaitStrategy + ?Sized,
{
    let deadline = deadline(timeout);
    let mut attempt = 0u32;
    loop {
        match consumer.try_read() {
            Ok(item) => return Ok(item),
            Err(Empty) => {
                if expired(deadline) {
                    return Err(Empty);
                }
                strategy.wait(attempt);
                attempt = attempt.saturating_add(1);
            }
        }
    }
}
