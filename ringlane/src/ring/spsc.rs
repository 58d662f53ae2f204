//! SPSC ring buffer - one producer handle, one consumer handle.
//!
//! ## Memory Ordering
//!
//! - **head**: written only by the producer. Relaxed load by its owner,
//!   Release store after the slot write, Acquire load by the consumer.
//! - **tail**: written only by the consumer. Relaxed load by its owner,
//!   Release store after the slot read, Acquire load by the producer.
//!
//! Each side also caches the last value it saw of the other side's cursor and
//! only goes back to the shared atomic when that cached value says full/empty.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

use crate::error::{Empty, Full, Result};
use crate::insights;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::ring::slots::{occupancy, SlotArray};
use crate::ring::{EventHandler, RingConfig, Sequence};

struct Shared<T> {
    head: CachePadded<AtomicU64>,
    tail: CachePadded<AtomicU64>,
    slots: SlotArray<T>,
    metrics: Metrics,
}

impl<T> Shared<T> {
    fn len(&self) -> usize {
        // tail first: the head observed afterwards is never behind it
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        occupancy(head, tail, self.slots.capacity())
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let head = *self.head.get_mut();
        let tail = *self.tail.get_mut();
        for position in tail..head {
            // SAFETY: [tail, head) is published and unread; no handles remain
            unsafe { self.slots.drop_in_place(position) };
        }
    }
}

/// Create an SPSC ring with `capacity` slots.
pub fn channel<T>(capacity: usize) -> Result<(SpscProducer<T>, SpscConsumer<T>)> {
    channel_with_config(RingConfig::new(capacity)?)
}

/// Create an SPSC ring from a full configuration.
pub fn channel_with_config<T>(config: RingConfig) -> Result<(SpscProducer<T>, SpscConsumer<T>)> {
    config.validate()?;

    let shared = Arc::new(Shared {
        head: CachePadded::new(AtomicU64::new(0)),
        tail: CachePadded::new(AtomicU64::new(0)),
        slots: SlotArray::new(config.capacity),
        metrics: Metrics::new(),
    });
    insights::record_created("spsc", config.capacity);

    Ok((
        SpscProducer {
            shared: shared.clone(),
            cached_tail: 0,
        },
        SpscConsumer {
            shared,
            cached_head: 0,
        },
    ))
}

/// Write side of an SPSC ring. Not cloneable: exactly one producer exists.
pub struct SpscProducer<T> {
    shared: Arc<Shared<T>>,
    cached_tail: Sequence,
}

impl<T> SpscProducer<T> {
    /// Move `item` into the next free slot, or hand it back if the ring is full.
    #[inline]
    pub fn try_write(&mut self, item: T) -> std::result::Result<(), Full<T>> {
        let shared = &*self.shared;
        let capacity = shared.slots.capacity() as u64;
        let head = shared.head.load(Ordering::Relaxed);

        if head - self.cached_tail >= capacity {
            self.cached_tail = shared.tail.load(Ordering::Acquire);
            if head - self.cached_tail >= capacity {
                shared.metrics.record_full();
                insights::record_full();
                return Err(Full(item));
            }
        }

        // SAFETY: head - tail < capacity, so the slot at head is free and only
        // this producer writes it until head is published
        unsafe { shared.slots.write(head, item) };
        shared.head.store(head + 1, Ordering::Release);
        Ok(())
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.slots.capacity()
    }

    /// Advisory element count; may be stale as soon as it returns.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Zero the ring's counters. Shared by both handles.
    pub fn reset_metrics(&self) {
        self.shared.metrics.reset();
    }
}

impl<T> std::fmt::Debug for SpscProducer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpscProducer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

/// Read side of an SPSC ring. Not cloneable: exactly one consumer exists.
pub struct SpscConsumer<T> {
    shared: Arc<Shared<T>>,
    cached_head: Sequence,
}

impl<T> SpscConsumer<T> {
    /// Number of published elements visible to the consumer right now,
    /// refreshing the cached head if needed.
    #[inline]
    fn available(&mut self, tail: Sequence) -> u64 {
        if tail == self.cached_head {
            self.cached_head = self.shared.head.load(Ordering::Acquire);
        }
        self.cached_head - tail
    }

    /// Take the oldest element, or `Empty` if nothing is published.
    #[inline]
    pub fn try_read(&mut self) -> std::result::Result<T, Empty> {
        let tail = self.shared.tail.load(Ordering::Relaxed);

        if self.available(tail) == 0 {
            self.shared.metrics.record_empty();
            insights::record_empty();
            return Err(Empty);
        }

        // SAFETY: tail < head, so the slot is published and only this
        // consumer reads it until tail is advanced
        let item = unsafe { self.shared.slots.read(tail) };
        self.shared.tail.store(tail + 1, Ordering::Release);
        Ok(item)
    }

    /// Drain up to `max` published elements into `handler`, publishing the
    /// tail once per batch. Returns the number handed over.
    pub fn process_events<H: EventHandler<T>>(&mut self, handler: &mut H, max: usize) -> usize {
        let tail = self.shared.tail.load(Ordering::Relaxed);
        let count = self.available(tail).min(max as u64);
        if count == 0 {
            return 0;
        }

        let mut guard = TailGuard {
            cursor: &self.shared.tail,
            position: tail,
        };
        for i in 0..count {
            let sequence = tail + i;
            // SAFETY: sequence < cached_head; guard publishes the new tail even
            // if the handler unwinds, so no slot is read twice
            let item = unsafe { self.shared.slots.read(sequence) };
            guard.position = sequence + 1;
            handler.on_event(item, sequence, i + 1 == count);
        }
        count as usize
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.slots.capacity()
    }

    /// Advisory element count; may be stale as soon as it returns.
    #[inline]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Zero the ring's counters. Shared by both handles.
    pub fn reset_metrics(&self) {
        self.shared.metrics.reset();
    }
}

impl<T> std::fmt::Debug for SpscConsumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpscConsumer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

/// Publishes the consumer position on drop.
pub(crate) struct TailGuard<'a> {
    pub(crate) cursor: &'a AtomicU64,
    pub(crate) position: Sequence,
}

impl Drop for TailGuard<'_> {
    fn drop(&mut self) {
        self.cursor.store(self.position, Ordering::Release);
    }
}
