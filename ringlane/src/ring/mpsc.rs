//! MPSC ring buffer - any number of producer handles, one consumer handle.
//!
//! ## Claim Protocol
//!
//! - **head**: `PackedHead` word `(generation, index)`. Producers CAS it
//!   forward by one slot. A stale snapshot from a previous lap carries an
//!   older generation and cannot win the CAS (no ABA).
//! - **published[]**: one stamp per slot, `generation + 1` of the lap whose
//!   write landed there. Because the CAS claim happens before the slot write,
//!   the consumer trusts the stamp, not the head, to know a slot is readable.
//! - **tail**: consumer-owned, identical to SPSC.
//!
//! Items from one producer are read in the order that producer wrote them.
//! There is no ordering between items from different producers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

use crate::error::{Empty, Full, Result};
use crate::insights;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::ring::head::{HeadLayout, PackedHead};
use crate::ring::slots::{occupancy, SlotArray};
use crate::ring::spsc::TailGuard;
use crate::ring::{EventHandler, RingConfig, Sequence};

/// Outcome of one claim attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    /// CAS won; the slot at this head belongs to the caller
    Won(PackedHead),
    /// No free slot for the observed head
    Full,
    /// CAS failed: another producer moved head first
    Lost,
    /// Head snapshot older than the tail; no CAS was attempted
    Stale,
}

struct Shared<T> {
    head: CachePadded<AtomicU64>,
    tail: CachePadded<AtomicU64>,
    slots: SlotArray<T>,
    published: Box<[AtomicU64]>,
    layout: HeadLayout,
    spin_limit: u32,
    metrics: Metrics,
}

impl<T> Shared<T> {
    /// One CAS attempt against an observed head value.
    pub(crate) fn try_claim(&self, observed: PackedHead) -> Claim {
        let tail = self.tail.load(Ordering::Acquire);
        let position = observed.sequence();

        // Relaxed head snapshot older than the tail we just acquired
        if tail > position {
            return Claim::Stale;
        }
        if position - tail >= self.layout.capacity() {
            return Claim::Full;
        }

        let next = self.layout.advance(observed);
        match self.head.compare_exchange_weak(
            observed.raw(),
            next.raw(),
            Ordering::Release,
            Ordering::Relaxed,
        ) {
            Ok(_) => Claim::Won(observed),
            Err(_) => Claim::Lost,
        }
    }

    /// Write into a won slot and stamp it readable.
    ///
    /// # Safety
    /// `claimed` must come from `Claim::Won` and be written exactly once.
    #[inline]
    unsafe fn publish(&self, claimed: PackedHead, item: T) {
        let position = claimed.sequence();
        self.slots.write(position, item);
        let stamp = self.layout.generation(claimed) + 1;
        self.published[self.slots.physical_index(position)].store(stamp, Ordering::Release);
    }

    #[inline]
    fn is_published(&self, position: Sequence) -> bool {
        let expected = self.layout.generation_of(position) + 1;
        self.published[self.slots.physical_index(position)].load(Ordering::Acquire) == expected
    }

    fn len(&self) -> usize {
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
            if self.is_published(position) {
                // SAFETY: published and unread; no handles remain
                unsafe { self.slots.drop_in_place(position) };
            }
        }
    }
}

/// Create an MPSC ring with `capacity` slots.
pub fn channel<T>(capacity: usize) -> Result<(MpscProducer<T>, MpscConsumer<T>)> {
    channel_with_config(RingConfig::new(capacity)?)
}

/// Create an MPSC ring from a full configuration.
pub fn channel_with_config<T>(config: RingConfig) -> Result<(MpscProducer<T>, MpscConsumer<T>)> {
    config.validate()?;
    let layout = HeadLayout::new(config.capacity)?;

    let published = (0..config.capacity)
        .map(|_| AtomicU64::new(0))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let shared = Arc::new(Shared {
        head: CachePadded::new(AtomicU64::new(PackedHead::ZERO.raw())),
        tail: CachePadded::new(AtomicU64::new(0)),
        slots: SlotArray::new(config.capacity),
        published,
        layout,
        spin_limit: config.spin_limit,
        metrics: Metrics::new(),
    });
    insights::record_created("mpsc", config.capacity);

    Ok((
        MpscProducer {
            shared: shared.clone(),
        },
        MpscConsumer {
            shared,
            cached_head: 0,
        },
    ))
}

/// Write side of an MPSC ring. Clone it once per producer thread.
pub struct MpscProducer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for MpscProducer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> MpscProducer<T> {
    /// Claim a slot and move `item` into it, or hand it back if the ring is
    /// full. Spins on lost CAS races and yields every `spin_limit` failures;
    /// never waits for the consumer.
    pub fn try_write(&self, item: T) -> std::result::Result<(), Full<T>> {
        let shared = &*self.shared;
        let mut failures: u32 = 0;

        loop {
            let observed = PackedHead::from_raw(shared.head.load(Ordering::Relaxed));
            match shared.try_claim(observed) {
                Claim::Won(claimed) => {
                    if failures > 0 {
                        shared.metrics.record_cas_retries(u64::from(failures));
                        insights::record_contention(failures.saturating_add(1));
                    }
                    // SAFETY: slot exclusively claimed by the CAS above
                    unsafe { shared.publish(claimed, item) };
                    return Ok(());
                }
                Claim::Full => {
                    if failures > 0 {
                        shared.metrics.record_cas_retries(u64::from(failures));
                    }
                    shared.metrics.record_full();
                    insights::record_full();
                    return Err(Full(item));
                }
                Claim::Lost => {
                    failures = failures.wrapping_add(1);
                    if failures % shared.spin_limit == 0 {
                        shared.metrics.record_yield();
                        insights::record_yield(failures);
                        std::thread::yield_now();
                    } else {
                        std::hint::spin_loop();
                    }
                }
                // reload head; not a CAS retry
                Claim::Stale => std::hint::spin_loop(),
            }
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.slots.capacity()
    }

    /// Advisory element count, including claimed slots still being written.
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

impl<T> std::fmt::Debug for MpscProducer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpscProducer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

/// Read side of an MPSC ring. Not cloneable: exactly one consumer exists.
pub struct MpscConsumer<T> {
    shared: Arc<Shared<T>>,
    cached_head: Sequence,
}

impl<T> MpscConsumer<T> {
    #[inline]
    fn has_claimed(&mut self, tail: Sequence) -> bool {
        if tail == self.cached_head {
            self.cached_head = self.shared.head.load(Ordering::Acquire);
        }
        tail < self.cached_head
    }

    /// Take the oldest element, or `Empty` if the next slot is unclaimed or
    /// still being written.
    #[inline]
    pub fn try_read(&mut self) -> std::result::Result<T, Empty> {
        let tail = self.shared.tail.load(Ordering::Relaxed);

        if !self.has_claimed(tail) || !self.shared.is_published(tail) {
            self.shared.metrics.record_empty();
            insights::record_empty();
            return Err(Empty);
        }

        // SAFETY: stamp proves the write completed; only this consumer reads
        let item = unsafe { self.shared.slots.read(tail) };
        self.shared.tail.store(tail + 1, Ordering::Release);
        Ok(item)
    }

    /// Drain up to `max` contiguous published elements into `handler`,
    /// stopping at the first slot still being written.
    pub fn process_events<H: EventHandler<T>>(&mut self, handler: &mut H, max: usize) -> usize {
        let tail = self.shared.tail.load(Ordering::Relaxed);
        if !self.has_claimed(tail) {
            return 0;
        }

        let shared = &*self.shared;
        let limit = (self.cached_head - tail).min(max as u64);
        let count = (0..limit)
            .take_while(|i| shared.is_published(tail + i))
            .count() as u64;
        if count == 0 {
            return 0;
        }

        let mut guard = TailGuard {
            cursor: &shared.tail,
            position: tail,
        };
        for i in 0..count {
            let sequence = tail + i;
            // SAFETY: stamp checked above; guard publishes progress on unwind
            let item = unsafe { shared.slots.read(sequence) };
            guard.position = sequence + 1;
            handler.on_event(item, sequence, i + 1 == count);
        }
        count as usize
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.slots.capacity()
    }

    /// Advisory element count, including claimed slots still being written.
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

impl<T> std::fmt::Debug for MpscConsumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MpscConsumer")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::rc::Rc;
    use std::thread;

    fn head_of<T>(producer: &MpscProducer<T>) -> PackedHead {
        PackedHead::from_raw(producer.shared.head.load(Ordering::SeqCst))
    }

    #[test]
    fn test_capacity_four_scenario() {
        let (tx, mut rx) = channel::<char>(4).unwrap();
        for c in ['A', 'B', 'C', 'D'] {
            assert!(tx.try_write(c).is_ok());
        }
        assert!(tx.is_full());
        assert_eq!(tx.try_write('E').unwrap_err().into_inner(), 'E');

        for c in ['A', 'B', 'C', 'D'] {
            assert_eq!(rx.try_read(), Ok(c));
        }
        assert!(rx.is_empty());
        assert_eq!(rx.try_read(), Err(Empty));
    }

    #[test]
    fn test_generation_advances_per_lap() {
        let (tx, mut rx) = channel::<u32>(4).unwrap();
        let layout = HeadLayout::new(4).unwrap();
        for i in 0..10u32 {
            tx.try_write(i).unwrap();
            assert_eq!(rx.try_read(), Ok(i));
        }
        let head = head_of(&tx);
        assert_eq!(layout.generation(head), 2);
        assert_eq!(layout.index(head), 2);
    }

    /// A producer snapshots head at (gen 0, idx 2), stalls while the ring
    /// laps to (gen 1, idx 2) with the slot still occupied, then retries its
    /// CAS. The generation makes the stale CAS fail.
    #[test]
    fn test_stale_claim_after_full_lap_is_rejected() {
        let (tx, mut rx) = channel::<&'static str>(4).unwrap();
        let layout = HeadLayout::new(4).unwrap();

        tx.try_write("A").unwrap();
        tx.try_write("B").unwrap();
        let stale = head_of(&tx);
        assert_eq!((layout.generation(stale), layout.index(stale)), (0, 2));

        tx.try_write("C").unwrap();
        tx.try_write("D").unwrap();
        assert_eq!(rx.try_read(), Ok("A"));
        assert_eq!(rx.try_read(), Ok("B"));
        tx.try_write("E").unwrap();
        tx.try_write("F").unwrap();

        let current = head_of(&tx);
        assert_eq!(layout.index(current), layout.index(stale));
        assert_eq!(layout.generation(current), 1);

        // From the stale view the slot looks free (position 2 - tail 2 == 0)
        assert_eq!(tx.shared.try_claim(stale), Claim::Lost);
        assert_eq!(head_of(&tx), current);

        for c in ["C", "D", "E", "F"] {
            assert_eq!(rx.try_read(), Ok(c));
        }
        assert_eq!(rx.try_read(), Err(Empty));
    }

    /// Same race against an index-only head word: the CAS wrongly succeeds.
    #[test]
    fn test_index_only_head_would_accept_stale_claim() {
        let mask = 3u64;
        let head = AtomicU64::new(0);
        for _ in 0..2 {
            let h = head.load(Ordering::Relaxed);
            head.store((h + 1) & mask, Ordering::Relaxed);
        }
        let stale = head.load(Ordering::Relaxed);
        // a full lap by other producers
        for _ in 0..4 {
            let h = head.load(Ordering::Relaxed);
            head.store((h + 1) & mask, Ordering::Relaxed);
        }
        let hazard = head.compare_exchange(
            stale,
            (stale + 1) & mask,
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
        assert!(hazard.is_ok());
    }

    #[test]
    fn test_claim_reports_full_and_stale() {
        let (tx, mut rx) = channel::<u8>(2).unwrap();
        tx.try_write(1).unwrap();
        tx.try_write(2).unwrap();
        assert_eq!(tx.shared.try_claim(head_of(&tx)), Claim::Full);

        let stale = PackedHead::ZERO;
        rx.try_read().unwrap();
        assert_eq!(tx.shared.try_claim(stale), Claim::Stale);
    }

    /// A snapshot behind the tail never reaches the CAS, so it must not
    /// show up as a CAS retry.
    #[test]
    fn test_stale_snapshot_is_not_a_cas_retry() {
        let (tx, mut rx) = channel::<u8>(2).unwrap();
        for i in 0..3 {
            tx.try_write(i).unwrap();
            rx.try_read().unwrap();
        }
        assert_eq!(tx.shared.try_claim(PackedHead::ZERO), Claim::Stale);
        assert_eq!(head_of(&tx).sequence(), 3);
        assert_eq!(tx.metrics().cas_retries, 0);

        tx.try_write(7).unwrap();
        assert_eq!(rx.try_read(), Ok(7));
    }

    #[test]
    fn test_claimed_but_unwritten_slot_reads_empty() {
        let (tx, mut rx) = channel::<u32>(4).unwrap();
        let claimed = loop {
            if let Claim::Won(h) = tx.shared.try_claim(head_of(&tx)) {
                break h;
            }
        };
        tx.try_write(99).unwrap();

        // position 0 claimed, position 1 published: consumer must wait on 0
        assert_eq!(rx.try_read(), Err(Empty));
        assert_eq!(rx.len(), 2);
        assert_eq!(
            rx.process_events(&mut |_: u32, _: Sequence, _: bool| {}, 8),
            0
        );

        unsafe { tx.shared.publish(claimed, 7) };
        assert_eq!(rx.try_read(), Ok(7));
        assert_eq!(rx.try_read(), Ok(99));
    }

    #[test]
    fn test_process_events_batches() {
        let (tx, mut rx) = channel::<u64>(8).unwrap();
        for i in 0..5 {
            tx.try_write(i).unwrap();
        }
        let mut seen = Vec::new();
        let n = rx.process_events(
            &mut |v: u64, seq: Sequence, end: bool| seen.push((v, seq, end)),
            3,
        );
        assert_eq!(n, 3);
        assert_eq!(seen, vec![(0, 0, false), (1, 1, false), (2, 2, true)]);
        assert_eq!(rx.try_read(), Ok(3));
        assert_eq!(rx.try_read(), Ok(4));
    }

    #[test]
    fn test_drop_releases_resident_items() {
        let tracker = Rc::new(());
        {
            let (tx, mut rx) = channel::<Rc<()>>(4).unwrap();
            for _ in 0..4 {
                tx.try_write(tracker.clone()).unwrap();
            }
            drop(rx.try_read().unwrap());
            tx.try_write(tracker.clone()).unwrap();
            assert_eq!(Rc::strong_count(&tracker), 5);
        }
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_spin_limit_config() {
        let config = RingConfig::new(8).unwrap().with_spin_limit(1).unwrap();
        let (tx, mut rx) = channel_with_config::<u8>(config).unwrap();
        tx.try_write(5).unwrap();
        assert_eq!(rx.try_read(), Ok(5));
        assert_eq!(tx.metrics().yields, 0);
    }

    #[test]
    fn test_concurrent_producers_no_loss_no_duplication() {
        const PRODUCERS: u64 = 4;
        const PER_PRODUCER: u64 = 25_000;

        let (tx, mut rx) = channel::<(u64, u64)>(256).unwrap();
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|id| {
                let tx = tx.clone();
                thread::spawn(move || {
                    for seq in 0..PER_PRODUCER {
                        let mut item = (id, seq);
                        loop {
                            match tx.try_write(item) {
                                Ok(()) => break,
                                Err(Full(back)) => {
                                    item = back;
                                    thread::yield_now();
                                }
                            }
                        }
                    }
                })
            })
            .collect();
        drop(tx);

        let mut last: HashMap<u64, u64> = HashMap::new();
        let mut received = Vec::with_capacity((PRODUCERS * PER_PRODUCER) as usize);
        while (received.len() as u64) < PRODUCERS * PER_PRODUCER {
            match rx.try_read() {
                Ok((id, seq)) => {
                    // per-producer FIFO
                    if let Some(prev) = last.insert(id, seq) {
                        assert!(seq > prev, "producer {} reordered: {} after {}", id, seq, prev);
                    }
                    received.push((id, seq));
                }
                Err(Empty) => thread::yield_now(),
            }
        }
        for h in handles {
            h.join().unwrap();
        }

        received.sort_unstable();
        let expected: Vec<_> = (0..PRODUCERS)
            .flat_map(|id| (0..PER_PRODUCER).map(move |seq| (id, seq)))
            .collect();
        assert_eq!(received, expected);
        assert_eq!(rx.try_read(), Err(Empty));
    }
}
