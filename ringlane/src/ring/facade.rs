//! Engine-agnostic interface over the SPSC and MPSC rings.
//!
//! Calling code written against `RingProducer` / `RingConsumer` (or the owning
//! `RingBuffer<T, E>`) can switch engines by changing one type parameter.
//! Everything here delegates; no state is added.

use std::marker::PhantomData;

use crate::error::{Empty, Full, Result};
use crate::metrics::MetricsSnapshot;
use crate::ring::mpsc::{self, MpscConsumer, MpscProducer};
use crate::ring::spsc::{self, SpscConsumer, SpscProducer};
use crate::ring::RingConfig;

/// Advisory occupancy snapshot shared by both sides.
pub trait RingState {
    fn capacity(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Counters of the ring this handle belongs to.
    fn metrics(&self) -> MetricsSnapshot;

    fn reset_metrics(&self);
}

pub trait RingProducer<T>: RingState {
    fn try_write(&mut self, item: T) -> std::result::Result<(), Full<T>>;
}

pub trait RingConsumer<T>: RingState {
    fn try_read(&mut self) -> std::result::Result<T, Empty>;
}

/// Ring engine selector.
pub trait Engine<T> {
    type Producer: RingProducer<T>;
    type Consumer: RingConsumer<T>;

    /// Short name used in logs
    const KIND: &'static str;

    fn create(config: RingConfig) -> Result<(Self::Producer, Self::Consumer)>;
}

/// Single-producer engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Spsc;

/// Multi-producer engine
#[derive(Debug, Clone, Copy, Default)]
pub struct Mpsc;

impl<T> Engine<T> for Spsc {
    type Producer = SpscProducer<T>;
    type Consumer = SpscConsumer<T>;
    const KIND: &'static str = "spsc";

    fn create(config: RingConfig) -> Result<(Self::Producer, Self::Consumer)> {
        spsc::channel_with_config(config)
    }
}

impl<T> Engine<T> for Mpsc {
    type Producer = MpscProducer<T>;
    type Consumer = MpscConsumer<T>;
    const KIND: &'static str = "mpsc";

    fn create(config: RingConfig) -> Result<(Self::Producer, Self::Consumer)> {
        mpsc::channel_with_config(config)
    }
}

macro_rules! impl_ring_state {
    ($($handle:ident),+) => {
        $(
            impl<T> RingState for $handle<T> {
                #[inline]
                fn capacity(&self) -> usize {
                    $handle::capacity(self)
                }

                #[inline]
                fn len(&self) -> usize {
                    $handle::len(self)
                }

                fn metrics(&self) -> MetricsSnapshot {
                    $handle::metrics(self)
                }

                fn reset_metrics(&self) {
                    $handle::reset_metrics(self)
                }
            }
        )+
    };
}

impl_ring_state!(SpscProducer, SpscConsumer, MpscProducer, MpscConsumer);

impl<T> RingProducer<T> for SpscProducer<T> {
    #[inline]
    fn try_write(&mut self, item: T) -> std::result::Result<(), Full<T>> {
        SpscProducer::try_write(self, item)
    }
}

impl<T> RingProducer<T> for MpscProducer<T> {
    #[inline]
    fn try_write(&mut self, item: T) -> std::result::Result<(), Full<T>> {
        MpscProducer::try_write(self, item)
    }
}

impl<T> RingConsumer<T> for SpscConsumer<T> {
    #[inline]
    fn try_read(&mut self) -> std::result::Result<T, Empty> {
        SpscConsumer::try_read(self)
    }
}

impl<T> RingConsumer<T> for MpscConsumer<T> {
    #[inline]
    fn try_read(&mut self) -> std::result::Result<T, Empty> {
        MpscConsumer::try_read(self)
    }
}

/// Owns one producer and the consumer of a ring for single-owner use, or
/// hands them out with `split`.
pub struct RingBuffer<T, E: Engine<T> = Spsc> {
    producer: E::Producer,
    consumer: E::Consumer,
    _engine: PhantomData<fn() -> E>,
}

impl<T, E: Engine<T>> RingBuffer<T, E> {
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(RingConfig::new(capacity)?)
    }

    pub fn with_config(config: RingConfig) -> Result<Self> {
        let (producer, consumer) = E::create(config)?;
        Ok(Self {
            producer,
            consumer,
            _engine: PhantomData,
        })
    }

    #[inline]
    pub fn try_write(&mut self, item: T) -> std::result::Result<(), Full<T>> {
        self.producer.try_write(item)
    }

    #[inline]
    pub fn try_read(&mut self) -> std::result::Result<T, Empty> {
        self.consumer.try_read()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.consumer.capacity()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.consumer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.consumer.is_full()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.consumer.metrics()
    }

    pub fn reset_metrics(&self) {
        self.consumer.reset_metrics();
    }

    pub fn kind(&self) -> &'static str {
        E::KIND
    }

    /// Hand out the producer and consumer for use on separate threads.
    pub fn split(self) -> (E::Producer, E::Consumer) {
        (self.producer, self.consumer)
    }
}

impl<T, E: Engine<T>> std::fmt::Debug for RingBuffer<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("kind", &E::KIND)
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}
