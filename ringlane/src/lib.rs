//! Ringlane - bounded lock-free ring buffers
//!
//! Fixed-capacity FIFO hand-off between threads without locks:
//!
//! - `ring::spsc` - one producer, one consumer. Two cursors, no CAS.
//! - `ring::mpsc` - many producers claim slots by CAS on a head word tagged
//!   with a lap generation, one consumer.
//! - `RingBuffer<T, E>` - the same interface over either engine.
//!
//! Writes never block: a full ring hands the item back in `Full`, an empty
//! ring answers `Empty`. The `wait` module layers spin / yield / sleep
//! policies on top for callers that want to wait.
//!
//! ```
//! use ringlane::{mpsc, Empty};
//!
//! let (producer, mut consumer) = mpsc::channel::<u64>(1024).unwrap();
//! let worker = producer.clone();
//! std::thread::spawn(move || worker.try_write(7).unwrap()).join().unwrap();
//!
//! assert_eq!(consumer.try_read(), Ok(7));
//! assert_eq!(consumer.try_read(), Err(Empty));
//! ```

pub mod constants;
pub mod error;
pub mod insights;
pub mod metrics;
pub mod ring;
pub mod wait;

// Re-exports
pub use error::{ConfigError, Empty, Full, Result};
pub use insights::init_tracy;
pub use metrics::{Metrics, MetricsSnapshot};
pub use ring::{
    mpsc, spsc, Engine, EventHandler, Mpsc, MpscConsumer, MpscProducer, RingBuffer, RingConfig,
    RingConsumer, RingProducer, RingState, Sequence, Spsc, SpscConsumer, SpscProducer,
};
pub use wait::{read_blocking, write_blocking, BusySpin, Sleeping, WaitStrategy, Yielding};
