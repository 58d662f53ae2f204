//! Lock-free bounded ring buffers.
//!
//! - `spsc` - Single producer, single consumer (fastest)
//! - `mpsc` - Multiple producers claim slots via CAS on a generation-tagged head
//! - `RingBuffer<T, E>` - Engine-agnostic facade over either of the above
//!
//! Every operation is non-blocking: a write against a full ring returns the
//! item in `Full`, a read against an empty ring returns `Empty`. Blocking and
//! backoff policy is layered on top (see `crate::wait`).

mod facade;
mod head;
pub mod mpsc;
mod slots;
pub mod spsc;

// Re-exports
pub use facade::{Engine, Mpsc, RingBuffer, RingConsumer, RingProducer, RingState, Spsc};
pub use mpsc::{MpscConsumer, MpscProducer};
pub use spsc::{SpscConsumer, SpscProducer};

use crate::constants::{DEFAULT_CAPACITY, DEFAULT_SPIN_LIMIT, MAX_CAPACITY};
use crate::error::{ConfigError, Result};

/// Logical ring position. Monotonically increasing, never reused.
pub type Sequence = u64;

/// Receives items drained by `process_events`.
pub trait EventHandler<T> {
    fn on_event(&mut self, item: T, sequence: Sequence, end_of_batch: bool);
}

impl<T, F> EventHandler<T> for F
where
    F: FnMut(T, Sequence, bool),
{
    fn on_event(&mut self, item: T, sequence: Sequence, end_of_batch: bool) {
        self(item, sequence, end_of_batch)
    }
}

/// Configuration for ring construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingConfig {
    /// Number of slots (must be power of 2)
    pub capacity: usize,
    /// Failed CAS attempts before an MPSC producer yields (SPSC ignores it)
    pub spin_limit: u32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            spin_limit: DEFAULT_SPIN_LIMIT,
        }
    }
}

impl RingConfig {
    /// Create a new configuration with the specified capacity
    pub fn new(capacity: usize) -> Result<Self> {
        validate_capacity(capacity)?;
        Ok(Self {
            capacity,
            ..Default::default()
        })
    }

    /// Set the MPSC spin budget
    pub fn with_spin_limit(mut self, spin_limit: u32) -> Result<Self> {
        if spin_limit == 0 {
            return Err(ConfigError::ZeroSpinLimit);
        }
        self.spin_limit = spin_limit;
        Ok(self)
    }

    /// Re-check a config assembled by hand through the public fields.
    pub fn validate(&self) -> Result<()> {
        validate_capacity(self.capacity)?;
        if self.spin_limit == 0 {
            return Err(ConfigError::ZeroSpinLimit);
        }
        Ok(())
    }
}

fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(ConfigError::ZeroCapacity);
    }
    if !capacity.is_power_of_two() {
        return Err(ConfigError::NotPowerOfTwo { capacity });
    }
    if capacity as u64 > MAX_CAPACITY {
        return Err(ConfigError::CapacityTooLarge {
            capacity,
            max: MAX_CAPACITY,
        });
    }
    Ok(())
}
