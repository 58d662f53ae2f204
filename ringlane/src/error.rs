//! Error types for Ringlane.
//!
//! Only `ConfigError` is fatal. `Full` and `Empty` are the normal, frequent
//! outcomes of a non-blocking hand-off and are reported straight back to the
//! caller.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Rejected ring configuration. No buffer is produced.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration: capacity must be greater than 0")]
    ZeroCapacity,

    #[error("Invalid configuration: capacity {capacity} is not a power of 2")]
    NotPowerOfTwo { capacity: usize },

    #[error("Invalid configuration: capacity {capacity} exceeds maximum {max}")]
    CapacityTooLarge { capacity: usize, max: u64 },

    #[error("Invalid configuration: spin limit must be greater than 0")]
    ZeroSpinLimit,
}

/// Write rejected because every slot is occupied. Carries the item back.
#[derive(Error, Clone, Copy, PartialEq, Eq)]
#[error("Ring buffer is full")]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Recover the rejected item.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Full(..)")
    }
}

/// Read attempted with nothing published.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Ring buffer is empty")]
pub struct Empty;
