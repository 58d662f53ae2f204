//! Ringlane tuning constants
//!
//! Defaults used by `RingConfig` and the MPSC claim loop.

/// Default ring capacity (must be power of 2)
pub const DEFAULT_CAPACITY: usize = 64 * 1024; // 64K slots

/// Largest accepted capacity. Keeps at least 32 bits of generation in the
/// packed MPSC head word.
pub const MAX_CAPACITY: u64 = 1 << 32;

/// Failed CAS attempts an MPSC producer spins through before yielding its
/// time slice. Liveness tuning only; correctness does not depend on it.
pub const DEFAULT_SPIN_LIMIT: u32 = 64;

/// Default batch size for `process_events`
pub const DEFAULT_BATCH_SIZE: usize = 2048;
