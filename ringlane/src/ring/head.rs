//! Generation-tagged MPSC head word.
//!
//! The producer cursor packs `(generation, index)` into one `u64`:
//!
//! ```text
//!  63                         shift            0
//! ┌─────────────────────────────┬───────────────┐
//! │ generation (laps completed) │ slot index    │
//! └─────────────────────────────┴───────────────┘
//! ```
//!
//! `shift = log2(capacity)`. The generation bumps exactly when the index wraps
//! back to zero, so a producer that observed `(g, i)` and stalled for a full
//! lap sees its CAS fail against `(g + 1, i)` even though the slot index is the
//! same. Read as a plain integer the word equals `g * capacity + i`, the
//! logical write position, so distance checks against the tail need no
//! unpacking.

use crate::error::Result;
use crate::ring::{validate_capacity, Sequence};

/// Raw packed head value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub(crate) struct PackedHead(u64);

impl PackedHead {
    pub(crate) const ZERO: PackedHead = PackedHead(0);

    #[inline(always)]
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub(crate) const fn raw(self) -> u64 {
        self.0
    }

    /// Logical write position this head points at.
    #[inline(always)]
    pub(crate) const fn sequence(self) -> Sequence {
        self.0
    }
}

/// Bit layout of a `PackedHead` for one ring capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeadLayout {
    shift: u32,
    mask: u64,
}

impl HeadLayout {
    /// Rejects the same capacities `RingConfig` does.
    pub(crate) fn new(capacity: usize) -> Result<Self> {
        validate_capacity(capacity)?;
        Ok(Self {
            shift: capacity.trailing_zeros(),
            mask: capacity as u64 - 1,
        })
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> u64 {
        self.mask + 1
    }

    #[inline(always)]
    pub(crate) fn pack(&self, generation: u64, index: u64) -> PackedHead {
        debug_assert!(index <= self.mask);
        // shift < 64 always; generation bits past the top are dropped
        PackedHead((generation << self.shift) | (index & self.mask))
    }

    #[inline(always)]
    pub(crate) fn generation(&self, head: PackedHead) -> u64 {
        head.0 >> self.shift
    }

    #[inline(always)]
    pub(crate) fn index(&self, head: PackedHead) -> u64 {
        head.0 & self.mask
    }

    /// Generation a plain logical position belongs to.
    #[inline(always)]
    pub(crate) fn generation_of(&self, position: Sequence) -> u64 {
        self.generation(PackedHead(position))
    }

    /// Candidate head after claiming the slot at `head`.
    #[inline(always)]
    pub(crate) fn advance(&self, head: PackedHead) -> PackedHead {
        let index = self.index(head) + 1;
        if index > self.mask {
            self.pack(self.generation(head).wrapping_add(1), 0)
        } else {
            self.pack(self.generation(head), index)
        }
    }
}
