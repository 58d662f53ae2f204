//! Slot array and index arithmetic shared by the SPSC and MPSC engines.
//!
//! Storage is allocated once and never resized. Logical position `p` lives in
//! slot `p & mask`, so the hot path needs no bounds branch. A slot only holds
//! a live value while `tail <= p < head`; the engines' cursor protocol decides
//! who may touch it, this type does not track it.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

use crate::ring::Sequence;

pub(crate) struct SlotArray<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
}

// SAFETY: each slot is owned by exactly one side at a time (head/tail protocol)
unsafe impl<T: Send> Sync for SlotArray<T> {}

impl<T> SlotArray<T> {
    /// `capacity` must already be validated as a non-zero power of 2.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            mask: capacity - 1,
        }
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    pub(crate) fn physical_index(&self, position: Sequence) -> usize {
        (position as usize) & self.mask
    }

    /// # Safety
    /// The caller must exclusively own `position` and the slot must be empty.
    #[inline(always)]
    pub(crate) unsafe fn write(&self, position: Sequence, value: T) {
        let idx = self.physical_index(position);
        (*self.slots.get_unchecked(idx).get()).write(value);
    }

    /// # Safety
    /// `position` must be published and not yet read. Ownership of the value
    /// moves out; the slot is logically empty afterwards.
    #[inline(always)]
    pub(crate) unsafe fn read(&self, position: Sequence) -> T {
        let idx = self.physical_index(position);
        (*self.slots.get_unchecked(idx).get()).assume_init_read()
    }

    /// # Safety
    /// Same contract as `read`, for values being discarded.
    pub(crate) unsafe fn drop_in_place(&self, position: Sequence) {
        let idx = self.physical_index(position);
        (*self.slots.get_unchecked(idx).get()).assume_init_drop();
    }
}

/// Number of resident elements for a `(head, tail)` snapshot, clamped to
/// `[0, capacity]`. Snapshots taken on another thread may be stale, never
/// out of range.
#[inline]
pub(crate) fn occupancy(head: Sequence, tail: Sequence, capacity: usize) -> usize {
    head.saturating_sub(tail).min(capacity as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_physical_index_wraps() {
        let slots = SlotArray::<u64>::new(8);
        assert_eq!(slots.capacity(), 8);
        assert_eq!(slots.physical_index(0), 0);
        assert_eq!(slots.physical_index(7), 7);
        assert_eq!(slots.physical_index(8), 0);
        assert_eq!(slots.physical_index(13), 5);
        assert_eq!(slots.physical_index(u64::MAX), 7);
    }

    #[test]
    fn test_capacity_one_maps_everything_to_slot_zero() {
        let slots = SlotArray::<u64>::new(1);
        assert_eq!(slots.physical_index(0), 0);
        assert_eq!(slots.physical_index(41), 0);
    }

    #[test]
    fn test_write_then_read_moves_value() {
        let slots = SlotArray::<String>::new(4);
        unsafe {
            slots.write(5, String::from("five"));
            assert_eq!(slots.read(5), "five");
            // slot 1 again, next lap
            slots.write(9, String::from("nine"));
            assert_eq!(slots.read(9), "nine");
        }
    }

    #[test]
    fn test_drop_in_place_releases_value() {
        let tracker = Rc::new(());
        let slots = SlotArray::<Rc<()>>::new(2);
        unsafe {
            slots.write(0, tracker.clone());
            assert_eq!(Rc::strong_count(&tracker), 2);
            slots.drop_in_place(0);
        }
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_occupancy_clamps() {
        assert_eq!(occupancy(10, 4, 8), 6);
        assert_eq!(occupancy(4, 4, 8), 0);
        // stale tail newer than head snapshot
        assert_eq!(occupancy(3, 4, 8), 0);
        assert_eq!(occupancy(20, 4, 8), 8);
    }
}
