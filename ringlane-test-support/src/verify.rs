//! Delivery verification for multi-producer runs.
//!
//! Stress payloads are `u64`s tagging the producer in the top bits and the
//! producer-local sequence in the low bits, so the consumer can check
//! per-producer FIFO on the fly and the full multiset once the run ends.

/// Bits reserved for the producer-local sequence
pub const SEQUENCE_BITS: u32 = 40;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

#[inline]
pub fn encode(producer: usize, sequence: u64) -> u64 {
    debug_assert!(sequence <= SEQUENCE_MASK);
    ((producer as u64) << SEQUENCE_BITS) | (sequence & SEQUENCE_MASK)
}

#[inline]
pub fn decode(value: u64) -> (usize, u64) {
    ((value >> SEQUENCE_BITS) as usize, value & SEQUENCE_MASK)
}

/// Checks that each producer's items arrive in the order it wrote them.
///
/// Items from different producers may interleave arbitrarily.
#[derive(Debug)]
pub struct ProducerOrderChecker {
    next_expected: Vec<u64>,
    received: Vec<u64>,
    out_of_order: u64,
}

impl ProducerOrderChecker {
    pub fn new(producers: usize) -> Self {
        Self {
            next_expected: vec![0; producers],
            received: Vec::new(),
            out_of_order: 0,
        }
    }

    /// Record one consumed value. Returns false on an ordering violation.
    pub fn record(&mut self, value: u64) -> bool {
        self.received.push(value);
        let (producer, sequence) = decode(value);
        // unknown producers surface as `unexpected` in `finish`
        let Some(next) = self.next_expected.get_mut(producer) else {
            return false;
        };
        if sequence != *next {
            self.out_of_order += 1;
            // resync so one gap is counted once
            *next = sequence + 1;
            return false;
        }
        *next += 1;
        true
    }

    pub fn received(&self) -> usize {
        self.received.len()
    }

    /// Compare everything received against `per_producer` items from each
    /// producer, as sorted multisets.
    pub fn finish(mut self, per_producer: u64) -> VerifyStats {
        let producers = self.next_expected.len();
        let mut expected: Vec<u64> = (0..producers)
            .flat_map(|p| (0..per_producer).map(move |s| encode(p, s)))
            .collect();
        expected.sort_unstable();
        self.received.sort_unstable();

        let duplicates = self.received.windows(2).filter(|w| w[0] == w[1]).count() as u64;

        let mut missing = 0u64;
        let mut unexpected = 0u64;
        let (mut i, mut j) = (0, 0);
        while i < expected.len() && j < self.received.len() {
            match expected[i].cmp(&self.received[j]) {
                std::cmp::Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => {
                    missing += 1;
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    unexpected += 1;
                    j += 1;
                }
            }
        }
        missing += (expected.len() - i) as u64;
        unexpected += (self.received.len() - j) as u64;

        VerifyStats {
            expected: expected.len() as u64,
            received: self.received.len() as u64,
            out_of_order: self.out_of_order,
            duplicates,
            missing,
            unexpected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerifyStats {
    pub expected: u64,
    pub received: u64,
    pub out_of_order: u64,
    pub duplicates: u64,
    pub missing: u64,
    /// Values never written, duplicates included
    pub unexpected: u64,
}

impl VerifyStats {
    pub fn is_clean(&self) -> bool {
        self.out_of_order == 0
            && self.duplicates == 0
            && self.missing == 0
            && self.unexpected == 0
            && self.expected == self.received
    }
}
