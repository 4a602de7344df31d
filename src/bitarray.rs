//! Fixed-Capacity Bit Array
//!
//! Multi-word bitmask used for device capability sets (supported key codes,
//! absolute axes) and pointer-id sets. Word width is fixed at 32 bits, which
//! matches the buffers returned by the kernel capability ioctls. Range
//! queries are word-masked rather than per-bit because they gate per-axis
//! dispatch on the event read-out path.

/// Fixed-size bit array over `WORDS` 32-bit words.
///
/// Out-of-range indices never fault: `test` reports an unset bit, `set`
/// refuses the write, and `any` treats the invalid portion of a range as
/// empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitArray<const WORDS: usize> {
    words: [u32; WORDS],
}

impl<const WORDS: usize> Default for BitArray<WORDS> {
    fn default() -> Self {
        Self { words: [0; WORDS] }
    }
}

impl<const WORDS: usize> BitArray<WORDS> {
    const WORD_BITS: usize = u32::BITS as usize;

    /// Total number of addressable bits
    pub const BITS: usize = WORDS * Self::WORD_BITS;

    /// Create an empty bit array
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-initialize from a word buffer, replacing all current bits
    pub fn load_from_buffer(&mut self, buffer: [u32; WORDS]) {
        self.words = buffer;
    }

    /// Test a single bit; false for `index >= Self::BITS`
    pub fn test(&self, index: usize) -> bool {
        if index >= Self::BITS {
            return false;
        }
        self.words[index / Self::WORD_BITS] & (1 << (index % Self::WORD_BITS)) != 0
    }

    /// Set a single bit, returning whether the index was in range
    pub fn set(&mut self, index: usize) -> bool {
        if index >= Self::BITS {
            return false;
        }
        self.words[index / Self::WORD_BITS] |= 1 << (index % Self::WORD_BITS);
        true
    }

    /// Number of set bits
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Test whether any bit in the half-open range `[start, end)` is set.
    ///
    /// Empty, inverted, and fully out-of-range ranges are false; ranges that
    /// straddle the valid boundary are clipped.
    pub fn any(&self, start: usize, end: usize) -> bool {
        let end = end.min(Self::BITS);
        if start >= end {
            return false;
        }
        let first_word = start / Self::WORD_BITS;
        let last_word = (end - 1) / Self::WORD_BITS;

        // Mask covering bits [start % 32, 32) of the first word.
        let start_mask = u32::MAX << (start % Self::WORD_BITS);
        // Mask covering bits [0, (end - 1) % 32] of the last word.
        let end_mask = u32::MAX >> (Self::WORD_BITS - 1 - (end - 1) % Self::WORD_BITS);

        if first_word == last_word {
            return self.words[first_word] & start_mask & end_mask != 0;
        }
        if self.words[first_word] & start_mask != 0 {
            return true;
        }
        if self.words[first_word + 1..last_word].iter().any(|w| *w != 0) {
            return true;
        }
        self.words[last_word] & end_mask != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SINGLE: [u32; 1] = [
        0x800F_0F0F, // bit 0 - 31
    ];
    const MULTI: [u32; 8] = [
        0xFFFF_FFFF, // bit 0 - 31
        0x0100_0001, // bit 32 - 63
        0x0000_0000, // bit 64 - 95
        0x8000_0000, // bit 96 - 127
        0x0000_0000, // bit 128 - 159
        0x0000_0000, // bit 160 - 191
        0x8000_0008, // bit 192 - 223
        0x0000_0000, // bit 224 - 255
    ];

    fn single() -> BitArray<1> {
        let mut bits = BitArray::new();
        bits.load_from_buffer(SINGLE);
        bits
    }

    fn multi() -> BitArray<8> {
        let mut bits = BitArray::new();
        bits.load_from_buffer(MULTI);
        bits
    }

    #[test]
    fn test_bit() {
        let single = single();
        assert!(single.test(0));
        assert!(single.test(31));
        assert!(!single.test(7));

        let multi = multi();
        assert!(multi.test(32));
        assert!(multi.test(56));
        assert!(!multi.test(192));
        assert!(multi.test(223));
        assert!(!multi.test(255));
    }

    #[test]
    fn test_any_bit() {
        let single = single();
        assert!(single.any(31, 32));
        assert!(!single.any(12, 16));

        let multi = multi();
        assert!(multi.any(31, 32));
        assert!(!multi.any(33, 33));
        assert!(multi.any(32, 55));
        assert!(multi.any(33, 57));
        assert!(!multi.any(33, 55));
        assert!(!multi.any(130, 190));

        assert!(!multi.any(128, 195));
        assert!(multi.any(128, 196));
        assert!(multi.any(128, 224));
        assert!(!multi.any(255, 256));
    }

    #[test]
    fn test_bit_invalid_index() {
        assert!(!single().test(32));
        assert!(!multi().test(256));
    }

    #[test]
    fn test_any_bit_invalid_range() {
        let single = single();
        assert!(!single.any(32, 32));
        assert!(!single.any(33, 34));

        let multi = multi();
        assert!(!multi.any(256, 256));
        assert!(!multi.any(257, 258));
        assert!(!multi.any(0, 0));
    }

    #[test]
    fn test_set_and_count() {
        let mut bits: BitArray<2> = BitArray::new();
        assert!(bits.set(0));
        assert!(bits.set(33));
        assert!(!bits.set(64));
        assert_eq!(bits.count(), 2);
        assert!(bits.test(0));
        assert!(bits.test(33));
        assert!(!bits.test(64));
    }

    proptest! {
        #[test]
        fn any_matches_per_bit_or(
            words in proptest::array::uniform8(any::<u32>()),
            start in 0usize..300,
            end in 0usize..300,
        ) {
            let mut bits: BitArray<8> = BitArray::new();
            bits.load_from_buffer(words);
            let expected = (start..end.min(BitArray::<8>::BITS))
                .any(|i| bits.test(i));
            prop_assert_eq!(bits.any(start, end), expected);
        }
    }
}
