//! Coding-region coverage accumulator.
//!
//! One bit per nucleotide position, addressed 1-based. Bit 0 is allocated
//! but never set so positions can be used as indices directly.

use crate::error::{CdsError, Result};
use crate::types::{CoordinateRange, CoverageSummary};

/// Largest genome length a map is allocated for (64 Gbp, an 8 GiB bitmap).
pub const MAX_GENOME_LENGTH: u64 = 1 << 36;

#[inline]
const fn bit_position(index: u64) -> (usize, u8) {
    ((index >> 3) as usize, 1 << (index & 0x07))
}

/// Positions of one genome attributed to at least one gene.
#[derive(Debug, Clone)]
pub struct CoverageMap {
    bits: Vec<u8>,
    length: u64,
    covered: u64,
}

impl CoverageMap {
    /// Allocate an empty map for a genome of `length` nucleotides.
    ///
    /// Lengths above [`MAX_GENOME_LENGTH`], or whose bitmap cannot be
    /// allocated, are rejected as [`CdsError::InvalidLength`].
    pub fn new(length: u64) -> Result<Self> {
        let too_long = || CdsError::InvalidLength(length.to_string());
        if length > MAX_GENOME_LENGTH {
            return Err(too_long());
        }
        let slots = length.checked_add(1).ok_or_else(too_long)?;
        let bytes = usize::try_from(slots.div_ceil(8)).map_err(|_| too_long())?;

        let mut bits: Vec<u8> = Vec::new();
        bits.try_reserve_exact(bytes).map_err(|_| too_long())?;
        bits.resize(bytes, 0);

        Ok(CoverageMap {
            bits,
            length,
            covered: 0,
        })
    }

    /// Genome length the map was sized for.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Number of positions marked so far.
    pub fn covered(&self) -> u64 {
        self.covered
    }

    /// Whether a 1-based position has been marked. Out-of-range positions
    /// are reported as uncovered.
    pub fn is_covered(&self, position: u64) -> bool {
        if position == 0 || position > self.length {
            return false;
        }
        let (byte, mask) = bit_position(position);
        self.bits[byte] & mask != 0
    }

    /// Mark every position of `range`, counting each position at most once.
    ///
    /// Returns the number of positions that were newly covered. The map is
    /// left untouched when the range is out of bounds.
    pub fn mark(&mut self, range: &CoordinateRange) -> Result<u64> {
        if range.start < 1 || range.end > self.length || range.start > range.end {
            return Err(CdsError::RangeOutOfBounds {
                start: range.start,
                end: range.end,
                length: self.length,
            });
        }

        let mut added = 0;
        for position in range.start..=range.end {
            let (byte, mask) = bit_position(position);
            if self.bits[byte] & mask == 0 {
                self.bits[byte] |= mask;
                added += 1;
            }
        }
        self.covered += added;
        Ok(added)
    }

    /// Totals for the genome. Can be called any number of times.
    pub fn finalize(&self) -> CoverageSummary {
        CoverageSummary::new(self.covered, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_position() {
        assert_eq!(bit_position(0), (0, 1));
        assert_eq!(bit_position(7), (0, 128));
        assert_eq!(bit_position(8), (1, 1));
        assert_eq!(bit_position(17), (2, 2));
    }

    #[test]
    fn test_mark_counts_positions() {
        let mut map = CoverageMap::new(100).unwrap();
        assert_eq!(map.mark(&CoordinateRange::new(10, 20)).unwrap(), 11);
        assert_eq!(map.covered(), 11);
        assert!(map.is_covered(10));
        assert!(map.is_covered(20));
        assert!(!map.is_covered(9));
        assert!(!map.is_covered(21));
    }

    #[test]
    fn test_mark_is_idempotent() {
        let mut map = CoverageMap::new(50).unwrap();
        let range = CoordinateRange::new(5, 15);
        map.mark(&range).unwrap();
        let once = map.covered();
        assert_eq!(map.mark(&range).unwrap(), 0);
        assert_eq!(map.covered(), once);
    }

    #[test]
    fn test_overlap_counted_once() {
        let mut map = CoverageMap::new(100).unwrap();
        map.mark(&CoordinateRange::new(5, 15)).unwrap();
        assert_eq!(map.mark(&CoordinateRange::new(10, 20)).unwrap(), 5);
        assert_eq!(map.covered(), 16);
    }

    #[test]
    fn test_full_genome_edges() {
        let mut map = CoverageMap::new(16).unwrap();
        map.mark(&CoordinateRange::new(1, 16)).unwrap();
        assert_eq!(map.covered(), 16);
        assert!(!map.is_covered(0));
        assert!(!map.is_covered(17));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut map = CoverageMap::new(30).unwrap();
        let err = map.mark(&CoordinateRange::new(5, 40)).unwrap_err();
        assert!(matches!(
            err,
            CdsError::RangeOutOfBounds {
                start: 5,
                end: 40,
                length: 30
            }
        ));
        assert_eq!(map.covered(), 0);

        assert!(map.mark(&CoordinateRange::new(0, 3)).is_err());
    }

    #[test]
    fn test_rejects_unallocatable_lengths() {
        for length in [u64::MAX, 10_000_000_000_000_000, MAX_GENOME_LENGTH + 1] {
            assert!(matches!(
                CoverageMap::new(length),
                Err(CdsError::InvalidLength(_))
            ));
        }
        assert_eq!(CoverageMap::new(1).unwrap().length(), 1);
    }

    #[test]
    fn test_finalize_is_repeatable() {
        let mut map = CoverageMap::new(10).unwrap();
        map.mark(&CoordinateRange::new(1, 4)).unwrap();
        let first = map.finalize();
        let second = map.finalize();
        assert_eq!(first, second);
        assert_eq!(first.covered, 4);
        assert_eq!(first.length, 10);
    }
}
