//! Block <-> interval conversion
//!
//! A block covers `[shifted << shift, (shifted << shift) + 2^shift - 1]`.
//! For IPv6 the end is computed with two-lane masks so that `::/0` yields
//! `[0, 2^128 - 1]` without a 128-bit native subtraction.

use ipf_core::domain::AddressDomain;
use ipf_core::types::{BlockSet, V4Block, V6Block};
use ipf_core::wide::U128;

/// Closed numeric range `[start, end]`, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval<T> {
    pub start: T,
    pub end: T,
}

impl<T: AddressDomain> Interval<T> {
    /// `None` when `start > end`.
    pub fn new(start: T, end: T) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn single(addr: T) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    pub fn everything() -> Self {
        Self {
            start: T::ZERO,
            end: T::MAX,
        }
    }

    #[inline]
    pub fn contains(&self, addr: T) -> bool {
        self.start <= addr && addr <= self.end
    }
}

/// A family's block type, convertible to and from its integer interval.
pub trait FamilyBlock: Copy {
    type Addr: AddressDomain;

    /// Range Converter: the closed interval this block covers.
    fn to_interval(&self) -> Interval<Self::Addr>;

    /// Block of size `2^exponent` starting at `start`.
    ///
    /// `start` must be aligned to `2^exponent`; host bits are dropped otherwise.
    fn from_aligned(start: Self::Addr, exponent: u32) -> Self;
}

impl FamilyBlock for V4Block {
    type Addr = u32;

    fn to_interval(&self) -> Interval<u32> {
        let start = self.network();
        let size_mask = match 1u32.checked_shl(self.shift() as u32) {
            Some(size) => size - 1,
            None => u32::MAX,
        };
        Interval {
            start,
            end: start | size_mask,
        }
    }

    fn from_aligned(start: u32, exponent: u32) -> Self {
        V4Block::with_host_bits(start, exponent.min(32) as u8)
    }
}

impl FamilyBlock for V6Block {
    type Addr = U128;

    fn to_interval(&self) -> Interval<U128> {
        let start = self.network();
        let host_bits = 128 - self.prefix() as u32;
        Interval {
            start,
            end: start.bitor(U128::low_mask(host_bits)),
        }
    }

    fn from_aligned(start: U128, exponent: u32) -> Self {
        V6Block::with_host_bits(start, exponent.min(128) as u8)
    }
}

/// Convert a slice of blocks into (unsorted) intervals.
pub fn to_intervals<B: FamilyBlock>(blocks: &[B]) -> Vec<Interval<B::Addr>> {
    blocks.iter().map(FamilyBlock::to_interval).collect()
}

/// Per-family interval lists of a whole collection.
pub fn block_set_intervals(set: &BlockSet) -> (Vec<Interval<u32>>, Vec<Interval<U128>>) {
    (to_intervals(&set.v4), to_intervals(&set.v6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipf_core::types::Block;

    use crate::parser::parse_rule;

    fn v4(text: &str) -> V4Block {
        match parse_rule(text).unwrap() {
            Block::V4(b) => b,
            Block::V6(_) => panic!("expected v4"),
        }
    }

    fn v6(text: &str) -> V6Block {
        match parse_rule(text).unwrap() {
            Block::V6(b) => b,
            Block::V4(_) => panic!("expected v6"),
        }
    }

    #[test]
    fn v4_intervals() {
        assert_eq!(
            v4("10.0.0.0/8").to_interval(),
            Interval { start: 0x0a00_0000, end: 0x0aff_ffff }
        );
        assert_eq!(
            v4("1.2.3.4").to_interval(),
            Interval { start: 0x0102_0304, end: 0x0102_0304 }
        );
        assert_eq!(v4("0.0.0.0/0").to_interval(), Interval::everything());
    }

    #[test]
    fn v6_whole_space_uses_both_lanes() {
        assert_eq!(v6("::/0").to_interval(), Interval::<U128>::everything());
    }

    #[test]
    fn v6_intervals_across_lane_boundary() {
        let i = v6("2001:db8::/32").to_interval();
        assert_eq!(i.start, U128::new(0x2001_0db8_0000_0000, 0));
        assert_eq!(i.end, U128::new(0x2001_0db8_ffff_ffff, u64::MAX));

        let i = v6("100::/64").to_interval();
        assert_eq!(i.start, U128::new(0x0100_0000_0000_0000, 0));
        assert_eq!(i.end, U128::new(0x0100_0000_0000_0000, u64::MAX));

        let i = v6("::ffff:0:0/96").to_interval();
        assert_eq!(i.start, U128::new(0, 0x0000_ffff_0000_0000));
        assert_eq!(i.end, U128::new(0, 0x0000_ffff_ffff_ffff));
    }

    #[test]
    fn from_aligned_inverts_to_interval() {
        let b = v4("192.168.0.0/16");
        let i = b.to_interval();
        assert_eq!(V4Block::from_aligned(i.start, 16), b);

        let b = v6("fe80::/10");
        let i = b.to_interval();
        assert_eq!(V6Block::from_aligned(i.start, 118), b);
    }

    #[test]
    fn interval_new_rejects_inverted() {
        assert!(Interval::new(5u32, 4).is_none());
        assert!(Interval::new(4u32, 4).is_some());
        assert!(Interval::single(9u32).contains(9));
    }

    #[test]
    fn block_set_intervals_splits_by_family() {
        let set: BlockSet = ["10.0.0.0/8", "::1/128", "192.0.2.0/24", "2001:db8::/32"]
            .into_iter()
            .map(|t| parse_rule(t).unwrap())
            .collect();
        let (v4s, v6s) = block_set_intervals(&set);

        assert_eq!(v4s.len(), 2);
        assert!(v4s.contains(&Interval { start: 0x0a00_0000, end: 0x0aff_ffff }));
        assert!(v4s.contains(&Interval { start: 0xc000_0200, end: 0xc000_02ff }));
        assert_eq!(v6s.len(), 2);
        assert!(v6s.contains(&Interval::single(U128::new(0, 1))));
        assert!(v6s.contains(&Interval {
            start: U128::new(0x2001_0db8_0000_0000, 0),
            end: U128::new(0x2001_0db8_ffff_ffff, u64::MAX),
        }));

        let (none4, none6) = block_set_intervals(&BlockSet::new());
        assert!(none4.is_empty() && none6.is_empty());
    }
}
