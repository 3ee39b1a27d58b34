//! Minimal CIDR decomposition of intervals
//!
//! Each step emits the largest block that both starts on an aligned boundary
//! at `start` and still fits before `end`, then advances past it.

use std::net::IpAddr;

use ipf_core::domain::AddressDomain;
use ipf_core::types::{Block, BlockSet, V4Block, V6Block};
use ipf_core::wide::U128;

use crate::parser::{parse_address, ParseError};
use crate::ranges::{FamilyBlock, Interval};

/// Decompose one interval into its minimal aligned block cover, appending to `out`.
///
/// An inverted interval (`start > end`) covers nothing and appends nothing.
pub fn decompose_interval<B: FamilyBlock>(interval: Interval<B::Addr>, out: &mut Vec<B>) {
    let mut start = interval.start;
    let end = interval.end;
    if start > end {
        return;
    }

    loop {
        let align_bits = start.alignment().min(<B::Addr as AddressDomain>::WIDTH);
        let len_bits = <B::Addr as AddressDomain>::span_exponent(start, end);
        let exponent = align_bits.min(len_bits);

        out.push(B::from_aligned(start, exponent));

        match start.add_pow2(exponent) {
            Some(next) if next <= end => start = next,
            // Either the block reached `end` exactly or it ended at the domain maximum.
            _ => break,
        }
    }
}

/// Decompose a disjoint interval sequence into blocks.
pub fn decompose<B: FamilyBlock>(intervals: &[Interval<B::Addr>]) -> Vec<B> {
    let mut out = Vec::with_capacity(intervals.len());
    for &interval in intervals {
        decompose_interval(interval, &mut out);
    }
    out
}

/// Minimal CIDR cover of the inclusive address range `start..=end`.
///
/// Both endpoints must be the same family and `start <= end`.
pub fn decompose_range(start: IpAddr, end: IpAddr) -> Result<BlockSet, ParseError> {
    let mut set = BlockSet::new();
    match (start, end) {
        (IpAddr::V4(s), IpAddr::V4(e)) => {
            let interval = Interval::new(u32::from(s), u32::from(e))
                .ok_or_else(|| ParseError::InvalidRange(format!("{s} is after {e}")))?;
            decompose_interval::<V4Block>(interval, &mut set.v4);
        }
        (IpAddr::V6(s), IpAddr::V6(e)) => {
            let interval = Interval::new(U128::from(s), U128::from(e))
                .ok_or_else(|| ParseError::InvalidRange(format!("{s} is after {e}")))?;
            decompose_interval::<V6Block>(interval, &mut set.v6);
        }
        _ => {
            return Err(ParseError::InvalidRange(format!(
                "{start} and {end} are different address families"
            )))
        }
    }
    Ok(set)
}

/// Text form of [`decompose_range`].
pub fn decompose_range_text(start: &str, end: &str) -> Result<Vec<Block>, ParseError> {
    let set = decompose_range(parse_address(start)?, parse_address(end)?)?;
    Ok(set.iter().collect())
}
