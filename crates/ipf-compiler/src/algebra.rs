//! Interval algebra: merge and difference
//!
//! Both operations are generic over [`AddressDomain`], so the IPv6 path runs
//! the same code as IPv4 on two-lane integers. All `+1`/`-1` steps are
//! checked: the domain maximum is a valid endpoint.

use ipf_core::domain::AddressDomain;
use ipf_core::types::{BlockSet, V4Block, V6Block};

use crate::decompose::decompose;
use crate::ranges::{block_set_intervals, FamilyBlock, Interval};

// =============================================================================
// Merge
// =============================================================================

/// Coalesce overlapping and adjacent intervals.
///
/// Output is sorted by `start`, pairwise disjoint and non-adjacent.
pub fn merge<T: AddressDomain>(mut intervals: Vec<Interval<T>>) -> Vec<Interval<T>> {
    if intervals.is_empty() {
        return intervals;
    }
    intervals.sort_unstable_by_key(|i| i.start);

    let mut out = Vec::with_capacity(intervals.len());
    let mut iter = intervals.into_iter();
    let Some(mut cur) = iter.next() else {
        return out;
    };

    for next in iter {
        // An accumulator ending at MAX absorbs everything after it.
        let touches = match cur.end.succ() {
            Some(after_end) => next.start <= after_end,
            None => true,
        };
        if touches {
            if next.end > cur.end {
                cur.end = next.end;
            }
        } else {
            out.push(cur);
            cur = next;
        }
    }
    out.push(cur);
    out
}

// =============================================================================
// Difference
// =============================================================================

/// How one exclusion interval relates to the remainder of a base interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap<T> {
    /// No shared address.
    Disjoint,
    /// Exclusion covers the whole remainder.
    Covers,
    /// Exclusion covers the left edge; the remainder now starts at `start`.
    LeftEdge { start: T },
    /// Exclusion covers the right edge; the remainder now ends at `end`.
    RightEdge { end: T },
    /// Exclusion sits strictly inside: `left` survives, `right` is what remains.
    Inside { left: Interval<T>, right: Interval<T> },
}

/// Classify `excl` against `rem`.
pub fn classify<T: AddressDomain>(rem: Interval<T>, excl: Interval<T>) -> Overlap<T> {
    if excl.end < rem.start || excl.start > rem.end {
        return Overlap::Disjoint;
    }

    let covers_left = excl.start <= rem.start;
    let covers_right = excl.end >= rem.end;

    // The checked steps below cannot fail: each is guarded by a strict
    // inequality against another in-domain value.
    match (covers_left, covers_right) {
        (true, true) => Overlap::Covers,
        (true, false) => match excl.end.succ() {
            Some(start) => Overlap::LeftEdge { start },
            None => Overlap::Covers,
        },
        (false, true) => match excl.start.pred() {
            Some(end) => Overlap::RightEdge { end },
            None => Overlap::Covers,
        },
        (false, false) => match (excl.start.pred(), excl.end.succ()) {
            (Some(left_end), Some(right_start)) => Overlap::Inside {
                left: Interval {
                    start: rem.start,
                    end: left_end,
                },
                right: Interval {
                    start: right_start,
                    end: rem.end,
                },
            },
            _ => Overlap::Covers,
        },
    }
}

/// `base \ excl` for two merged, sorted interval sequences.
///
/// For every address `a`: `a` is in the output iff it is in `base` and not in
/// `excl`. Output is sorted and disjoint.
pub fn difference<T: AddressDomain>(base: &[Interval<T>], excl: &[Interval<T>]) -> Vec<Interval<T>> {
    if excl.is_empty() {
        return base.to_vec();
    }

    let mut out = Vec::with_capacity(base.len());
    let mut j = 0;

    for &b in base {
        // Exclusions ending before this base interval can't touch later ones either.
        while j < excl.len() && excl[j].end < b.start {
            j += 1;
        }

        let mut rem = Some(b);
        let mut k = j;
        while let Some(cur) = rem {
            let Some(&e) = excl.get(k) else {
                break;
            };
            if e.start > cur.end {
                break;
            }
            match classify(cur, e) {
                Overlap::Disjoint => {}
                Overlap::Covers => rem = None,
                Overlap::LeftEdge { start } => rem = Some(Interval { start, end: cur.end }),
                Overlap::RightEdge { end } => {
                    out.push(Interval { start: cur.start, end });
                    rem = None;
                }
                Overlap::Inside { left, right } => {
                    out.push(left);
                    rem = Some(right);
                }
            }
            k += 1;
        }

        if let Some(cur) = rem {
            out.push(cur);
        }
    }

    out
}

// =============================================================================
// Set operations on block collections
// =============================================================================

fn combine_family<B: FamilyBlock>(
    base: Vec<Interval<B::Addr>>,
    excludes: Vec<Interval<B::Addr>>,
) -> Vec<B> {
    let base = merge(base);
    let excl = merge(excludes);
    decompose(&difference(&base, &excl))
}

/// `base` minus `excludes`, as a minimal block collection.
///
/// Range conversion, merge of both sides, difference, then decomposition.
pub fn combine(base: &BlockSet, excludes: &BlockSet) -> BlockSet {
    let (base_v4, base_v6) = block_set_intervals(base);
    let (excl_v4, excl_v6) = block_set_intervals(excludes);
    BlockSet {
        v4: combine_family::<V4Block>(base_v4, excl_v4),
        v6: combine_family::<V6Block>(base_v6, excl_v6),
    }
}

/// Union of `parts`, coalesced into a minimal block collection.
pub fn union<'a, I>(parts: I) -> BlockSet
where
    I: IntoIterator<Item = &'a BlockSet>,
{
    let mut all = BlockSet::new();
    for part in parts {
        all.v4.extend_from_slice(&part.v4);
        all.v6.extend_from_slice(&part.v6);
    }
    combine(&all, &BlockSet::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipf_core::wide::U128;

    fn iv(start: u32, end: u32) -> Interval<u32> {
        Interval { start, end }
    }

    // Deterministic LCG, same constants as the benchmark workload generator.
    fn create_rng(seed: u32) -> impl FnMut() -> u32 {
        let mut state = seed;
        move || {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            state
        }
    }

    fn set(tokens: &[&str]) -> BlockSet {
        crate::parser::parse_rules(tokens, crate::parser::ParseMode::Strict).unwrap()
    }

    #[test]
    fn combine_carves_each_family_independently() {
        let result = combine(
            &set(&["10.0.0.0/8", "2001:db8::/32"]),
            &set(&["10.128.0.0/9", "2001:db8:8000::/33", "192.0.2.0/24"]),
        );
        let texts: Vec<String> = result.iter().map(|b| b.to_string()).collect();
        assert_eq!(texts, vec!["10.0.0.0/9", "2001:db8::/33"]);

        let untouched = combine(&set(&["::/0"]), &set(&["0.0.0.0/0"]));
        assert_eq!(untouched, set(&["::/0"]));
    }

    #[test]
    fn merge_overlapping_and_adjacent() {
        let merged = merge(vec![iv(10, 20), iv(0, 5), iv(6, 8), iv(15, 30), iv(40, 41)]);
        assert_eq!(merged, vec![iv(0, 8), iv(10, 30), iv(40, 41)]);
    }

    #[test]
    fn merge_contained_interval_keeps_larger_end() {
        let merged = merge(vec![iv(0, 100), iv(10, 20)]);
        assert_eq!(merged, vec![iv(0, 100)]);
    }

    #[test]
    fn merge_at_domain_maximum() {
        let merged = merge(vec![iv(u32::MAX - 1, u32::MAX), iv(u32::MAX, u32::MAX), iv(0, 0)]);
        assert_eq!(merged, vec![iv(0, 0), iv(u32::MAX - 1, u32::MAX)]);

        let v6 = merge(vec![
            Interval { start: U128::new(0, u64::MAX), end: U128::MAX },
            Interval { start: U128::new(1, 0), end: U128::new(1, 5) },
        ]);
        assert_eq!(v6, vec![Interval { start: U128::new(0, u64::MAX), end: U128::MAX }]);
    }

    #[test]
    fn merge_adjacent_across_lane_boundary() {
        let a = Interval { start: U128::ZERO, end: U128::new(0, u64::MAX) };
        let b = Interval { start: U128::new(1, 0), end: U128::new(1, 1) };
        assert_eq!(merge(vec![b, a]), vec![Interval { start: U128::ZERO, end: U128::new(1, 1) }]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut rand = create_rng(7);
        for _ in 0..50 {
            let intervals: Vec<_> = (0..20)
                .map(|_| {
                    let a = rand() % 10_000;
                    let b = a + rand() % 300;
                    iv(a, b)
                })
                .collect();
            let once = merge(intervals);
            let twice = merge(once.clone());
            assert_eq!(once, twice);
            for pair in once.windows(2) {
                assert!(pair[0].end + 1 < pair[1].start);
            }
        }
    }

    #[test]
    fn classify_each_case() {
        let rem = iv(10, 20);
        assert_eq!(classify(rem, iv(0, 9)), Overlap::Disjoint);
        assert_eq!(classify(rem, iv(21, 30)), Overlap::Disjoint);
        assert_eq!(classify(rem, iv(5, 25)), Overlap::Covers);
        assert_eq!(classify(rem, iv(10, 20)), Overlap::Covers);
        assert_eq!(classify(rem, iv(5, 12)), Overlap::LeftEdge { start: 13 });
        assert_eq!(classify(rem, iv(18, 30)), Overlap::RightEdge { end: 17 });
        assert_eq!(
            classify(rem, iv(12, 14)),
            Overlap::Inside { left: iv(10, 11), right: iv(15, 20) }
        );
    }

    #[test]
    fn classify_at_domain_edges() {
        let rem = iv(0, u32::MAX);
        assert_eq!(classify(rem, iv(0, 5)), Overlap::LeftEdge { start: 6 });
        assert_eq!(classify(rem, iv(7, u32::MAX)), Overlap::RightEdge { end: 6 });
        assert_eq!(classify(rem, iv(0, u32::MAX)), Overlap::Covers);
    }

    #[test]
    fn difference_cases() {
        let base = vec![iv(0, 100), iv(200, 300)];
        let excl = vec![iv(10, 20), iv(30, 40), iv(90, 210), iv(290, 400)];
        assert_eq!(
            difference(&base, &excl),
            vec![iv(0, 9), iv(21, 29), iv(41, 89), iv(211, 289)]
        );
    }

    #[test]
    fn difference_empty_sides() {
        let base = vec![iv(0, 10)];
        assert_eq!(difference(&base, &[]), base);
        assert!(difference(&[], &base).is_empty());
        assert!(difference(&base, &[iv(0, 10)]).is_empty());
    }

    #[test]
    fn difference_exclusion_spanning_bases() {
        let base = vec![iv(0, 10), iv(20, 30), iv(40, 50)];
        let excl = vec![iv(5, 45)];
        assert_eq!(difference(&base, &excl), vec![iv(0, 4), iv(46, 50)]);
    }

    #[test]
    fn difference_matches_pointwise_membership() {
        let mut rand = create_rng(42);
        for _ in 0..200 {
            let mut random_set = |n: usize| -> Vec<Interval<u32>> {
                merge(
                    (0..n)
                        .map(|_| {
                            let a = rand() % 2_000;
                            iv(a, a + rand() % 120)
                        })
                        .collect(),
                )
            };
            let a = random_set(8);
            let b = random_set(8);
            let d = difference(&a, &b);
            for addr in 0..2_200u32 {
                let in_a = a.iter().any(|i| i.contains(addr));
                let in_b = b.iter().any(|i| i.contains(addr));
                let in_d = d.iter().any(|i| i.contains(addr));
                assert_eq!(in_d, in_a && !in_b, "addr {addr}");
            }
            for pair in d.windows(2) {
                assert!(pair[0].end < pair[1].start);
            }
        }
    }

    #[test]
    fn difference_matches_pointwise_membership_v6() {
        let mut rand = create_rng(1234);
        let hi = 0x2001_0db8_0000_0000u64;
        for _ in 0..100 {
            let mut random_set = |n: usize| -> Vec<Interval<U128>> {
                merge(
                    (0..n)
                        .map(|_| {
                            // straddle the lane boundary to exercise carries
                            let s = U128::new(hi, u64::MAX - 500);
                            let off = (rand() % 1_000) as u64;
                            let len = (rand() % 80) as u64;
                            let start = add(s, off);
                            Interval { start, end: add(start, len) }
                        })
                        .collect(),
                )
            };
            let a = random_set(6);
            let b = random_set(6);
            let d = difference(&a, &b);
            for off in 0..1_200u64 {
                let addr = add(U128::new(hi, u64::MAX - 500), off);
                let in_a = a.iter().any(|i| i.contains(addr));
                let in_b = b.iter().any(|i| i.contains(addr));
                let in_d = d.iter().any(|i| i.contains(addr));
                assert_eq!(in_d, in_a && !in_b, "offset {off}");
            }
        }
    }

    fn add(v: U128, n: u64) -> U128 {
        let (lo, carry) = v.lo.overflowing_add(n);
        U128::new(v.hi + carry as u64, lo)
    }
}
