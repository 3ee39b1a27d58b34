//! Query-ready address-set index
//!
//! IPv4 blocks are partitioned by shift so the three most common prefix
//! lengths (/8, /16, /24) are tested against one precomputed shift of the
//! query address. IPv6 blocks are kept as a flat list.

use crate::types::{BlockSet, V4Block, V6Block};

// =============================================================================
// IPv4 Prefix Buckets
// =============================================================================

/// IPv4 blocks grouped by prefix length, each group sorted by `shifted`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct V4Buckets {
    /// shift 24 (/8)
    pub(crate) p8: Vec<V4Block>,
    /// shift 16 (/16)
    pub(crate) p16: Vec<V4Block>,
    /// shift 8 (/24)
    pub(crate) p24: Vec<V4Block>,
    /// every other prefix length
    pub(crate) rest: Vec<V4Block>,
}

impl V4Buckets {
    pub fn build(blocks: &[V4Block]) -> Self {
        let mut out = Self::default();

        for &block in blocks {
            match block.shift() {
                24 => out.p8.push(block),
                16 => out.p16.push(block),
                8 => out.p24.push(block),
                _ => out.rest.push(block),
            }
        }

        out.p8.sort_by_key(|b| b.shifted());
        out.p16.sort_by_key(|b| b.shifted());
        out.p24.sort_by_key(|b| b.shifted());
        out.rest.sort_by_key(|b| b.shifted());

        out
    }

    pub fn p8(&self) -> &[V4Block] {
        &self.p8
    }

    pub fn p16(&self) -> &[V4Block] {
        &self.p16
    }

    pub fn p24(&self) -> &[V4Block] {
        &self.p24
    }

    pub fn rest(&self) -> &[V4Block] {
        &self.rest
    }

    pub fn len(&self) -> usize {
        self.p8.len() + self.p16.len() + self.p24.len() + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Index
// =============================================================================

/// Immutable membership index for one address set.
///
/// Built once, then shared read-only by every query; it holds no interior
/// mutability and is `Send + Sync`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpIndex {
    pub(crate) v4: V4Buckets,
    pub(crate) v6: Vec<V6Block>,
}

impl IpIndex {
    /// Bucket a finished block collection.
    pub fn build(set: &BlockSet) -> Self {
        let index = Self {
            v4: V4Buckets::build(&set.v4),
            v6: set.v6.clone(),
        };
        let stats = index.stats();
        log::debug!(
            "built index: v4 p8={} p16={} p24={} rest={}, v6={}",
            stats.v4_p8,
            stats.v4_p16,
            stats.v4_p24,
            stats.v4_rest,
            stats.v6
        );
        index
    }

    /// Index that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn v4(&self) -> &V4Buckets {
        &self.v4
    }

    pub fn v6(&self) -> &[V6Block] {
        &self.v6
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    /// Indexed blocks, each family sorted by network address.
    pub fn to_block_set(&self) -> BlockSet {
        let v4 = &self.v4;
        let mut set = BlockSet {
            v4: [&v4.p8, &v4.p16, &v4.p24, &v4.rest]
                .into_iter()
                .flatten()
                .copied()
                .collect(),
            v6: self.v6.clone(),
        };
        set.v4.sort_by_key(|b| (b.network(), b.prefix()));
        set.v6.sort_by_key(|b| (b.network(), b.prefix()));
        set
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            v4_p8: self.v4.p8.len(),
            v4_p16: self.v4.p16.len(),
            v4_p24: self.v4.p24.len(),
            v4_rest: self.v4.rest.len(),
            v6: self.v6.len(),
        }
    }
}

/// Entry counts per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub v4_p8: usize,
    pub v4_p16: usize,
    pub v4_p24: usize,
    pub v4_rest: usize,
    pub v6: usize,
}

impl IndexStats {
    pub fn v4_total(&self) -> usize {
        self.v4_p8 + self.v4_p16 + self.v4_p24 + self.v4_rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wide::U128;

    fn v4(a: u8, b: u8, c: u8, d: u8, prefix: u8) -> V4Block {
        V4Block::new(u32::from_be_bytes([a, b, c, d]), prefix).unwrap()
    }

    #[test]
    fn buckets_by_shift() {
        let blocks = [
            v4(11, 0, 0, 0, 8),
            v4(10, 0, 0, 0, 8),
            v4(192, 168, 0, 0, 16),
            v4(192, 0, 2, 0, 24),
            v4(100, 64, 0, 0, 10),
            v4(1, 2, 3, 4, 32),
        ];
        let buckets = V4Buckets::build(&blocks);
        assert_eq!(buckets.p8().len(), 2);
        assert_eq!(buckets.p16().len(), 1);
        assert_eq!(buckets.p24().len(), 1);
        assert_eq!(buckets.rest().len(), 2);
        assert_eq!(buckets.len(), 6);
    }

    #[test]
    fn buckets_are_sorted() {
        let blocks = [v4(12, 0, 0, 0, 8), v4(10, 0, 0, 0, 8), v4(11, 0, 0, 0, 8)];
        let buckets = V4Buckets::build(&blocks);
        let shifted: Vec<u32> = buckets.p8().iter().map(|b| b.shifted()).collect();
        assert_eq!(shifted, vec![10, 11, 12]);
    }

    #[test]
    fn v6_kept_in_insertion_order() {
        let mut set = BlockSet::new();
        set.v6.push(V6Block::new(U128::new(0xfe80 << 48, 0), 10).unwrap());
        set.v6.push(V6Block::new(U128::new(0x2001_0db8 << 32, 0), 32).unwrap());
        let index = IpIndex::build(&set);
        assert_eq!(index.v6(), set.v6.as_slice());
        assert_eq!(index.stats().v6, 2);
    }

    #[test]
    fn block_set_listing_is_sorted() {
        let blocks = [v4(192, 0, 2, 0, 24), v4(10, 0, 0, 0, 8), v4(1, 2, 3, 4, 32)];
        let set = BlockSet {
            v4: blocks.to_vec(),
            v6: Vec::new(),
        };
        let listed = IpIndex::build(&set).to_block_set();
        let networks: Vec<u32> = listed.v4.iter().map(|b| b.network()).collect();
        assert_eq!(networks, vec![0x0102_0304, 0x0a00_0000, 0xc000_0200]);
    }

    #[test]
    fn empty_index() {
        let index = IpIndex::empty();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert_eq!(index.stats(), IndexStats::default());
    }
}
