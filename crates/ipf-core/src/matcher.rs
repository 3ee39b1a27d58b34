//! Membership Query
//!
//! This is the hot path - every checked address goes through here.
//! No allocations, no locking: the index is immutable once built.

use std::net::IpAddr;

use crate::index::{IpIndex, V4Buckets};
use crate::types::{Family, V6Block};
use crate::wide::U128;

impl IpIndex {
    /// Does the set contain this IPv4 address (as a big-endian integer)?
    #[inline]
    pub fn contains_v4(&self, ip: u32) -> bool {
        match_v4(ip, &self.v4)
    }

    /// Does the set contain this IPv6 address?
    #[inline]
    pub fn contains_v6(&self, ip: U128) -> bool {
        match_v6(ip, &self.v6)
    }

    /// Does the set contain `addr`?
    #[inline]
    pub fn contains(&self, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => self.contains_v4(u32::from(v4)),
            IpAddr::V6(v6) => self.contains_v6(U128::from(v6)),
        }
    }

    /// Check raw network-order address bytes of the given family.
    ///
    /// The byte length is the caller's contract; a slice of the wrong length
    /// matches nothing.
    pub fn matches(&self, family: Family, bytes: &[u8]) -> bool {
        match family {
            Family::V4 => match <[u8; 4]>::try_from(bytes) {
                Ok(octets) => self.contains_v4(u32::from_be_bytes(octets)),
                Err(_) => false,
            },
            Family::V6 => match <[u8; 16]>::try_from(bytes) {
                Ok(octets) => self.contains_v6(U128::from_be_bytes(octets)),
                Err(_) => false,
            },
        }
    }

    /// Does the set contain any of `addrs`?
    pub fn contains_any<I>(&self, addrs: I) -> bool
    where
        I: IntoIterator<Item = IpAddr>,
    {
        addrs.into_iter().any(|addr| self.contains(addr))
    }
}

// =============================================================================
// IPv4: prefix buckets
// =============================================================================

fn match_v4(ip: u32, buckets: &V4Buckets) -> bool {
    let ip8 = ip >> 24;
    let ip16 = ip >> 16;
    let ip24 = ip >> 8;

    if buckets.p8.iter().any(|b| b.shifted() == ip8) {
        return true;
    }
    if buckets.p16.iter().any(|b| b.shifted() == ip16) {
        return true;
    }
    if buckets.p24.iter().any(|b| b.shifted() == ip24) {
        return true;
    }

    // Other prefix lengths: each entry carries its own shift (0..=32).
    buckets
        .rest
        .iter()
        .any(|b| ip.checked_shr(b.shift() as u32).unwrap_or(0) == b.shifted())
}

// =============================================================================
// IPv6: flat scan over pre-shifted lanes
// =============================================================================

fn match_v6(ip: U128, nets: &[V6Block]) -> bool {
    nets.iter().any(|n| n.contains(ip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockSet, V4Block};
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn index_of(v4: &[(&str, u8)], v6: &[(&str, u8)]) -> IpIndex {
        let mut set = BlockSet::new();
        for (addr, prefix) in v4 {
            let addr: Ipv4Addr = addr.parse().unwrap();
            set.v4.push(V4Block::new(u32::from(addr), *prefix).unwrap());
        }
        for (addr, prefix) in v6 {
            let addr: Ipv6Addr = addr.parse().unwrap();
            set.v6.push(V6Block::new(U128::from(addr), *prefix).unwrap());
        }
        IpIndex::build(&set)
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn matches_each_v4_bucket() {
        let index = index_of(
            &[
                ("10.0.0.0", 8),
                ("192.168.0.0", 16),
                ("192.0.2.0", 24),
                ("100.64.0.0", 10),
                ("1.2.3.4", 32),
            ],
            &[],
        );
        assert!(index.contains(ip("10.200.1.1")));
        assert!(index.contains(ip("192.168.255.255")));
        assert!(index.contains(ip("192.0.2.77")));
        assert!(index.contains(ip("100.127.255.255")));
        assert!(index.contains(ip("1.2.3.4")));

        assert!(!index.contains(ip("11.0.0.1")));
        assert!(!index.contains(ip("192.169.0.1")));
        assert!(!index.contains(ip("192.0.3.1")));
        assert!(!index.contains(ip("100.128.0.0")));
        assert!(!index.contains(ip("1.2.3.5")));
    }

    #[test]
    fn v4_prefix_zero_matches_everything() {
        let index = index_of(&[("0.0.0.0", 0)], &[]);
        assert!(index.contains(ip("0.0.0.0")));
        assert!(index.contains(ip("255.255.255.255")));
        assert!(!index.contains(ip("::1")));
    }

    #[test]
    fn v6_wildcard_matches_both_ends() {
        let index = index_of(&[], &[("::", 0)]);
        assert!(index.contains(ip("::")));
        assert!(index.contains(ip("ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff")));
        assert!(!index.contains(ip("8.8.8.8")));
    }

    #[test]
    fn v6_prefix_in_high_and_low_lane() {
        let index = index_of(
            &[],
            &[("2001:db8::", 32), ("::ffff:0:0", 96), ("fe80::1", 128), ("100::", 64)],
        );
        assert!(index.contains(ip("2001:db8:1::1")));
        assert!(!index.contains(ip("2001:db9::1")));
        assert!(index.contains(ip("::ffff:1.2.3.4")));
        assert!(!index.contains(ip("::fffe:1.2.3.4")));
        assert!(index.contains(ip("fe80::1")));
        assert!(!index.contains(ip("fe80::2")));
        assert!(index.contains(ip("100::ffff:ffff:ffff:ffff")));
        assert!(!index.contains(ip("100:0:0:1::")));
    }

    #[test]
    fn raw_bytes_query() {
        let index = index_of(&[("127.0.0.0", 8)], &[("::1", 128)]);
        assert!(index.matches(Family::V4, &[127, 0, 0, 1]));
        assert!(!index.matches(Family::V4, &[128, 0, 0, 1]));
        assert!(index.matches(Family::V6, &Ipv6Addr::LOCALHOST.octets()));
        assert!(!index.matches(Family::V4, &[127, 0, 0]));
        assert!(!index.matches(Family::V6, &[0; 4]));
    }

    #[test]
    fn empty_index_matches_nothing() {
        let index = IpIndex::empty();
        assert!(!index.contains(ip("10.0.0.1")));
        assert!(!index.contains(ip("::1")));
    }

    #[test]
    fn contains_any_over_answers() {
        let index = index_of(&[("10.0.0.0", 8)], &[]);
        assert!(index.contains_any([ip("1.2.3.4"), ip("10.1.2.3")]));
        assert!(!index.contains_any([ip("1.2.3.4"), ip("2001:db8::1")]));
        assert!(!index.contains_any(std::iter::empty()));
    }

    #[test]
    fn index_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<IpIndex>();
    }
}
