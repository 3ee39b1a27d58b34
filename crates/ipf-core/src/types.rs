//! Core type definitions for IPFence
//!
//! A block is stored pre-shifted: only the top `prefix` bits of its base
//! address are kept, so a membership test is a single shift and compare.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::wide::U128;

// =============================================================================
// Address Family
// =============================================================================

/// Address width class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Family {
    /// 32-bit addresses
    V4,
    /// 128-bit addresses
    V6,
}

impl Family {
    /// Address width in bits.
    #[inline]
    pub const fn width(self) -> u8 {
        match self {
            Self::V4 => 32,
            Self::V6 => 128,
        }
    }

    /// Address width in bytes.
    #[inline]
    pub const fn byte_len(self) -> usize {
        match self {
            Self::V4 => 4,
            Self::V6 => 16,
        }
    }

    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => f.write_str("ipv4"),
            Self::V6 => f.write_str("ipv6"),
        }
    }
}

/// Prefix length does not fit the family width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("prefix length {prefix} exceeds {family} width {}", .family.width())]
pub struct PrefixError {
    pub family: Family,
    pub prefix: u8,
}

// =============================================================================
// IPv4 Block
// =============================================================================

/// One IPv4 CIDR entry: `shifted = base >> shift`, `shift = 32 - prefix`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct V4Block {
    shifted: u32,
    shift: u8,
}

impl V4Block {
    /// Canonical block for `addr/prefix`; host bits of `addr` are discarded.
    pub fn new(addr: u32, prefix: u8) -> Result<Self, PrefixError> {
        if prefix > 32 {
            return Err(PrefixError {
                family: Family::V4,
                prefix,
            });
        }
        Ok(Self::with_host_bits(addr, 32 - prefix))
    }

    /// Block of size `2^host_bits` containing `addr`. `host_bits` is clamped to 32.
    #[inline]
    pub fn with_host_bits(addr: u32, host_bits: u8) -> Self {
        let shift = host_bits.min(32);
        Self {
            shifted: addr.checked_shr(shift as u32).unwrap_or(0),
            shift,
        }
    }

    /// Single-address block.
    #[inline]
    pub fn host(addr: Ipv4Addr) -> Self {
        Self::with_host_bits(u32::from(addr), 0)
    }

    #[inline]
    pub const fn shifted(&self) -> u32 {
        self.shifted
    }

    #[inline]
    pub const fn shift(&self) -> u8 {
        self.shift
    }

    #[inline]
    pub const fn prefix(&self) -> u8 {
        32 - self.shift
    }

    /// Base address of the block.
    #[inline]
    pub fn network(&self) -> u32 {
        self.shifted.checked_shl(self.shift as u32).unwrap_or(0)
    }

    /// Does this block contain `addr`?
    #[inline]
    pub fn contains(&self, addr: u32) -> bool {
        addr.checked_shr(self.shift as u32).unwrap_or(0) == self.shifted
    }
}

impl fmt::Display for V4Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Ipv4Addr::from(self.network()), self.prefix())
    }
}

// =============================================================================
// IPv6 Block
// =============================================================================

/// One IPv6 CIDR entry, pre-shifted per lane.
///
/// - `prefix == 0`: both lanes zero
/// - `prefix <= 64`: `shifted_hi = hi >> (64 - prefix)`, `shifted_lo = 0`
/// - `prefix > 64`: `shifted_hi = hi`, `shifted_lo = lo >> (128 - prefix)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct V6Block {
    shifted_hi: u64,
    shifted_lo: u64,
    prefix: u8,
}

impl V6Block {
    /// Canonical block for `addr/prefix`; host bits of `addr` are discarded.
    pub fn new(addr: U128, prefix: u8) -> Result<Self, PrefixError> {
        if prefix > 128 {
            return Err(PrefixError {
                family: Family::V6,
                prefix,
            });
        }
        Ok(Self::with_host_bits(addr, 128 - prefix))
    }

    /// Block of size `2^host_bits` containing `addr`. `host_bits` is clamped to 128.
    pub fn with_host_bits(addr: U128, host_bits: u8) -> Self {
        let prefix = 128 - host_bits.min(128);
        let (shifted_hi, shifted_lo) = match prefix {
            0 => (0, 0),
            1..=64 => (addr.hi >> (64 - prefix), 0),
            _ => (addr.hi, addr.lo >> (128 - prefix)),
        };
        Self {
            shifted_hi,
            shifted_lo,
            prefix,
        }
    }

    /// Single-address block.
    #[inline]
    pub fn host(addr: Ipv6Addr) -> Self {
        Self::with_host_bits(U128::from(addr), 0)
    }

    #[inline]
    pub const fn shifted_hi(&self) -> u64 {
        self.shifted_hi
    }

    #[inline]
    pub const fn shifted_lo(&self) -> u64 {
        self.shifted_lo
    }

    #[inline]
    pub const fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Base address of the block.
    pub fn network(&self) -> U128 {
        match self.prefix {
            0 => U128::ZERO,
            p @ 1..=64 => U128::new(self.shifted_hi << (64 - p), 0),
            p => U128::new(self.shifted_hi, self.shifted_lo << (128 - p)),
        }
    }

    /// Does this block contain `addr`?
    #[inline]
    pub fn contains(&self, addr: U128) -> bool {
        let p = self.prefix as u32;
        if p == 0 {
            true
        } else if p <= 64 {
            (addr.hi >> (64 - p)) == self.shifted_hi
        } else {
            addr.hi == self.shifted_hi && (addr.lo >> (128 - p)) == self.shifted_lo
        }
    }
}

impl fmt::Display for V6Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", Ipv6Addr::from(self.network()), self.prefix)
    }
}

// =============================================================================
// Block
// =============================================================================

/// A CIDR entry of either family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Block {
    V4(V4Block),
    V6(V6Block),
}

impl Block {
    #[inline]
    pub const fn family(&self) -> Family {
        match self {
            Self::V4(_) => Family::V4,
            Self::V6(_) => Family::V6,
        }
    }

    #[inline]
    pub const fn prefix(&self) -> u8 {
        match self {
            Self::V4(b) => b.prefix(),
            Self::V6(b) => b.prefix(),
        }
    }

    /// The whole address space of `family`.
    pub fn everything(family: Family) -> Self {
        match family {
            Family::V4 => Self::V4(V4Block::with_host_bits(0, 32)),
            Family::V6 => Self::V6(V6Block::with_host_bits(U128::ZERO, 128)),
        }
    }

    /// Does `other` lie entirely within this block?
    ///
    /// Blocks of different families never contain each other.
    pub fn covers(&self, other: &Block) -> bool {
        match (self, other) {
            (Self::V4(a), Self::V4(b)) => a.prefix() <= b.prefix() && a.contains(b.network()),
            (Self::V6(a), Self::V6(b)) => a.prefix() <= b.prefix() && a.contains(b.network()),
            _ => false,
        }
    }
}

impl From<V4Block> for Block {
    fn from(b: V4Block) -> Self {
        Self::V4(b)
    }
}

impl From<V6Block> for Block {
    fn from(b: V6Block) -> Self {
        Self::V6(b)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(b) => b.fmt(f),
            Self::V6(b) => b.fmt(f),
        }
    }
}

// =============================================================================
// Block Set
// =============================================================================

/// Unordered, possibly overlapping collection of blocks, one list per family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    pub v4: Vec<V4Block>,
    pub v6: Vec<V6Block>,
}

impl BlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) {
        match block {
            Block::V4(b) => self.v4.push(b),
            Block::V6(b) => self.v6.push(b),
        }
    }

    /// Append every block of `other`.
    pub fn extend(&mut self, other: BlockSet) {
        self.v4.extend(other.v4);
        self.v6.extend(other.v6);
    }

    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Block> + '_ {
        self.v4
            .iter()
            .copied()
            .map(Block::V4)
            .chain(self.v6.iter().copied().map(Block::V6))
    }
}

impl FromIterator<Block> for BlockSet {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        let mut set = Self::new();
        for block in iter {
            set.push(block);
        }
        set
    }
}
