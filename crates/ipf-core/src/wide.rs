//! Two-lane 128-bit unsigned arithmetic
//!
//! IPv6 addresses are handled as a pair of 64-bit lanes `(hi, lo)`. Every
//! operation the interval algebra needs (successor, predecessor, power-of-two
//! increments, trailing-zero count, bit length) is written explicitly over the
//! two lanes with carry/borrow handling, so nothing depends on a native
//! 128-bit integer.

use std::fmt;
use std::net::Ipv6Addr;

/// 128-bit unsigned value split into two 64-bit lanes.
///
/// Field order matters: the derived `Ord` compares `hi` first, then `lo`,
/// which is numeric order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct U128 {
    pub hi: u64,
    pub lo: u64,
}

impl U128 {
    pub const ZERO: Self = Self { hi: 0, lo: 0 };
    pub const ONE: Self = Self { hi: 0, lo: 1 };
    pub const MAX: Self = Self {
        hi: u64::MAX,
        lo: u64::MAX,
    };

    #[inline]
    pub const fn new(hi: u64, lo: u64) -> Self {
        Self { hi, lo }
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    /// Build from 16 network-order bytes.
    #[inline]
    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        let mut hi = [0u8; 8];
        let mut lo = [0u8; 8];
        hi.copy_from_slice(&bytes[..8]);
        lo.copy_from_slice(&bytes[8..]);
        Self {
            hi: u64::from_be_bytes(hi),
            lo: u64::from_be_bytes(lo),
        }
    }

    #[inline]
    pub fn to_be_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.hi.to_be_bytes());
        out[8..].copy_from_slice(&self.lo.to_be_bytes());
        out
    }

    /// `self + 1`, or `None` past `MAX`.
    #[inline]
    pub fn checked_succ(self) -> Option<Self> {
        let (lo, carry) = self.lo.overflowing_add(1);
        let hi = self.hi.checked_add(carry as u64)?;
        Some(Self { hi, lo })
    }

    /// `self - 1`, or `None` below zero.
    #[inline]
    pub fn checked_pred(self) -> Option<Self> {
        let (lo, borrow) = self.lo.overflowing_sub(1);
        let hi = self.hi.checked_sub(borrow as u64)?;
        Some(Self { hi, lo })
    }

    /// `self + 2^bits`, or `None` on overflow (including `bits >= 128`).
    #[inline]
    pub fn checked_add_pow2(self, bits: u32) -> Option<Self> {
        if bits < 64 {
            let (lo, carry) = self.lo.overflowing_add(1u64 << bits);
            let hi = self.hi.checked_add(carry as u64)?;
            Some(Self { hi, lo })
        } else if bits < 128 {
            let hi = self.hi.checked_add(1u64 << (bits - 64))?;
            Some(Self { hi, lo: self.lo })
        } else {
            None
        }
    }

    /// `self - rhs` modulo 2^128.
    #[inline]
    pub fn wrapping_sub(self, rhs: Self) -> Self {
        let (lo, borrow) = self.lo.overflowing_sub(rhs.lo);
        let hi = self.hi.wrapping_sub(rhs.hi).wrapping_sub(borrow as u64);
        Self { hi, lo }
    }

    /// Trailing zero bits, 128 for zero.
    #[inline]
    pub fn trailing_zeros(self) -> u32 {
        if self.lo != 0 {
            self.lo.trailing_zeros()
        } else if self.hi != 0 {
            64 + self.hi.trailing_zeros()
        } else {
            128
        }
    }

    /// Leading zero bits, 128 for zero.
    #[inline]
    pub fn leading_zeros(self) -> u32 {
        if self.hi != 0 {
            self.hi.leading_zeros()
        } else {
            64 + self.lo.leading_zeros()
        }
    }

    /// floor(log2(self)). Zero has no logarithm and yields `None`.
    #[inline]
    pub fn floor_log2(self) -> Option<u32> {
        if self.is_zero() {
            None
        } else {
            Some(127 - self.leading_zeros())
        }
    }

    /// Logical right shift; shifting by 128 or more yields zero.
    #[inline]
    pub fn shr(self, bits: u32) -> Self {
        match bits {
            0 => self,
            1..=63 => Self {
                hi: self.hi >> bits,
                lo: (self.lo >> bits) | (self.hi << (64 - bits)),
            },
            64..=127 => Self {
                hi: 0,
                lo: self.hi >> (bits - 64),
            },
            _ => Self::ZERO,
        }
    }

    /// Logical left shift; shifting by 128 or more yields zero.
    #[inline]
    pub fn shl(self, bits: u32) -> Self {
        match bits {
            0 => self,
            1..=63 => Self {
                hi: (self.hi << bits) | (self.lo >> (64 - bits)),
                lo: self.lo << bits,
            },
            64..=127 => Self {
                hi: self.lo << (bits - 64),
                lo: 0,
            },
            _ => Self::ZERO,
        }
    }

    /// `2^bits - 1` for `bits` in `0..=128`.
    #[inline]
    pub fn low_mask(bits: u32) -> Self {
        match bits {
            0 => Self::ZERO,
            1..=63 => Self {
                hi: 0,
                lo: (1u64 << bits) - 1,
            },
            64 => Self {
                hi: 0,
                lo: u64::MAX,
            },
            65..=127 => Self {
                hi: (1u64 << (bits - 64)) - 1,
                lo: u64::MAX,
            },
            _ => Self::MAX,
        }
    }

    #[inline]
    pub fn bitor(self, rhs: Self) -> Self {
        Self {
            hi: self.hi | rhs.hi,
            lo: self.lo | rhs.lo,
        }
    }
}

impl From<Ipv6Addr> for U128 {
    #[inline]
    fn from(addr: Ipv6Addr) -> Self {
        Self::from_be_bytes(addr.octets())
    }
}

impl From<U128> for Ipv6Addr {
    #[inline]
    fn from(value: U128) -> Self {
        Ipv6Addr::from(value.to_be_bytes())
    }
}

impl fmt::Debug for U128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U128({:#018x}_{:016x})", self.hi, self.lo)
    }
}
