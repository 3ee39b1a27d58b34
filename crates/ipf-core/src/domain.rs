//! Integer domains of the two address families
//!
//! Interval algebra and CIDR decomposition are written once against
//! [`AddressDomain`] and instantiated for `u32` (IPv4) and [`U128`] (IPv6).
//! Every operation is overflow-checked: the domain maximum is a legal
//! interval endpoint, so `end + 1` must never silently wrap.

use std::fmt::Debug;

use crate::wide::U128;

/// Unsigned integer domain of one address family.
pub trait AddressDomain: Copy + Ord + Eq + Debug {
    /// Bit width of the domain (32 or 128).
    const WIDTH: u32;
    const ZERO: Self;
    const MAX: Self;

    /// `self + 1`, `None` past the domain maximum.
    fn succ(self) -> Option<Self>;

    /// `self - 1`, `None` below zero.
    fn pred(self) -> Option<Self>;

    /// `self + 2^bits`, `None` on overflow.
    fn add_pow2(self, bits: u32) -> Option<Self>;

    /// Trailing zero bits of `self`; zero counts as fully aligned (`WIDTH`).
    fn alignment(self) -> u32;

    /// floor(log2(end - start + 1)).
    ///
    /// Callers must pass `start <= end`; debug builds assert it.
    ///
    /// A span covering the whole domain has `2^WIDTH` addresses, which does not
    /// fit in the domain itself; it reports `WIDTH`.
    fn span_exponent(start: Self, end: Self) -> u32;
}

impl AddressDomain for u32 {
    const WIDTH: u32 = 32;
    const ZERO: Self = 0;
    const MAX: Self = u32::MAX;

    #[inline]
    fn succ(self) -> Option<Self> {
        self.checked_add(1)
    }

    #[inline]
    fn pred(self) -> Option<Self> {
        self.checked_sub(1)
    }

    #[inline]
    fn add_pow2(self, bits: u32) -> Option<Self> {
        let step = 1u32.checked_shl(bits)?;
        self.checked_add(step)
    }

    #[inline]
    fn alignment(self) -> u32 {
        self.trailing_zeros()
    }

    #[inline]
    fn span_exponent(start: Self, end: Self) -> u32 {
        debug_assert!(start <= end, "inverted span {start}..={end}");
        match end.wrapping_sub(start).checked_add(1) {
            Some(len) => 31 - len.leading_zeros(),
            None => Self::WIDTH,
        }
    }
}

impl AddressDomain for U128 {
    const WIDTH: u32 = 128;
    const ZERO: Self = U128::ZERO;
    const MAX: Self = U128::MAX;

    #[inline]
    fn succ(self) -> Option<Self> {
        self.checked_succ()
    }

    #[inline]
    fn pred(self) -> Option<Self> {
        self.checked_pred()
    }

    #[inline]
    fn add_pow2(self, bits: u32) -> Option<Self> {
        self.checked_add_pow2(bits)
    }

    #[inline]
    fn alignment(self) -> u32 {
        self.trailing_zeros()
    }

    #[inline]
    fn span_exponent(start: Self, end: Self) -> u32 {
        debug_assert!(start <= end, "inverted span {start:?}..={end:?}");
        match end.wrapping_sub(start).checked_succ() {
            Some(len) => len.floor_log2().unwrap_or(0),
            None => Self::WIDTH,
        }
    }
}
