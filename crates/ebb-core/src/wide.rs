//! Minimal 256-bit unsigned arithmetic for weighted rate sums.
//!
//! A weighted sum `Σ width × rate` multiplies two `u128` quantities and
//! overflows `u128` for realistic volumes, so accumulation happens in
//! [`U256`] and only the final quotient is narrowed back to `u128`.
//! Every operation is checked; nothing wraps.

use serde::{Deserialize, Serialize};
use std::fmt;

const LOW_MASK: u128 = u64::MAX as u128;

/// Unsigned 256-bit integer as two 128-bit halves.
///
/// Field order makes the derived `Ord` compare `hi` first.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U256 {
    pub hi: u128,
    pub lo: u128,
}

impl U256 {
    pub const ZERO: Self = Self { hi: 0, lo: 0 };

    pub const fn from_u128(v: u128) -> Self {
        Self { hi: 0, lo: v }
    }

    pub fn is_zero(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    /// Full 128×128 → 256 bit product.
    pub fn widening_mul(a: u128, b: u128) -> Self {
        let (a0, a1) = (a & LOW_MASK, a >> 64);
        let (b0, b1) = (b & LOW_MASK, b >> 64);

        let p00 = a0 * b0;
        let p01 = a0 * b1;
        let p10 = a1 * b0;
        let p11 = a1 * b1;

        // At most 3 * (2^64 - 1), no overflow.
        let mid = (p00 >> 64) + (p01 & LOW_MASK) + (p10 & LOW_MASK);

        let lo = (p00 & LOW_MASK) | (mid << 64);
        let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);
        Self { hi, lo }
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let (lo, carry) = self.lo.overflowing_add(rhs.lo);
        let hi = self.hi.checked_add(rhs.hi)?.checked_add(carry as u128)?;
        Some(Self { hi, lo })
    }

    /// Floor division by a `u128` divisor.
    ///
    /// Returns `None` on a zero divisor or when the quotient does not fit `u128`.
    pub fn checked_div_u128(self, divisor: u128) -> Option<u128> {
        if divisor == 0 {
            return None;
        }
        if self.hi == 0 {
            return Some(self.lo / divisor);
        }
        // Quotient fits u128 iff hi < divisor.
        if self.hi >= divisor {
            return None;
        }

        // Restoring division over the low half; the remainder starts as `hi`.
        let mut rem = self.hi;
        let mut quotient: u128 = 0;
        for i in (0..128).rev() {
            let carry = rem >> 127;
            rem = (rem << 1) | ((self.lo >> i) & 1);
            if carry == 1 || rem >= divisor {
                rem = rem.wrapping_sub(divisor);
                quotient |= 1 << i;
            }
        }
        Some(quotient)
    }
}

impl From<u128> for U256 {
    fn from(v: u128) -> Self {
        Self::from_u128(v)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hi == 0 {
            write!(f, "{}", self.lo)
        } else {
            write!(f, "0x{:x}{:032x}", self.hi, self.lo)
        }
    }
}

/// `floor(a * b / c)` with a 256-bit intermediate product.
///
/// Returns `None` if `c == 0` or the quotient exceeds `u128`.
pub fn mul_div_floor(a: u128, b: u128, c: u128) -> Option<u128> {
    U256::widening_mul(a, b).checked_div_u128(c)
}
