use std::fmt;
use std::ops::Neg;
use std::str::FromStr;

use num_bigint::{BigInt, ParseBigIntError, Sign};
use num_traits::ToPrimitive;

/// An arbitrary-precision integer.
///
/// Every value of every integer descriptor fits, including the unbounded
/// ones; narrowing to a machine integer is explicit and fallible.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Integer(BigInt);

impl Integer {
    pub fn zero() -> Self {
        Self(BigInt::default())
    }

    /// `2^exp`.
    pub fn pow2(exp: u32) -> Self {
        Self(BigInt::from(1u8) << exp)
    }

    /// Build an integer from its sign and magnitude. Negative zero is zero.
    pub fn from_parts(negative: bool, magnitude: u128) -> Self {
        let magnitude = BigInt::from(magnitude);
        Self(if negative { -magnitude } else { magnitude })
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    pub fn into_bigint(self) -> BigInt {
        self.0
    }

    pub fn to_i128(&self) -> Option<i128> {
        self.0.to_i128()
    }

    pub fn to_u128(&self) -> Option<u128> {
        self.0.to_u128()
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }

    /// Nearest float; infinite beyond the `f64` range.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(if self.is_negative() {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        })
    }

    /// Encode as a little-endian integer of exactly `len` bytes,
    /// two's-complement when `signed`.
    ///
    /// Returns `None` when the value does not fit.
    pub fn to_le_bytes(&self, len: usize, signed: bool) -> Option<Vec<u8>> {
        let bits = u32::try_from(len.checked_mul(8)?).ok()?;
        if bits == 0 {
            return None;
        }
        let (min, max) = width_limits(bits, signed);
        if *self < min || *self > max {
            return None;
        }

        let mut bytes = if signed {
            self.0.to_signed_bytes_le()
        } else {
            self.0.to_bytes_le().1
        };
        bytes.resize(len, if self.is_negative() { 0xFF } else { 0x00 });
        Some(bytes)
    }

    /// Decode a little-endian integer, two's-complement when `signed`.
    /// An empty slice is zero.
    pub fn from_le_bytes(bytes: &[u8], signed: bool) -> Self {
        if signed {
            Self(BigInt::from_signed_bytes_le(bytes))
        } else {
            Self(BigInt::from_bytes_le(Sign::Plus, bytes))
        }
    }
}

/// Smallest and largest value of a `bits`-wide integer.
pub(crate) fn width_limits(bits: u32, signed: bool) -> (Integer, Integer) {
    let one = BigInt::from(1u8);
    if signed {
        let half = Integer::pow2(bits - 1).0;
        (Integer(-&half), Integer(half - one))
    } else {
        (Integer::zero(), Integer(Integer::pow2(bits).0 - one))
    }
}

impl Neg for Integer {
    type Output = Integer;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl FromStr for Integer {
    type Err = ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl fmt::Display for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Integer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<BigInt> for Integer {
    fn from(value: BigInt) -> Self {
        Self(value)
    }
}

impl From<Integer> for BigInt {
    fn from(value: Integer) -> Self {
        value.0
    }
}

macro_rules! from_primitive {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Integer {
            fn from(value: $ty) -> Self {
                Self(BigInt::from(value))
            }
        }
    )*};
}

from_primitive!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
