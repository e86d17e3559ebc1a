use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use parking_lot::Mutex;
use tracing::trace;

use crate::constraint::RangeConstraint;
use crate::error::{Result, TypeError};
use crate::integer::{width_limits, Integer};

/// Bit length of a number type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bits {
    Finite(u32),
    /// Arbitrary precision: no fixed width, bounds are infinite.
    Unbounded,
}

impl From<u32> for Bits {
    fn from(bits: u32) -> Self {
        Bits::Finite(bits)
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bits::Finite(bits) => write!(f, "{bits}"),
            Bits::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// Size of an encoded value in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteSize {
    Finite(u32),
    Unbounded,
}

impl ByteSize {
    /// The finite size, if any.
    pub fn finite(self) -> Option<u32> {
        match self {
            ByteSize::Finite(size) => Some(size),
            ByteSize::Unbounded => None,
        }
    }
}

/// What a number type holds in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    Int,
    Float,
}

impl fmt::Display for NumberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberKind::Int => f.write_str("int"),
            NumberKind::Float => f.write_str("float"),
        }
    }
}

/// One end of a numeric range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Bound {
    NegInfinity,
    Finite(Integer),
    PosInfinity,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::NegInfinity => f.write_str("-inf"),
            Bound::Finite(value) => fmt::Display::fmt(value, f),
            Bound::PosInfinity => f.write_str("inf"),
        }
    }
}

/// Inclusive `[min, max]` range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub min: Bound,
    pub max: Bound,
}

impl Bounds {
    pub const UNBOUNDED: Bounds = Bounds {
        min: Bound::NegInfinity,
        max: Bound::PosInfinity,
    };

    /// Bounds of a finite two's-complement (signed) or plain binary
    /// (unsigned) integer.
    pub fn for_width(bits: u32, signed: bool) -> Self {
        let (min, max) = width_limits(bits, signed);
        Self {
            min: Bound::Finite(min),
            max: Bound::Finite(max),
        }
    }

    /// Returns true if `value` lies inside the range.
    pub fn contains(&self, value: &Integer) -> bool {
        let above_min = match &self.min {
            Bound::NegInfinity => true,
            Bound::Finite(min) => value >= min,
            Bound::PosInfinity => false,
        };
        let below_max = match &self.max {
            Bound::NegInfinity => false,
            Bound::Finite(max) => value <= max,
            Bound::PosInfinity => true,
        };
        above_min && below_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TypeKey {
    kind: NumberKind,
    bits: Bits,
    signed: bool,
}

/// Immutable descriptor of an abstract number type.
///
/// Obtain one through [`make_int_type`], [`make_float_type`] or
/// [`crate::alias`]; the same shape always yields the same `&'static`
/// instance.
#[derive(Debug, PartialEq, Eq)]
pub struct NumberType {
    kind: NumberKind,
    bits: Bits,
    signed: bool,
    bounds: Bounds,
    constraint: RangeConstraint,
}

impl NumberType {
    pub fn kind(&self) -> NumberKind {
        self.kind
    }

    pub fn bits(&self) -> Bits {
        self.bits
    }

    pub fn signed(&self) -> bool {
        self.signed
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn min(&self) -> &Bound {
        &self.bounds.min
    }

    pub fn max(&self) -> &Bound {
        &self.bounds.max
    }

    /// `bits / 8` for finite widths, unbounded otherwise.
    pub fn size_of(&self) -> ByteSize {
        match self.bits {
            Bits::Finite(bits) => ByteSize::Finite(bits / 8),
            Bits::Unbounded => ByteSize::Unbounded,
        }
    }

    /// The bounds check shared by every user of this descriptor.
    pub fn constraint(&self) -> &RangeConstraint {
        &self.constraint
    }

    /// Canonical name, e.g. `UnsignedInt8`, `SignedInt64`, `Float32`, or
    /// `AnyInt` / `AnyUnsignedInt` for the unbounded shapes.
    pub fn canonical_name(&self) -> String {
        match (self.kind, self.bits) {
            (NumberKind::Float, bits) => format!("Float{bits}"),
            (NumberKind::Int, Bits::Unbounded) if self.signed => "AnyInt".to_string(),
            (NumberKind::Int, Bits::Unbounded) => "AnyUnsignedInt".to_string(),
            (NumberKind::Int, Bits::Finite(bits)) if self.signed => format!("SignedInt{bits}"),
            (NumberKind::Int, Bits::Finite(bits)) => format!("UnsignedInt{bits}"),
        }
    }
}

impl fmt::Display for NumberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}

static DESCRIPTORS: LazyLock<Mutex<HashMap<TypeKey, &'static NumberType>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn intern(key: TypeKey, bounds: impl FnOnce() -> Bounds) -> &'static NumberType {
    let mut descriptors = DESCRIPTORS.lock();
    *descriptors.entry(key).or_insert_with(|| {
        trace!(kind = %key.kind, bits = %key.bits, signed = key.signed, "creating descriptor");
        let bounds = bounds();
        Box::leak(Box::new(NumberType {
            kind: key.kind,
            bits: key.bits,
            signed: key.signed,
            constraint: RangeConstraint::new(bounds.clone()),
            bounds,
        }))
    })
}

/// Get the integer descriptor for `(bits, signed)`, creating it once.
///
/// Any positive width is accepted; widths past the machine sizes are
/// served by byte-sequence codecs. Unsigned unbounded integers are bounded
/// below by zero.
pub fn make_int_type(bits: impl Into<Bits>, signed: bool) -> Result<&'static NumberType> {
    let bits = bits.into();
    if bits == Bits::Finite(0) {
        return Err(TypeError::ZeroWidth);
    }

    let key = TypeKey {
        kind: NumberKind::Int,
        bits,
        signed,
    };
    Ok(intern(key, || match bits {
        Bits::Finite(n) => Bounds::for_width(n, signed),
        Bits::Unbounded if signed => Bounds::UNBOUNDED,
        Bits::Unbounded => Bounds {
            min: Bound::Finite(Integer::zero()),
            max: Bound::PosInfinity,
        },
    }))
}

/// Get the IEEE float descriptor for `bits`, creating it once.
pub fn make_float_type(bits: impl Into<Bits>) -> Result<&'static NumberType> {
    match bits.into() {
        Bits::Finite(n @ (16 | 32 | 64)) => Ok(intern(
            TypeKey {
                kind: NumberKind::Float,
                bits: Bits::Finite(n),
                signed: true,
            },
            || Bounds::UNBOUNDED,
        )),
        Bits::Finite(n) => Err(TypeError::UnsupportedFloatWidth { bits: n }),
        Bits::Unbounded => Err(TypeError::UnboundedFloat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_is_memoized() {
        let a = make_int_type(16, true).unwrap();
        let b = make_int_type(Bits::Finite(16), true).unwrap();
        assert!(std::ptr::eq(a, b));

        let unsigned = make_int_type(16, false).unwrap();
        assert!(!std::ptr::eq(a, unsigned));
    }

    #[test]
    fn size_of_is_exact() {
        assert_eq!(make_int_type(8, false).unwrap().size_of(), ByteSize::Finite(1));
        assert_eq!(make_int_type(64, true).unwrap().size_of(), ByteSize::Finite(8));
        assert_eq!(make_int_type(4, false).unwrap().size_of(), ByteSize::Finite(0));
        assert_eq!(
            make_int_type(Bits::Unbounded, true).unwrap().size_of(),
            ByteSize::Unbounded
        );
    }

    #[test]
    fn width_bounds() {
        let u8_type = make_int_type(8, false).unwrap();
        assert_eq!(u8_type.min(), &Bound::Finite(Integer::zero()));
        assert_eq!(u8_type.max(), &Bound::Finite(Integer::from(255u8)));

        let i8_type = make_int_type(8, true).unwrap();
        assert_eq!(i8_type.min(), &Bound::Finite(Integer::from(-128i16)));
        assert_eq!(i8_type.max(), &Bound::Finite(Integer::from(127u8)));

        let i128_type = make_int_type(128, true).unwrap();
        assert_eq!(i128_type.min(), &Bound::Finite(Integer::from(i128::MIN)));
        assert_eq!(i128_type.max(), &Bound::Finite(Integer::from(i128::MAX)));

        let u128_type = make_int_type(128, false).unwrap();
        assert_eq!(u128_type.max(), &Bound::Finite(Integer::from(u128::MAX)));
    }

    #[test]
    fn wide_width_bounds() {
        let i256 = make_int_type(256, true).unwrap();
        assert_eq!(i256.size_of(), ByteSize::Finite(32));
        assert_eq!(i256.min(), &Bound::Finite(-Integer::pow2(255)));
        assert!(i256.bounds().contains(&Integer::from(u128::MAX)));
        assert!(!i256.bounds().contains(&Integer::pow2(255)));

        let u512 = make_int_type(512, false).unwrap();
        assert_eq!(u512.size_of(), ByteSize::Finite(64));
        assert!(u512.bounds().contains(&Integer::pow2(511)));
        assert!(!u512.bounds().contains(&Integer::pow2(512)));
        assert!(std::ptr::eq(u512, make_int_type(512, false).unwrap()));
    }

    #[test]
    fn unbounded_bounds() {
        let big = make_int_type(Bits::Unbounded, true).unwrap();
        assert_eq!(big.bounds(), &Bounds::UNBOUNDED);
        assert!(big.bounds().contains(&Integer::from(u128::MAX)));
        assert!(big.bounds().contains(&Integer::from(i128::MIN)));

        let natural = make_int_type(Bits::Unbounded, false).unwrap();
        assert!(!natural.bounds().contains(&Integer::from(-1i8)));
    }

    #[test]
    fn invalid_widths_rejected() {
        assert_eq!(make_int_type(0, true), Err(TypeError::ZeroWidth));
        assert!(make_int_type(4096, true).is_ok());
        assert!(matches!(
            make_float_type(80),
            Err(TypeError::UnsupportedFloatWidth { bits: 80 })
        ));
        assert!(matches!(
            make_float_type(Bits::Unbounded),
            Err(TypeError::UnboundedFloat)
        ));
    }

    #[test]
    fn canonical_names() {
        assert_eq!(make_int_type(8, false).unwrap().to_string(), "UnsignedInt8");
        assert_eq!(make_int_type(32, true).unwrap().to_string(), "SignedInt32");
        assert_eq!(make_float_type(64).unwrap().to_string(), "Float64");
        assert_eq!(make_int_type(256, true).unwrap().to_string(), "SignedInt256");
        assert_eq!(make_int_type(Bits::Unbounded, true).unwrap().to_string(), "AnyInt");
        assert_eq!(make_int_type(Bits::Unbounded, false).unwrap().to_string(), "AnyUnsignedInt");
    }
}
