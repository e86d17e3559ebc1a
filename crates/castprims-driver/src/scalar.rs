use std::fmt;

use castprims_types::Integer;

/// An in-memory primitive value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(Integer),
    Float(f64),
}

impl Scalar {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
        }
    }

    pub fn as_int(&self) -> Option<&Integer> {
        match self {
            Scalar::Int(value) => Some(value),
            Scalar::Float(_) => None,
        }
    }

    /// The value as a float. Integers convert with rounding.
    pub fn as_float(&self) -> f64 {
        match self {
            Scalar::Float(value) => *value,
            Scalar::Int(value) => value.to_f64(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(value) => fmt::Display::fmt(value, f),
            Scalar::Float(value) => fmt::Display::fmt(value, f),
        }
    }
}

impl From<Integer> for Scalar {
    fn from(value: Integer) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::Float(value.into())
    }
}

macro_rules! from_int {
    ($($ty:ty),*) => {$(
        impl From<$ty> for Scalar {
            fn from(value: $ty) -> Self {
                Scalar::Int(Integer::from(value))
            }
        }
    )*};
}

from_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
