//! Named shortcuts for common number shapes.
//!
//! Every alias resolves through the memoized factory, so two aliases of the
//! same shape (`Int` and `Signed`) hand back the same descriptor.

use crate::descriptor::{make_float_type, make_int_type, Bits, NumberKind, NumberType};

/// A named `(kind, bits, signed)` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    pub name: &'static str,
    pub kind: NumberKind,
    pub bits: u32,
    pub signed: bool,
}

impl Alias {
    const fn int(name: &'static str, bits: u32, signed: bool) -> Self {
        Self {
            name,
            kind: NumberKind::Int,
            bits,
            signed,
        }
    }

    const fn float(name: &'static str, bits: u32) -> Self {
        Self {
            name,
            kind: NumberKind::Float,
            bits,
            signed: true,
        }
    }

    /// The descriptor this alias names.
    ///
    /// Returns `None` only for a malformed entry (zero width, odd float).
    pub fn resolve(&self) -> Option<&'static NumberType> {
        match self.kind {
            NumberKind::Int => make_int_type(self.bits, self.signed).ok(),
            NumberKind::Float => make_float_type(self.bits).ok(),
        }
    }
}

pub const ALIASES: &[Alias] = &[
    Alias::int("Bool", 1, false),
    Alias::int("Bit", 1, false),
    Alias::int("Nibble", 4, false),
    Alias::int("HalfByte", 4, false),
    Alias::int("Tetrade", 4, false),
    Alias::int("SignedInt8", 8, true),
    Alias::int("Int8", 8, true),
    Alias::int("SignedInt16", 16, true),
    Alias::int("Int16", 16, true),
    Alias::int("SignedInt32", 32, true),
    Alias::int("Int32", 32, true),
    Alias::int("SignedInt64", 64, true),
    Alias::int("Int64", 64, true),
    Alias::int("SignedInt128", 128, true),
    Alias::int("Int128", 128, true),
    Alias::int("SignedInt256", 256, true),
    Alias::int("Int256", 256, true),
    Alias::int("SignedInt512", 512, true),
    Alias::int("Int512", 512, true),
    Alias::int("UnsignedInt8", 8, false),
    Alias::int("UnsignedInt16", 16, false),
    Alias::int("UnsignedInt32", 32, false),
    Alias::int("UnsignedInt64", 64, false),
    Alias::int("UnsignedInt128", 128, false),
    Alias::int("UnsignedInt256", 256, false),
    Alias::int("UnsignedInt512", 512, false),
    // C names
    Alias::int("Byte", 8, true),
    Alias::int("SignedByte", 8, true),
    Alias::int("Char", 8, true),
    Alias::int("SignedChar", 8, true),
    Alias::int("UnsignedByte", 8, false),
    Alias::int("UnsignedChar", 8, false),
    Alias::int("Short", 16, true),
    Alias::int("ShortInt", 16, true),
    Alias::int("UnsignedShort", 16, false),
    Alias::int("Int", 32, true),
    Alias::int("Long", 32, true),
    Alias::int("LongInt", 32, true),
    Alias::int("Signed", 32, true),
    Alias::int("SignedInt", 32, true),
    Alias::int("SignedLong", 32, true),
    Alias::int("SignedLongInt", 32, true),
    Alias::int("Unsigned", 32, false),
    Alias::int("UnsignedInt", 32, false),
    Alias::int("UnsignedLong", 32, false),
    Alias::int("UnsignedLongInt", 32, false),
    Alias::int("LongLong", 64, true),
    Alias::int("LongLongInt", 64, true),
    Alias::int("SignedLongLong", 64, true),
    Alias::int("SignedLongLongInt", 64, true),
    Alias::int("UnsignedLongLong", 64, false),
    Alias::int("UnsignedLongLongInt", 64, false),
    Alias::float("Float16", 16),
    Alias::float("Half", 16),
    Alias::float("Float32", 32),
    Alias::float("Single", 32),
    Alias::float("Float64", 64),
    Alias::float("Double", 64),
];

/// Look up a descriptor by alias name.
pub fn alias(name: &str) -> Option<&'static NumberType> {
    ALIASES
        .iter()
        .find(|alias| alias.name == name)
        .and_then(Alias::resolve)
}

/// Every alias naming `ty`, in table order.
pub fn aliases_of(ty: &NumberType) -> Vec<&'static str> {
    ALIASES
        .iter()
        .filter(|alias| {
            alias.kind == ty.kind() && Bits::Finite(alias.bits) == ty.bits() && alias.signed == ty.signed()
        })
        .map(|alias| alias.name)
        .collect()
}
