//! Constraint-checked primitive type descriptors.
//!
//! This is the lowest layer of castprims. Every abstract number type is a
//! [`NumberType`] descriptor:
//! - built once per `(kind, bit length, signedness)` by a memoized factory
//! - carrying immutable `(min, max)` bounds and a derived byte size
//! - shared by every alias that names the same shape
//!
//! Descriptors are `&'static` and compare by identity or equality, never by
//! name.

pub mod alias;
pub mod constraint;
pub mod descriptor;
pub mod error;
pub mod integer;

pub use alias::{alias, aliases_of, Alias, ALIASES};
pub use constraint::{truncate, ConstraintPolicy, RangeConstraint, TRUNCATE_WIDTH};
pub use descriptor::{
    make_float_type, make_int_type, Bits, Bound, Bounds, ByteSize, NumberKind, NumberType,
};
pub use error::{ConstraintError, Result, TypeError};
pub use integer::Integer;
