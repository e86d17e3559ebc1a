//! Backend-agnostic serialization primitives.
//!
//! castprims provides the pieces codec libraries are built from: bounded
//! number types, pluggable drivers that map those types to encoders, and a
//! scope tree threading shared state through nested serializers.
//!
//! # Crate Structure
//!
//! - [`types`]: memoized number descriptors, bounds and constraints
//! - [`context`]: scope tree and context containers
//! - [`driver`]: driver registry, adapters, codecs and the cast API
//! - `logging`: stderr tracing bootstrap (behind the `logging` feature)
//!
//! ```
//! use castprims::driver::{define_native, AdapterSettings, DriverRegistry, SerializerExt};
//!
//! let registry = DriverRegistry::new();
//! let native = define_native(&registry).unwrap();
//! let int = native.resolve("Int").implementation().unwrap().instantiate(&AdapterSettings::default()).unwrap();
//!
//! let dumped = int.dump(-2i32, None).unwrap();
//! assert_eq!(dumped.as_ref(), &[0xFF, 0xFF, 0xFF, 0xFE]);
//! ```

/// Re-export type descriptor types.
pub mod types {
    pub use castprims_types::*;
}

/// Re-export scope and context types.
pub mod context {
    pub use castprims_context::*;
}

/// Re-export driver types.
pub mod driver {
    pub use castprims_driver::*;
}

#[cfg(feature = "logging")]
pub mod logging;

pub use castprims_context::{Context, ContextRef, Scope, ScopeType};
pub use castprims_driver::{AdapterSettings, Driver, DriverRegistry, Scalar, Serializer, SerializerExt};
pub use castprims_types::{make_int_type, Integer, NumberType};
