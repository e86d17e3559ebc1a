//! Driver registry, adapters and codecs.
//!
//! A [`Driver`] maps abstract types to implementations. Resolving a type
//! yields a [`Serializer`], usually a [`NumberAdapter`] that picks its
//! codec once, on first use:
//! - an explicit codec from the settings wins
//! - else a fixed-size codec for the host's native widths
//! - else the generic byte-integer codec
//!
//! Every load and dump goes through [`SerializerExt`], which applies the
//! type's constraint.

pub mod adapter;
pub mod builtin;
pub mod cast;
pub mod codec;
pub mod config;
pub mod error;
pub mod registry;
pub mod scalar;

pub use adapter::NumberAdapter;
pub use builtin::{define_native, native_driver, NumberImplementation, NATIVE_DRIVER};
pub use cast::{Serializer, SerializerExt};
pub use codec::{ByteOrder, BytesIntegerCodec, Codec, CodecRef, FixedCodec};
pub use config::{AdapterConfig, AdapterSettings, EndianFlag, EndianFlags, PolicyName};
pub use error::{DriverError, Result};
pub use registry::{AbstractType, Driver, DriverBuilder, DriverInfo, DriverRegistry, Implementation, Lookup, Model};
pub use scalar::Scalar;
