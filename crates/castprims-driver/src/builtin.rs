//! Reference driver backed by the codecs in this crate.

use std::sync::Arc;

use castprims_types::{make_float_type, make_int_type, NumberType};

use crate::adapter::NumberAdapter;
use crate::cast::Serializer;
use crate::config::AdapterSettings;
use crate::error::Result;
use crate::registry::{AbstractType, Driver, DriverRegistry, Implementation};

/// Name the native driver is defined under.
pub const NATIVE_DRIVER: &str = crate::driver_name!();

/// Implementation producing a [`NumberAdapter`] for one descriptor.
#[derive(Debug, Clone, Copy)]
pub struct NumberImplementation {
    descriptor: &'static NumberType,
}

impl NumberImplementation {
    pub fn new(descriptor: &'static NumberType) -> Self {
        Self { descriptor }
    }
}

impl Implementation for NumberImplementation {
    fn origin(&self) -> AbstractType {
        AbstractType::Number(self.descriptor)
    }

    fn instantiate(&self, settings: &AdapterSettings) -> Result<Box<dyn Serializer>> {
        Ok(Box::new(NumberAdapter::new(self.descriptor, settings.clone())))
    }
}

/// The native driver: signed and unsigned integers of 8 to 512 bits and
/// 16/32/64-bit floats.
pub fn native_driver() -> Result<Driver> {
    let mut builder = Driver::builder(NATIVE_DRIVER);
    for bits in [8u32, 16, 32, 64, 128, 256, 512] {
        for signed in [true, false] {
            builder = builder.register(NumberImplementation::new(make_int_type(bits, signed)?));
        }
    }
    for bits in [16u32, 32, 64] {
        builder = builder.register(NumberImplementation::new(make_float_type(bits)?));
    }
    Ok(builder.build())
}

/// Define the native driver in `registry`.
pub fn define_native(registry: &DriverRegistry) -> Result<Arc<Driver>> {
    registry.define(native_driver()?)
}
