use std::io::{Read, Write};
use std::sync::{Arc, OnceLock};

use castprims_context::ContextRef;
use castprims_types::{Bits, NumberKind, NumberType, RangeConstraint};
use tracing::{debug, warn};

use crate::cast::Serializer;
use crate::codec::{BytesIntegerCodec, CodecRef, FixedCodec};
use crate::config::AdapterSettings;
use crate::error::{DriverError, Result};
use crate::scalar::Scalar;

/// Serializer for one number type, backed by a codec chosen on first use.
#[derive(Debug)]
pub struct NumberAdapter {
    descriptor: &'static NumberType,
    settings: AdapterSettings,
    constraint: RangeConstraint,
    codec: OnceLock<CodecRef>,
}

impl NumberAdapter {
    pub fn new(descriptor: &'static NumberType, settings: AdapterSettings) -> Self {
        let constraint = descriptor.constraint().with_policy(settings.policy);
        Self {
            descriptor,
            settings,
            constraint,
            codec: OnceLock::new(),
        }
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    /// The codec, selected once.
    pub fn codec(&self) -> Result<&CodecRef> {
        if let Some(codec) = self.codec.get() {
            return Ok(codec);
        }
        let codec = self.setup()?;
        Ok(self.codec.get_or_init(|| codec))
    }

    fn setup(&self) -> Result<CodecRef> {
        if let Some(codec) = &self.settings.codec {
            debug!(ty = %self.descriptor, ?codec, "using explicit codec");
            return Ok(Arc::clone(codec));
        }

        let endian = &self.settings.endian;
        if endian.count() > 1 {
            warn!(
                ty = %self.descriptor,
                ?endian,
                "several endianness flags set, using big > little > native"
            );
        }

        let cpu_sized = self.settings.cpu_sized && !endian.any_deferred();
        if cpu_sized {
            let fixed = endian
                .resolve_static()
                .and_then(|order| FixedCodec::lookup(self.descriptor, order));
            if let Some(fixed) = fixed {
                debug!(ty = %self.descriptor, format = %fixed.format_name(), "selected fixed codec");
                return Ok(Arc::new(fixed));
            }
        }

        match (self.descriptor.kind(), self.descriptor.bits()) {
            (NumberKind::Int, Bits::Finite(bits)) if bits % 8 == 0 => {
                let codec = BytesIntegerCodec::new(
                    (bits / 8) as usize,
                    self.descriptor.signed(),
                    endian.clone(),
                )?;
                debug!(ty = %self.descriptor, ?codec, "selected byte-integer codec");
                Ok(Arc::new(codec))
            }
            _ => Err(DriverError::UnsupportedType {
                shape: self.descriptor.canonical_name(),
            }),
        }
    }
}

impl Serializer for NumberAdapter {
    fn name(&self) -> String {
        self.descriptor.canonical_name()
    }

    fn descriptor(&self) -> Option<&'static NumberType> {
        Some(self.descriptor)
    }

    fn constraint(&self) -> Option<&RangeConstraint> {
        Some(&self.constraint)
    }

    fn size(&self) -> Option<usize> {
        self.descriptor
            .size_of()
            .finite()
            .map(|size| size as usize)
    }

    fn parse(&self, src: &mut dyn Read, context: Option<&ContextRef>) -> Result<Scalar> {
        self.codec()?.parse(src, context)
    }

    fn build(&self, value: &Scalar, dst: &mut dyn Write, context: Option<&ContextRef>) -> Result<()> {
        self.codec()?.build(value, dst, context)
    }
}
