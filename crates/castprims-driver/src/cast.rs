//! The paired sync/async cast API.
//!
//! Implementors override the [`Serializer`] defaults; callers go through
//! [`SerializerExt`], which wraps every default with the constraint checks
//! and is blanket-implemented so it cannot be overridden.

use std::io::{Read, Seek, SeekFrom, Write};

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use castprims_context::ContextRef;
use castprims_types::{NumberType, RangeConstraint};
use tracing::trace;

use crate::error::Result;
use crate::scalar::Scalar;

/// Overridable load/dump operations of one serializer.
#[async_trait]
pub trait Serializer: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> String;

    /// The abstract type this serializer casts, if it is a number.
    fn descriptor(&self) -> Option<&'static NumberType> {
        None
    }

    /// The check applied before dump and after load.
    fn constraint(&self) -> Option<&RangeConstraint> {
        None
    }

    /// Encoded size in bytes, if fixed.
    fn size(&self) -> Option<usize> {
        None
    }

    fn parse(&self, src: &mut dyn Read, context: Option<&ContextRef>) -> Result<Scalar>;

    fn build(&self, value: &Scalar, dst: &mut dyn Write, context: Option<&ContextRef>) -> Result<()>;

    async fn parse_async(&self, src: Bytes, context: Option<&ContextRef>) -> Result<Scalar> {
        self.parse(&mut src.as_ref(), context)
    }

    async fn build_async(&self, value: Scalar, context: Option<&ContextRef>) -> Result<Bytes> {
        let mut dst = BytesMut::new().writer();
        self.build(&value, &mut dst, context)?;
        Ok(dst.into_inner().freeze())
    }
}

fn check<S: Serializer + ?Sized>(serializer: &S, value: Scalar) -> Result<Scalar> {
    match (serializer.constraint(), value) {
        (Some(constraint), Scalar::Int(int)) => Ok(Scalar::Int(constraint.validate(int)?)),
        (_, value) => Ok(value),
    }
}

/// Public entry points of every [`Serializer`].
#[async_trait]
pub trait SerializerExt: Serializer {
    /// Decode one value from `src` and check it.
    fn load<R: Read>(&self, mut src: R, context: Option<&ContextRef>) -> Result<Scalar> {
        let value = check(self, self.parse(&mut src, context)?)?;
        trace!(serializer = %self.name(), %value, "loaded");
        Ok(value)
    }

    /// Check `value` and encode it, returning exactly the bytes produced.
    fn dump(&self, value: impl Into<Scalar>, context: Option<&ContextRef>) -> Result<Bytes> {
        let value = check(self, value.into())?;
        let mut dst = BytesMut::new().writer();
        self.build(&value, &mut dst, context)?;
        let dumped = dst.into_inner().freeze();
        trace!(serializer = %self.name(), %value, len = dumped.len(), "dumped");
        Ok(dumped)
    }

    /// Like [`SerializerExt::dump`], but encode into a reused stream at its
    /// current position. Returns only the span written by this call and
    /// leaves the stream positioned after it.
    fn dump_into<S: Read + Write + Seek>(
        &self,
        value: impl Into<Scalar>,
        stream: &mut S,
        context: Option<&ContextRef>,
    ) -> Result<Bytes> {
        let value = check(self, value.into())?;
        let start = stream.stream_position()?;
        self.build(&value, stream, context)?;
        let end = stream.stream_position()?;

        stream.seek(SeekFrom::Start(start))?;
        let mut written = vec![0u8; end.saturating_sub(start) as usize];
        stream.read_exact(&mut written)?;
        Ok(Bytes::from(written))
    }

    async fn load_async(&self, src: Bytes, context: Option<&ContextRef>) -> Result<Scalar> {
        let value = check(self, self.parse_async(src, context).await?)?;
        trace!(serializer = %self.name(), %value, "loaded");
        Ok(value)
    }

    async fn dump_async(&self, value: Scalar, context: Option<&ContextRef>) -> Result<Bytes> {
        let value = check(self, value)?;
        let shown = value.to_string();
        let dumped = self.build_async(value, context).await?;
        trace!(serializer = %self.name(), value = %shown, len = dumped.len(), "dumped");
        Ok(dumped)
    }
}

impl<T: Serializer + ?Sized> SerializerExt for T {}
