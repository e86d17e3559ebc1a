//! Backend codecs: the byte-level encoders adapters delegate to.

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use castprims_context::ContextRef;
use castprims_types::{Bits, Integer, NumberKind, NumberType};
use half::f16;

use crate::config::EndianFlags;
use crate::error::{DriverError, Result};
use crate::scalar::Scalar;

/// Byte order of an encoded number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
    /// Whatever the host uses.
    Native,
}

impl ByteOrder {
    fn suffix(self) -> char {
        match self {
            ByteOrder::Big => 'b',
            ByteOrder::Little => 'l',
            ByteOrder::Native => 'n',
        }
    }

    fn is_little(self) -> bool {
        match self {
            ByteOrder::Big => false,
            ByteOrder::Little => true,
            ByteOrder::Native => cfg!(target_endian = "little"),
        }
    }
}

/// Encoder/decoder of one scalar shape.
///
/// The shared context is passed through on every call; codecs that do not
/// depend on it ignore it.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Encoded size in bytes, if fixed.
    fn size(&self) -> Option<usize>;

    fn parse(&self, src: &mut dyn Read, context: Option<&ContextRef>) -> Result<Scalar>;

    fn build(&self, value: &Scalar, dst: &mut dyn Write, context: Option<&ContextRef>) -> Result<()>;
}

pub type CodecRef = Arc<dyn Codec>;

/// Codec for the sizes the host CPU handles natively: 8 to 128-bit
/// integers and IEEE half, single and double floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedCodec {
    kind: NumberKind,
    bits: u32,
    signed: bool,
    order: ByteOrder,
}

impl FixedCodec {
    /// The fixed codec for `descriptor` in `order`, if the shape has one.
    pub fn lookup(descriptor: &NumberType, order: ByteOrder) -> Option<Self> {
        let Bits::Finite(bits) = descriptor.bits() else {
            return None;
        };
        let supported = match descriptor.kind() {
            NumberKind::Int => matches!(bits, 8 | 16 | 32 | 64 | 128),
            NumberKind::Float => matches!(bits, 16 | 32 | 64),
        };
        supported.then_some(Self {
            kind: descriptor.kind(),
            bits,
            signed: descriptor.signed(),
            order,
        })
    }

    /// Format name such as `Int32sb` or `Float64l`.
    pub fn format_name(&self) -> String {
        match self.kind {
            NumberKind::Int => format!(
                "Int{}{}{}",
                self.bits,
                if self.signed { 's' } else { 'u' },
                self.order.suffix()
            ),
            NumberKind::Float => format!("Float{}{}", self.bits, self.order.suffix()),
        }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    fn width(&self) -> usize {
        (self.bits / 8) as usize
    }
}

macro_rules! put_ordered {
    ($dst:expr, $order:expr, $value:expr, $be:ident, $le:ident, $ne:ident) => {
        match $order {
            ByteOrder::Big => $dst.$be($value),
            ByteOrder::Little => $dst.$le($value),
            ByteOrder::Native => $dst.$ne($value),
        }
    };
}

macro_rules! get_ordered {
    ($src:expr, $order:expr, $be:ident, $le:ident, $ne:ident) => {
        match $order {
            ByteOrder::Big => $src.$be(),
            ByteOrder::Little => $src.$le(),
            ByteOrder::Native => $src.$ne(),
        }
    };
}

fn narrow<T: TryFrom<i128> + TryFrom<u128>>(value: &Integer, shape: &FixedCodec) -> Result<T> {
    let narrowed = match value.to_i128() {
        Some(v) => T::try_from(v).ok(),
        None => value.to_u128().and_then(|v| T::try_from(v).ok()),
    };
    narrowed.ok_or_else(|| DriverError::Codec(format!("{value} does not fit {}", shape.format_name())))
}

impl Codec for FixedCodec {
    fn size(&self) -> Option<usize> {
        Some(self.width())
    }

    fn parse(&self, src: &mut dyn Read, _context: Option<&ContextRef>) -> Result<Scalar> {
        let mut raw = [0u8; 16];
        let raw = &mut raw[..self.width()];
        src.read_exact(raw)?;
        let mut buf: &[u8] = raw;
        let order = self.order;

        let value = match (self.kind, self.bits, self.signed) {
            (NumberKind::Int, 8, true) => Scalar::from(buf.get_i8()),
            (NumberKind::Int, 8, false) => Scalar::from(buf.get_u8()),
            (NumberKind::Int, 16, true) => Scalar::from(get_ordered!(buf, order, get_i16, get_i16_le, get_i16_ne)),
            (NumberKind::Int, 16, false) => Scalar::from(get_ordered!(buf, order, get_u16, get_u16_le, get_u16_ne)),
            (NumberKind::Int, 32, true) => Scalar::from(get_ordered!(buf, order, get_i32, get_i32_le, get_i32_ne)),
            (NumberKind::Int, 32, false) => Scalar::from(get_ordered!(buf, order, get_u32, get_u32_le, get_u32_ne)),
            (NumberKind::Int, 64, true) => Scalar::from(get_ordered!(buf, order, get_i64, get_i64_le, get_i64_ne)),
            (NumberKind::Int, 64, false) => Scalar::from(get_ordered!(buf, order, get_u64, get_u64_le, get_u64_ne)),
            (NumberKind::Int, 128, true) => Scalar::from(get_ordered!(buf, order, get_i128, get_i128_le, get_i128_ne)),
            (NumberKind::Int, _, _) => Scalar::from(get_ordered!(buf, order, get_u128, get_u128_le, get_u128_ne)),
            (NumberKind::Float, 16, _) => {
                let raw = [buf.get_u8(), buf.get_u8()];
                let half = match order {
                    ByteOrder::Big => f16::from_be_bytes(raw),
                    ByteOrder::Little => f16::from_le_bytes(raw),
                    ByteOrder::Native => f16::from_ne_bytes(raw),
                };
                Scalar::from(half.to_f64())
            }
            (NumberKind::Float, 32, _) => Scalar::from(get_ordered!(buf, order, get_f32, get_f32_le, get_f32_ne)),
            (NumberKind::Float, _, _) => Scalar::from(get_ordered!(buf, order, get_f64, get_f64_le, get_f64_ne)),
        };
        Ok(value)
    }

    fn build(&self, value: &Scalar, dst: &mut dyn Write, _context: Option<&ContextRef>) -> Result<()> {
        let mut buf = BytesMut::with_capacity(self.width());
        let order = self.order;

        match self.kind {
            NumberKind::Int => {
                let int = value.as_int().ok_or(DriverError::ValueKind {
                    expected: "int",
                    found: value.kind_name(),
                })?;
                match (self.bits, self.signed) {
                    (8, true) => buf.put_i8(narrow(int, self)?),
                    (8, false) => buf.put_u8(narrow(int, self)?),
                    (16, true) => put_ordered!(buf, order, narrow(int, self)?, put_i16, put_i16_le, put_i16_ne),
                    (16, false) => put_ordered!(buf, order, narrow(int, self)?, put_u16, put_u16_le, put_u16_ne),
                    (32, true) => put_ordered!(buf, order, narrow(int, self)?, put_i32, put_i32_le, put_i32_ne),
                    (32, false) => put_ordered!(buf, order, narrow(int, self)?, put_u32, put_u32_le, put_u32_ne),
                    (64, true) => put_ordered!(buf, order, narrow(int, self)?, put_i64, put_i64_le, put_i64_ne),
                    (64, false) => put_ordered!(buf, order, narrow(int, self)?, put_u64, put_u64_le, put_u64_ne),
                    (128, true) => put_ordered!(buf, order, narrow(int, self)?, put_i128, put_i128_le, put_i128_ne),
                    _ => put_ordered!(buf, order, narrow(int, self)?, put_u128, put_u128_le, put_u128_ne),
                }
            }
            NumberKind::Float => {
                let float = value.as_float();
                match self.bits {
                    16 => {
                        let half = f16::from_f64(float);
                        buf.put_slice(&match order {
                            ByteOrder::Big => half.to_be_bytes(),
                            ByteOrder::Little => half.to_le_bytes(),
                            ByteOrder::Native => half.to_ne_bytes(),
                        });
                    }
                    32 => put_ordered!(buf, order, float as f32, put_f32, put_f32_le, put_f32_ne),
                    _ => put_ordered!(buf, order, float, put_f64, put_f64_le, put_f64_ne),
                }
            }
        }

        dst.write_all(&buf)?;
        Ok(())
    }
}

/// Generic two's-complement integer codec of any non-zero byte length.
///
/// The byte order is re-evaluated on every call, so deferred endianness
/// flags can follow the shared context.
#[derive(Debug, Clone)]
pub struct BytesIntegerCodec {
    length: usize,
    signed: bool,
    endian: EndianFlags,
}

impl BytesIntegerCodec {
    pub fn new(length: usize, signed: bool, endian: EndianFlags) -> Result<Self> {
        if length == 0 {
            return Err(DriverError::UnsupportedType {
                shape: format!("{length}-byte integer"),
            });
        }
        Ok(Self {
            length,
            signed,
            endian,
        })
    }
}

impl Codec for BytesIntegerCodec {
    fn size(&self) -> Option<usize> {
        Some(self.length)
    }

    fn parse(&self, src: &mut dyn Read, context: Option<&ContextRef>) -> Result<Scalar> {
        let mut raw = vec![0u8; self.length];
        src.read_exact(&mut raw)?;
        if !self.endian.resolve(context).is_little() {
            raw.reverse();
        }
        Ok(Scalar::Int(Integer::from_le_bytes(&raw, self.signed)))
    }

    fn build(&self, value: &Scalar, dst: &mut dyn Write, context: Option<&ContextRef>) -> Result<()> {
        let int = value.as_int().ok_or(DriverError::ValueKind {
            expected: "int",
            found: value.kind_name(),
        })?;
        let mut raw = int.to_le_bytes(self.length, self.signed).ok_or_else(|| {
            DriverError::Codec(format!("{int} does not fit {} bytes", self.length))
        })?;
        if !self.endian.resolve(context).is_little() {
            raw.reverse();
        }

        let mut buf = BytesMut::with_capacity(self.length);
        buf.put_slice(&raw);
        dst.write_all(&buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use castprims_types::{make_float_type, make_int_type};

    use super::*;
    use crate::config::EndianFlag;

    fn encode(codec: &dyn Codec, value: impl Into<Scalar>) -> Vec<u8> {
        let mut out = Vec::new();
        codec.build(&value.into(), &mut out, None).unwrap();
        out
    }

    #[test]
    fn fixed_codec_byte_orders() {
        let i16_type = make_int_type(16, true).unwrap();
        let big = FixedCodec::lookup(i16_type, ByteOrder::Big).unwrap();
        let little = FixedCodec::lookup(i16_type, ByteOrder::Little).unwrap();

        assert_eq!(encode(&big, -2i16), vec![0xFF, 0xFE]);
        assert_eq!(encode(&little, -2i16), vec![0xFE, 0xFF]);
        assert_eq!(big.format_name(), "Int16sb");

        let parsed = big.parse(&mut &[0x01, 0x02][..], None).unwrap();
        assert_eq!(parsed, Scalar::from(0x0102i16));
    }

    #[test]
    fn fixed_codec_floats() {
        let f32_type = make_float_type(32).unwrap();
        let codec = FixedCodec::lookup(f32_type, ByteOrder::Little).unwrap();
        assert_eq!(encode(&codec, 1.5f32), 1.5f32.to_le_bytes().to_vec());
        assert_eq!(codec.format_name(), "Float32l");

        let parsed = codec.parse(&mut &1.5f32.to_le_bytes()[..], None).unwrap();
        assert_eq!(parsed, Scalar::Float(1.5));
    }

    #[test]
    fn fixed_codec_half_floats() {
        let f16_type = make_float_type(16).unwrap();
        let big = FixedCodec::lookup(f16_type, ByteOrder::Big).unwrap();
        let little = FixedCodec::lookup(f16_type, ByteOrder::Little).unwrap();
        assert_eq!(big.size(), Some(2));
        assert_eq!(big.format_name(), "Float16b");

        assert_eq!(encode(&big, 1.5f64), vec![0x3E, 0x00]);
        assert_eq!(encode(&little, -2.0f64), vec![0x00, 0xC0]);
        assert_eq!(big.parse(&mut &[0x3E, 0x00][..], None).unwrap(), Scalar::Float(1.5));
        assert_eq!(little.parse(&mut &[0x00, 0x7C][..], None).unwrap(), Scalar::Float(f64::INFINITY));
    }

    #[test]
    fn fixed_codec_missing_shapes() {
        assert!(FixedCodec::lookup(make_int_type(24, false).unwrap(), ByteOrder::Big).is_none());
        assert!(FixedCodec::lookup(make_int_type(256, true).unwrap(), ByteOrder::Big).is_none());
    }

    #[test]
    fn fixed_codec_rejects_overflow() {
        let codec = FixedCodec::lookup(make_int_type(8, false).unwrap(), ByteOrder::Big).unwrap();
        let mut out = Vec::new();
        let err = codec.build(&Scalar::from(300u16), &mut out, None).unwrap_err();
        assert!(matches!(err, DriverError::Codec(_)));
        assert!(out.is_empty());
    }

    #[test]
    fn fixed_codec_rejects_float_for_int() {
        let codec = FixedCodec::lookup(make_int_type(32, true).unwrap(), ByteOrder::Big).unwrap();
        let err = codec.build(&Scalar::Float(1.0), &mut Vec::new(), None).unwrap_err();
        assert!(matches!(
            err,
            DriverError::ValueKind {
                expected: "int",
                found: "float"
            }
        ));
    }

    #[test]
    fn bytes_integer_odd_width() {
        let codec = BytesIntegerCodec::new(3, true, EndianFlags::default()).unwrap();
        assert_eq!(encode(&codec, -2i32), vec![0xFF, 0xFF, 0xFE]);
        let parsed = codec.parse(&mut &[0xFF, 0xFF, 0xFE][..], None).unwrap();
        assert_eq!(parsed, Scalar::from(-2i32));
        assert_eq!(codec.size(), Some(3));
    }

    #[test]
    fn bytes_integer_follows_context() {
        let endian = EndianFlags {
            little: Some(EndianFlag::deferred(|ctx| ctx.is_some())),
            ..EndianFlags::default()
        };
        let codec = BytesIntegerCodec::new(2, false, endian).unwrap();
        let context = castprims_context::ContextSpec::default().create();

        let mut big = Vec::new();
        codec.build(&Scalar::from(1u8), &mut big, None).unwrap();
        let mut little = Vec::new();
        codec.build(&Scalar::from(1u8), &mut little, Some(&context)).unwrap();

        assert_eq!(big, vec![0x00, 0x01]);
        assert_eq!(little, vec![0x01, 0x00]);
    }

    #[test]
    fn bytes_integer_length_limits() {
        assert!(BytesIntegerCodec::new(0, true, EndianFlags::default()).is_err());
        assert_eq!(
            BytesIntegerCodec::new(64, true, EndianFlags::default()).unwrap().size(),
            Some(64)
        );
    }

    #[test]
    fn bytes_integer_256_bits() {
        let codec = BytesIntegerCodec::new(32, true, EndianFlags::default()).unwrap();
        let min = -Integer::pow2(255);

        let encoded = encode(&codec, min.clone());
        let mut expected = vec![0u8; 32];
        expected[0] = 0x80;
        assert_eq!(encoded, expected);
        assert_eq!(codec.parse(&mut &encoded[..], None).unwrap(), Scalar::Int(min));

        let err = codec.build(&Scalar::Int(Integer::pow2(255)), &mut Vec::new(), None).unwrap_err();
        assert!(matches!(err, DriverError::Codec(_)));
    }
}
