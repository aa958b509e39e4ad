//! Primitive scalar codec: integers, booleans and floats of fixed width.

use std::fmt;

use half::f16;

use crate::{
    bits::int_range,
    byteorder::ByteOrder,
    errors::{CodecError, FormatError, RangeError, SchemaError, type_mismatch},
    value::Value,
};

/// Kind of a primitive scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    UInt,
    Bool,
    Float,
}

impl Primitive {
    fn prefix(self) -> &'static str {
        match self {
            Primitive::Int => "int",
            Primitive::UInt => "uint",
            Primitive::Bool => "bool",
            Primitive::Float => "float",
        }
    }
}

/// C type names accepted in addition to the `<kind><bits>` tags.
const ALIASES: &[(&str, &str)] = &[
    ("char", "int8"),
    ("signed char", "int8"),
    ("unsigned char", "uint8"),
    ("short", "int16"),
    ("short int", "int16"),
    ("unsigned short", "uint16"),
    ("unsigned short int", "uint16"),
    ("int", "int32"),
    ("unsigned int", "uint32"),
    ("long", "int64"),
    ("long int", "int64"),
    ("unsigned long", "uint64"),
    ("unsigned long int", "uint64"),
    ("long long", "int64"),
    ("long long int", "int64"),
    ("unsigned long long", "uint64"),
    ("unsigned long long int", "uint64"),
    ("float", "float32"),
    ("double", "float64"),
    ("bool", "bool8"),
];

/// A primitive scalar type with a fixed width and byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicTypeDef {
    kind: Primitive,
    size: usize,
    byteorder: ByteOrder,
}

impl BasicTypeDef {
    /// Creates a primitive of `size` bytes. Integers and booleans take 1, 2, 4 or 8 bytes,
    /// floats 2, 4 or 8.
    pub fn new(kind: Primitive, size: usize, byteorder: ByteOrder) -> Result<Self, SchemaError> {
        let valid = match kind {
            Primitive::Float => matches!(size, 2 | 4 | 8),
            _ => matches!(size, 1 | 2 | 4 | 8),
        };
        if !valid {
            return Err(SchemaError::InvalidSize {
                kind: kind.prefix(),
                size,
            });
        }

        Ok(Self {
            kind,
            size,
            byteorder,
        })
    }

    /// Integer type whose width the caller has already validated.
    pub(crate) fn integer(kind: Primitive, size: usize, byteorder: ByteOrder) -> Self {
        debug_assert!(matches!(size, 1 | 2 | 4 | 8));
        Self {
            kind,
            size,
            byteorder,
        }
    }

    /// Resolves a type tag such as `uint16`, `float32` or `unsigned short`.
    pub fn from_tag(tag: &str, byteorder: ByteOrder) -> Result<Self, SchemaError> {
        let unsupported = || SchemaError::UnsupportedType(tag.to_string());
        let canonical = ALIASES
            .iter()
            .find(|(alias, _)| *alias == tag)
            .map_or(tag, |(_, canonical)| canonical);

        let (kind, bits) = [
            Primitive::UInt,
            Primitive::Int,
            Primitive::Bool,
            Primitive::Float,
        ]
        .into_iter()
        .find_map(|kind| {
            canonical
                .strip_prefix(kind.prefix())
                .and_then(|bits| bits.parse::<usize>().ok())
                .map(|bits| (kind, bits))
        })
        .ok_or_else(unsupported)?;

        if bits % 8 != 0 {
            return Err(unsupported());
        }
        Self::new(kind, bits / 8, byteorder).map_err(|_| unsupported())
    }

    pub fn kind(&self) -> Primitive {
        self.kind
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Natural alignment equals the width.
    pub fn alignment(&self) -> usize {
        self.size
    }

    pub fn byteorder(&self) -> ByteOrder {
        self.byteorder
    }

    /// Canonical tag, e.g. `int32`.
    pub fn tag(&self) -> String {
        format!("{}{}", self.kind.prefix(), self.size * 8)
    }

    pub fn zero_value(&self) -> Value {
        match self.kind {
            Primitive::Int => Value::Int(0),
            Primitive::UInt => Value::UInt(0),
            Primitive::Bool => Value::Bool(false),
            Primitive::Float => Value::Float(0.0),
        }
    }

    /// Encodes `value` into exactly [`size`](Self::size) bytes.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; self.size];
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    pub(crate) fn encode_into(&self, value: &Value, out: &mut [u8]) -> Result<(), CodecError> {
        let out = &mut out[..self.size];
        let bits = self.size * 8;

        let raw = match self.kind {
            Primitive::Int | Primitive::UInt => {
                let expected = if self.kind == Primitive::Int {
                    "signed integer"
                } else {
                    "unsigned integer"
                };
                let v = value
                    .as_integer()
                    .ok_or_else(|| type_mismatch(expected, value))?;
                let signed = self.kind == Primitive::Int;
                let (min, max) = int_range(bits, signed);
                if v < min || v > max {
                    return Err(RangeError::Integer {
                        value: v,
                        bits,
                        signedness: if signed { "signed" } else { "unsigned" },
                    }
                    .into());
                }
                v as u64
            }
            Primitive::Bool => match value {
                Value::Bool(b) => *b as u64,
                other => {
                    let v = other
                        .as_integer()
                        .ok_or_else(|| type_mismatch("bool", other))?;
                    (v != 0) as u64
                }
            },
            Primitive::Float => {
                let v = match value {
                    Value::Float(f) => *f,
                    other => other
                        .as_integer()
                        .ok_or_else(|| type_mismatch("float", other))?
                        as f64,
                };
                self.float_bits(v)?
            }
        };

        self.byteorder.write_uint(raw, out);
        Ok(())
    }

    fn float_bits(&self, v: f64) -> Result<u64, RangeError> {
        let overflow = || RangeError::Float {
            value: v.to_string(),
            bits: self.size * 8,
        };
        match self.size {
            2 => {
                let half = f16::from_f64(v);
                if v.is_finite() && half.is_infinite() {
                    return Err(overflow());
                }
                Ok(half.to_bits() as u64)
            }
            4 => {
                let single = v as f32;
                if v.is_finite() && single.is_infinite() {
                    return Err(overflow());
                }
                Ok(single.to_bits() as u64)
            }
            _ => Ok(v.to_bits()),
        }
    }

    /// Decodes the first [`size`](Self::size) bytes of `data`.
    pub fn decode(&self, data: &[u8]) -> Result<Value, FormatError> {
        let data = data.get(..self.size).ok_or(FormatError::BufferTooShort {
            needed: self.size,
            actual: data.len(),
        })?;
        let raw = self.byteorder.read_uint(data);

        Ok(match self.kind {
            Primitive::Int => Value::Int(crate::bits::sign_extend(raw, self.size * 8)),
            Primitive::UInt => Value::UInt(raw),
            Primitive::Bool => Value::Bool(raw != 0),
            Primitive::Float => Value::Float(match self.size {
                2 => f16::from_bits(raw as u16).to_f64(),
                4 => f32::from_bits(raw as u32) as f64,
                _ => f64::from_bits(raw),
            }),
        })
    }
}

impl fmt::Display for BasicTypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(tag: &str, byteorder: ByteOrder) -> BasicTypeDef {
        BasicTypeDef::from_tag(tag, byteorder).unwrap()
    }

    #[test]
    fn test_from_tag() {
        let t = basic("uint16", ByteOrder::Little);
        assert_eq!(t.kind(), Primitive::UInt);
        assert_eq!(t.size(), 2);
        assert_eq!(basic("unsigned short", ByteOrder::Little), t);
        assert_eq!(basic("double", ByteOrder::Big).tag(), "float64");
        assert_eq!(basic("char", ByteOrder::Big).tag(), "int8");
    }

    #[test]
    fn test_from_tag_unsupported() {
        for tag in ["uint12", "float8", "int128", "quux", "uint"] {
            assert_eq!(
                BasicTypeDef::from_tag(tag, ByteOrder::Native).unwrap_err(),
                SchemaError::UnsupportedType(tag.to_string())
            );
        }
    }

    #[test]
    fn test_encode_byteorder() {
        let v = Value::UInt(0x0102);
        assert_eq!(basic("uint16", ByteOrder::Little).encode(&v).unwrap(), [0x02, 0x01]);
        assert_eq!(basic("uint16", ByteOrder::Big).encode(&v).unwrap(), [0x01, 0x02]);
    }

    #[test]
    fn test_encode_negative() {
        let t = basic("int16", ByteOrder::Big);
        assert_eq!(t.encode(&Value::Int(-2)).unwrap(), [0xff, 0xfe]);
        assert_eq!(t.decode(&[0xff, 0xfe]).unwrap(), Value::Int(-2));
    }

    #[test]
    fn test_encode_out_of_range() {
        let u8t = basic("uint8", ByteOrder::Little);
        assert!(matches!(
            u8t.encode(&Value::UInt(256)).unwrap_err(),
            CodecError::Range(RangeError::Integer { value: 256, .. })
        ));
        assert!(matches!(
            u8t.encode(&Value::Int(-1)).unwrap_err(),
            CodecError::Range(RangeError::Integer { value: -1, .. })
        ));
        let i8t = basic("int8", ByteOrder::Little);
        assert!(i8t.encode(&Value::Int(127)).is_ok());
        assert!(i8t.encode(&Value::Int(128)).is_err());
        assert!(i8t.encode(&Value::Int(-128)).is_ok());
    }

    #[test]
    fn test_encode_type_mismatch() {
        let t = basic("int32", ByteOrder::Little);
        assert_eq!(
            t.encode(&Value::Str("1".to_string())).unwrap_err(),
            CodecError::Format(FormatError::TypeMismatch {
                expected: "signed integer",
                actual: "string"
            })
        );
        assert!(t.encode(&Value::Float(1.0)).is_err());
    }

    #[test]
    fn test_bool() {
        let t = basic("bool16", ByteOrder::Little);
        assert_eq!(t.encode(&Value::Bool(true)).unwrap(), [1, 0]);
        assert_eq!(t.encode(&Value::UInt(7)).unwrap(), [1, 0]);
        assert_eq!(t.decode(&[0, 0x80]).unwrap(), Value::Bool(true));
        assert_eq!(t.decode(&[0, 0]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_float() {
        let t = basic("float32", ByteOrder::Little);
        let bytes = t.encode(&Value::Float(1.5)).unwrap();
        assert_eq!(bytes, 1.5f32.to_le_bytes());
        assert_eq!(t.decode(&bytes).unwrap(), Value::Float(1.5));
        assert!(matches!(
            t.encode(&Value::Float(1.0e300)).unwrap_err(),
            CodecError::Range(RangeError::Float { bits: 32, .. })
        ));
        assert!(t.encode(&Value::Float(f64::INFINITY)).is_ok());

        let half = basic("float16", ByteOrder::Big);
        assert_eq!(half.encode(&Value::Float(1.0)).unwrap(), [0x3c, 0x00]);
        assert_eq!(half.decode(&[0xc0, 0x00]).unwrap(), Value::Float(-2.0));
        assert!(half.encode(&Value::Float(70000.0)).is_err());
        assert_eq!(half.encode(&Value::Int(2)).unwrap(), [0x40, 0x00]);
        assert_eq!(half.encode(&Value::Float(65504.0)).unwrap(), [0x7b, 0xff]);
        assert_eq!(half.decode(&[0x00, 0x01]).unwrap(), Value::Float(2f64.powi(-24)));
        assert!(matches!(
            half.decode(&[0x7e, 0x00]).unwrap(),
            Value::Float(f) if f.is_nan()
        ));
    }

    #[test]
    fn test_decode_short_buffer() {
        let t = basic("uint32", ByteOrder::Little);
        assert_eq!(
            t.decode(&[1, 2]).unwrap_err(),
            FormatError::BufferTooShort {
                needed: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn test_uint64_extremes() {
        let t = basic("uint64", ByteOrder::Big);
        let bytes = t.encode(&Value::UInt(u64::MAX)).unwrap();
        assert_eq!(bytes, [0xff; 8]);
        assert_eq!(t.decode(&bytes).unwrap(), Value::UInt(u64::MAX));

        let i = basic("int64", ByteOrder::Little);
        let bytes = i.encode(&Value::Int(i64::MIN)).unwrap();
        assert_eq!(i.decode(&bytes).unwrap(), Value::Int(i64::MIN));
    }
}
