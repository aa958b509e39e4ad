//! Symbolic enums: a bidirectional name to integer map over one integer type.

use crate::{
    basic::{BasicTypeDef, Primitive},
    bits::{container_bytes, int_range},
    byteorder::ByteOrder,
    errors::{CodecError, FormatError, SchemaError},
    value::Value,
};

/// An enum encoded as a signed or unsigned integer.
///
/// Unless the size is fixed with [`EnumDef::with_size`], the underlying integer grows to the
/// smallest of 1, 2, 4 or 8 bytes holding every registered value. Values are `i128` so that
/// both `i64` and `u64` constants fit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    constants: Vec<(String, i128)>,
    fixed_size: Option<usize>,
    signed: bool,
    byteorder: ByteOrder,
}

impl EnumDef {
    /// Unsigned enum with an automatically sized underlying integer.
    pub fn new(byteorder: ByteOrder) -> Self {
        Self {
            constants: Vec::new(),
            fixed_size: None,
            signed: false,
            byteorder,
        }
    }

    /// Signed enum with an automatically sized underlying integer.
    pub fn new_signed(byteorder: ByteOrder) -> Self {
        Self {
            signed: true,
            ..Self::new(byteorder)
        }
    }

    /// Enum over an integer of exactly `size` bytes.
    pub fn with_size(size: usize, signed: bool, byteorder: ByteOrder) -> Result<Self, SchemaError> {
        if !matches!(size, 1 | 2 | 4 | 8) {
            return Err(SchemaError::InvalidSize { kind: "enum", size });
        }

        Ok(Self {
            fixed_size: Some(size),
            signed,
            ..Self::new(byteorder)
        })
    }

    /// Registers `name` with `value`.
    pub fn add(&mut self, name: &str, value: impl Into<i128>) -> Result<(), SchemaError> {
        let value = value.into();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if self.value_of(name).is_some() {
            return Err(SchemaError::DuplicateName(name.to_string()));
        }

        let out_of_range = || SchemaError::EnumValueOutOfRange {
            name: name.to_string(),
            value,
        };
        let (min, max) = int_range(self.fixed_size.unwrap_or(8) * 8, self.signed);
        if value < min || value > max {
            return Err(out_of_range());
        }

        self.constants.push((name.to_string(), value));
        Ok(())
    }

    /// Registers `name` with the previous value plus one, or 0 for the first constant.
    pub fn add_next(&mut self, name: &str) -> Result<(), SchemaError> {
        let value = match self.constants.last() {
            Some((_, last)) => last + 1,
            None => 0,
        };
        self.add(name, value)
    }

    pub fn value_of(&self, name: &str) -> Option<i128> {
        self.constants
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// First registered name carrying `value`.
    pub fn name_of(&self, value: i128) -> Option<&str> {
        self.constants
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }

    /// Registered constants in registration order.
    pub fn constants(&self) -> impl Iterator<Item = (&str, i128)> {
        self.constants.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn byteorder(&self) -> ByteOrder {
        self.byteorder
    }

    pub fn size(&self) -> usize {
        if let Some(size) = self.fixed_size {
            return size;
        }

        self.constants
            .iter()
            .map(|(_, v)| {
                let redundant = if *v < 0 {
                    v.leading_ones() as usize
                } else {
                    v.leading_zeros() as usize
                };
                // signed values keep one extra bit for the sign
                let bits = if self.signed {
                    129 - redundant
                } else {
                    128 - redundant
                };
                container_bytes(bits).unwrap_or(8)
            })
            .max()
            .unwrap_or(1)
    }

    pub fn alignment(&self) -> usize {
        self.size()
    }

    /// The integer type values are encoded with.
    pub fn underlying(&self) -> BasicTypeDef {
        let kind = if self.signed {
            Primitive::Int
        } else {
            Primitive::UInt
        };
        BasicTypeDef::integer(kind, self.size(), self.byteorder)
    }

    pub fn zero_value(&self) -> Value {
        self.symbol_or_raw(0)
    }

    /// Encodes a symbol name or a raw integer.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; self.size()];
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    pub(crate) fn encode_into(&self, value: &Value, out: &mut [u8]) -> Result<(), CodecError> {
        let underlying = self.underlying();
        match value {
            Value::Str(name) => {
                let v = self
                    .value_of(name)
                    .ok_or_else(|| FormatError::UnknownSymbol(name.clone()))?;
                underlying.encode_into(&raw_value(v), out)
            }
            other => underlying.encode_into(other, out),
        }
    }

    /// Decodes the underlying integer; values without a registered name pass through as is.
    pub fn decode(&self, data: &[u8]) -> Result<Value, FormatError> {
        let raw = self.underlying().decode(data)?;
        Ok(match raw {
            Value::Int(v) => self.symbol_or_raw(v.into()),
            Value::UInt(v) => self.symbol_or_raw(v.into()),
            other => other,
        })
    }

    fn symbol_or_raw(&self, v: i128) -> Value {
        match self.name_of(v) {
            Some(name) => Value::Str(name.to_string()),
            None if self.signed => Value::Int(v as i64),
            None => Value::UInt(v as u64),
        }
    }
}

/// Registered values are range checked, so they fit either `i64` or `u64`.
fn raw_value(v: i128) -> Value {
    match u64::try_from(v) {
        Ok(u) => Value::UInt(u),
        Err(_) => Value::Int(v as i64),
    }
}
