//! Fixed-length, zero-padded UTF-8 strings.

use crate::{
    errors::{CodecError, FormatError, RangeError, type_mismatch},
    value::Value,
};

/// A string occupying exactly `length` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringDef {
    length: usize,
}

impl StringDef {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn size(&self) -> usize {
        self.length
    }

    pub fn alignment(&self) -> usize {
        1
    }

    pub fn zero_value(&self) -> Value {
        Value::Str(String::new())
    }

    /// Encodes `value` and zero-pads it to the fixed length. Never truncates.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; self.length];
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    pub(crate) fn encode_into(&self, value: &Value, out: &mut [u8]) -> Result<(), CodecError> {
        let text = value.as_str().ok_or_else(|| type_mismatch("string", value))?;
        let bytes = text.as_bytes();
        if bytes.len() > self.length {
            return Err(RangeError::StringTooLong {
                len: bytes.len(),
                max: self.length,
            }
            .into());
        }

        let out = &mut out[..self.length];
        out[..bytes.len()].copy_from_slice(bytes);
        out[bytes.len()..].fill(0);
        Ok(())
    }

    /// Decodes the first `length` bytes of `data`, dropping trailing zero bytes.
    pub fn decode(&self, data: &[u8]) -> Result<Value, FormatError> {
        let data = data.get(..self.length).ok_or(FormatError::BufferTooShort {
            needed: self.length,
            actual: data.len(),
        })?;
        let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let text = std::str::from_utf8(&data[..end]).map_err(|_| FormatError::InvalidUtf8)?;

        Ok(Value::Str(text.to_string()))
    }
}
