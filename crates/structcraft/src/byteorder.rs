//! Byte order configuration shared by every codec.

use std::{fmt, str::FromStr};

use crate::errors::FormatError;

/// Byte order of a primitive, enum or bitfield container.
///
/// `Native` follows the target platform and is resolved when bytes are produced or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ByteOrder {
    #[default]
    Native,
    Little,
    Big,
}

impl ByteOrder {
    /// Resolves `Native` to the byte order of the target platform.
    pub fn resolve(self) -> ByteOrder {
        match self {
            ByteOrder::Native if cfg!(target_endian = "big") => ByteOrder::Big,
            ByteOrder::Native => ByteOrder::Little,
            other => other,
        }
    }

    pub fn is_little(self) -> bool {
        self.resolve() == ByteOrder::Little
    }

    /// Writes the low `out.len()` bytes of `value`.
    pub(crate) fn write_uint(self, value: u64, out: &mut [u8]) {
        let n = out.len();
        if self.is_little() {
            out.copy_from_slice(&value.to_le_bytes()[..n]);
        } else {
            out.copy_from_slice(&value.to_be_bytes()[8 - n..]);
        }
    }

    /// Reads `data.len()` (at most 8) bytes as an unsigned integer.
    pub(crate) fn read_uint(self, data: &[u8]) -> u64 {
        let n = data.len();
        let mut raw = [0u8; 8];
        if self.is_little() {
            raw[..n].copy_from_slice(data);
            u64::from_le_bytes(raw)
        } else {
            raw[8 - n..].copy_from_slice(data);
            u64::from_be_bytes(raw)
        }
    }
}

impl FromStr for ByteOrder {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "native" | "" => Ok(ByteOrder::Native),
            "little" => Ok(ByteOrder::Little),
            "big" => Ok(ByteOrder::Big),
            other => Err(FormatError::InvalidByteOrder(other.to_string())),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ByteOrder::Native => "native",
            ByteOrder::Little => "little",
            ByteOrder::Big => "big",
        })
    }
}
