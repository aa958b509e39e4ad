//! Sub-byte fields packed into a fixed-width unsigned container.
//!
//! The container byte order decides both how the container integer is laid out in memory and
//! in which direction members are allocated: with little byte order the first member takes the
//! least significant bits, with big byte order the most significant ones.

use crate::{
    bits::{container_bytes, int_range, mask, sign_extend},
    byteorder::ByteOrder,
    errors::{CodecError, FormatError, RangeError, SchemaError, type_mismatch},
    value::{Record, Value},
};

/// A named run of bits inside a [`BitfieldDef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitfieldMember {
    name: String,
    bits: usize,
    signed: bool,
    /// Bits allocated before this member, counted from the allocation end.
    cursor: usize,
}

impl BitfieldMember {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }
}

/// Bitfield definition: ordered members over a 1, 2, 4 or 8 byte container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitfieldDef {
    members: Vec<BitfieldMember>,
    used_bits: usize,
    fixed_size: Option<usize>,
    byteorder: ByteOrder,
}

impl BitfieldDef {
    /// Bitfield whose container grows with the registered members.
    pub fn new(byteorder: ByteOrder) -> Self {
        Self {
            members: Vec::new(),
            used_bits: 0,
            fixed_size: None,
            byteorder,
        }
    }

    /// Bitfield with a container of exactly `size` bytes.
    pub fn with_size(size: usize, byteorder: ByteOrder) -> Result<Self, SchemaError> {
        if !matches!(size, 1 | 2 | 4 | 8) {
            return Err(SchemaError::InvalidSize {
                kind: "bitfield",
                size,
            });
        }

        Ok(Self {
            fixed_size: Some(size),
            ..Self::new(byteorder)
        })
    }

    /// Appends an unsigned member of `bits` bits.
    pub fn add(&mut self, name: &str, bits: usize) -> Result<(), SchemaError> {
        self.add_member(name, bits, false)
    }

    /// Appends a two's complement member of `bits` bits.
    pub fn add_signed(&mut self, name: &str, bits: usize) -> Result<(), SchemaError> {
        self.add_member(name, bits, true)
    }

    fn add_member(&mut self, name: &str, bits: usize, signed: bool) -> Result<(), SchemaError> {
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if self.member(name).is_some() {
            return Err(SchemaError::DuplicateName(name.to_string()));
        }
        if bits == 0 || bits > 64 {
            return Err(SchemaError::InvalidBitWidth {
                name: name.to_string(),
                bits,
            });
        }

        let capacity = self.fixed_size.map_or(64, |size| size * 8);
        let needed = self.used_bits + bits;
        if needed > capacity {
            return Err(SchemaError::CapacityOverflow {
                name: name.to_string(),
                needed,
                capacity,
            });
        }

        self.members.push(BitfieldMember {
            name: name.to_string(),
            bits,
            signed,
            cursor: self.used_bits,
        });
        self.used_bits = needed;
        Ok(())
    }

    pub fn members(&self) -> &[BitfieldMember] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&BitfieldMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn byteorder(&self) -> ByteOrder {
        self.byteorder
    }

    /// Bits allocated by all members.
    pub fn used_bits(&self) -> usize {
        self.used_bits
    }

    pub fn size(&self) -> usize {
        self.fixed_size
            .or_else(|| container_bytes(self.used_bits))
            .unwrap_or(8)
    }

    pub fn alignment(&self) -> usize {
        self.size()
    }

    /// Position of the member's least significant bit within the container integer.
    pub fn bit_offset(&self, member: &BitfieldMember) -> usize {
        if self.byteorder.is_little() {
            member.cursor
        } else {
            self.size() * 8 - member.cursor - member.bits
        }
    }

    pub fn zero_value(&self) -> Value {
        Value::Struct(
            self.members
                .iter()
                .map(|m| {
                    let zero = if m.signed { Value::Int(0) } else { Value::UInt(0) };
                    (m.name.clone(), zero)
                })
                .collect(),
        )
    }

    /// Reads the container integer from the first [`size`](Self::size) bytes of `data`.
    pub fn read_container(&self, data: &[u8]) -> Result<u64, FormatError> {
        let size = self.size();
        let data = data.get(..size).ok_or(FormatError::BufferTooShort {
            needed: size,
            actual: data.len(),
        })?;
        Ok(self.byteorder.read_uint(data))
    }

    pub(crate) fn write_container(&self, container: u64, out: &mut [u8]) {
        self.byteorder.write_uint(container, &mut out[..self.size()]);
    }

    /// Extracts `member` from a container integer.
    pub fn get_member(&self, container: u64, member: &BitfieldMember) -> Value {
        let raw = (container >> self.bit_offset(member)) & mask(member.bits);
        if member.signed {
            Value::Int(sign_extend(raw, member.bits))
        } else {
            Value::UInt(raw)
        }
    }

    /// Returns `container` with `member` replaced by `value`.
    pub fn set_member(
        &self,
        container: u64,
        member: &BitfieldMember,
        value: &Value,
    ) -> Result<u64, CodecError> {
        let v = value
            .as_integer()
            .ok_or_else(|| type_mismatch("integer", value))?;
        let (min, max) = int_range(member.bits, member.signed);
        if v < min || v > max {
            return Err(RangeError::BitfieldValue {
                name: member.name.clone(),
                value: v,
                bits: member.bits,
            }
            .into());
        }

        let field_mask = mask(member.bits) << self.bit_offset(member);
        let bits = ((v as u64) & mask(member.bits)) << self.bit_offset(member);
        Ok((container & !field_mask) | bits)
    }

    /// Packs a member mapping into the container integer. Missing members are zero.
    pub fn pack(&self, record: &Record) -> Result<u64, CodecError> {
        if let Some(unknown) = record.keys().find(|k| self.member(k).is_none()) {
            return Err(FormatError::UnknownField(unknown.clone()).into());
        }

        self.members.iter().try_fold(0u64, |container, member| {
            match record.get(&member.name) {
                Some(value) => self.set_member(container, member, value),
                None => Ok(container),
            }
        })
    }

    /// Unpacks every member of a container integer.
    pub fn unpack(&self, container: u64) -> Record {
        self.members
            .iter()
            .map(|m| (m.name.clone(), self.get_member(container, m)))
            .collect()
    }

    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; self.size()];
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    pub(crate) fn encode_into(&self, value: &Value, out: &mut [u8]) -> Result<(), CodecError> {
        let record = value
            .as_record()
            .ok_or_else(|| type_mismatch("mapping", value))?;
        let container = self.pack(record)?;
        self.write_container(container, out);
        Ok(())
    }

    pub fn decode(&self, data: &[u8]) -> Result<Value, FormatError> {
        Ok(Value::Struct(self.unpack(self.read_container(data)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;

    fn rgba(byteorder: ByteOrder) -> BitfieldDef {
        let mut b = BitfieldDef::new(byteorder);
        for name in ["r", "g", "b", "a"] {
            b.add(name, 4).unwrap();
        }
        b
    }

    #[test]
    fn test_auto_size() {
        let mut b = BitfieldDef::new(ByteOrder::Little);
        assert_eq!(b.size(), 1);
        b.add("a", 8).unwrap();
        assert_eq!(b.size(), 1);
        b.add("b", 1).unwrap();
        assert_eq!(b.size(), 2);
        b.add("c", 23).unwrap();
        assert_eq!(b.size(), 4);
        b.add("d", 1).unwrap();
        assert_eq!(b.size(), 8);
        assert_eq!(b.alignment(), 8);
    }

    #[test]
    fn test_little_packing() {
        let b = rgba(ByteOrder::Little);
        let bytes = b
            .encode(&Value::Struct(record! { "r" => 1u8, "g" => 2u8, "b" => 3u8, "a" => 4u8 }))
            .unwrap();
        // r takes the low nibble of the first byte
        assert_eq!(bytes, [0x21, 0x43]);
        assert_eq!(
            b.decode(&bytes).unwrap(),
            Value::Struct(record! { "r" => 1u8, "g" => 2u8, "b" => 3u8, "a" => 4u8 })
        );
    }

    #[test]
    fn test_big_packing() {
        let b = rgba(ByteOrder::Big);
        let bytes = b
            .encode(&Value::Struct(record! { "r" => 1u8, "g" => 2u8, "b" => 3u8, "a" => 4u8 }))
            .unwrap();
        // r takes the high nibble of the first byte
        assert_eq!(bytes, [0x12, 0x34]);
    }

    #[test]
    fn test_one_byte_nibbles() {
        let mut b = BitfieldDef::with_size(1, ByteOrder::Little).unwrap();
        b.add("lo", 4).unwrap();
        b.add("hi", 4).unwrap();
        let v = Value::Struct(record! { "lo" => 9u8, "hi" => 9u8 });
        assert_eq!(b.decode(&[0x99]).unwrap(), v);
        assert_eq!(b.encode(&v).unwrap(), [0x99]);
    }

    #[test]
    fn test_signed_member() {
        let mut b = BitfieldDef::new(ByteOrder::Little);
        b.add_signed("delta", 4).unwrap();
        b.add("flag", 1).unwrap();
        let bytes = b
            .encode(&Value::Struct(record! { "delta" => -3i8, "flag" => true }))
            .unwrap();
        assert_eq!(bytes, [0b1_1101]);
        assert_eq!(
            b.decode(&bytes).unwrap(),
            Value::Struct(record! { "delta" => -3i8, "flag" => 1u8 })
        );
        assert!(
            b.encode(&Value::Struct(record! { "delta" => -9i8 }))
                .is_err()
        );
    }

    #[test]
    fn test_value_too_wide() {
        let b = rgba(ByteOrder::Little);
        assert_eq!(
            b.encode(&Value::Struct(record! { "g" => 16u8 })).unwrap_err(),
            CodecError::Range(RangeError::BitfieldValue {
                name: "g".to_string(),
                value: 16,
                bits: 4
            })
        );
    }

    #[test]
    fn test_unknown_member() {
        let b = rgba(ByteOrder::Little);
        assert_eq!(
            b.encode(&Value::Struct(record! { "x" => 1u8 })).unwrap_err(),
            CodecError::Format(FormatError::UnknownField("x".to_string()))
        );
    }

    #[test]
    fn test_missing_members_are_zero() {
        let b = rgba(ByteOrder::Little);
        assert_eq!(
            b.encode(&Value::Struct(record! { "a" => 0xfu8 })).unwrap(),
            [0x00, 0xf0]
        );
    }

    #[test]
    fn test_capacity_overflow_fixed() {
        let mut b = BitfieldDef::with_size(1, ByteOrder::Little).unwrap();
        b.add("a", 5).unwrap();
        assert_eq!(
            b.add("b", 4).unwrap_err(),
            SchemaError::CapacityOverflow {
                name: "b".to_string(),
                needed: 9,
                capacity: 8
            }
        );
        assert_eq!(b.members().len(), 1);
        assert!(b.add("b", 3).is_ok());
    }

    #[test]
    fn test_capacity_overflow_auto() {
        let mut b = BitfieldDef::new(ByteOrder::Little);
        b.add("a", 60).unwrap();
        assert!(matches!(
            b.add("b", 5).unwrap_err(),
            SchemaError::CapacityOverflow { capacity: 64, .. }
        ));
    }

    #[test]
    fn test_invalid_members() {
        let mut b = BitfieldDef::new(ByteOrder::Little);
        b.add("a", 1).unwrap();
        assert_eq!(
            b.add("a", 1).unwrap_err(),
            SchemaError::DuplicateName("a".to_string())
        );
        assert!(matches!(
            b.add("z", 0).unwrap_err(),
            SchemaError::InvalidBitWidth { bits: 0, .. }
        ));
        assert_eq!(b.add("", 1).unwrap_err(), SchemaError::EmptyName);
    }

    #[test]
    fn test_full_width_member() {
        let mut b = BitfieldDef::new(ByteOrder::Big);
        b.add("all", 64).unwrap();
        let v = Value::Struct(record! { "all" => u64::MAX });
        let bytes = b.encode(&v).unwrap();
        assert_eq!(bytes, [0xff; 8]);
        assert_eq!(b.decode(&bytes).unwrap(), v);
    }
}
