//! Struct and union definitions: field placement and the eager codec.
//!
//! Fields are placed in registration order. In struct mode each field starts at the end of the
//! previous one, rounded up to the field's effective alignment (its natural alignment, capped by
//! `pack` when set) with a synthetic padding field filling the gap. In union mode every field
//! starts at offset 0. Either way the total size is rounded up to the largest effective
//! alignment.

use std::sync::Arc;

use crate::{
    basic::{BasicTypeDef, Primitive},
    byteorder::ByteOrder,
    errors::{CodecError, FormatError, RangeError, SchemaError, type_mismatch},
    field::{Field, PADDING_PREFIX},
    node::{TypeNode, TypeSpec},
    string::StringDef,
    value::{Record, Value},
    view::View,
};

/// Tag that declares a fixed-length UTF-8 string of the add call's length.
pub const UTF8_TAG: &str = "utf-8";

/// Construction options of a [`StructDef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StructOptions {
    /// Byte order of fields declared with primitive tags.
    pub byteorder: ByteOrder,
    /// Upper bound on member alignment, like `#pragma pack(n)`.
    pub pack: Option<usize>,
    /// Place every field at offset 0.
    pub union: bool,
}

/// An ordered set of fields with a computed C layout.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    fields: Vec<Field>,
    options: StructOptions,
    /// End of the last field, before trailing padding.
    end: usize,
    alignment: usize,
    padding_count: usize,
}

impl Default for StructDef {
    fn default() -> Self {
        Self::new(ByteOrder::Native)
    }
}

impl StructDef {
    /// Struct with natural alignment.
    pub fn new(byteorder: ByteOrder) -> Self {
        Self {
            fields: Vec::new(),
            options: StructOptions {
                byteorder,
                ..Default::default()
            },
            end: 0,
            alignment: 1,
            padding_count: 0,
        }
    }

    /// Union with natural alignment.
    pub fn new_union(byteorder: ByteOrder) -> Self {
        let mut def = Self::new(byteorder);
        def.options.union = true;
        def
    }

    pub fn with_options(options: StructOptions) -> Result<Self, SchemaError> {
        if let Some(pack) = options.pack {
            if !pack.is_power_of_two() {
                return Err(SchemaError::InvalidPack(pack));
            }
        }

        let mut def = Self::new(options.byteorder);
        def.options = options;
        Ok(def)
    }

    /// Appends a field. `length` 1 declares a scalar, larger values a fixed array.
    ///
    /// With the `utf-8` tag `length` is the string length and the field is a single string.
    pub fn add(
        &mut self,
        ty: impl Into<TypeSpec>,
        name: &str,
        length: usize,
    ) -> Result<(), SchemaError> {
        self.add_with_byteorder(ty, name, length, self.options.byteorder)
    }

    /// Like [`add`](Self::add), with a byte order override for primitive tags.
    pub fn add_with_byteorder(
        &mut self,
        ty: impl Into<TypeSpec>,
        name: &str,
        length: usize,
        byteorder: ByteOrder,
    ) -> Result<(), SchemaError> {
        self.check_name(name)?;
        if length == 0 {
            return Err(SchemaError::InvalidLength(name.to_string()));
        }

        let (ty, length): (Arc<TypeNode>, usize) = match ty.into() {
            TypeSpec::Tag(tag) if tag == UTF8_TAG => (Arc::new(StringDef::new(length).into()), 1),
            TypeSpec::Tag(tag) => (
                Arc::new(BasicTypeDef::from_tag(&tag, byteorder)?.into()),
                length,
            ),
            TypeSpec::Node(node) => (node, length),
        };
        if length > 1 && matches!(*ty, TypeNode::Bitfield(_)) {
            return Err(SchemaError::UnsupportedArray {
                name: name.to_string(),
                kind: "bitfield",
            });
        }

        let alignment = self.effective_alignment(&ty);
        let padding = if self.options.union {
            0
        } else {
            (alignment - self.end % alignment) % alignment
        };
        let overflow = || SchemaError::SizeOverflow {
            name: name.to_string(),
        };
        let size = ty.size().checked_mul(length).ok_or_else(overflow)?;
        let offset = if self.options.union {
            0
        } else {
            self.end.checked_add(padding).ok_or_else(overflow)?
        };
        let end = offset.checked_add(size).ok_or_else(overflow)?.max(self.end);
        // trailing padding must stay addressable too
        end.checked_next_multiple_of(self.alignment.max(alignment))
            .ok_or_else(overflow)?;

        if padding > 0 {
            self.push_padding(padding);
        }

        tracing::trace!(field = name, offset, size, alignment, "field placed");

        self.fields.push(Field {
            name: name.to_string(),
            ty,
            length,
            offset,
            is_padding: false,
        });
        self.end = end;
        self.alignment = self.alignment.max(alignment);
        Ok(())
    }

    fn check_name(&self, name: &str) -> Result<(), SchemaError> {
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }
        if name.starts_with(PADDING_PREFIX) {
            return Err(SchemaError::ReservedName(name.to_string()));
        }
        if self.fields.iter().any(|f| f.name == name) {
            return Err(SchemaError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn push_padding(&mut self, bytes: usize) {
        let pad = BasicTypeDef::integer(Primitive::UInt, 1, ByteOrder::Native);
        self.fields.push(Field {
            name: format!("{PADDING_PREFIX}_{}", self.padding_count),
            ty: Arc::new(pad.into()),
            length: bytes,
            offset: self.end,
            is_padding: true,
        });
        self.padding_count += 1;
        self.end += bytes;
    }

    /// Alignment `ty` gets inside this struct: its natural alignment capped by `pack`.
    pub fn effective_alignment(&self, ty: &TypeNode) -> usize {
        let natural = ty.alignment().max(1);
        match self.options.pack {
            Some(pack) => natural.min(pack),
            None => natural,
        }
    }

    /// Total size including trailing padding.
    pub fn size(&self) -> usize {
        self.end.next_multiple_of(self.alignment)
    }

    /// Largest effective member alignment, at least 1.
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn is_union(&self) -> bool {
        self.options.union
    }

    pub fn pack(&self) -> Option<usize> {
        self.options.pack
    }

    pub fn byteorder(&self) -> ByteOrder {
        self.options.byteorder
    }

    pub fn options(&self) -> StructOptions {
        self.options
    }

    /// Declared fields in order, without padding.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_padding)
    }

    /// Every placed field, synthetic padding included.
    pub fn layout(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().find(|f| f.name == name)
    }

    pub fn offset(&self, name: &str) -> Option<usize> {
        self.field(name).map(Field::offset)
    }

    /// Encodes `data` into exactly [`size`](Self::size) bytes with all padding zeroed.
    ///
    /// Missing keys encode as zero. Nothing is returned unless every field encoded.
    pub fn serialize(&self, data: &Record) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; self.size()];
        self.write_record(data, &mut out)?;
        Ok(out)
    }

    pub(crate) fn encode_into(&self, value: &Value, out: &mut [u8]) -> Result<(), CodecError> {
        let record = value
            .as_record()
            .ok_or_else(|| type_mismatch("mapping", value))?;
        let out = &mut out[..self.size()];
        out.fill(0);
        self.write_record(record, out)
    }

    fn write_record(&self, data: &Record, out: &mut [u8]) -> Result<(), CodecError> {
        if let Some(unknown) = data.keys().find(|k| self.field(k).is_none()) {
            return Err(FormatError::UnknownField(unknown.clone()).into());
        }

        for field in self.fields() {
            if let Some(value) = data.get(&field.name) {
                let region = &mut out[field.offset..field.offset + field.size()];
                encode_field(field, value, region)?;
            }
        }
        Ok(())
    }

    /// Decodes a record from the first [`size`](Self::size) bytes of `data`.
    pub fn deserialize(&self, data: &[u8]) -> Result<Record, FormatError> {
        let size = self.size();
        if data.len() < size {
            return Err(FormatError::BufferTooShort {
                needed: size,
                actual: data.len(),
            });
        }

        self.fields()
            .map(|field| {
                let region = &data[field.offset..field.offset + field.size()];
                Ok((field.name.clone(), decode_field(field, region)?))
            })
            .collect()
    }

    pub(crate) fn decode(&self, data: &[u8]) -> Result<Value, FormatError> {
        self.deserialize(data).map(Value::Struct)
    }

    /// Decodes consecutive records; a trailing partial record is ignored.
    pub fn deserialize_many(&self, data: &[u8]) -> Result<Vec<Record>, FormatError> {
        match self.size() {
            0 => Ok(Vec::new()),
            size => data
                .chunks_exact(size)
                .map(|chunk| self.deserialize(chunk))
                .collect(),
        }
    }

    /// View over a freshly allocated, zeroed buffer.
    pub fn instance(&self) -> View<'_, Vec<u8>> {
        View::new(vec![0u8; self.size()], 0, self)
    }

    /// View aliasing `buf`, which must hold at least [`size`](Self::size) bytes.
    pub fn instance_from<B: AsRef<[u8]>>(&self, buf: B) -> Result<View<'_, B>, FormatError> {
        let actual = buf.as_ref().len();
        if actual < self.size() {
            return Err(FormatError::BufferTooShort {
                needed: self.size(),
                actual,
            });
        }
        Ok(View::new(buf, 0, self))
    }

    /// Record holding the zero value of every field.
    pub fn create_empty_data(&self) -> Record {
        self.fields()
            .map(|field| {
                let zero = field.ty.zero_value();
                let value = if field.is_array() {
                    Value::Array(vec![zero; field.length])
                } else {
                    zero
                };
                (field.name.clone(), value)
            })
            .collect()
    }

    pub fn create_empty_instance(&self) -> View<'_, Vec<u8>> {
        self.instance()
    }
}

/// Encodes `value` over `out`, which is exactly the field's byte range.
pub(crate) fn encode_field(field: &Field, value: &Value, out: &mut [u8]) -> Result<(), CodecError> {
    if !field.is_array() {
        return field.ty.encode_into(value, out);
    }

    let items = value
        .as_array()
        .ok_or_else(|| type_mismatch("sequence", value))?;
    if items.len() > field.length {
        return Err(RangeError::ArrayTooLong {
            name: field.name.clone(),
            len: items.len(),
            max: field.length,
        }
        .into());
    }

    let elem = field.ty.size();
    for (item, chunk) in items.iter().zip(out.chunks_exact_mut(elem.max(1))) {
        field.ty.encode_into(item, chunk)?;
    }
    out[items.len() * elem..].fill(0);
    Ok(())
}

/// Decodes a field from exactly its byte range.
pub(crate) fn decode_field(field: &Field, data: &[u8]) -> Result<Value, FormatError> {
    if !field.is_array() {
        return field.ty.decode(data);
    }

    (0..field.length)
        .map(|i| field.ty.decode(&data[field.element_offset(i)..]))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}
