//! Lazy views over byte buffers.
//!
//! A [`View`] is a `(buffer, offset, definition)` triple. Reading a field decodes only that
//! field's bytes; nested structs, bitfields and arrays hand out child views over the same buffer
//! at the field's offset, so nothing is copied and siblings are never decoded. Writes encode
//! straight into the field's byte range.
//!
//! The buffer is anything that derefs to bytes: an owned `Vec<u8>` from
//! [`StructDef::instance`], or a borrowed `&[u8]` / `&mut [u8]` passed to
//! [`StructDef::instance_from`]. Mutation through the buffer's owner is visible through every
//! view over it once the borrow ends.

use crate::{
    bitfield::BitfieldDef,
    errors::{CodecError, FormatError},
    field::Field,
    node::TypeNode,
    structdef::{StructDef, encode_field},
    value::{Record, Value},
};

/// What a field read through [`View::get`] resolves to.
#[derive(Debug)]
pub enum Access<'v, 's> {
    /// A primitive, string or enum field, decoded.
    Value(Value),
    Struct(View<'s, &'v [u8]>),
    Bitfield(BitfieldView<'s, &'v [u8]>),
    Array(ArrayView<'s, &'v [u8]>),
}

/// Lazy accessor for a struct or union laid out in a buffer.
#[derive(Debug, Clone)]
pub struct View<'s, B> {
    buf: B,
    base: usize,
    def: &'s StructDef,
}

impl<'s, B> View<'s, B> {
    pub(crate) fn new(buf: B, base: usize, def: &'s StructDef) -> Self {
        Self { buf, base, def }
    }

    pub fn def(&self) -> &'s StructDef {
        self.def
    }

    /// Offset of this view inside its buffer.
    pub fn base_offset(&self) -> usize {
        self.base
    }

    pub fn into_inner(self) -> B {
        self.buf
    }

    fn lookup(&self, name: &str) -> Result<&'s Field, FormatError> {
        self.def
            .field(name)
            .ok_or_else(|| FormatError::UnknownField(name.to_string()))
    }

    fn range(&self, field: &Field) -> std::ops::Range<usize> {
        let start = self.base + field.offset();
        start..start + field.size()
    }
}

fn not_a(expected: &'static str, field: &Field) -> FormatError {
    FormatError::TypeMismatch {
        expected,
        actual: if field.is_array() {
            "array"
        } else {
            field.ty().kind_name()
        },
    }
}

fn nested_struct<'s>(field: &'s Field) -> Result<&'s StructDef, FormatError> {
    match (&*field.ty, field.is_array()) {
        (TypeNode::Struct(def), false) => Ok(def),
        _ => Err(not_a("struct", field)),
    }
}

fn nested_bitfield<'s>(field: &'s Field) -> Result<&'s BitfieldDef, FormatError> {
    match &*field.ty {
        TypeNode::Bitfield(def) => Ok(def),
        _ => Err(not_a("bitfield", field)),
    }
}

fn array_field(field: &Field) -> Result<(), FormatError> {
    if field.is_array() {
        Ok(())
    } else {
        Err(not_a("array", field))
    }
}

impl<'s, B: AsRef<[u8]>> View<'s, B> {
    /// The bytes covered by this view.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf.as_ref()[self.base..self.base + self.def.size()]
    }

    /// Resolves a field to a decoded value or a child view.
    pub fn get(&self, name: &str) -> Result<Access<'_, 's>, FormatError> {
        let field = self.lookup(name)?;
        if field.is_array() {
            return self.array(name).map(Access::Array);
        }
        Ok(match &*field.ty {
            TypeNode::Struct(_) => Access::Struct(self.child(name)?),
            TypeNode::Bitfield(_) => Access::Bitfield(self.bitfield(name)?),
            _ => Access::Value(self.value(name)?),
        })
    }

    /// Decodes one field. Nested structs and arrays decode to their full value.
    pub fn value(&self, name: &str) -> Result<Value, FormatError> {
        let field = self.lookup(name)?;
        crate::structdef::decode_field(field, &self.buf.as_ref()[self.range(field)])
    }

    /// Child view over a nested struct or union field.
    pub fn child(&self, name: &str) -> Result<View<'s, &[u8]>, FormatError> {
        let field = self.lookup(name)?;
        let def = nested_struct(field)?;
        Ok(View::new(self.buf.as_ref(), self.base + field.offset(), def))
    }

    pub fn bitfield(&self, name: &str) -> Result<BitfieldView<'s, &[u8]>, FormatError> {
        let field = self.lookup(name)?;
        let def = nested_bitfield(field)?;
        Ok(BitfieldView::new(self.buf.as_ref(), self.base + field.offset(), def))
    }

    pub fn array(&self, name: &str) -> Result<ArrayView<'s, &[u8]>, FormatError> {
        let field = self.lookup(name)?;
        array_field(field)?;
        Ok(ArrayView::new(self.buf.as_ref(), self.base, field))
    }

    /// Decodes every field; equal to `deserialize` over the same bytes.
    pub fn to_record(&self) -> Result<Record, FormatError> {
        self.def.deserialize(self.as_bytes())
    }
}

impl<'s, B: AsRef<[u8]> + AsMut<[u8]>> View<'s, B> {
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let end = self.base + self.def.size();
        &mut self.buf.as_mut()[self.base..end]
    }

    /// Encodes `value` into the field's bytes. Other fields are left untouched, and nothing is
    /// written if encoding fails.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), CodecError> {
        let field = self.lookup(name)?;
        let mut bytes = vec![0u8; field.size()];
        encode_field(field, &value.into(), &mut bytes)?;

        let range = self.range(field);
        self.buf.as_mut()[range].copy_from_slice(&bytes);
        Ok(())
    }

    pub fn child_mut(&mut self, name: &str) -> Result<View<'s, &mut [u8]>, FormatError> {
        let field = self.lookup(name)?;
        let def = nested_struct(field)?;
        Ok(View::new(self.buf.as_mut(), self.base + field.offset(), def))
    }

    pub fn bitfield_mut(&mut self, name: &str) -> Result<BitfieldView<'s, &mut [u8]>, FormatError> {
        let field = self.lookup(name)?;
        let def = nested_bitfield(field)?;
        Ok(BitfieldView::new(self.buf.as_mut(), self.base + field.offset(), def))
    }

    pub fn array_mut(&mut self, name: &str) -> Result<ArrayView<'s, &mut [u8]>, FormatError> {
        let field = self.lookup(name)?;
        array_field(field)?;
        Ok(ArrayView::new(self.buf.as_mut(), self.base, field))
    }
}

/// Lazy accessor for an array field. Every access decodes one element.
#[derive(Debug, Clone)]
pub struct ArrayView<'s, B> {
    buf: B,
    /// Absolute offset of element 0.
    start: usize,
    elem: &'s TypeNode,
    len: usize,
}

impl<'s, B> ArrayView<'s, B> {
    fn new(buf: B, base: usize, field: &'s Field) -> Self {
        Self {
            buf,
            start: base + field.offset(),
            elem: field.ty(),
            len: field.length(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn element_start(&self, index: usize) -> Result<usize, FormatError> {
        if index >= self.len {
            return Err(FormatError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        Ok(self.start + index * self.elem.size())
    }

    fn element_struct(&self) -> Result<&'s StructDef, FormatError> {
        match self.elem {
            TypeNode::Struct(def) => Ok(def),
            other => Err(FormatError::TypeMismatch {
                expected: "struct",
                actual: other.kind_name(),
            }),
        }
    }
}

impl<'s, B: AsRef<[u8]>> ArrayView<'s, B> {
    pub fn get(&self, index: usize) -> Result<Value, FormatError> {
        let start = self.element_start(index)?;
        self.elem.decode(&self.buf.as_ref()[start..start + self.elem.size()])
    }

    /// Child view over a struct element.
    pub fn child(&self, index: usize) -> Result<View<'s, &[u8]>, FormatError> {
        let def = self.element_struct()?;
        let start = self.element_start(index)?;
        Ok(View::new(self.buf.as_ref(), start, def))
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Value, FormatError>> + '_ {
        (0..self.len).map(|i| self.get(i))
    }

    pub fn to_vec(&self) -> Result<Vec<Value>, FormatError> {
        self.iter().collect()
    }
}

impl<'s, B: AsRef<[u8]> + AsMut<[u8]>> ArrayView<'s, B> {
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<(), CodecError> {
        let start = self.element_start(index)?;
        let bytes = self.elem.encode(&value.into())?;
        self.buf.as_mut()[start..start + bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }

    pub fn child_mut(&mut self, index: usize) -> Result<View<'s, &mut [u8]>, FormatError> {
        let def = self.element_struct()?;
        let start = self.element_start(index)?;
        Ok(View::new(self.buf.as_mut(), start, def))
    }
}

/// Lazy accessor for a bitfield. Member access reads (and rewrites) only the container.
#[derive(Debug, Clone)]
pub struct BitfieldView<'s, B> {
    buf: B,
    base: usize,
    def: &'s BitfieldDef,
}

impl<'s, B> BitfieldView<'s, B> {
    fn new(buf: B, base: usize, def: &'s BitfieldDef) -> Self {
        Self { buf, base, def }
    }

    pub fn def(&self) -> &'s BitfieldDef {
        self.def
    }
}

impl<'s, B: AsRef<[u8]>> BitfieldView<'s, B> {
    fn container(&self) -> Result<u64, FormatError> {
        self.def.read_container(&self.buf.as_ref()[self.base..])
    }

    pub fn get(&self, name: &str) -> Result<Value, FormatError> {
        let member = self
            .def
            .member(name)
            .ok_or_else(|| FormatError::UnknownField(name.to_string()))?;
        Ok(self.def.get_member(self.container()?, member))
    }

    pub fn to_record(&self) -> Result<Record, FormatError> {
        Ok(self.def.unpack(self.container()?))
    }
}

impl<'s, B: AsRef<[u8]> + AsMut<[u8]>> BitfieldView<'s, B> {
    /// Replaces one member, keeping the other bits of the container.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), CodecError> {
        let member = self
            .def
            .member(name)
            .ok_or_else(|| FormatError::UnknownField(name.to_string()))?;
        let container = self.def.set_member(self.container()?, member, &value.into())?;
        let base = self.base;
        self.def
            .write_container(container, &mut self.buf.as_mut()[base..]);
        Ok(())
    }
}
