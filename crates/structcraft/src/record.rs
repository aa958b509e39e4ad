//! Flat record descriptors for array libraries.
//!
//! A [`RecordDescriptor`] describes a struct as named, offset fields of fixed-width primitive
//! codes, the model used by structured arrays in numerical libraries (numpy's `dtype` with
//! `names`, `formats`, `offsets` and `itemsize`). Only layouts expressible in that model
//! convert: unions, bitfields and multi-byte booleans have no counterpart.

use std::fmt;

use thiserror::Error;

use crate::{
    basic::{BasicTypeDef, Primitive},
    byteorder::ByteOrder,
    node::TypeNode,
    structdef::StructDef,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("unions have no record representation")]
    Union,
    #[error("field `{0}` is a bitfield")]
    Bitfield(String),
    /// Booleans are only representable as a single byte.
    #[error("field `{field}` is a {size} byte boolean")]
    WideBool { field: String, size: usize },
}

/// Element code of a record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveCode {
    /// Signed integer of the given byte width.
    Int(usize),
    UInt(usize),
    Float(usize),
    Bool,
    /// Fixed-length byte string.
    Bytes(usize),
    Record(Box<RecordDescriptor>),
}

impl PrimitiveCode {
    fn from_basic(field: &str, basic: &BasicTypeDef) -> Result<Self, RecordError> {
        Ok(match basic.kind() {
            Primitive::Int => PrimitiveCode::Int(basic.size()),
            Primitive::UInt => PrimitiveCode::UInt(basic.size()),
            Primitive::Float => PrimitiveCode::Float(basic.size()),
            Primitive::Bool if basic.size() == 1 => PrimitiveCode::Bool,
            Primitive::Bool => {
                return Err(RecordError::WideBool {
                    field: field.to_string(),
                    size: basic.size(),
                });
            }
        })
    }

    /// Whether the byte order matters for this code.
    fn is_multibyte(&self) -> bool {
        match self {
            PrimitiveCode::Int(size) | PrimitiveCode::UInt(size) | PrimitiveCode::Float(size) => {
                *size > 1
            }
            _ => false,
        }
    }
}

impl fmt::Display for PrimitiveCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveCode::Int(size) => write!(f, "i{size}"),
            PrimitiveCode::UInt(size) => write!(f, "u{size}"),
            PrimitiveCode::Float(size) => write!(f, "f{size}"),
            PrimitiveCode::Bool => f.write_str("b1"),
            PrimitiveCode::Bytes(len) => write!(f, "S{len}"),
            PrimitiveCode::Record(record) => f.write_str(&record.format()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub name: String,
    pub code: PrimitiveCode,
    pub byteorder: ByteOrder,
    /// Element count, 1 for scalars.
    pub length: usize,
    pub offset: usize,
}

impl RecordField {
    /// Format string of this field, e.g. `<u2`, `|S8` or `('>i4', (3,))`.
    pub fn format(&self) -> String {
        let element = match &self.code {
            PrimitiveCode::Record(record) => record.format(),
            code if code.is_multibyte() => format!("{}{code}", order_char(self.byteorder)),
            code => format!("|{code}"),
        };
        if self.length > 1 {
            match self.code {
                PrimitiveCode::Record(_) => format!("({element}, ({},))", self.length),
                _ => format!("('{element}', ({},))", self.length),
            }
        } else {
            element
        }
    }
}

fn order_char(byteorder: ByteOrder) -> char {
    match byteorder {
        ByteOrder::Native => '=',
        ByteOrder::Little => '<',
        ByteOrder::Big => '>',
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub itemsize: usize,
    pub fields: Vec<RecordField>,
}

impl RecordDescriptor {
    /// Describes `def`, skipping padding. Enums are described by their underlying integer.
    pub fn from_struct(def: &StructDef) -> Result<Self, RecordError> {
        if def.is_union() {
            return Err(RecordError::Union);
        }

        let fields = def
            .fields()
            .map(|field| {
                let (code, byteorder) = match field.ty() {
                    TypeNode::Basic(basic) => {
                        (PrimitiveCode::from_basic(field.name(), basic)?, basic.byteorder())
                    }
                    TypeNode::Enum(e) => {
                        let underlying = e.underlying();
                        (PrimitiveCode::from_basic(field.name(), &underlying)?, e.byteorder())
                    }
                    TypeNode::String(s) => (PrimitiveCode::Bytes(s.size()), ByteOrder::Native),
                    TypeNode::Struct(nested) => (
                        PrimitiveCode::Record(Box::new(Self::from_struct(nested)?)),
                        nested.byteorder(),
                    ),
                    TypeNode::Bitfield(_) => {
                        return Err(RecordError::Bitfield(field.name().to_string()));
                    }
                };
                Ok(RecordField {
                    name: field.name().to_string(),
                    code,
                    byteorder,
                    length: field.length(),
                    offset: field.offset(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            itemsize: def.size(),
            fields,
        })
    }

    /// Renders the descriptor in numpy's explicit-offsets form:
    /// `{'names':[..], 'formats':[..], 'offsets':[..], 'itemsize':N}`.
    pub fn format(&self) -> String {
        let names: Vec<String> = self.fields.iter().map(|f| format!("'{}'", f.name)).collect();
        let formats: Vec<String> = self
            .fields
            .iter()
            .map(|f| match &f.code {
                PrimitiveCode::Record(_) => f.format(),
                _ if f.length > 1 => f.format(),
                _ => format!("'{}'", f.format()),
            })
            .collect();
        let offsets: Vec<String> = self.fields.iter().map(|f| f.offset.to_string()).collect();

        format!(
            "{{'names':[{}], 'formats':[{}], 'offsets':[{}], 'itemsize':{}}}",
            names.join(","),
            formats.join(","),
            offsets.join(","),
            self.itemsize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{bitfield::BitfieldDef, enumeration::EnumDef};

    #[test]
    fn test_integers_with_padding() {
        let mut def = StructDef::with_options(Default::default()).unwrap();
        def.add("uint8", "a", 1).unwrap();
        def.add("int32", "b", 1).unwrap();
        def.add("uint16", "c", 3).unwrap();
        let desc = RecordDescriptor::from_struct(&def).unwrap();

        assert_eq!(desc.itemsize, 16);
        let names: Vec<_> = desc.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(desc.fields[1].offset, 4);
        assert_eq!(desc.fields[1].code, PrimitiveCode::Int(4));
        assert_eq!(desc.fields[2].length, 3);
    }

    #[test]
    fn test_format() {
        let mut def = StructDef::new(ByteOrder::Little);
        def.add("uint8", "a", 1).unwrap();
        def.add("uint16", "b", 1).unwrap();
        def.add("utf-8", "name", 4).unwrap();
        def.add("float32", "v", 2).unwrap();
        let desc = RecordDescriptor::from_struct(&def).unwrap();
        assert_eq!(
            desc.format(),
            "{'names':['a','b','name','v'], 'formats':['|u1','<u2','|S4',('<f4', (2,))], \
             'offsets':[0,2,4,8], 'itemsize':16}"
        );
    }

    #[test]
    fn test_nested_and_enum() {
        let mut inner = StructDef::new(ByteOrder::Big);
        inner.add("int16", "x", 1).unwrap();
        let mut color = EnumDef::new(ByteOrder::Big);
        color.add("red", 0).unwrap();
        color.add("blue", 300).unwrap();

        let mut outer = StructDef::new(ByteOrder::Big);
        outer.add(color, "color", 1).unwrap();
        outer.add(inner, "pos", 1).unwrap();
        let desc = RecordDescriptor::from_struct(&outer).unwrap();

        assert_eq!(desc.fields[0].code, PrimitiveCode::UInt(2));
        assert_eq!(desc.fields[0].format(), ">u2");
        let PrimitiveCode::Record(nested) = &desc.fields[1].code else {
            panic!("nested struct is a record");
        };
        assert_eq!(nested.itemsize, 2);
        assert_eq!(
            desc.format(),
            "{'names':['color','pos'], 'formats':['>u2',{'names':['x'], 'formats':['>i2'], \
             'offsets':[0], 'itemsize':2}], 'offsets':[0,2], 'itemsize':4}"
        );
    }

    #[test]
    fn test_rejections() {
        let mut union = StructDef::new_union(ByteOrder::Little);
        union.add("uint8", "a", 1).unwrap();
        assert_eq!(RecordDescriptor::from_struct(&union), Err(RecordError::Union));

        let mut bits = BitfieldDef::new(ByteOrder::Little);
        bits.add("flag", 1).unwrap();
        let mut def = StructDef::new(ByteOrder::Little);
        def.add(bits, "flags", 1).unwrap();
        assert_eq!(
            RecordDescriptor::from_struct(&def),
            Err(RecordError::Bitfield("flags".to_string()))
        );

        let mut def = StructDef::new(ByteOrder::Little);
        def.add("bool8", "ok", 1).unwrap();
        def.add("bool32", "wide", 1).unwrap();
        assert_eq!(
            RecordDescriptor::from_struct(&def),
            Err(RecordError::WideBool {
                field: "wide".to_string(),
                size: 4
            })
        );
    }

    #[test]
    fn test_nested_union_rejected() {
        let mut union = StructDef::new_union(ByteOrder::Little);
        union.add("uint32", "word", 1).unwrap();
        let mut def = StructDef::new(ByteOrder::Little);
        def.add(union, "u", 1).unwrap();
        assert_eq!(RecordDescriptor::from_struct(&def), Err(RecordError::Union));
    }
}
