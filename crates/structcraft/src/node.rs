//! The closed set of type definitions a field can hold.

use std::sync::Arc;

use crate::{
    basic::BasicTypeDef,
    bitfield::BitfieldDef,
    enumeration::EnumDef,
    errors::{CodecError, FormatError},
    string::StringDef,
    structdef::StructDef,
    value::Value,
};

/// Any definition that knows its size, alignment and how to encode and decode itself.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    Basic(BasicTypeDef),
    String(StringDef),
    Enum(EnumDef),
    Bitfield(BitfieldDef),
    Struct(StructDef),
}

impl TypeNode {
    pub fn size(&self) -> usize {
        match self {
            TypeNode::Basic(t) => t.size(),
            TypeNode::String(t) => t.size(),
            TypeNode::Enum(t) => t.size(),
            TypeNode::Bitfield(t) => t.size(),
            TypeNode::Struct(t) => t.size(),
        }
    }

    pub fn alignment(&self) -> usize {
        match self {
            TypeNode::Basic(t) => t.alignment(),
            TypeNode::String(t) => t.alignment(),
            TypeNode::Enum(t) => t.alignment(),
            TypeNode::Bitfield(t) => t.alignment(),
            TypeNode::Struct(t) => t.alignment(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeNode::Basic(_) => "basic type",
            TypeNode::String(_) => "string",
            TypeNode::Enum(_) => "enum",
            TypeNode::Bitfield(_) => "bitfield",
            TypeNode::Struct(t) if t.is_union() => "union",
            TypeNode::Struct(_) => "struct",
        }
    }

    /// Value decoded from an all-zero buffer.
    pub fn zero_value(&self) -> Value {
        match self {
            TypeNode::Basic(t) => t.zero_value(),
            TypeNode::String(t) => t.zero_value(),
            TypeNode::Enum(t) => t.zero_value(),
            TypeNode::Bitfield(t) => t.zero_value(),
            TypeNode::Struct(t) => Value::Struct(t.create_empty_data()),
        }
    }

    /// Encodes `value` into exactly [`size`](Self::size) bytes.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; self.size()];
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    /// Encodes `value` over the first [`size`](Self::size) bytes of `out`.
    ///
    /// `out` must hold at least `size()` bytes.
    pub(crate) fn encode_into(&self, value: &Value, out: &mut [u8]) -> Result<(), CodecError> {
        match self {
            TypeNode::Basic(t) => t.encode_into(value, out),
            TypeNode::String(t) => t.encode_into(value, out),
            TypeNode::Enum(t) => t.encode_into(value, out),
            TypeNode::Bitfield(t) => t.encode_into(value, out),
            TypeNode::Struct(t) => t.encode_into(value, out),
        }
    }

    pub fn decode(&self, data: &[u8]) -> Result<Value, FormatError> {
        match self {
            TypeNode::Basic(t) => t.decode(data),
            TypeNode::String(t) => t.decode(data),
            TypeNode::Enum(t) => t.decode(data),
            TypeNode::Bitfield(t) => t.decode(data),
            TypeNode::Struct(t) => t.decode(data),
        }
    }
}

macro_rules! impl_from_def {
    ($($variant:ident($def:ty)),+) => {
        $(impl From<$def> for TypeNode {
            fn from(def: $def) -> Self {
                TypeNode::$variant(def)
            }
        })+
    };
}

impl_from_def!(
    Basic(BasicTypeDef),
    String(StringDef),
    Enum(EnumDef),
    Bitfield(BitfieldDef),
    Struct(StructDef)
);

/// Type argument of [`StructDef::add`]: a primitive tag or an already built definition.
#[derive(Debug, Clone)]
pub enum TypeSpec {
    /// Primitive tag such as `uint8` or `double`; `utf-8` declares a string whose length is the
    /// field length.
    Tag(String),
    Node(Arc<TypeNode>),
}

impl From<&str> for TypeSpec {
    fn from(tag: &str) -> Self {
        TypeSpec::Tag(tag.to_string())
    }
}

impl From<String> for TypeSpec {
    fn from(tag: String) -> Self {
        TypeSpec::Tag(tag)
    }
}

impl From<Arc<TypeNode>> for TypeSpec {
    fn from(node: Arc<TypeNode>) -> Self {
        TypeSpec::Node(node)
    }
}

impl From<TypeNode> for TypeSpec {
    fn from(node: TypeNode) -> Self {
        TypeSpec::Node(Arc::new(node))
    }
}

macro_rules! impl_spec_from_def {
    ($($def:ty),+) => {
        $(impl From<$def> for TypeSpec {
            fn from(def: $def) -> Self {
                TypeSpec::Node(Arc::new(def.into()))
            }
        })+
    };
}

impl_spec_from_def!(BasicTypeDef, StringDef, EnumDef, BitfieldDef, StructDef);

impl From<&StructDef> for TypeSpec {
    fn from(def: &StructDef) -> Self {
        def.clone().into()
    }
}
