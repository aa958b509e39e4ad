//! Declarative schema descriptions.
//!
//! A [`SchemaDecl`] lists named struct, enum and bitfield declarations. Struct fields refer to
//! primitive tags or to types declared earlier in the list, optionally with an `[N]` suffix for
//! arrays (`"Color[10]"`, `"uint16[4]"`, `"utf-8[16]"` for a 16 byte string). With the `serde`
//! feature the declarations can be read from any serde format, for example a JSON schema file
//! shipped with an application:
//!
//! ```json
//! { "types": [
//!     { "kind": "struct", "name": "Color", "fields": [
//!         { "name": "r", "type": "uint8" }, { "name": "g", "type": "uint8" } ] },
//!     { "kind": "struct", "name": "Palette", "byteorder": "little", "fields": [
//!         { "name": "colors", "type": "Color[16]" } ] }
//! ] }
//! ```
//!
//! Struct declarations are packed (`pack` 1) unless they say otherwise; `"pack": null` selects
//! natural alignment.

use std::{collections::BTreeMap, sync::Arc};

use thiserror::Error;

use crate::{
    bitfield::BitfieldDef,
    byteorder::ByteOrder,
    enumeration::EnumDef,
    errors::SchemaError,
    node::{TypeNode, TypeSpec},
    structdef::{StructDef, StructOptions},
};

/// Errors produced when compiling declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclError {
    /// Enum values and bit widths must be integers.
    #[error("`{owner}.{member}` must be an integer, got {actual}")]
    NotAnInteger {
        owner: String,
        member: String,
        actual: &'static str,
    },
    /// Field refers to a name that is neither a primitive nor declared earlier.
    #[error("`{owner}.{field}` refers to unknown type `{reference}`")]
    UnknownType {
        owner: String,
        field: String,
        reference: String,
    },
    /// Malformed `Name[N]` reference.
    #[error("invalid type reference `{0}`")]
    InvalidReference(String),
    /// Two declarations share a name.
    #[error("type `{0}` is declared twice")]
    DuplicateType(String),
    /// A declaration was rejected by its definition.
    #[error("`{owner}`: {source}")]
    Schema { owner: String, source: SchemaError },
}

/// A literal in a declaration. Only integers are valid enum values and bit widths; the other
/// variants exist so that malformed input is reported instead of silently coerced.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum DeclValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl DeclValue {
    fn kind_name(&self) -> &'static str {
        match self {
            DeclValue::Int(_) => "integer",
            DeclValue::Float(_) => "float",
            DeclValue::Text(_) => "string",
            DeclValue::Bool(_) => "bool",
        }
    }

    fn integer(&self, owner: &str, member: &str) -> Result<i64, DeclError> {
        match self {
            DeclValue::Int(v) => Ok(*v),
            other => Err(DeclError::NotAnInteger {
                owner: owner.to_string(),
                member: member.to_string(),
                actual: other.kind_name(),
            }),
        }
    }
}

impl From<i64> for DeclValue {
    fn from(v: i64) -> Self {
        DeclValue::Int(v)
    }
}

impl From<i32> for DeclValue {
    fn from(v: i32) -> Self {
        DeclValue::Int(v as i64)
    }
}

impl From<f64> for DeclValue {
    fn from(v: f64) -> Self {
        DeclValue::Float(v)
    }
}

impl From<&str> for DeclValue {
    fn from(v: &str) -> Self {
        DeclValue::Text(v.to_string())
    }
}

impl From<bool> for DeclValue {
    fn from(v: bool) -> Self {
        DeclValue::Bool(v)
    }
}

/// Ordered list of declarations; later entries may refer to earlier ones.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchemaDecl {
    pub types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum TypeDecl {
    Struct(StructDecl),
    Enum(EnumDecl),
    Bitfield(BitfieldDecl),
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Struct(d) => &d.name,
            TypeDecl::Enum(d) => &d.name,
            TypeDecl::Bitfield(d) => &d.name,
        }
    }
}

#[cfg(feature = "serde")]
fn default_pack() -> Option<usize> {
    Some(1)
}

/// A struct or union declaration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructDecl {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub byteorder: ByteOrder,
    #[cfg_attr(feature = "serde", serde(default = "default_pack"))]
    pub pack: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub union: bool,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldDecl {
    pub name: String,
    /// Primitive tag or declared name, with an optional `[N]` suffix.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumDecl {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub byteorder: ByteOrder,
    /// Fixed underlying size in bytes; grows with the values when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub size: Option<usize>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub signed: bool,
    pub members: Vec<MemberDecl>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberDecl {
    pub name: String,
    pub value: DeclValue,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitfieldDecl {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub byteorder: ByteOrder,
    /// Fixed container size in bytes; grows with the members when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub size: Option<usize>,
    pub members: Vec<BitDecl>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BitDecl {
    pub name: String,
    pub bits: DeclValue,
    #[cfg_attr(feature = "serde", serde(default))]
    pub signed: bool,
}

impl StructDecl {
    /// Packed struct declaration with native byte order.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            byteorder: ByteOrder::Native,
            pack: Some(1),
            union: false,
            fields: Vec::new(),
        }
    }

    pub fn byteorder(mut self, byteorder: ByteOrder) -> Self {
        self.byteorder = byteorder;
        self
    }

    pub fn pack(mut self, pack: Option<usize>) -> Self {
        self.pack = pack;
        self
    }

    pub fn union(mut self) -> Self {
        self.union = true;
        self
    }

    pub fn field(mut self, name: &str, ty: &str) -> Self {
        self.fields.push(FieldDecl {
            name: name.to_string(),
            ty: ty.to_string(),
        });
        self
    }

    /// Builds the definition, resolving references through `known`.
    pub fn compile(&self, known: &BTreeMap<String, Arc<TypeNode>>) -> Result<StructDef, DeclError> {
        let schema_err = |source| DeclError::Schema {
            owner: self.name.clone(),
            source,
        };
        let mut def = StructDef::with_options(StructOptions {
            byteorder: self.byteorder,
            pack: self.pack,
            union: self.union,
        })
        .map_err(schema_err)?;

        for field in &self.fields {
            let (reference, length) = parse_type_ref(&field.ty)?;
            let spec = match known.get(reference) {
                Some(node) => TypeSpec::Node(Arc::clone(node)),
                None => TypeSpec::Tag(reference.to_string()),
            };
            def.add(spec, &field.name, length).map_err(|err| match err {
                SchemaError::UnsupportedType(_) => DeclError::UnknownType {
                    owner: self.name.clone(),
                    field: field.name.clone(),
                    reference: reference.to_string(),
                },
                other => schema_err(other),
            })?;
        }
        Ok(def)
    }
}

impl EnumDecl {
    /// Unsigned, automatically sized enum declaration.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            byteorder: ByteOrder::Native,
            size: None,
            signed: false,
            members: Vec::new(),
        }
    }

    pub fn member(mut self, name: &str, value: impl Into<DeclValue>) -> Self {
        self.members.push(MemberDecl {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn compile(&self) -> Result<EnumDef, DeclError> {
        let schema_err = |source| DeclError::Schema {
            owner: self.name.clone(),
            source,
        };
        let mut def = match self.size {
            Some(size) => EnumDef::with_size(size, self.signed, self.byteorder).map_err(schema_err)?,
            None if self.signed => EnumDef::new_signed(self.byteorder),
            None => EnumDef::new(self.byteorder),
        };

        for member in &self.members {
            let value = member.value.integer(&self.name, &member.name)?;
            def.add(&member.name, value).map_err(schema_err)?;
        }
        Ok(def)
    }
}

impl BitfieldDecl {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            byteorder: ByteOrder::Native,
            size: None,
            members: Vec::new(),
        }
    }

    pub fn member(mut self, name: &str, bits: impl Into<DeclValue>) -> Self {
        self.members.push(BitDecl {
            name: name.to_string(),
            bits: bits.into(),
            signed: false,
        });
        self
    }

    pub fn compile(&self) -> Result<BitfieldDef, DeclError> {
        let schema_err = |source| DeclError::Schema {
            owner: self.name.clone(),
            source,
        };
        let mut def = match self.size {
            Some(size) => BitfieldDef::with_size(size, self.byteorder).map_err(schema_err)?,
            None => BitfieldDef::new(self.byteorder),
        };

        for member in &self.members {
            let bits = member.bits.integer(&self.name, &member.name)?;
            let bits = usize::try_from(bits).map_err(|_| {
                schema_err(SchemaError::InvalidBitWidth {
                    name: member.name.clone(),
                    bits: 0,
                })
            })?;
            let added = if member.signed {
                def.add_signed(&member.name, bits)
            } else {
                def.add(&member.name, bits)
            };
            added.map_err(schema_err)?;
        }
        Ok(def)
    }
}

impl SchemaDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, decl: impl Into<TypeDecl>) -> Self {
        self.types.push(decl.into());
        self
    }

    /// Compiles every declaration in order into a name-keyed set of definitions.
    pub fn compile(&self) -> Result<BTreeMap<String, TypeNode>, DeclError> {
        let mut known: BTreeMap<String, Arc<TypeNode>> = BTreeMap::new();

        for decl in &self.types {
            if known.contains_key(decl.name()) {
                return Err(DeclError::DuplicateType(decl.name().to_string()));
            }
            let node: TypeNode = match decl {
                TypeDecl::Struct(d) => d.compile(&known)?.into(),
                TypeDecl::Enum(d) => d.compile()?.into(),
                TypeDecl::Bitfield(d) => d.compile()?.into(),
            };
            tracing::debug!(name = decl.name(), size = node.size(), "type declared");
            known.insert(decl.name().to_string(), Arc::new(node));
        }

        Ok(known
            .into_iter()
            .map(|(name, node)| (name, Arc::unwrap_or_clone(node)))
            .collect())
    }
}

impl From<StructDecl> for TypeDecl {
    fn from(d: StructDecl) -> Self {
        TypeDecl::Struct(d)
    }
}

impl From<EnumDecl> for TypeDecl {
    fn from(d: EnumDecl) -> Self {
        TypeDecl::Enum(d)
    }
}

impl From<BitfieldDecl> for TypeDecl {
    fn from(d: BitfieldDecl) -> Self {
        TypeDecl::Bitfield(d)
    }
}

/// Splits `Name[N]` into the name and the repetition count (1 without a suffix).
pub fn parse_type_ref(reference: &str) -> Result<(&str, usize), DeclError> {
    let invalid = || DeclError::InvalidReference(reference.to_string());
    let reference_trimmed = reference.trim();

    let Some(body) = reference_trimmed.strip_suffix(']') else {
        if reference_trimmed.is_empty() || reference_trimmed.contains('[') {
            return Err(invalid());
        }
        return Ok((reference_trimmed, 1));
    };

    let (name, count) = body.split_once('[').ok_or_else(invalid)?;
    let count: usize = count.trim().parse().map_err(|_| invalid())?;
    let name = name.trim();
    if count == 0 || name.is_empty() {
        return Err(invalid());
    }
    Ok((name, count))
}
