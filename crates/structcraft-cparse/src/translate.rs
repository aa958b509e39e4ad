//! Translation of castxml output into structcraft definitions.
//!
//! castxml describes every declaration as a flat list of XML elements linked by `id`
//! attributes. Composites (`Struct`, `Union`) list their `Field` ids in `members`; a field's
//! `type` points at a `FundamentalType`, `PointerType`, `ArrayType` or another composite,
//! possibly through `Typedef`, `ElaboratedType` and `CvQualifiedType` indirections.
//!
//! A composite that cannot be expressed is logged and left out, together with every composite
//! that embeds it. The rest of the header still translates.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    str::FromStr,
    sync::Arc,
};

use roxmltree::{Document, Node};
use structcraft::{
    BitfieldDef, ByteOrder, EnumDef, SchemaError, StructDef, StructOptions, TypeNode, TypeSpec,
};

use crate::errors::{CParseError, Unsupported};

/// Translates castxml XML (`--castxml-output=1`) into definitions keyed by type name.
///
/// Structs, unions, enumerations and structs made only of bit members (as bitfields) are
/// returned. Anonymous types are named after their typedef, or `anonymous_N`.
pub fn translate_xml(
    xml: &str,
    byteorder: ByteOrder,
) -> Result<BTreeMap<String, TypeNode>, CParseError> {
    let doc = Document::parse(xml)?;
    Ok(Translator::new(&doc, byteorder).translate())
}

/// Resolved type of a struct member.
enum MemberType<'a> {
    /// Primitive tag, or `utf-8` for character arrays.
    Tag(String),
    /// Id of a composite or enumeration element.
    Reference(&'a str),
}

struct Translator<'a, 'input> {
    roots: Vec<Node<'a, 'input>>,
    elements: HashMap<&'a str, Node<'a, 'input>>,
    names: HashMap<&'a str, String>,
    byteorder: ByteOrder,
    anonymous_count: usize,
    built: HashMap<&'a str, Result<Arc<TypeNode>, Unsupported>>,
    in_progress: HashSet<&'a str>,
}

impl<'a, 'input> Translator<'a, 'input> {
    fn new(doc: &'a Document<'input>, byteorder: ByteOrder) -> Self {
        let roots: Vec<_> = doc.root_element().children().filter(Node::is_element).collect();
        let elements = roots
            .iter()
            .filter_map(|node| node.attribute("id").map(|id| (id, *node)))
            .collect();

        Self {
            roots,
            elements,
            names: HashMap::new(),
            byteorder,
            anonymous_count: 0,
            built: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    fn translate(&mut self) -> BTreeMap<String, TypeNode> {
        let mut declared = Vec::new();
        for node in self.roots.clone() {
            if !matches!(node.tag_name().name(), "Struct" | "Union" | "Enumeration") {
                continue;
            }
            if node.attribute("incomplete") == Some("1") {
                continue;
            }
            let Some(id) = node.attribute("id") else {
                continue;
            };
            let name = self.type_name(node, id);
            self.names.insert(id, name.clone());
            declared.push((id, name));
        }

        let mut result = BTreeMap::new();
        for (id, name) in declared {
            match self.build(id) {
                Ok(node) => {
                    tracing::debug!(name = %name, kind = node.kind_name(), size = node.size(), "type translated");
                    result.insert(name, Arc::unwrap_or_clone(node));
                }
                Err(reason) => {
                    tracing::warn!(name = %name, %reason, "type is not supported and will be ignored");
                }
            }
        }
        result
    }

    /// Declared name, else the name of a typedef for it, else a fresh `anonymous_N`.
    fn type_name(&mut self, node: Node<'a, 'input>, id: &str) -> String {
        if let Some(name) = node.attribute("name").filter(|name| !name.is_empty()) {
            return name.to_string();
        }

        let typedef_of = |target: &str| {
            self.roots
                .iter()
                .find(|n| n.has_tag_name("Typedef") && n.attribute("type") == Some(target))
                .and_then(|n| n.attribute("name"))
        };
        let typedef = typedef_of(id).or_else(|| {
            self.roots
                .iter()
                .filter(|n| n.has_tag_name("ElaboratedType") && n.attribute("type") == Some(id))
                .filter_map(|n| n.attribute("id"))
                .find_map(typedef_of)
        });

        match typedef {
            Some(name) => name.to_string(),
            None => {
                let name = format!("anonymous_{}", self.anonymous_count);
                self.anonymous_count += 1;
                name
            }
        }
    }

    fn display_name(&self, id: &str) -> String {
        self.names.get(id).cloned().unwrap_or_else(|| id.to_string())
    }

    fn element(&self, id: &str) -> Result<Node<'a, 'input>, Unsupported> {
        self.elements
            .get(id)
            .copied()
            .ok_or_else(|| Unsupported::MissingElement(id.to_string()))
    }

    /// Follows typedefs, elaborated and cv-qualified types to the underlying element.
    fn unwrap_aliases(&self, type_id: &str) -> Result<Node<'a, 'input>, Unsupported> {
        let mut elem = self.element(type_id)?;
        for _ in 0..=self.elements.len() {
            if !matches!(
                elem.tag_name().name(),
                "Typedef" | "ElaboratedType" | "CvQualifiedType"
            ) {
                return Ok(elem);
            }
            elem = self.element(attr(elem, "type")?)?;
        }
        Err(Unsupported::Recursive)
    }

    /// Memoized translation of a composite or enumeration.
    fn build(&mut self, id: &'a str) -> Result<Arc<TypeNode>, Unsupported> {
        if let Some(done) = self.built.get(id) {
            return done.clone();
        }
        if !self.in_progress.insert(id) {
            return Err(Unsupported::Recursive);
        }

        let result = self.element(id).and_then(|node| {
            let built: TypeNode = match node.tag_name().name() {
                "Enumeration" => self.build_enum(node)?.into(),
                "Struct" | "Union" => self.build_composite(node, id)?,
                other => return Err(Unsupported::ElementKind(other.to_string())),
            };
            Ok(Arc::new(built))
        });

        self.in_progress.remove(id);
        self.built.insert(id, result.clone());
        result
    }

    fn build_enum(&self, node: Node<'a, 'input>) -> Result<EnumDef, Unsupported> {
        let size = byte_size(node)?;
        let values = node
            .children()
            .filter(|c| c.has_tag_name("EnumValue"))
            .map(|c| -> Result<(&'a str, i128), Unsupported> {
                Ok((attr(c, "name")?, number(attr(c, "init")?)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let signed = values.iter().any(|(_, value)| *value < 0);
        let mut def = EnumDef::with_size(size, signed, self.byteorder)?;
        for (name, value) in values {
            def.add(name, value)?;
        }
        Ok(def)
    }

    fn build_composite(
        &mut self,
        node: Node<'a, 'input>,
        id: &str,
    ) -> Result<TypeNode, Unsupported> {
        if node.attribute("incomplete") == Some("1") {
            return Err(Unsupported::Incomplete);
        }
        let union = node.has_tag_name("Union");
        let size = byte_size(node)?;
        let align = match node.attribute("align") {
            Some(bits) => (number::<usize>(bits)? / 8).max(1),
            None => 1,
        };
        let fields = self.fields(node)?;

        let bit_members = fields.iter().filter(|f| f.attribute("bits").is_some()).count();
        if bit_members > 0 {
            if union || bit_members != fields.len() {
                return Err(Unsupported::MixedBitfield);
            }
            return Ok(self.build_bitfield(&fields, size)?.into());
        }

        let mut def = StructDef::with_options(StructOptions {
            byteorder: self.byteorder,
            pack: Some(align),
            union,
        })?;
        for field in fields {
            let name = attr(field, "name")?;
            let member = |reason| Unsupported::Member {
                member: name.to_string(),
                reason: Box::new(reason),
            };

            let (ty, length) = self.member_type(attr(field, "type")?).map_err(member)?;
            let spec = match ty {
                MemberType::Tag(tag) => TypeSpec::Tag(tag),
                MemberType::Reference(ref_id) => match self.build(ref_id) {
                    Ok(node) => TypeSpec::Node(node),
                    Err(_) => return Err(member(Unsupported::Dependency(self.display_name(ref_id)))),
                },
            };
            def.add(spec, name, length).map_err(|err| member(err.into()))?;
        }

        if def.size() != size {
            return Err(SchemaError::SizeMismatch {
                name: self.display_name(id),
                computed: def.size(),
                expected: size,
            }
            .into());
        }
        Ok(def.into())
    }

    fn build_bitfield(&self, fields: &[Node<'a, 'input>], size: usize) -> Result<BitfieldDef, Unsupported> {
        let mut def = BitfieldDef::with_size(size, self.byteorder)?;
        for field in fields {
            let name = attr(*field, "name")?;
            let member = |reason| Unsupported::Member {
                member: name.to_string(),
                reason: Box::new(reason),
            };
            let bits = number::<usize>(attr(*field, "bits")?)?;
            let signed = self.is_signed(attr(*field, "type")?).map_err(member)?;

            let added = if signed {
                def.add_signed(name, bits)
            } else {
                def.add(name, bits)
            };
            added.map_err(|err| member(err.into()))?;
        }
        Ok(def)
    }

    /// `Field` elements listed in a composite's `members`, skipping nested declarations.
    fn fields(&self, node: Node<'a, 'input>) -> Result<Vec<Node<'a, 'input>>, Unsupported> {
        let mut fields = Vec::new();
        for member_id in node.attribute("members").unwrap_or("").split_whitespace() {
            let member = self.element(member_id)?;
            if member.has_tag_name("Field") {
                fields.push(member);
            }
        }
        Ok(fields)
    }

    fn member_type(&self, type_id: &str) -> Result<(MemberType<'a>, usize), Unsupported> {
        let mut elem = self.unwrap_aliases(type_id)?;
        let mut length = 1;
        if elem.has_tag_name("ArrayType") {
            let min = number::<i64>(attr(elem, "min")?)?;
            let max_text = attr(elem, "max")?;
            let max = number::<i64>(max_text)?;
            length = usize::try_from(max - min + 1)
                .map_err(|_| Unsupported::InvalidNumber(max_text.to_string()))?;

            elem = self.unwrap_aliases(attr(elem, "type")?)?;
            if elem.has_tag_name("ArrayType") {
                return Err(Unsupported::NestedArray);
            }
        }

        let ty = match elem.tag_name().name() {
            "FundamentalType" => MemberType::Tag(fundamental_tag(elem, length)?),
            "PointerType" => MemberType::Tag(format!("uint{}", attr(elem, "size")?)),
            "Struct" | "Union" | "Enumeration" => MemberType::Reference(attr(elem, "id")?),
            other => return Err(Unsupported::ElementKind(other.to_string())),
        };
        Ok((ty, length))
    }

    /// Signedness of a bit member's declared type.
    fn is_signed(&self, type_id: &str) -> Result<bool, Unsupported> {
        let elem = self.unwrap_aliases(type_id)?;
        match elem.tag_name().name() {
            "FundamentalType" => {
                let name = attr(elem, "name")?;
                Ok(!name.contains("unsigned") && !is_bool(name))
            }
            "Enumeration" => Ok(false),
            other => Err(Unsupported::ElementKind(other.to_string())),
        }
    }
}

fn attr<'a>(node: Node<'a, '_>, attribute: &'static str) -> Result<&'a str, Unsupported> {
    node.attribute(attribute)
        .ok_or_else(|| Unsupported::MissingAttribute {
            id: node.attribute("id").unwrap_or_default().to_string(),
            attribute,
        })
}

fn number<T: FromStr>(text: &str) -> Result<T, Unsupported> {
    text.trim()
        .parse()
        .map_err(|_| Unsupported::InvalidNumber(text.to_string()))
}

/// The `size` attribute, given in bits, as bytes.
fn byte_size(node: Node<'_, '_>) -> Result<usize, Unsupported> {
    let text = attr(node, "size")?;
    let bits = number::<usize>(text)?;
    if bits % 8 != 0 {
        return Err(Unsupported::InvalidNumber(text.to_string()));
    }
    Ok(bits / 8)
}

fn is_bool(name: &str) -> bool {
    name == "_Bool" || name == "bool"
}

/// Primitive tag for a fundamental type. Plain `char` arrays are text.
fn fundamental_tag(elem: Node<'_, '_>, length: usize) -> Result<String, Unsupported> {
    let name = attr(elem, "name")?;
    let size = elem
        .attribute("size")
        .ok_or_else(|| Unsupported::Fundamental(name.to_string()))?;

    Ok(if name.contains("float") || name.contains("double") {
        format!("float{size}")
    } else if name == "char" && length > 1 {
        format!("utf-{size}")
    } else if is_bool(name) {
        format!("bool{size}")
    } else if name.contains("unsigned") {
        format!("uint{size}")
    } else {
        format!("int{size}")
    })
}
