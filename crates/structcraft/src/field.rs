//! Fields of a [crate::StructDef] and their placement.

use std::sync::Arc;

use crate::node::TypeNode;

/// Name prefix reserved for synthetic padding fields.
pub const PADDING_PREFIX: &str = "__pad";

/// A single placed field: a scalar or a fixed-length array of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) ty: Arc<TypeNode>,
    /// 1 for scalars, the element count for arrays.
    pub(crate) length: usize,
    /// Byte offset from the start of the enclosing struct.
    pub(crate) offset: usize,
    /// Synthetic padding: occupies space, always zero, hidden from values.
    pub(crate) is_padding: bool,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeNode {
        &self.ty
    }

    /// The shared type definition, for reuse in another struct.
    pub fn shared_ty(&self) -> Arc<TypeNode> {
        Arc::clone(&self.ty)
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_array(&self) -> bool {
        self.length > 1
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_padding(&self) -> bool {
        self.is_padding
    }

    /// Bytes occupied by all elements.
    pub fn size(&self) -> usize {
        self.ty.size() * self.length
    }

    /// Offset of element `index` relative to the field start.
    pub fn element_offset(&self, index: usize) -> usize {
        index * self.ty.size()
    }
}
