//! # structcraft
//!
//! C-compatible memory layouts described at runtime.
//!
//! Build a [`StructDef`] by adding fields (primitive tags, strings, enums, bitfields, nested
//! structs and unions, fixed arrays of any of these), and the definition computes offsets,
//! padding and alignment the way a C compiler does, including `pack` overrides. The definition
//! then converts between bytes and values in two ways:
//!
//! - eagerly, with [`StructDef::serialize`] and [`StructDef::deserialize`] over a [`Record`];
//! - lazily, with a [`View`] from [`StructDef::instance_from`] that decodes or encodes one field
//!   at a time directly in the buffer.
//!
//! Definitions can also be compiled from [`SchemaDecl`] declarations (readable from JSON with the
//! `serde` feature), and non-union layouts describe themselves as a [`RecordDescriptor`] for
//! structured-array libraries.
//!
//! ## Example
//!
//! ```
//! use structcraft::{ByteOrder, StructDef, Value, record};
//!
//! let mut color = StructDef::new(ByteOrder::Little);
//! for name in ["r", "g", "b", "a"] {
//!     color.add("uint8", name, 1).unwrap();
//! }
//!
//! let mut pixel = StructDef::new(ByteOrder::Little);
//! pixel.add("uint16", "x", 1).unwrap();
//! pixel.add(color, "color", 1).unwrap();
//! assert_eq!(pixel.size(), 6);
//!
//! let bytes = pixel
//!     .serialize(&record! { "x" => 3u16, "color" => record! { "g" => 0x80u8 } })
//!     .unwrap();
//! assert_eq!(bytes, [3, 0, 0, 0x80, 0, 0]);
//!
//! let view = pixel.instance_from(&bytes).unwrap();
//! assert_eq!(view.child("color").unwrap().value("g").unwrap(), Value::UInt(0x80));
//! ```

pub mod basic;
pub mod bitfield;
pub mod bits;
pub mod byteorder;
pub mod declarative;
pub mod enumeration;
pub mod errors;
pub mod field;
pub mod node;
pub mod record;
pub mod string;
pub mod structdef;
pub mod value;
pub mod view;

pub use basic::{BasicTypeDef, Primitive};
pub use bitfield::BitfieldDef;
pub use byteorder::ByteOrder;
pub use declarative::{BitfieldDecl, DeclError, DeclValue, EnumDecl, SchemaDecl, StructDecl, TypeDecl};
pub use enumeration::EnumDef;
pub use errors::{CodecError, FormatError, RangeError, SchemaError};
pub use field::Field;
pub use node::{TypeNode, TypeSpec};
pub use record::{PrimitiveCode, RecordDescriptor, RecordError, RecordField};
pub use string::StringDef;
pub use structdef::{StructDef, StructOptions};
pub use value::{Record, Value};
pub use view::{Access, ArrayView, BitfieldView, View};
