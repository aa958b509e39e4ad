//! Error types for schema construction, value encoding and buffer decoding.

use thiserror::Error;

/// Errors produced while building a definition (`add` calls and options).
///
/// A failing registration never modifies the definition it was called on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Field or member name is empty.
    #[error("field name must not be empty")]
    EmptyName,
    /// Field or member name is already registered.
    #[error("duplicate field name `{0}`")]
    DuplicateName(String),
    /// Field name collides with a name reserved for synthetic padding.
    #[error("field name `{0}` is reserved")]
    ReservedName(String),
    /// Primitive type tag is not known.
    #[error("unsupported type `{0}`")]
    UnsupportedType(String),
    /// Array length is zero.
    #[error("array length of `{0}` must be at least 1")]
    InvalidLength(String),
    /// The element type cannot be repeated as an array.
    #[error("arrays of {kind} are not supported (field `{name}`)")]
    UnsupportedArray { name: String, kind: &'static str },
    /// Pack value is zero or not a power of two.
    #[error("invalid pack value {0}, expected a power of two")]
    InvalidPack(usize),
    /// Size is not one of the supported widths for this kind.
    #[error("invalid size {size} for {kind}")]
    InvalidSize { kind: &'static str, size: usize },
    /// Bit width is zero or wider than 64 bits.
    #[error("invalid bit width {bits} for `{name}`")]
    InvalidBitWidth { name: String, bits: usize },
    /// Bitfield members no longer fit the container.
    #[error("bitfield member `{name}` needs {needed} bits, container holds {capacity}")]
    CapacityOverflow {
        name: String,
        needed: usize,
        capacity: usize,
    },
    /// Enum value does not fit the configured underlying integer.
    #[error("enum value {value} of `{name}` does not fit the underlying integer")]
    EnumValueOutOfRange { name: String, value: i128 },
    /// Adding the field would push the struct size past `usize::MAX`.
    #[error("field `{name}` overflows the addressable struct size")]
    SizeOverflow { name: String },
    /// Computed layout disagrees with an externally reported one.
    #[error("`{name}` computes {computed} bytes but {expected} were expected")]
    SizeMismatch {
        name: String,
        computed: usize,
        expected: usize,
    },
}

/// Errors produced when a value cannot be represented by its type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// Integer does not fit the signed/unsigned width.
    #[error("{value} does not fit a {bits}-bit {signedness} integer")]
    Integer {
        value: i128,
        bits: usize,
        signedness: &'static str,
    },
    /// Finite float is beyond the target precision's range.
    #[error("{value} does not fit a {bits}-bit float")]
    Float { value: String, bits: usize },
    /// Encoded string is longer than the fixed field length.
    #[error("string of {len} bytes exceeds fixed length {max}")]
    StringTooLong { len: usize, max: usize },
    /// Bitfield member value exceeds its bit width.
    #[error("{value} does not fit {bits}-bit member `{name}`")]
    BitfieldValue {
        name: String,
        value: i128,
        bits: usize,
    },
    /// More array elements than the field declares.
    #[error("array `{name}` holds {max} elements, got {len}")]
    ArrayTooLong { name: String, len: usize, max: usize },
}

/// Errors produced by malformed input: short buffers, bad text, unknown names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// Buffer is shorter than the definition's size.
    #[error("buffer of {actual} bytes is shorter than the required {needed}")]
    BufferTooShort { needed: usize, actual: usize },
    /// Bytes of a string field are not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    /// Key does not name a (non-padding) field.
    #[error("unknown field `{0}`")]
    UnknownField(String),
    /// Symbol is not registered in the enum.
    #[error("unknown enum symbol `{0}`")]
    UnknownSymbol(String),
    /// Byte order tag is not `native`, `little` or `big`.
    #[error("invalid byte order `{0}`")]
    InvalidByteOrder(String),
    /// Value kind does not match the field type.
    #[error("expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// Array index past the end of an array field.
    #[error("index {index} out of range for array of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors produced by encoding operations (`serialize`, view writes).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

pub(crate) fn type_mismatch(expected: &'static str, actual: &crate::value::Value) -> FormatError {
    FormatError::TypeMismatch {
        expected,
        actual: actual.kind_name(),
    }
}
