//! Decoded value tree produced by `deserialize` and consumed by `serialize`.

use indexmap::IndexMap;

/// Field name to value mapping of a decoded struct, union or bitfield, in declaration order.
pub type Record = IndexMap<String, Value>;

/// A value read from or written to a buffer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Value {
    Bool(bool),
    /// Signed integers, signed bitfield members and signed enum passthrough.
    Int(i64),
    /// Unsigned integers, unsigned bitfield members and unsigned enum passthrough.
    UInt(u64),
    Float(f64),
    /// Fixed-length strings and enum symbols.
    Str(String),
    /// Nested struct, union or bitfield.
    Struct(Record),
    Array(Vec<Value>),
}

impl Value {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "signed integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Struct(_) => "mapping",
            Value::Array(_) => "sequence",
        }
    }

    /// Integer view of `Bool`, `Int` and `UInt` values.
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Value::Bool(b) => Some(b as i128),
            Value::Int(i) => Some(i as i128),
            Value::UInt(u) => Some(u as i128),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($variant:ident, $target:ty, $($t:ty),+) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v as $target)
            }
        })+
    };
}

impl_from!(Int, i64, i8, i16, i32, i64);
impl_from!(UInt, u64, u8, u16, u32, u64);
impl_from!(Float, f64, f32, f64);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Struct(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

/// Builds a [`Record`] from `name => value` pairs.
///
/// ```
/// use structcraft::{record, value::Value};
///
/// let color = record! { "r" => 1u8, "g" => 2u8 };
/// assert_eq!(color["g"], Value::UInt(2));
/// ```
#[macro_export]
macro_rules! record {
    ($($name:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::value::Record::new();
        $(map.insert(::std::string::String::from($name), $crate::value::Value::from($value));)*
        map
    }};
}
