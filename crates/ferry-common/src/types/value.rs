//! Cell values.
//!
//! This module defines the `Value` type which represents one cell of a
//! table, either as supplied by the caller or as read back from a backend.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{FerryError, FerryResult};

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// Variable-width integer.
    Int(i64),
    /// Variable-width floating point.
    Float(f64),
    /// String value.
    String(String),
    /// Raw byte sequence.
    Bytes(Vec<u8>),
    /// Integer carrying an explicit storage width.
    FixedInt(FixedInt),
    /// Floating point carrying an explicit storage width.
    FixedFloat(FixedFloat),
    /// Opaque composite value.
    Object(ObjectValue),
}

impl Value {
    /// Creates a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Value::String(v.into())
    }

    /// Creates a byte sequence value.
    pub fn bytes(v: impl AsRef<[u8]>) -> Self {
        Value::Bytes(v.as_ref().to_vec())
    }

    /// Captures any serializable value as an opaque object.
    pub fn object<T: Serialize + ?Sized>(v: &T) -> FerryResult<Self> {
        ObjectValue::from_typed(v).map(Value::Object)
    }

    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for values SQL stores natively without encoding.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Boolean(_) | Value::Int(_) | Value::Float(_) | Value::String(_)
        )
    }

    /// Returns the boolean if this is a [`Value::Boolean`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer for `Int` and in-range `FixedInt` values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::FixedInt(i) => i.to_i64(),
            _ => None,
        }
    }

    /// Returns the float for `Float` and `FixedFloat` values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::FixedFloat(f) => Some(f.to_f64()),
            _ => None,
        }
    }

    /// Returns the string slice if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the bytes if this is a [`Value::Bytes`].
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the object if this is a [`Value::Object`].
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Returns a short name for the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::FixedInt(i) => i.type_name(),
            Value::FixedFloat(f) => f.type_name(),
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::FixedInt(i) => write!(f, "{}", i),
            Value::FixedFloat(v) => write!(f, "{}", v),
            Value::Object(o) => write!(f, "{}", o),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<FixedInt> for Value {
    fn from(v: FixedInt) -> Self {
        Value::FixedInt(v)
    }
}

impl From<FixedFloat> for Value {
    fn from(v: FixedFloat) -> Self {
        Value::FixedFloat(v)
    }
}

impl From<ObjectValue> for Value {
    fn from(v: ObjectValue) -> Self {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// An integer with an explicit storage width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedInt {
    /// 8-bit signed.
    I8(i8),
    /// 16-bit signed.
    I16(i16),
    /// 32-bit signed.
    I32(i32),
    /// 64-bit signed.
    I64(i64),
    /// 8-bit unsigned.
    U8(u8),
    /// 16-bit unsigned.
    U16(u16),
    /// 32-bit unsigned.
    U32(u32),
    /// 64-bit unsigned.
    U64(u64),
}

impl FixedInt {
    /// Widens to `i64`. Returns `None` for a `U64` above `i64::MAX`.
    pub fn to_i64(self) -> Option<i64> {
        match self {
            FixedInt::I8(v) => Some(i64::from(v)),
            FixedInt::I16(v) => Some(i64::from(v)),
            FixedInt::I32(v) => Some(i64::from(v)),
            FixedInt::I64(v) => Some(v),
            FixedInt::U8(v) => Some(i64::from(v)),
            FixedInt::U16(v) => Some(i64::from(v)),
            FixedInt::U32(v) => Some(i64::from(v)),
            FixedInt::U64(v) => i64::try_from(v).ok(),
        }
    }

    /// Returns the width name, e.g. `"int32"`.
    pub fn type_name(self) -> &'static str {
        match self {
            FixedInt::I8(_) => "int8",
            FixedInt::I16(_) => "int16",
            FixedInt::I32(_) => "int32",
            FixedInt::I64(_) => "int64",
            FixedInt::U8(_) => "uint8",
            FixedInt::U16(_) => "uint16",
            FixedInt::U32(_) => "uint32",
            FixedInt::U64(_) => "uint64",
        }
    }
}

impl fmt::Display for FixedInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedInt::I8(v) => write!(f, "{}", v),
            FixedInt::I16(v) => write!(f, "{}", v),
            FixedInt::I32(v) => write!(f, "{}", v),
            FixedInt::I64(v) => write!(f, "{}", v),
            FixedInt::U8(v) => write!(f, "{}", v),
            FixedInt::U16(v) => write!(f, "{}", v),
            FixedInt::U32(v) => write!(f, "{}", v),
            FixedInt::U64(v) => write!(f, "{}", v),
        }
    }
}

/// A floating point number with an explicit storage width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixedFloat {
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
}

impl FixedFloat {
    /// Widens to `f64`.
    pub fn to_f64(self) -> f64 {
        match self {
            FixedFloat::F32(v) => f64::from(v),
            FixedFloat::F64(v) => v,
        }
    }

    /// Returns the width name, e.g. `"float32"`.
    pub fn type_name(self) -> &'static str {
        match self {
            FixedFloat::F32(_) => "float32",
            FixedFloat::F64(_) => "float64",
        }
    }
}

impl fmt::Display for FixedFloat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedFloat::F32(v) => write!(f, "{}", v),
            FixedFloat::F64(v) => write!(f, "{}", v),
        }
    }
}

/// An opaque composite value.
///
/// Objects are captured structurally from any `Serialize` type and compared
/// by structure, never by identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectValue(serde_json::Value);

impl ObjectValue {
    /// Wraps an already structured value.
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// Captures a serializable value.
    pub fn from_typed<T: Serialize + ?Sized>(value: &T) -> FerryResult<Self> {
        serde_json::to_value(value)
            .map(Self)
            .map_err(|e| FerryError::invalid_argument(format!("object not serializable: {}", e)))
    }

    /// Rebuilds a typed value from the captured structure.
    pub fn to_typed<T: DeserializeOwned>(&self) -> FerryResult<T> {
        serde_json::from_value(self.0.clone())
            .map_err(|e| FerryError::invalid_argument(format!("object shape mismatch: {}", e)))
    }

    /// Returns the underlying structure.
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// Consumes the object, returning the underlying structure.
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

impl fmt::Display for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
