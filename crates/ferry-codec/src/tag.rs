//! Column type tags.

use std::fmt;

use ferry_common::error::{FerryError, FerryResult};

/// Per-column classification result driving encode and decode.
///
/// The numeric values are stable; they are persisted in the sidecar tag
/// table.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnTypeTag {
    /// Natively storable; passed through.
    Primitive = 0,
    /// Raw bytes, stored base64 with the bytes prefix.
    Bytes = 1,
    /// Fixed-width integer, widened on store.
    FixedInt = 2,
    /// Fixed-width float, widened on store.
    FixedFloat = 3,
    /// Anything else, serialized then stored base64 with the object prefix.
    Opaque = -1,
}

impl ColumnTypeTag {
    /// Returns the stable numeric tag.
    #[inline]
    pub const fn as_i8(self) -> i8 {
        self as i8
    }

    /// Parses a stable numeric tag.
    pub fn from_i8(v: i8) -> Option<Self> {
        match v {
            0 => Some(ColumnTypeTag::Primitive),
            1 => Some(ColumnTypeTag::Bytes),
            2 => Some(ColumnTypeTag::FixedInt),
            3 => Some(ColumnTypeTag::FixedFloat),
            -1 => Some(ColumnTypeTag::Opaque),
            _ => None,
        }
    }

    /// Parses a numeric tag read back from storage.
    pub fn from_stored(v: i64) -> FerryResult<Self> {
        i8::try_from(v)
            .ok()
            .and_then(Self::from_i8)
            .ok_or_else(|| FerryError::internal(format!("unknown column type tag {}", v)))
    }

    /// Returns true if values of this tag go to SQL untouched.
    pub const fn is_primitive(self) -> bool {
        matches!(self, ColumnTypeTag::Primitive)
    }

    /// Returns true if stored cells carry a text prefix and need decoding.
    pub const fn is_prefixed(self) -> bool {
        matches!(self, ColumnTypeTag::Bytes | ColumnTypeTag::Opaque)
    }
}

impl fmt::Display for ColumnTypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
