//! # ferry-codec
//!
//! Column classification and reversible SQL-safe encoding.
//!
//! SQL stores strings, integers and floats natively. Everything else is
//! rewritten into a tagged text form on the way in and restored on the way
//! out:
//!
//! | tag          | stored as                                       |
//! |--------------|-------------------------------------------------|
//! | `Primitive`  | unchanged                                       |
//! | `Bytes`      | `base64_encode::<standard base64>`              |
//! | `FixedInt`   | widened to a plain 64-bit integer               |
//! | `FixedFloat` | widened to a plain 64-bit float                 |
//! | `Opaque`     | `base64_pickle_encode::<base64 of serialized>`  |
//!
//! A column gets exactly one tag. By default the tag comes from the first
//! non-NULL value ([`ClassifyMode::Sample`]); [`ClassifyMode::Strict`] scans
//! the whole column instead.
//!
//! ## Example
//!
//! ```rust
//! use ferry_codec::{decode_column, encode_column, classify, ColumnTypeTag};
//! use ferry_common::types::{Column, Value};
//!
//! let mut column = Column::new("blob", vec![Value::bytes(b"hi"), Value::Null]);
//! let tag = classify(&column);
//! assert_eq!(tag, ColumnTypeTag::Bytes);
//!
//! encode_column(&mut column, tag).unwrap();
//! assert_eq!(column.get(0), &Value::string("base64_encode::aGk="));
//!
//! decode_column(&mut column).unwrap();
//! assert_eq!(column.get(0), &Value::bytes(b"hi"));
//! ```
//!
//! [`ClassifyMode::Sample`]: ferry_common::config::ClassifyMode::Sample
//! [`ClassifyMode::Strict`]: ferry_common::config::ClassifyMode::Strict

#![warn(missing_docs)]
#![warn(clippy::all)]

mod classify;
mod decode;
mod encode;
mod manifest;
mod tag;

pub use classify::{classify, classify_strict, classify_table, classify_with, tag_of};
pub use decode::{decode_column, decode_column_as, decode_table, decode_table_with};
pub use encode::{encode_column, encode_table};
pub use manifest::{TagManifest, MANIFEST_COLUMNS};
pub use tag::ColumnTypeTag;
