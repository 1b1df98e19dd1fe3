//! Core data model for ferry.
//!
//! A [`Table`] is an ordered list of named [`Column`]s that share a row
//! count. Cells are [`Value`]s; the value variant decides how the codec
//! treats a column on its way into SQL.

mod table;
mod value;

pub use table::{Column, Table, TableBuilder};
pub use value::{FixedFloat, FixedInt, ObjectValue, Value};
