//! # ferry-backend
//!
//! Storage capabilities consumed by the transfer engines, and the backends
//! that provide them.
//!
//! The engines only see two narrow capabilities:
//!
//! - [`DataSink`]: append one chunk of rows to a table, replace a table's
//!   schema
//! - [`DataSource`]: fetch one page of rows, count rows
//!
//! [`Backend`] adds the pass-through operations (raw SQL, DDL, single-row
//! writes) used by the facade and the CLI.
//!
//! ## Backends
//!
//! | kind       | type               | feature    |
//! |------------|--------------------|------------|
//! | memory     | [`MemoryBackend`]  | always     |
//! | sqlite     | `SqliteBackend`    | `sqlite`   |
//! | postgresql | `PostgresBackend`  | `postgres` |
//! | mysql      | `MySqlBackend`     | `mysql`    |
//!
//! [`connect`] resolves a [`ConnectionConfig`] into a shared backend handle
//! once; kinds whose feature is compiled out fail with
//! [`FerryError::UnsupportedBackend`].
//!
//! SQL backends open one connection per call and close it afterwards, so a
//! single handle can be shared by any number of worker threads.
//!
//! [`ConnectionConfig`]: ferry_common::config::ConnectionConfig
//! [`FerryError::UnsupportedBackend`]: ferry_common::error::FerryError::UnsupportedBackend

#![warn(missing_docs)]
#![warn(clippy::all)]

mod factory;
mod memory;
pub mod sql;
mod traits;

#[cfg(feature = "mysql")]
mod mysql_backend;
#[cfg(feature = "postgres")]
mod postgres_backend;
#[cfg(feature = "sqlite")]
mod sqlite_backend;

pub use factory::connect;
pub use memory::MemoryBackend;
pub use sql::{infer_schema, ColumnDef, Dialect, SqlType};
pub use traits::{Backend, DataSink, DataSource, SelectRequest};

#[cfg(feature = "mysql")]
pub use mysql_backend::MySqlBackend;
#[cfg(feature = "postgres")]
pub use postgres_backend::PostgresBackend;
#[cfg(feature = "sqlite")]
pub use sqlite_backend::SqliteBackend;
