//! # ferry-exec
//!
//! Work partitioning and fan-out/fan-in for ferry.
//!
//! - [`plan_chunks`] splits a row range into contiguous [`Chunk`]s
//! - [`ParallelExecutor`] runs a batch of independent tasks on a bounded set
//!   of worker threads and returns their results in submission order

#![warn(missing_docs)]
#![warn(clippy::all)]

mod chunk;
mod executor;

pub use chunk::{plan_chunks, Chunk};
pub use executor::ParallelExecutor;
