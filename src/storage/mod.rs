//! Reference persistence layer.
//!
//! Real deployments wrap their own [`WriteExecutor`](crate::WriteExecutor);
//! the in-memory store serves embedded use and tests.

mod memory;

pub use memory::{InMemoryWriteStore, StoredRow};
