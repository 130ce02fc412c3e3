//! # idgate - segment id assignment on the write path
//!
//! idgate sits between application code and the persistence layer's write
//! entry point. Insert-shaped writes get their unset id fields filled from a
//! remote segment allocator before the write runs, so callers never request
//! ids explicitly.
//!
//! ## Core Concepts
//!
//! - **Record**: an entity with a static [`RecordDescriptor`]; its leading
//!   `i64` fields tagged with a business tag are eligible for assignment
//! - **SegmentAllocator**: issues unique ids per business tag
//! - **AssignmentEngine**: fills one record's unset id fields
//! - **KeyAssigningExecutor**: decorator over a [`WriteExecutor`] that
//!   classifies each write and runs assignment before forwarding it
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use idgate::{InMemorySegmentAllocator, KeyAssigningExecutor, Payload, WriteExecutor, WriteOperation};
//!
//! let allocator = Arc::new(InMemorySegmentAllocator::new().with_sequence("mall4cloud-order", 1, 1));
//! let executor = KeyAssigningExecutor::new(my_executor, allocator);
//!
//! let mut op = WriteOperation::insert("app.OrderMapper.insert", Payload::record(order));
//! executor.execute(&mut op)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod allocator;
pub mod config;
pub mod engine;
pub mod error;
pub mod interceptor;
pub mod operation;
pub mod record;
pub mod storage;
pub mod value;

// Re-export primary types at crate root for convenience
pub use allocator::{InMemorySegmentAllocator, SegmentAllocator};
pub use config::{AllocatorConfig, IdGateConfig};
pub use engine::AssignmentEngine;
pub use error::{
	AllocationError, ConfigError, IdGateError, IdGateResult, StorageError, ValidationError,
};
pub use interceptor::{KeyAssigningExecutor, StatementClassifier, StatementShape};
pub use operation::{
	Param, ParamMap, Payload, StatementKind, WriteExecutor, WriteOperation, WriteOutcome,
};
pub use record::{
	DescriptorRegistry, FieldDescriptor, FieldType, Record, RecordDescriptor,
	RecordDescriptorBuilder, Row,
};
pub use storage::{InMemoryWriteStore, StoredRow};
pub use value::Value;

#[cfg(feature = "transport-grpc")]
pub use allocator::grpc::{GrpcSegmentAllocator, SegmentServiceImpl};
