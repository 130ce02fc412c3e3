//! Segment allocator client interface.
//!
//! The allocator issues unique 64-bit ids per business tag. How it does so
//! (counters, prefetched segments, ...) is its own concern; callers rely only
//! on two calls with the same tag never returning the same value, and on
//! failures being reported as [`AllocationError`].

mod memory;

#[cfg(feature = "transport-grpc")]
pub mod grpc;

pub use memory::InMemorySegmentAllocator;

use std::sync::Arc;

use crate::error::AllocationError;

/// Allocates ids from named sequences.
pub trait SegmentAllocator: Send + Sync {
    /// Allocates the next id for `biz_tag`.
    ///
    /// # Errors
    /// Returns an [`AllocationError`] when no id can be issued.
    fn allocate(&self, biz_tag: &str) -> Result<i64, AllocationError>;
}

impl<A: SegmentAllocator + ?Sized> SegmentAllocator for Arc<A> {
    fn allocate(&self, biz_tag: &str) -> Result<i64, AllocationError> {
        (**self).allocate(biz_tag)
    }
}

impl<A: SegmentAllocator + ?Sized> SegmentAllocator for &A {
    fn allocate(&self, biz_tag: &str) -> Result<i64, AllocationError> {
        (**self).allocate(biz_tag)
    }
}
