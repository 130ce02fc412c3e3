//! In-memory segment allocator.
//!
//! Thread-safe per-tag counters. Intended for embedded usage and tests, and
//! as a reference for the allocator contract.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::AllocationError;

use super::SegmentAllocator;

/// Code returned when a tag has no registered sequence.
pub const UNKNOWN_TAG_CODE: &str = "biz_tag_not_found";

#[derive(Debug, Clone, Copy)]
struct Sequence {
    next: i64,
    step: i64,
}

/// Per-tag monotonic counters.
///
/// Tags must be registered with [`InMemorySegmentAllocator::register`]
/// unless auto-creation is enabled, in which case unknown tags start at 1.
#[derive(Debug, Default)]
pub struct InMemorySegmentAllocator {
    sequences: Mutex<HashMap<String, Sequence>>,
    auto_create: bool,
}

impl InMemorySegmentAllocator {
    /// Creates an allocator with no sequences.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets unknown tags start a fresh sequence at 1 instead of failing.
    #[must_use]
    pub fn with_auto_create(mut self, auto_create: bool) -> Self {
        self.auto_create = auto_create;
        self
    }

    /// Registers (or resets) the sequence for `biz_tag`.
    ///
    /// `step` values below 1 are treated as 1. A poisoned sequence table is
    /// reported with `warn!` and the registration is skipped.
    pub fn register(&self, biz_tag: impl Into<String>, start: i64, step: i64) {
        let biz_tag = biz_tag.into();
        let seq = Sequence {
            next: start,
            step: step.max(1),
        };
        match self.sequences.lock() {
            Ok(mut guard) => {
                guard.insert(biz_tag, seq);
            }
            Err(_) => warn!(biz_tag = %biz_tag, "sequence table lock poisoned; registration skipped"),
        }
    }

    /// Registers a sequence, returning the allocator for chaining.
    #[must_use]
    pub fn with_sequence(self, biz_tag: impl Into<String>, start: i64, step: i64) -> Self {
        self.register(biz_tag, start, step);
        self
    }

    /// The id the next call for `biz_tag` would return, if the tag is known.
    #[must_use]
    pub fn peek(&self, biz_tag: &str) -> Option<i64> {
        self.sequences
            .lock()
            .ok()
            .and_then(|guard| guard.get(biz_tag).map(|s| s.next))
    }
}

impl SegmentAllocator for InMemorySegmentAllocator {
    fn allocate(&self, biz_tag: &str) -> Result<i64, AllocationError> {
        let mut guard = self
            .sequences
            .lock()
            .map_err(|_| AllocationError::Unavailable {
                biz_tag: biz_tag.to_string(),
                message: "poisoned lock: sequences".to_string(),
            })?;

        if !guard.contains_key(biz_tag) {
            if !self.auto_create {
                return Err(AllocationError::Rejected {
                    biz_tag: biz_tag.to_string(),
                    code: UNKNOWN_TAG_CODE.to_string(),
                    message: "no sequence registered for tag".to_string(),
                });
            }
            guard.insert(biz_tag.to_string(), Sequence { next: 1, step: 1 });
        }

        let seq = guard
            .get_mut(biz_tag)
            .ok_or_else(|| AllocationError::Exhausted {
                biz_tag: biz_tag.to_string(),
            })?;
        let id = seq.next;
        seq.next = id
            .checked_add(seq.step)
            .ok_or_else(|| AllocationError::Exhausted {
                biz_tag: biz_tag.to_string(),
            })?;

        debug!(biz_tag, id, "allocated id from in-memory sequence");
        Ok(id)
    }
}
