//! Assignment engine: fills unset id fields of one record.
//!
//! Fields are scanned in declaration order and the scan ends at the first
//! field that is not an eligible `i64` id field, or at the first id field
//! that already holds a value. Each unset eligible field before that point
//! costs exactly one allocator call.

use std::sync::Arc;

use tracing::{debug, error};

use crate::allocator::SegmentAllocator;
use crate::error::IdGateResult;
use crate::record::{Record, RecordDescriptor};

/// Assigns allocated ids to records in place.
#[derive(Clone)]
pub struct AssignmentEngine {
    allocator: Arc<dyn SegmentAllocator>,
}

impl std::fmt::Debug for AssignmentEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentEngine").finish_non_exhaustive()
    }
}

impl AssignmentEngine {
    /// Creates an engine drawing ids from `allocator`.
    #[must_use]
    pub fn new(allocator: Arc<dyn SegmentAllocator>) -> Self {
        Self { allocator }
    }

    /// Assigns ids using the record's own layout. Returns how many ids were set.
    ///
    /// # Errors
    /// Returns [`IdGateError::Allocation`](crate::IdGateError::Allocation) on
    /// the first allocator failure; fields after it are left untouched.
    pub fn assign(&self, record: &mut dyn Record) -> IdGateResult<usize> {
        let shape = record.descriptor();
        self.assign_with_shape(&shape, record)
    }

    /// Assigns ids to `record` following the layout in `shape`.
    ///
    /// Used for batch elements, which share the layout resolved once for the
    /// whole call while each element keeps its own values.
    ///
    /// # Errors
    /// As [`AssignmentEngine::assign`], plus a validation error if the record
    /// rejects an index from `shape`.
    pub fn assign_with_shape(
        &self,
        shape: &RecordDescriptor,
        record: &mut dyn Record,
    ) -> IdGateResult<usize> {
        let mut assigned = 0;

        for (index, field) in shape.id_prefix() {
            if record.id_value(index).is_some() {
                break;
            }
            let Some(biz_tag) = field.biz_tag() else {
                break;
            };

            let id = self.allocator.allocate(biz_tag).map_err(|e| {
                error!(
                    record_type = shape.type_name(),
                    field = field.name(),
                    biz_tag,
                    error = %e,
                    "can't get distributed id"
                );
                e
            })?;

            record.set_id_value(index, id)?;
            debug!(
                record_type = shape.type_name(),
                field = field.name(),
                biz_tag,
                id,
                "assigned id"
            );
            assigned += 1;
        }

        Ok(assigned)
    }
}
