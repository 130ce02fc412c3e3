//! Startup table of record descriptors, keyed by record type name.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::error::{IdGateError, IdGateResult, ValidationError};

use super::{RecordDescriptor, Row};

fn lock_err() -> IdGateError {
    IdGateError::internal("poisoned lock: descriptor registry")
}

/// Thread-safe registry of record descriptors.
///
/// Descriptors are registered once at startup and shared afterwards.
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    by_type: RwLock<HashMap<String, Arc<RecordDescriptor>>>,
}

impl DescriptorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor, returning the shared handle.
    ///
    /// Eligible fields declared after the leading id run are logged, since
    /// assignment never reaches them.
    ///
    /// # Errors
    /// Returns [`ValidationError::DuplicateRecordType`] if the type is already registered.
    pub fn register(&self, descriptor: RecordDescriptor) -> IdGateResult<Arc<RecordDescriptor>> {
        let unreachable: Vec<&str> = descriptor
            .unreachable_id_fields()
            .iter()
            .map(|f| f.name())
            .collect();
        if !unreachable.is_empty() {
            warn!(
                record_type = descriptor.type_name(),
                fields = ?unreachable,
                "id fields declared after a non-id field will never be assigned"
            );
        }

        let mut guard = self.by_type.write().map_err(|_| lock_err())?;
        if guard.contains_key(descriptor.type_name()) {
            return Err(ValidationError::DuplicateRecordType {
                record_type: descriptor.type_name().to_string(),
            }
            .into());
        }
        let shared = Arc::new(descriptor);
        guard.insert(shared.type_name().to_string(), Arc::clone(&shared));
        Ok(shared)
    }

    /// Looks up a registered descriptor.
    ///
    /// # Errors
    /// Returns an internal error if the registry lock is poisoned.
    pub fn get(&self, type_name: &str) -> IdGateResult<Option<Arc<RecordDescriptor>>> {
        let guard = self.by_type.read().map_err(|_| lock_err())?;
        Ok(guard.get(type_name).cloned())
    }

    /// Creates an empty [`Row`] of a registered type.
    ///
    /// # Errors
    /// Returns [`ValidationError::UnknownRecordType`] for unregistered types.
    pub fn new_row(&self, type_name: &str) -> IdGateResult<Row> {
        let descriptor = self.get(type_name)?.ok_or_else(|| ValidationError::UnknownRecordType {
            record_type: type_name.to_string(),
        })?;
        Ok(Row::new(descriptor))
    }

    /// Number of registered types.
    ///
    /// # Errors
    /// Returns an internal error if the registry lock is poisoned.
    pub fn len(&self) -> IdGateResult<usize> {
        Ok(self.by_type.read().map_err(|_| lock_err())?.len())
    }

    /// Whether no types are registered.
    ///
    /// # Errors
    /// Returns an internal error if the registry lock is poisoned.
    pub fn is_empty(&self) -> IdGateResult<bool> {
        Ok(self.len()? == 0)
    }
}
