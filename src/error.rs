//! Error types for idgate.
//!
//! All errors in idgate are strongly typed using thiserror.
//! Allocation failures are kept distinct from storage failures so that
//! callers can tell "no id could be issued" apart from "the write failed".

use thiserror::Error;

/// Validation errors raised while building descriptors, rows, or config.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Business tag for field '{field}' cannot be empty")]
    EmptyBizTag {
        field: String,
    },

    #[error("Field '{field}' exceeds maximum length of {max_length}")]
    FieldTooLong {
        field: String,
        max_length: usize,
    },

    #[error("Record type name cannot be empty")]
    EmptyTypeName,

    #[error("Field name cannot be empty")]
    EmptyFieldName,

    #[error("Field '{field}' is declared more than once on '{record_type}'")]
    DuplicateField {
        record_type: String,
        field: String,
    },

    #[error("Record type '{record_type}' has no field '{field}'")]
    UnknownField {
        record_type: String,
        field: String,
    },

    #[error("Field '{field}' expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Record type '{record_type}' is already registered")]
    DuplicateRecordType {
        record_type: String,
    },

    #[error("Record type '{record_type}' is not registered")]
    UnknownRecordType {
        record_type: String,
    },
}

/// Failures reported by a segment allocator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The allocator answered, but with a failure response.
    #[error("Allocator rejected biz_tag '{biz_tag}' (code {code}): {message}")]
    Rejected {
        biz_tag: String,
        code: String,
        message: String,
    },

    /// The allocator could not be reached or did not answer in time.
    #[error("Allocator unavailable for biz_tag '{biz_tag}': {message}")]
    Unavailable {
        biz_tag: String,
        message: String,
    },

    /// The sequence cannot advance any further.
    #[error("Sequence for biz_tag '{biz_tag}' is exhausted")]
    Exhausted {
        biz_tag: String,
    },
}

impl AllocationError {
    /// The business tag the failed request was made for.
    #[must_use]
    pub fn biz_tag(&self) -> &str {
        match self {
            Self::Rejected { biz_tag, .. }
            | Self::Unavailable { biz_tag, .. }
            | Self::Exhausted { biz_tag } => biz_tag,
        }
    }
}

/// Errors raised by the wrapped write executor.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key already exists.
    #[error("Duplicate key {key} in '{table}'")]
    DuplicateKey {
        table: String,
        key: i64,
    },

    /// The record reached the store without a key.
    #[error("Record for '{table}' has no key")]
    MissingKey {
        table: String,
    },

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {message}")]
    Read {
        path: String,
        message: String,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {reason}")]
    Invalid {
        reason: String,
    },
}

/// Top-level error type for idgate.
#[derive(Debug, Error)]
pub enum IdGateError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Id allocation failed: {0}")]
    Allocation(#[from] AllocationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl IdGateError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this write was aborted because no id could be allocated.
    #[must_use]
    pub const fn is_allocation_failure(&self) -> bool {
        matches!(self, Self::Allocation(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if retrying the whole write may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Allocation(e) => matches!(e, AllocationError::Unavailable { .. }),
            Self::Storage(e) => matches!(e, StorageError::BackendError(_)),
            Self::Validation(_) | Self::Config(_) | Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for idgate operations.
pub type IdGateResult<T> = Result<T, IdGateError>;
