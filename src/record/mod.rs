//! Record model: static field descriptors and the `Record` trait.
//!
//! A record type describes itself once through a [`RecordDescriptor`]: its
//! ordered field list, each field's declared type, and for id fields the
//! business tag naming the allocation sequence. The assignment engine reads
//! the descriptor instead of inspecting values at runtime.
//!
//! Id fields are expected to be declared contiguously at the start of the
//! field list. Only that leading run is ever considered for assignment.

mod registry;
mod row;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use registry::DescriptorRegistry;
pub use row::Row;

/// Maximum length of a business tag (matches the allocator's key column).
pub const MAX_BIZ_TAG_LEN: usize = 128;

/// Declared type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// 64-bit integer; the only type an id field may have.
    I64,
    I32,
    F64,
    Bool,
    Text,
    Timestamp,
    Json,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::I64 => "i64",
            Self::I32 => "i32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Text => "text",
            Self::Timestamp => "timestamp",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// One declared field of a record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    name: String,
    ty: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    biz_tag: Option<String>,
}

impl FieldDescriptor {
    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared field type.
    #[must_use]
    pub const fn ty(&self) -> FieldType {
        self.ty
    }

    /// Business tag of the allocation sequence, if this is an id field.
    #[must_use]
    pub fn biz_tag(&self) -> Option<&str> {
        self.biz_tag.as_deref()
    }

    /// Whether the field is marked for remote id assignment.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.ty == FieldType::I64 && self.biz_tag.is_some()
    }
}

/// Ordered field layout of one record type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDescriptor {
    type_name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    /// Starts a descriptor for the given record type.
    pub fn builder(type_name: impl Into<String>) -> RecordDescriptorBuilder {
        RecordDescriptorBuilder {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Record type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Index of the field called `name`.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// The leading run of eligible fields, with their indices.
    ///
    /// Stops at the first field that is not an eligible `i64` field.
    pub fn id_prefix(&self) -> impl Iterator<Item = (usize, &FieldDescriptor)> + '_ {
        self.fields
            .iter()
            .enumerate()
            .take_while(|(_, f)| f.is_eligible())
    }

    /// Eligible fields declared after the leading run. These are never assigned.
    #[must_use]
    pub fn unreachable_id_fields(&self) -> Vec<&FieldDescriptor> {
        let prefix = self.id_prefix().count();
        self.fields[prefix..]
            .iter()
            .filter(|f| f.is_eligible())
            .collect()
    }
}

/// Builder for [`RecordDescriptor`].
#[derive(Debug)]
pub struct RecordDescriptorBuilder {
    type_name: String,
    fields: Vec<FieldDescriptor>,
}

impl RecordDescriptorBuilder {
    /// Declares an id field drawing from the sequence named `biz_tag`.
    #[must_use]
    pub fn id_field(mut self, name: impl Into<String>, biz_tag: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            ty: FieldType::I64,
            biz_tag: Some(biz_tag.into()),
        });
        self
    }

    /// Declares a plain field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            ty,
            biz_tag: None,
        });
        self
    }

    /// Validates and builds the descriptor.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for empty names, empty or oversized
    /// business tags, and duplicate field names.
    pub fn build(self) -> Result<RecordDescriptor, ValidationError> {
        if self.type_name.trim().is_empty() {
            return Err(ValidationError::EmptyTypeName);
        }

        for (i, field) in self.fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(ValidationError::EmptyFieldName);
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(ValidationError::DuplicateField {
                    record_type: self.type_name.clone(),
                    field: field.name.clone(),
                });
            }
            if let Some(tag) = &field.biz_tag {
                if tag.trim().is_empty() {
                    return Err(ValidationError::EmptyBizTag {
                        field: field.name.clone(),
                    });
                }
                if tag.len() > MAX_BIZ_TAG_LEN {
                    return Err(ValidationError::FieldTooLong {
                        field: format!("{}.biz_tag", field.name),
                        max_length: MAX_BIZ_TAG_LEN,
                    });
                }
            }
        }

        Ok(RecordDescriptor {
            type_name: self.type_name,
            fields: self.fields,
        })
    }
}

/// An entity that can receive allocated ids before it is persisted.
///
/// Implementors expose their descriptor and accessors for their `i64`
/// fields by position. The engine mutates the record in place and never
/// replaces it.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, OnceLock};
/// use idgate::{FieldType, Record, RecordDescriptor, ValidationError};
///
/// #[derive(Debug, Default)]
/// struct Order {
///     order_id: Option<i64>,
///     note: String,
/// }
///
/// fn order_descriptor() -> Arc<RecordDescriptor> {
///     static DESCRIPTOR: OnceLock<Arc<RecordDescriptor>> = OnceLock::new();
///     DESCRIPTOR
///         .get_or_init(|| {
///             Arc::new(
///                 RecordDescriptor::builder("order")
///                     .id_field("order_id", "mall4cloud-order")
///                     .field("note", FieldType::Text)
///                     .build()
///                     .expect("static descriptor is valid"),
///             )
///         })
///         .clone()
/// }
///
/// impl Record for Order {
///     fn descriptor(&self) -> Arc<RecordDescriptor> {
///         order_descriptor()
///     }
///
///     fn id_value(&self, index: usize) -> Option<i64> {
///         match index {
///             0 => self.order_id,
///             _ => None,
///         }
///     }
///
///     fn set_id_value(&mut self, index: usize, id: i64) -> Result<(), ValidationError> {
///         match index {
///             0 => {
///                 self.order_id = Some(id);
///                 Ok(())
///             }
///             _ => Err(ValidationError::UnknownField {
///                 record_type: "order".to_string(),
///                 field: index.to_string(),
///             }),
///         }
///     }
/// }
///
/// let order = Order::default();
/// assert_eq!(order.descriptor().id_prefix().count(), 1);
/// ```
pub trait Record: Send + Sync + fmt::Debug {
    /// The record type's field layout.
    fn descriptor(&self) -> Arc<RecordDescriptor>;

    /// Current value of the `i64` field at `index`, or `None` when unset.
    fn id_value(&self, index: usize) -> Option<i64>;

    /// Sets the `i64` field at `index`.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if `index` is not an `i64` field of this record.
    fn set_id_value(&mut self, index: usize, id: i64) -> Result<(), ValidationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> RecordDescriptor {
        RecordDescriptor::builder("order")
            .id_field("order_id", "mall4cloud-order")
            .id_field("trade_id", "mall4cloud-trade")
            .field("user_id", FieldType::I64)
            .field("note", FieldType::Text)
            .build()
            .unwrap()
    }

    #[test]
    fn test_id_prefix_is_leading_run() {
        let desc = order();
        let prefix: Vec<_> = desc.id_prefix().map(|(i, f)| (i, f.name().to_string())).collect();
        assert_eq!(
            prefix,
            vec![(0, "order_id".to_string()), (1, "trade_id".to_string())]
        );
        assert!(desc.unreachable_id_fields().is_empty());
    }

    #[test]
    fn test_id_prefix_stops_at_first_plain_field() {
        let desc = RecordDescriptor::builder("split")
            .id_field("a", "tag-a")
            .field("b", FieldType::Text)
            .id_field("c", "tag-c")
            .build()
            .unwrap();
        assert_eq!(desc.id_prefix().count(), 1);
        let unreachable = desc.unreachable_id_fields();
        assert_eq!(unreachable.len(), 1);
        assert_eq!(unreachable[0].name(), "c");
    }

    #[test]
    fn test_untagged_i64_is_not_eligible() {
        let desc = RecordDescriptor::builder("plain")
            .field("id", FieldType::I64)
            .id_field("later", "tag")
            .build()
            .unwrap();
        assert_eq!(desc.id_prefix().count(), 0);
        assert!(!desc.fields()[0].is_eligible());
        assert!(desc.fields()[1].is_eligible());
    }

    #[test]
    fn test_builder_rejects_empty_biz_tag() {
        let err = RecordDescriptor::builder("order")
            .id_field("order_id", "  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::EmptyBizTag { .. }));
    }

    #[test]
    fn test_builder_rejects_long_biz_tag() {
        let err = RecordDescriptor::builder("order")
            .id_field("order_id", "x".repeat(MAX_BIZ_TAG_LEN + 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::FieldTooLong { .. }));
    }

    #[test]
    fn test_builder_rejects_duplicate_field() {
        let err = RecordDescriptor::builder("order")
            .id_field("order_id", "t")
            .field("order_id", FieldType::Text)
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateField { .. }));
    }

    #[test]
    fn test_builder_rejects_empty_type_name() {
        let err = RecordDescriptor::builder("").build().unwrap_err();
        assert!(matches!(err, ValidationError::EmptyTypeName));
    }

    #[test]
    fn test_field_index() {
        let desc = order();
        assert_eq!(desc.field_index("note"), Some(3));
        assert_eq!(desc.field_index("missing"), None);
    }
}
