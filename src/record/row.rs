//! Runtime-described record backed by a shared descriptor.

use std::sync::Arc;

use crate::error::ValidationError;
use crate::value::Value;

use super::{FieldType, Record, RecordDescriptor};

/// A record whose layout comes from a [`RecordDescriptor`] at runtime.
///
/// Every field starts as [`Value::Null`]. Values are type-checked against
/// the descriptor on [`Row::set`].
#[derive(Debug, Clone)]
pub struct Row {
    descriptor: Arc<RecordDescriptor>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row with every field unset.
    #[must_use]
    pub fn new(descriptor: Arc<RecordDescriptor>) -> Self {
        let values = vec![Value::Null; descriptor.fields().len()];
        Self { descriptor, values }
    }

    /// Sets the field called `name`, returning the row for chaining.
    ///
    /// # Errors
    /// Returns [`ValidationError::UnknownField`] or [`ValidationError::TypeMismatch`].
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, ValidationError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Sets the field called `name`.
    ///
    /// # Errors
    /// Returns [`ValidationError::UnknownField`] or [`ValidationError::TypeMismatch`].
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ValidationError> {
        let index = self.index_of(name)?;
        let value = value.into();
        let ty = self.descriptor.fields()[index].ty();
        if !value.fits(ty) {
            return Err(ValidationError::TypeMismatch {
                field: name.to_string(),
                expected: type_label(ty),
                actual: value.type_name(),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    /// Value of the field called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.descriptor
            .field_index(name)
            .and_then(|i| self.values.get(i))
    }

    /// All values in declaration order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn index_of(&self, name: &str) -> Result<usize, ValidationError> {
        self.descriptor
            .field_index(name)
            .ok_or_else(|| ValidationError::UnknownField {
                record_type: self.descriptor.type_name().to_string(),
                field: name.to_string(),
            })
    }
}

const fn type_label(ty: FieldType) -> &'static str {
    match ty {
        FieldType::I64 => "i64",
        FieldType::I32 => "i32",
        FieldType::F64 => "f64",
        FieldType::Bool => "bool",
        FieldType::Text => "string",
        FieldType::Timestamp => "timestamp",
        FieldType::Json => "structured",
    }
}

impl Record for Row {
    fn descriptor(&self) -> Arc<RecordDescriptor> {
        Arc::clone(&self.descriptor)
    }

    fn id_value(&self, index: usize) -> Option<i64> {
        self.values.get(index).and_then(Value::as_int)
    }

    fn set_id_value(&mut self, index: usize, id: i64) -> Result<(), ValidationError> {
        match self.descriptor.fields().get(index) {
            Some(field) if field.ty() == FieldType::I64 => {
                self.values[index] = Value::Int(id);
                Ok(())
            }
            Some(field) => Err(ValidationError::TypeMismatch {
                field: field.name().to_string(),
                expected: type_label(field.ty()),
                actual: "i64",
            }),
            None => Err(ValidationError::UnknownField {
                record_type: self.descriptor.type_name().to_string(),
                field: format!("#{index}"),
            }),
        }
    }
}
