//! Write operations as seen by the persistence layer's execution entry point.
//!
//! A [`WriteOperation`] names its statement, carries its statement kind and
//! payload, and is handed to a [`WriteExecutor`]. Executors may be stacked:
//! an interceptor is itself a `WriteExecutor` that wraps the concrete one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::IdGateResult;
use crate::record::{Record, RecordDescriptor};
use crate::value::Value;

/// Kind of statement behind a write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    Select,
    Unknown,
}

/// One named argument of a multi-argument call.
#[derive(Debug)]
pub enum Param {
    /// A single record.
    Record(Box<dyn Record>),
    /// A sequence of records (batch calls).
    List(Vec<Box<dyn Record>>),
    /// Any scalar argument.
    Scalar(Value),
}

/// Named call arguments, kept in insertion order.
#[derive(Debug, Default)]
pub struct ParamMap {
    entries: Vec<(String, Param)>,
}

impl ParamMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `key`, returning the map for chaining.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, param: Param) -> Self {
        self.insert(key, param);
        self
    }

    /// Inserts or replaces `key`.
    pub fn insert(&mut self, key: impl Into<String>, param: Param) {
        let key = key.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = param;
        } else {
            self.entries.push((key, param));
        }
    }

    /// Argument stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Param> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, p)| p)
    }

    /// Mutable argument stored under `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Param> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, p)| p)
    }

    /// Arguments in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &Param> {
        self.entries.iter().map(|(_, p)| p)
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map holds no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Argument shape of a write call.
#[derive(Debug)]
pub enum Payload {
    /// The call takes one record directly.
    Record(Box<dyn Record>),
    /// The call takes named arguments (batch calls wrap their list here).
    Params(ParamMap),
    /// Anything else; never touched by id assignment.
    Other(Value),
}

impl Payload {
    /// Creates a single-record payload.
    pub fn record(record: impl Record + 'static) -> Self {
        Self::Record(Box::new(record))
    }

    /// Creates the conventional batch payload: the records under `list_key`.
    pub fn batch<R: Record + 'static>(list_key: impl Into<String>, records: Vec<R>) -> Self {
        let list = records
            .into_iter()
            .map(|r| Box::new(r) as Box<dyn Record>)
            .collect();
        Self::Params(ParamMap::new().with(list_key, Param::List(list)))
    }

    /// The record an assignment targets: the payload itself, or the first
    /// record-valued argument.
    pub fn target_record_mut(&mut self) -> Option<&mut (dyn Record + 'static)> {
        match self {
            Self::Record(record) => Some(&mut **record),
            Self::Params(params) => params.entries.iter_mut().find_map(|(_, p)| match p {
                Param::Record(record) => Some(&mut **record),
                _ => None,
            }),
            Self::Other(_) => None,
        }
    }

    /// Field layout to use for batch elements.
    ///
    /// Taken from the target record if there is one, otherwise from the
    /// first element of the first non-empty list argument.
    #[must_use]
    pub fn target_shape(&self) -> Option<Arc<RecordDescriptor>> {
        match self {
            Self::Record(record) => Some(record.descriptor()),
            Self::Params(params) => params
                .values()
                .find_map(|p| match p {
                    Param::Record(record) => Some(record.descriptor()),
                    _ => None,
                })
                .or_else(|| {
                    params.values().find_map(|p| match p {
                        Param::List(items) => items.first().map(|r| r.descriptor()),
                        _ => None,
                    })
                }),
            Self::Other(_) => None,
        }
    }

    /// The record list stored under `list_key`, if the payload is a map and
    /// that entry is a list.
    pub fn list_mut(&mut self, list_key: &str) -> Option<&mut Vec<Box<dyn Record>>> {
        match self {
            Self::Params(params) => match params.get_mut(list_key) {
                Some(Param::List(items)) => Some(items),
                _ => None,
            },
            _ => None,
        }
    }
}

/// A single intercepted write call.
#[derive(Debug)]
pub struct WriteOperation {
    /// Correlation id for logs.
    pub request_id: Uuid,
    /// When the call was made.
    pub timestamp: DateTime<Utc>,
    /// Fully-qualified statement identifier, e.g. `app.mapper.OrderMapper.insert`.
    pub statement_id: String,
    /// Statement kind.
    pub kind: StatementKind,
    /// Call arguments; mutated in place by id assignment.
    pub payload: Payload,
}

impl WriteOperation {
    /// Creates a new operation.
    pub fn new(statement_id: impl Into<String>, kind: StatementKind, payload: Payload) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            statement_id: statement_id.into(),
            kind,
            payload,
        }
    }

    /// Shorthand for an insert-kind operation.
    pub fn insert(statement_id: impl Into<String>, payload: Payload) -> Self {
        Self::new(statement_id, StatementKind::Insert, payload)
    }

    /// Sets a custom request ID (useful for correlation).
    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }
}

/// Result of executing a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOutcome {
    /// Rows written.
    pub rows_affected: u64,
}

/// The persistence layer's write-execution entry point.
pub trait WriteExecutor: Send + Sync {
    /// Executes the write. The operation stays owned by the caller, so any
    /// records in its payload remain readable afterwards.
    ///
    /// # Errors
    /// Returns the executor's failure, or an allocation failure from a wrapping interceptor.
    fn execute(&self, op: &mut WriteOperation) -> IdGateResult<WriteOutcome>;
}

impl<E: WriteExecutor + ?Sized> WriteExecutor for Arc<E> {
    fn execute(&self, op: &mut WriteOperation) -> IdGateResult<WriteOutcome> {
        (**self).execute(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldType, Row};

    fn order_row() -> Row {
        Row::new(Arc::new(
            RecordDescriptor::builder("order")
                .id_field("order_id", "mall4cloud-order")
                .field("note", FieldType::Text)
                .build()
                .unwrap(),
        ))
    }

    fn sku_row() -> Row {
        Row::new(Arc::new(
            RecordDescriptor::builder("sku")
                .id_field("sku_id", "mall4cloud-sku")
                .build()
                .unwrap(),
        ))
    }

    #[test]
    fn test_target_of_record_payload() {
        let mut payload = Payload::record(order_row());
        assert_eq!(payload.target_shape().unwrap().type_name(), "order");
        assert!(payload.target_record_mut().is_some());
    }

    #[test]
    fn test_target_is_first_record_param() {
        let mut payload = Payload::Params(
            ParamMap::new()
                .with("shopId", Param::Scalar(Value::Int(3)))
                .with("order", Param::Record(Box::new(order_row())))
                .with("sku", Param::Record(Box::new(sku_row()))),
        );
        let target = payload.target_record_mut().unwrap();
        assert_eq!(target.descriptor().type_name(), "order");
    }

    #[test]
    fn test_no_target_for_scalars() {
        let mut payload = Payload::Params(
            ParamMap::new().with("shopId", Param::Scalar(Value::Int(3))),
        );
        assert!(payload.target_record_mut().is_none());
        assert!(payload.target_shape().is_none());

        let mut other = Payload::Other(Value::from("raw"));
        assert!(other.target_record_mut().is_none());
        assert!(other.target_shape().is_none());
    }

    #[test]
    fn test_batch_shape_falls_back_to_list_element() {
        let mut payload = Payload::batch("list", vec![sku_row(), sku_row()]);
        assert!(payload.target_record_mut().is_none());
        assert_eq!(payload.target_shape().unwrap().type_name(), "sku");
        assert_eq!(payload.list_mut("list").unwrap().len(), 2);
        assert!(payload.list_mut("items").is_none());
    }

    #[test]
    fn test_empty_list_has_no_shape() {
        let payload = Payload::batch::<Row>("list", Vec::new());
        assert!(payload.target_shape().is_none());
    }

    #[test]
    fn test_param_map_insert_replaces() {
        let mut params = ParamMap::new();
        params.insert("a", Param::Scalar(Value::Int(1)));
        params.insert("a", Param::Scalar(Value::Int(2)));
        assert_eq!(params.len(), 1);
        assert!(matches!(params.get("a"), Some(Param::Scalar(Value::Int(2)))));
    }

    #[test]
    fn test_write_operation_defaults() {
        let id = Uuid::new_v4();
        let op = WriteOperation::insert("app.OrderMapper.insert", Payload::Other(Value::Null))
            .with_request_id(id);
        assert_eq!(op.kind, StatementKind::Insert);
        assert_eq!(op.request_id, id);
    }
}
