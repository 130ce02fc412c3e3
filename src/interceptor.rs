//! Write interceptor: assigns ids on insert-shaped writes before they run.
//!
//! [`KeyAssigningExecutor`] wraps a concrete [`WriteExecutor`]. For every
//! call it decides whether assignment applies, runs the
//! [`AssignmentEngine`] on the target record(s), and then forwards the call
//! exactly once. An allocation failure aborts the call before the wrapped
//! executor is reached.

use std::sync::Arc;

use tracing::{debug, debug_span};

use crate::allocator::SegmentAllocator;
use crate::config::IdGateConfig;
use crate::engine::AssignmentEngine;
use crate::error::IdGateResult;
use crate::operation::{StatementKind, WriteExecutor, WriteOperation, WriteOutcome};

/// How an insert statement carries its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementShape {
    /// One record per call.
    Single,
    /// A list of records per call.
    Batch,
}

/// Classifies statements by substrings of their identifier.
#[derive(Debug, Clone)]
pub struct StatementClassifier {
    single_markers: Vec<String>,
    batch_markers: Vec<String>,
}

impl Default for StatementClassifier {
    fn default() -> Self {
        Self::from_config(&IdGateConfig::default())
    }
}

impl StatementClassifier {
    /// Creates a classifier with explicit marker lists.
    pub fn new(single_markers: Vec<String>, batch_markers: Vec<String>) -> Self {
        Self {
            single_markers,
            batch_markers,
        }
    }

    /// Creates a classifier from config markers.
    #[must_use]
    pub fn from_config(config: &IdGateConfig) -> Self {
        Self::new(config.single_markers.clone(), config.batch_markers.clone())
    }

    /// Shape selected by `statement_id`, or `None` when no marker matches.
    ///
    /// Batch markers are checked first: the conventional batch names contain
    /// the single markers (`insertBatch` contains `insert`).
    #[must_use]
    pub fn classify(&self, statement_id: &str) -> Option<StatementShape> {
        if self.batch_markers.iter().any(|m| statement_id.contains(m.as_str())) {
            Some(StatementShape::Batch)
        } else if self.single_markers.iter().any(|m| statement_id.contains(m.as_str())) {
            Some(StatementShape::Single)
        } else {
            None
        }
    }
}

/// Decorator assigning allocated ids before delegating to `E`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use idgate::{
///     InMemorySegmentAllocator, InMemoryWriteStore, KeyAssigningExecutor, Payload,
///     Record, RecordDescriptor, Row, WriteExecutor, WriteOperation, FieldType,
/// };
///
/// let allocator = Arc::new(InMemorySegmentAllocator::new().with_sequence("mall4cloud-order", 1, 1));
/// let executor = KeyAssigningExecutor::new(InMemoryWriteStore::new(), allocator);
///
/// let order = Arc::new(
///     RecordDescriptor::builder("order")
///         .id_field("order_id", "mall4cloud-order")
///         .field("note", FieldType::Text)
///         .build()
///         .unwrap(),
/// );
/// let mut op = WriteOperation::insert("app.OrderMapper.save", Payload::record(Row::new(order)));
/// executor.execute(&mut op).unwrap();
///
/// let target = op.payload.target_record_mut().unwrap();
/// assert_eq!(target.id_value(0), Some(1));
/// ```
pub struct KeyAssigningExecutor<E> {
    inner: E,
    engine: AssignmentEngine,
    classifier: StatementClassifier,
    batch_list_key: String,
}

impl<E: std::fmt::Debug> std::fmt::Debug for KeyAssigningExecutor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyAssigningExecutor")
            .field("inner", &self.inner)
            .field("classifier", &self.classifier)
            .field("batch_list_key", &self.batch_list_key)
            .finish_non_exhaustive()
    }
}

impl<E: WriteExecutor> KeyAssigningExecutor<E> {
    /// Wraps `inner` using the default markers and list key.
    pub fn new(inner: E, allocator: Arc<dyn SegmentAllocator>) -> Self {
        Self::with_config(inner, allocator, &IdGateConfig::default())
    }

    /// Wraps `inner` using markers and list key from `config`.
    pub fn with_config(inner: E, allocator: Arc<dyn SegmentAllocator>, config: &IdGateConfig) -> Self {
        Self {
            inner,
            engine: AssignmentEngine::new(allocator),
            classifier: StatementClassifier::from_config(config),
            batch_list_key: config.batch_list_key.clone(),
        }
    }

    /// The wrapped executor.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Runs id assignment for `op` without executing it.
    ///
    /// Returns the number of ids assigned; zero when the operation is not
    /// applicable.
    ///
    /// # Errors
    /// Returns the first allocation failure. Records processed before it
    /// keep their assigned ids.
    pub fn prepare(&self, op: &mut WriteOperation) -> IdGateResult<usize> {
        if op.kind != StatementKind::Insert {
            debug!(statement_id = %op.statement_id, kind = ?op.kind, "not an insert; passing through");
            return Ok(0);
        }

        let Some(shape) = self.classifier.classify(&op.statement_id) else {
            debug!(statement_id = %op.statement_id, "insert statement name matches no marker; passing through");
            return Ok(0);
        };

        match shape {
            StatementShape::Single => {
                let Some(record) = op.payload.target_record_mut() else {
                    debug!(statement_id = %op.statement_id, "no record in payload; passing through");
                    return Ok(0);
                };
                self.engine.assign(record)
            }
            StatementShape::Batch => {
                let Some(layout) = op.payload.target_shape() else {
                    debug!(statement_id = %op.statement_id, "no record in payload; passing through");
                    return Ok(0);
                };
                let Some(items) = op.payload.list_mut(&self.batch_list_key) else {
                    debug!(
                        statement_id = %op.statement_id,
                        list_key = %self.batch_list_key,
                        "batch payload has no record list; passing through"
                    );
                    return Ok(0);
                };

                let mut assigned = 0;
                for item in items.iter_mut() {
                    assigned += self.engine.assign_with_shape(&layout, &mut **item)?;
                }
                Ok(assigned)
            }
        }
    }
}

impl<E: WriteExecutor> WriteExecutor for KeyAssigningExecutor<E> {
    fn execute(&self, op: &mut WriteOperation) -> IdGateResult<WriteOutcome> {
        let span = debug_span!(
            "assign_ids",
            request_id = %op.request_id,
            statement_id = %op.statement_id
        );
        let assigned = {
            let _entered = span.enter();
            self.prepare(op)?
        };
        if assigned > 0 {
            debug!(
                request_id = %op.request_id,
                statement_id = %op.statement_id,
                assigned,
                "ids assigned; proceeding with write"
            );
        }
        self.inner.execute(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    use crate::allocator::InMemorySegmentAllocator;
    use crate::operation::Payload;
    use crate::storage::InMemoryWriteStore;
    use crate::value::Value;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_classify_single() {
        let c = StatementClassifier::default();
        assert_eq!(c.classify("app.mapper.OrderMapper.insert"), Some(StatementShape::Single));
        assert_eq!(c.classify("app.mapper.UserMapper.save"), Some(StatementShape::Single));
        assert_eq!(
            c.classify("app.mapper.UserMapper.insertSelective"),
            Some(StatementShape::Single)
        );
    }

    #[test]
    fn test_classify_batch_before_single() {
        let c = StatementClassifier::default();
        assert_eq!(c.classify("app.mapper.SkuMapper.insertBatch"), Some(StatementShape::Batch));
        assert_eq!(c.classify("app.mapper.SkuMapper.saveBatch"), Some(StatementShape::Batch));
    }

    #[test]
    fn test_classify_unmatched() {
        let c = StatementClassifier::default();
        assert_eq!(c.classify("app.mapper.OrderMapper.create"), None);
        assert_eq!(c.classify("app.mapper.OrderMapper.Insert"), None);
    }

    #[test]
    fn test_classify_custom_markers() {
        let c = StatementClassifier::new(vec!["add".to_string()], vec!["addAll".to_string()]);
        assert_eq!(c.classify("repo.addAll"), Some(StatementShape::Batch));
        assert_eq!(c.classify("repo.add"), Some(StatementShape::Single));
        assert_eq!(c.classify("repo.insert"), None);
    }

    #[test]
    fn test_non_insert_pass_through_is_logged() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let exec = KeyAssigningExecutor::new(
            InMemoryWriteStore::new(),
            Arc::new(InMemorySegmentAllocator::new()),
        );
        let mut op = WriteOperation::new(
            "app.OrderMapper.updateById",
            StatementKind::Update,
            Payload::Other(Value::Null),
        );
        let assigned = tracing::subscriber::with_default(subscriber, || exec.prepare(&mut op));

        assert_eq!(assigned.unwrap(), 0);
        let out = logs.contents();
        assert!(out.contains("not an insert; passing through"), "{out}");
        assert!(out.contains("app.OrderMapper.updateById"), "{out}");
        assert!(out.contains("Update"), "{out}");
    }
}
