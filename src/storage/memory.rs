//! In-memory write store.
//!
//! A reference [`WriteExecutor`] keyed by each record's first `i64` field.
//! It rejects records reaching it without a key, or with a key that is
//! already stored, which makes it a convenient check that id assignment
//! ran before the write.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::debug;

use crate::error::{IdGateResult, StorageError};
use crate::operation::{Param, Payload, StatementKind, WriteExecutor, WriteOperation, WriteOutcome};
use crate::record::{FieldType, Record};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// A stored row and the statement that last wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    /// Key taken from the record's first `i64` field.
    pub key: i64,
    /// Statement of the last insert or update.
    pub statement_id: String,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: HashMap<String, BTreeMap<i64, StoredRow>>,
}

/// Thread-safe in-memory write executor.
#[derive(Debug, Default)]
pub struct InMemoryWriteStore {
    state: RwLock<StoreState>,
    executions: AtomicU64,
}

impl InMemoryWriteStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times [`WriteExecutor::execute`] has been called.
    #[must_use]
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::SeqCst)
    }

    /// Keys stored for `table`, ascending.
    ///
    /// # Errors
    /// Returns [`StorageError::BackendError`] if the lock is poisoned.
    pub fn keys(&self, table: &str) -> Result<Vec<i64>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("store.keys"))?;
        Ok(state
            .tables
            .get(table)
            .map(|rows| rows.keys().copied().collect())
            .unwrap_or_default())
    }

    /// Row stored under `key` in `table`.
    ///
    /// # Errors
    /// Returns [`StorageError::BackendError`] if the lock is poisoned.
    pub fn get(&self, table: &str, key: i64) -> Result<Option<StoredRow>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("store.get"))?;
        Ok(state.tables.get(table).and_then(|rows| rows.get(&key)).cloned())
    }
}

fn payload_records(payload: &Payload) -> Vec<&dyn Record> {
    match payload {
        Payload::Record(record) => vec![&**record],
        Payload::Params(params) => {
            let mut out: Vec<&dyn Record> = Vec::new();
            for param in params.values() {
                match param {
                    Param::Record(record) => out.push(&**record),
                    Param::List(items) => out.extend(items.iter().map(|r| &**r)),
                    Param::Scalar(_) => {}
                }
            }
            out
        }
        Payload::Other(_) => Vec::new(),
    }
}

fn record_key(record: &dyn Record) -> Result<(String, i64), StorageError> {
    let desc = record.descriptor();
    let table = desc.type_name().to_string();
    let Some(index) = desc.fields().iter().position(|f| f.ty() == FieldType::I64) else {
        return Err(StorageError::BackendError(format!(
            "record type '{table}' has no i64 key field"
        )));
    };
    match record.id_value(index) {
        Some(key) => Ok((table, key)),
        None => Err(StorageError::MissingKey { table }),
    }
}

impl WriteExecutor for InMemoryWriteStore {
    fn execute(&self, op: &mut WriteOperation) -> IdGateResult<WriteOutcome> {
        self.executions.fetch_add(1, Ordering::SeqCst);

        let keyed = payload_records(&op.payload)
            .into_iter()
            .map(record_key)
            .collect::<Result<Vec<_>, _>>()?;

        let mut state = self.state.write().map_err(|_| lock_err("store.execute"))?;
        let rows_affected = match op.kind {
            StatementKind::Insert => {
                // Validate the whole batch before touching any table.
                for (i, (table, key)) in keyed.iter().enumerate() {
                    let in_store = state
                        .tables
                        .get(table)
                        .is_some_and(|rows| rows.contains_key(key));
                    let in_batch = keyed[..i].iter().any(|(t, k)| t == table && k == key);
                    if in_store || in_batch {
                        return Err(StorageError::DuplicateKey {
                            table: table.clone(),
                            key: *key,
                        }
                        .into());
                    }
                }
                for (table, key) in &keyed {
                    state.tables.entry(table.clone()).or_default().insert(
                        *key,
                        StoredRow {
                            key: *key,
                            statement_id: op.statement_id.clone(),
                        },
                    );
                }
                keyed.len()
            }
            StatementKind::Update => {
                let mut updated = 0;
                for (table, key) in &keyed {
                    if let Some(row) = state.tables.get_mut(table).and_then(|rows| rows.get_mut(key)) {
                        row.statement_id.clone_from(&op.statement_id);
                        updated += 1;
                    }
                }
                updated
            }
            StatementKind::Delete => {
                let mut deleted = 0;
                for (table, key) in &keyed {
                    if let Some(rows) = state.tables.get_mut(table) {
                        if rows.remove(key).is_some() {
                            deleted += 1;
                        }
                    }
                }
                deleted
            }
            StatementKind::Select | StatementKind::Unknown => 0,
        };

        debug!(
            statement_id = %op.statement_id,
            kind = ?op.kind,
            rows_affected,
            "in-memory write executed"
        );
        Ok(WriteOutcome {
            rows_affected: u64::try_from(rows_affected).unwrap_or(u64::MAX),
        })
    }
}
