use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;

use super::{RecordSink, SinkError};
use crate::schema::types::{Record, Row};

/// In-process sink for dry runs and tests.
///
/// Records are kept per table in write order, keyed by the record key's
/// display form (`seq_nota=5,seq_item_nota=2`). Failures can be injected per
/// key, per table, or for reads.
#[derive(Default)]
pub struct MemorySink {
    label: String,
    tables: Mutex<HashMap<String, IndexMap<String, Record>>>,
    failing_keys: Mutex<HashSet<(String, String)>>,
    failing_tables: Mutex<HashSet<String>>,
    fail_reads: AtomicBool,
    attempts: AtomicUsize,
}

impl MemorySink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Fail every upsert of the record with this key, e.g. `("cliente", "cod_cliente=3")`.
    pub fn fail_on(&self, table: &str, key: &str) {
        lock(&self.failing_keys).insert((table.to_string(), key.to_string()));
    }

    /// Fail every upsert into `table`.
    pub fn fail_table(&self, table: &str) {
        lock(&self.failing_tables).insert(table.to_string());
    }

    /// Make `bulk_read` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Stored records of a table, in first-write order.
    pub fn records(&self, table: &str) -> Vec<Record> {
        lock(&self.tables)
            .get(table)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, table: &str) -> usize {
        lock(&self.tables).get(table).map_or(0, IndexMap::len)
    }

    pub fn total_len(&self) -> usize {
        lock(&self.tables).values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    pub fn contains(&self, table: &str, key: &str) -> bool {
        lock(&self.tables)
            .get(table)
            .is_some_and(|records| records.contains_key(key))
    }

    /// Upserts attempted, including injected failures.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// A poisoned lock only means another test thread panicked mid-write; the
/// maps stay usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl RecordSink for MemorySink {
    fn name(&self) -> &str {
        &self.label
    }

    async fn upsert(&self, table: &str, record: &Record) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let key = record.key().to_string();

        let injected = lock(&self.failing_tables).contains(table)
            || lock(&self.failing_keys).contains(&(table.to_string(), key.clone()));
        if injected {
            return Err(SinkError::Injected {
                table: table.to_string(),
                key,
            });
        }

        lock(&self.tables)
            .entry(table.to_string())
            .or_default()
            .insert(key, record.clone());
        Ok(())
    }

    async fn bulk_read(&self, table: &str) -> Result<Vec<Row>, SinkError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SinkError::Injected {
                table: table.to_string(),
                key: "bulk read".to_string(),
            });
        }
        Ok(self.records(table).iter().map(Record::to_row).collect())
    }
}
