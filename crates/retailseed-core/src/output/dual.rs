use std::sync::Arc;

use tracing::warn;

use crate::schema::types::Record;
use crate::sink::{RecordSink, SinkError, SinkRole};

/// Result of writing one record to both sinks. The two results are
/// independent: one sink failing says nothing about the other.
#[derive(Debug)]
pub struct DualWriteOutcome {
    pub document: Result<(), SinkError>,
    pub wide_column: Result<(), SinkError>,
}

impl DualWriteOutcome {
    pub fn result(&self, role: SinkRole) -> &Result<(), SinkError> {
        match role {
            SinkRole::Document => &self.document,
            SinkRole::WideColumn => &self.wide_column,
        }
    }

    /// Both sinks accepted the record.
    pub fn is_complete(&self) -> bool {
        self.document.is_ok() && self.wide_column.is_ok()
    }

    /// Roles whose write failed.
    pub fn failures(&self) -> impl Iterator<Item = SinkRole> + '_ {
        SinkRole::ALL
            .into_iter()
            .filter(|role| self.result(*role).is_err())
    }
}

/// Writes every record to the document store and the wide-column store.
///
/// There is no retry and no rollback. A failed write is logged with the
/// entity, key and sink, then handed back to the caller to count.
#[derive(Clone)]
pub struct DualWriter {
    document: Arc<dyn RecordSink>,
    wide_column: Arc<dyn RecordSink>,
}

impl DualWriter {
    pub fn new(document: Arc<dyn RecordSink>, wide_column: Arc<dyn RecordSink>) -> Self {
        Self {
            document,
            wide_column,
        }
    }

    pub fn sink(&self, role: SinkRole) -> &Arc<dyn RecordSink> {
        match role {
            SinkRole::Document => &self.document,
            SinkRole::WideColumn => &self.wide_column,
        }
    }

    /// Submit the record to both sinks concurrently.
    pub async fn write(&self, record: &Record) -> DualWriteOutcome {
        let table = record.table_name();
        let (document, wide_column) = tokio::join!(
            self.document.upsert(table, record),
            self.wide_column.upsert(table, record),
        );
        let outcome = DualWriteOutcome {
            document,
            wide_column,
        };

        for role in outcome.failures() {
            if let Err(e) = outcome.result(role) {
                warn!(
                    entity = %record.kind(),
                    key = %record.key(),
                    sink = self.sink(role).name(),
                    "Failed to write to the {}: {}",
                    role,
                    e
                );
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::EntityKind;
    use crate::sink::MemorySink;

    fn store(id: i64) -> Record {
        Record::new(EntityKind::Store)
            .with("cod_loja", id)
            .with("nom_loja", format!("Loja {}", id))
    }

    #[tokio::test]
    async fn test_both_sinks_receive_record() {
        let document = Arc::new(MemorySink::new("document"));
        let wide_column = Arc::new(MemorySink::new("wide-column"));
        let writer = DualWriter::new(document.clone(), wide_column.clone());

        let outcome = writer.write(&store(1)).await;
        assert!(outcome.is_complete());
        assert!(document.contains("loja", "cod_loja=1"));
        assert!(wide_column.contains("loja", "cod_loja=1"));
    }

    #[tokio::test]
    async fn test_one_sink_failing_does_not_block_the_other() {
        let document = Arc::new(MemorySink::new("document"));
        let wide_column = Arc::new(MemorySink::new("wide-column"));
        document.fail_on("loja", "cod_loja=2");
        let writer = DualWriter::new(document.clone(), wide_column.clone());

        let outcome = writer.write(&store(2)).await;
        assert!(!outcome.is_complete());
        assert_eq!(outcome.failures().collect::<Vec<_>>(), vec![SinkRole::Document]);
        assert!(wide_column.contains("loja", "cod_loja=2"));
        assert!(!document.contains("loja", "cod_loja=2"));
    }
}
