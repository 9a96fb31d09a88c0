use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::{Client, Collection, Database};
use tracing::debug;

use super::{RecordSink, SinkError};
use crate::generate::value::Value;
use crate::schema::types::{Record, Row};

/// Document-store sink. One collection per entity table.
pub struct MongoSink {
    database: Database,
}

impl MongoSink {
    /// Connect and ping, so a bad URI fails here rather than on the first write.
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self, SinkError> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database_name);
        database.run_command(doc! { "ping": 1 }).await?;
        debug!("Connected to MongoDB database '{}'", database_name);
        Ok(Self { database })
    }

    /// Wrap an existing database handle.
    pub fn with_database(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self, table: &str) -> Collection<Document> {
        self.database.collection(table)
    }
}

/// Filter matching a record's key fields.
fn key_filter(record: &Record) -> Document {
    record
        .key()
        .0
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_bson()))
        .collect()
}

/// Absent optional fields stay absent; `Value::Null` becomes a BSON null.
fn to_document(record: &Record) -> Document {
    record
        .fields()
        .map(|(name, value)| (name.to_string(), value.to_bson()))
        .collect()
}

fn from_document(document: Document) -> Row {
    document
        .into_iter()
        .filter(|(name, _)| name != "_id")
        .map(|(name, value)| (name, Value::from_bson(value)))
        .collect()
}

#[async_trait]
impl RecordSink for MongoSink {
    fn name(&self) -> &str {
        "mongodb"
    }

    async fn upsert(&self, table: &str, record: &Record) -> Result<(), SinkError> {
        self.collection(table)
            .replace_one(key_filter(record), to_document(record))
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn bulk_read(&self, table: &str) -> Result<Vec<Row>, SinkError> {
        let mut cursor = self.collection(table).find(doc! {}).await?;
        let mut rows = Vec::new();
        while cursor.advance().await? {
            rows.push(from_document(cursor.deserialize_current()?));
        }
        debug!("Read {} documents back from '{}'", rows.len(), table);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::EntityKind;
    use bson::Bson;

    #[test]
    fn test_line_filter_uses_composite_key() {
        let record = Record::new(EntityKind::InvoiceLine)
            .with("seq_item_nota", 2i64)
            .with("seq_nota", 5i64)
            .with("qtd_produto", 1.0);
        let filter = key_filter(&record);
        assert_eq!(filter, doc! { "seq_nota": 5i64, "seq_item_nota": 2i64 });
    }

    #[test]
    fn test_absent_and_null_fields_stay_distinct() {
        let record = Record::new(EntityKind::InvoiceLine)
            .with("seq_nota", 1i64)
            .with_nullable::<f64>("vlr_promocao", None)
            .with_optional::<i64>("cod_promocao", None);
        let document = to_document(&record);
        assert_eq!(document.get("vlr_promocao"), Some(&Bson::Null));
        assert!(!document.contains_key("cod_promocao"));
    }

    #[test]
    fn test_object_id_is_dropped_on_read() {
        let document = doc! {
            "_id": bson::oid::ObjectId::new(),
            "cod_produto": 3i64,
            "vlr_venda": 15.0,
        };
        let row = from_document(document);
        assert!(!row.contains_key("_id"));
        assert_eq!(row.get("cod_produto"), Some(&Value::Int(3)));
    }
}
