//! # Sinks
//!
//! A sink is a data store that accepts records keyed by their identifying
//! fields. Writes are upserts, so rerunning the pipeline with the same seed
//! overwrites rather than duplicates. Two production sinks exist, one per
//! store, plus an in-memory sink for dry runs and tests.

pub mod cassandra;
pub mod memory;
pub mod mongo;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::types::{Record, Row};

pub use cassandra::CassandraSink;
pub use memory::MemorySink;
pub use mongo::MongoSink;

/// Which of the two stores a sink plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkRole {
    Document,
    WideColumn,
}

impl SinkRole {
    pub const ALL: [SinkRole; 2] = [SinkRole::Document, SinkRole::WideColumn];
}

impl fmt::Display for SinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkRole::Document => write!(f, "document store"),
            SinkRole::WideColumn => write!(f, "wide-column store"),
        }
    }
}

/// A single sink operation failed.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Cassandra error: {0}")]
    Cassandra(String),

    #[error("Failed to decode row from '{table}': {message}")]
    Decode { table: String, message: String },

    #[error("Injected failure on '{table}' ({key})")]
    Injected { table: String, key: String },
}

/// A store the pipeline writes records into.
///
/// Implementations must be safe to share across worker tasks; every worker
/// holds the same `Arc<dyn RecordSink>`.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Short label for logs, e.g. `mongodb` or `cassandra`.
    fn name(&self) -> &str;

    /// Insert the record, replacing any existing record with the same key.
    async fn upsert(&self, table: &str, record: &Record) -> Result<(), SinkError>;

    /// Read every row of a table. Only used for the product catalog.
    async fn bulk_read(&self, table: &str) -> Result<Vec<Row>, SinkError>;
}
