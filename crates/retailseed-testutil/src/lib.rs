use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use retailseed_core::config::{PipelineSettings, Volumes};
use retailseed_core::schema::{EntityKind, Record};
use retailseed_core::sink::MemorySink;
use retailseed_core::{DualWriter, Pipeline, SinkRole};

/// Fixed base time so terminal and invoice dates are reproducible.
pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 15)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .expect("valid fixture date")
}

/// A dataset small enough for unit-speed tests, with every stage non-empty.
pub fn small_volumes() -> Volumes {
    Volumes {
        cities: 20,
        addresses: None,
        suppliers: 15,
        products: 40,
        stores: 5,
        terminals: 8,
        registers: 6,
        customers: 30,
        invoices: 60,
    }
}

pub fn small_settings(seed: u64, workers: usize) -> PipelineSettings {
    PipelineSettings {
        volumes: small_volumes(),
        workers,
        seed,
        base_time: Some(base_time()),
        catalog_source: SinkRole::Document,
    }
}

/// A pipeline wired to two in-memory sinks the test can inspect.
pub struct MemoryPipeline {
    pub pipeline: Pipeline,
    pub document: Arc<MemorySink>,
    pub wide_column: Arc<MemorySink>,
}

pub fn memory_pipeline(settings: PipelineSettings) -> MemoryPipeline {
    let document = Arc::new(MemorySink::new("document"));
    let wide_column = Arc::new(MemorySink::new("wide-column"));
    memory_pipeline_with(settings, document, wide_column)
}

/// Same as [`memory_pipeline`], with sinks prepared by the caller (e.g. with
/// injected failures).
pub fn memory_pipeline_with(
    settings: PipelineSettings,
    document: Arc<MemorySink>,
    wide_column: Arc<MemorySink>,
) -> MemoryPipeline {
    let writer = DualWriter::new(document.clone(), wide_column.clone());
    let pipeline = Pipeline::new(settings, writer).expect("fixture settings are valid");
    MemoryPipeline {
        pipeline,
        document,
        wide_column,
    }
}

pub fn int_field(record: &Record, name: &str) -> i64 {
    record
        .get(name)
        .and_then(|v| v.as_int())
        .unwrap_or_else(|| panic!("{} has no integer field '{}'", record.table_name(), name))
}

pub fn float_field(record: &Record, name: &str) -> f64 {
    record
        .get(name)
        .and_then(|v| v.as_float())
        .unwrap_or_else(|| panic!("{} has no numeric field '{}'", record.table_name(), name))
}

pub fn string_field<'a>(record: &'a Record, name: &str) -> &'a str {
    record
        .get(name)
        .and_then(|v| v.as_string())
        .unwrap_or_else(|| panic!("{} has no string field '{}'", record.table_name(), name))
}

/// Single-column keys stored for an entity.
pub fn keys(sink: &MemorySink, kind: EntityKind) -> BTreeSet<i64> {
    let key_field = kind.key_fields()[0];
    sink.records(kind.table_name())
        .iter()
        .map(|r| int_field(r, key_field))
        .collect()
}

/// Table name to the sorted JSON form of every stored record. Two runs
/// produced the same dataset iff their snapshots are equal.
pub fn snapshot(sink: &MemorySink) -> BTreeMap<&'static str, Vec<String>> {
    EntityKind::ALL
        .iter()
        .map(|kind| {
            let mut records: Vec<String> = sink
                .records(kind.table_name())
                .iter()
                .map(Record::to_json_string)
                .collect();
            records.sort();
            (kind.table_name(), records)
        })
        .collect()
}
