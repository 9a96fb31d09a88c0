//! # Error Types
//!
//! Defines `RetailSeedError`, the unified error enum for every fatal failure
//! mode in the RetailSeed pipeline. Per-record sink failures are NOT fatal and
//! never appear here; they are reported through `DualWriteOutcome` and counted
//! in the run report. Every variant carries enough context (stage, table,
//! counts) to tell which precondition failed without digging through logs.

use thiserror::Error;

use crate::sink::{SinkError, SinkRole};

/// All fatal errors that can occur in RetailSeed operations.
#[derive(Error, Debug)]
pub enum RetailSeedError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to connect to the {role} sink: {message}\n  Endpoint: {endpoint_hint}\n  Cause: {source}")]
    Connection {
        role: SinkRole,
        message: String,
        endpoint_hint: String,
        #[source]
        source: SinkError,
    },

    #[error("Address pool too small at stage '{stage}': {stores} stores + {customers} customers need {needed} addresses, but only {available} were generated\n  Raise volumes.addresses in retailseed.toml or lower the store/customer counts")]
    AddressPoolExhausted {
        stage: &'static str,
        stores: usize,
        customers: usize,
        needed: usize,
        available: usize,
    },

    #[error("Product catalog read-back from the {role} sink failed before the invoice stage; no invoice can be generated\n  Table: {table}\n  Cause: {source}")]
    CatalogReadBack {
        role: SinkRole,
        table: &'static str,
        #[source]
        source: SinkError,
    },

    #[error("Product catalog row {row_index} from '{table}' is malformed: {message}")]
    CatalogDecode {
        table: &'static str,
        row_index: usize,
        message: String,
    },

    #[error("Product catalog read back from the {role} sink is empty, but {invoices} invoices were requested")]
    EmptyCatalog { role: SinkRole, invoices: usize },

    #[error("A worker of stage '{stage}' did not finish: {message}")]
    WorkerFailed {
        stage: &'static str,
        message: String,
    },

    #[error("Run cancelled during stage '{stage}' after {completed_stages} completed stages")]
    Cancelled {
        stage: &'static str,
        completed_stages: usize,
    },
}

pub type Result<T> = std::result::Result<T, RetailSeedError>;
