pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod schema;
pub mod sink;

// Re-export key types for convenience
pub use config::{PipelineSettings, RetailSeedConfig, Volumes};
pub use error::{Result, RetailSeedError};
pub use output::{DualWriteOutcome, DualWriter};
pub use pipeline::{Pipeline, ProgressEvent, RunReport, Stage};
pub use sink::{RecordSink, SinkError, SinkRole};
