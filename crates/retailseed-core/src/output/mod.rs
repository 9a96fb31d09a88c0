//! # Output
//!
//! Fan-out of generated records to the configured sinks.

pub mod dual;

pub use dual::{DualWriteOutcome, DualWriter};
