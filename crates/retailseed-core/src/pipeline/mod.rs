//! # Pipeline
//!
//! Runs the stages in dependency order. Within a stage the index space is
//! partitioned across a pool of worker tasks; each worker generates its
//! records and dual-writes them. The next stage starts only after every
//! worker of the current one has joined, so a child never references a key
//! that has not been generated yet.
//!
//! The invoice stage first reads the product table back from one sink and
//! hands the resulting catalog to every invoice worker.
//!
//! Sink write failures are best-effort: logged, counted in the
//! [`RunReport`], never fatal. Failed preconditions, worker panics and
//! cancellation end the run with an error.

pub mod orchestrator;
pub mod stage;

pub use orchestrator::Pipeline;
pub use stage::{ProgressCallback, ProgressEvent, RunReport, Stage, StageReport, StageState};

/// Records between two progress milestones within a stage.
pub const MILESTONE_INTERVAL: usize = 1000;
