use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Volumes;
use crate::schema::types::EntityKind;
use crate::sink::SinkRole;

/// The pipeline's stages, in dependency order. Each stage only references
/// keys produced by stages before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Cities,
    Addresses,
    Suppliers,
    Products,
    Stores,
    Terminals,
    Registers,
    Customers,
    /// Invoices and their lines.
    Invoices,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Cities,
        Stage::Addresses,
        Stage::Suppliers,
        Stage::Products,
        Stage::Stores,
        Stage::Terminals,
        Stage::Registers,
        Stage::Customers,
        Stage::Invoices,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Cities => "cities",
            Stage::Addresses => "addresses",
            Stage::Suppliers => "suppliers",
            Stage::Products => "products",
            Stage::Stores => "stores",
            Stage::Terminals => "terminals",
            Stage::Registers => "registers",
            Stage::Customers => "customers",
            Stage::Invoices => "invoices",
        }
    }

    /// The entity the stage generates (for invoices, the head record).
    pub fn kind(self) -> EntityKind {
        match self {
            Stage::Cities => EntityKind::City,
            Stage::Addresses => EntityKind::Address,
            Stage::Suppliers => EntityKind::Supplier,
            Stage::Products => EntityKind::Product,
            Stage::Stores => EntityKind::Store,
            Stage::Terminals => EntityKind::Terminal,
            Stage::Registers => EntityKind::Register,
            Stage::Customers => EntityKind::Customer,
            Stage::Invoices => EntityKind::Invoice,
        }
    }

    /// Mixed into each record's seed so stages draw independent streams.
    pub fn salt(self) -> u64 {
        self as u64 + 1
    }

    pub fn volume(self, volumes: &Volumes) -> usize {
        match self {
            Stage::Cities => volumes.cities,
            Stage::Addresses => volumes.address_count(),
            Stage::Suppliers => volumes.suppliers,
            Stage::Products => volumes.products,
            Stage::Stores => volumes.stores,
            Stage::Terminals => volumes.terminals,
            Stage::Registers => volumes.registers,
            Stage::Customers => volumes.customers,
            Stage::Invoices => volumes.invoices,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Pending,
    Complete,
}

/// What one stage did.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    pub state: StageState,
    /// Entities generated (invoices count once, however many lines they have).
    pub records: usize,
    /// Records submitted to the writer, invoice lines included.
    pub writes: usize,
    pub document_failures: usize,
    pub wide_column_failures: usize,
    pub duration: Duration,
}

impl StageReport {
    pub fn pending(stage: Stage) -> Self {
        Self {
            stage,
            state: StageState::Pending,
            records: 0,
            writes: 0,
            document_failures: 0,
            wide_column_failures: 0,
            duration: Duration::ZERO,
        }
    }

    pub fn failures(&self, role: SinkRole) -> usize {
        match role {
            SinkRole::Document => self.document_failures,
            SinkRole::WideColumn => self.wide_column_failures,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub seed: u64,
    pub stages: Vec<StageReport>,
    pub duration: Duration,
}

impl RunReport {
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    pub fn total_records(&self) -> usize {
        self.stages.iter().map(|r| r.records).sum()
    }

    pub fn total_writes(&self) -> usize {
        self.stages.iter().map(|r| r.writes).sum()
    }

    pub fn total_failures(&self, role: SinkRole) -> usize {
        self.stages.iter().map(|r| r.failures(role)).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(|r| r.state == StageState::Complete)
    }
}

/// Progress notifications emitted while the pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StageStarted { stage: Stage, total: usize },
    /// Emitted every [`MILESTONE_INTERVAL`](super::MILESTONE_INTERVAL) records.
    Milestone {
        stage: Stage,
        processed: usize,
        total: usize,
    },
    CatalogLoaded { products: usize, source: SinkRole },
    StageCompleted(StageReport),
}

pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
