use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDateTime;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::stage::{ProgressCallback, ProgressEvent, RunReport, Stage, StageReport, StageState};
use super::MILESTONE_INTERVAL;
use crate::config::PipelineSettings;
use crate::error::{Result, RetailSeedError};
use crate::generate::catalog::ProductCatalog;
use crate::generate::entities::*;
use crate::generate::foreign_key::KeyRange;
use crate::generate::partition::partition;
use crate::generate::record_rng;
use crate::output::{DualWriteOutcome, DualWriter};
use crate::schema::entities::{ToRecords, CITY_KEY_BASE, DEFAULT_KEY_BASE};
use crate::schema::types::EntityKind;
use crate::sink::SinkRole;

/// Drives a full run: nine stages, one worker pool each.
pub struct Pipeline {
    settings: PipelineSettings,
    base_time: NaiveDateTime,
    writer: DualWriter,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

/// Per-worker counts, merged at the stage barrier.
#[derive(Debug, Default)]
struct WorkerTally {
    records: usize,
    writes: usize,
    document_failures: usize,
    wide_column_failures: usize,
}

impl WorkerTally {
    fn count(&mut self, outcome: &DualWriteOutcome) {
        self.writes += 1;
        for role in outcome.failures() {
            match role {
                SinkRole::Document => self.document_failures += 1,
                SinkRole::WideColumn => self.wide_column_failures += 1,
            }
        }
    }

    fn merge(&mut self, other: WorkerTally) {
        self.records += other.records;
        self.writes += other.writes;
        self.document_failures += other.document_failures;
        self.wide_column_failures += other.wide_column_failures;
    }
}

/// What a worker task needs, all of it shared or cheap to clone.
struct WorkerContext<G> {
    stage: Stage,
    seed: u64,
    total: usize,
    generator: Arc<G>,
    writer: DualWriter,
    processed: Arc<AtomicUsize>,
    progress: Option<ProgressCallback>,
    cancel: CancellationToken,
}

async fn run_worker<G: EntityGenerator>(ctx: WorkerContext<G>, range: Range<usize>) -> WorkerTally {
    let mut tally = WorkerTally::default();
    for index in range {
        if ctx.cancel.is_cancelled() {
            break;
        }

        let mut rng = record_rng(ctx.seed, ctx.stage.salt(), index);
        let entity = ctx.generator.generate(index, &mut rng);
        for record in entity.to_records() {
            let outcome = ctx.writer.write(&record).await;
            tally.count(&outcome);
        }
        tally.records += 1;

        let processed = ctx.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if processed % MILESTONE_INTERVAL == 0 {
            info!("{}: {}/{} records", ctx.stage, processed, ctx.total);
            if let Some(ref progress) = ctx.progress {
                progress(&ProgressEvent::Milestone {
                    stage: ctx.stage,
                    processed,
                    total: ctx.total,
                });
            }
        }
    }
    tally
}

impl Pipeline {
    /// Validate the settings and pin the base time.
    pub fn new(settings: PipelineSettings, writer: DualWriter) -> Result<Self> {
        settings.validate()?;
        let base_time = settings
            .base_time
            .unwrap_or_else(|| chrono::Utc::now().naive_utc());
        Ok(Self {
            settings,
            base_time,
            writer,
            progress: None,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Cancelling the token stops new records from being submitted. Writes
    /// already in flight finish, then the run returns `Cancelled`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn base_time(&self) -> NaiveDateTime {
        self.base_time
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref progress) = self.progress {
            progress(&event);
        }
    }

    fn cancelled(&self, stage: Stage, completed_stages: usize) -> RetailSeedError {
        info!("Run cancelled during stage '{}'", stage);
        RetailSeedError::Cancelled {
            stage: stage.name(),
            completed_stages,
        }
    }

    /// Run every stage in order.
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let volumes = &self.settings.volumes;
        let mut reports: Vec<StageReport> =
            Stage::ALL.iter().map(|s| StageReport::pending(*s)).collect();

        let cities = KeyRange::new(CITY_KEY_BASE, volumes.cities);
        let suppliers = KeyRange::new(DEFAULT_KEY_BASE, volumes.suppliers);
        let stores = KeyRange::new(DEFAULT_KEY_BASE, volumes.stores);
        let terminals = KeyRange::new(DEFAULT_KEY_BASE, volumes.terminals);
        let registers = KeyRange::new(DEFAULT_KEY_BASE, volumes.registers);
        let customers = KeyRange::new(DEFAULT_KEY_BASE, volumes.customers);

        for (completed, stage) in Stage::ALL.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled(stage, completed));
            }

            let report = match stage {
                Stage::Cities => self.run_stage(stage, completed, CityGenerator).await?,
                Stage::Addresses => {
                    self.run_stage(stage, completed, AddressGenerator { cities })
                        .await?
                }
                Stage::Suppliers => self.run_stage(stage, completed, SupplierGenerator).await?,
                Stage::Products => {
                    self.run_stage(stage, completed, ProductGenerator { suppliers })
                        .await?
                }
                Stage::Stores => {
                    let allocation = volumes.address_allocation(stage.name())?;
                    self.run_stage(stage, completed, StoreGenerator::new(&allocation))
                        .await?
                }
                Stage::Terminals => {
                    let generator = TerminalGenerator {
                        stores,
                        base_time: self.base_time,
                    };
                    self.run_stage(stage, completed, generator).await?
                }
                Stage::Registers => {
                    self.run_stage(stage, completed, RegisterGenerator { stores })
                        .await?
                }
                Stage::Customers => {
                    let allocation = volumes.address_allocation(stage.name())?;
                    self.run_stage(stage, completed, CustomerGenerator::new(&allocation))
                        .await?
                }
                Stage::Invoices => {
                    let catalog = self.load_catalog().await?;
                    let generator = InvoiceGenerator {
                        terminals,
                        registers,
                        customers,
                        catalog,
                        base_time: self.base_time,
                    };
                    self.run_stage(stage, completed, generator).await?
                }
            };
            reports[completed] = report;
        }

        let report = RunReport {
            seed: self.settings.seed,
            stages: reports,
            duration: started.elapsed(),
        };
        info!(
            "Run complete: {} records, {} writes in {:.1?}",
            report.total_records(),
            report.total_writes(),
            report.duration
        );
        Ok(report)
    }

    /// Read the product table back from the catalog source sink.
    ///
    /// Skipped when no invoices are requested. Otherwise a failed read or an
    /// empty catalog ends the run: invoice lines need products to point at.
    async fn load_catalog(&self) -> Result<Arc<ProductCatalog>> {
        let invoices = self.settings.volumes.invoices;
        if invoices == 0 {
            return Ok(Arc::new(ProductCatalog::default()));
        }

        let role = self.settings.catalog_source;
        let table = EntityKind::Product.table_name();
        let rows = self
            .writer
            .sink(role)
            .bulk_read(table)
            .await
            .map_err(|source| RetailSeedError::CatalogReadBack {
                role,
                table,
                source,
            })?;

        let catalog = ProductCatalog::from_rows(&rows)?;
        if catalog.is_empty() {
            return Err(RetailSeedError::EmptyCatalog { role, invoices });
        }

        info!("Loaded {} products from the {}", catalog.len(), role);
        self.emit(ProgressEvent::CatalogLoaded {
            products: catalog.len(),
            source: role,
        });
        Ok(Arc::new(catalog))
    }

    async fn run_stage<G: EntityGenerator>(
        &self,
        stage: Stage,
        completed_stages: usize,
        generator: G,
    ) -> Result<StageReport> {
        let started = Instant::now();
        let total = stage.volume(&self.settings.volumes);
        info!(
            "Stage '{}': {} records across {} workers",
            stage, total, self.settings.workers
        );
        self.emit(ProgressEvent::StageStarted { stage, total });

        let generator = Arc::new(generator);
        let processed = Arc::new(AtomicUsize::new(0));
        let mut workers = JoinSet::new();
        for (worker, range) in partition(total, self.settings.workers)
            .into_iter()
            .enumerate()
        {
            if range.is_empty() {
                continue;
            }
            debug!("{} worker {}: indices {:?}", stage, worker, range);
            let ctx = WorkerContext {
                stage,
                seed: self.settings.seed,
                total,
                generator: Arc::clone(&generator),
                writer: self.writer.clone(),
                processed: Arc::clone(&processed),
                progress: self.progress.clone(),
                cancel: self.cancel.clone(),
            };
            workers.spawn(run_worker(ctx, range));
        }

        let mut tally = WorkerTally::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(worker_tally) => tally.merge(worker_tally),
                Err(e) => {
                    workers.abort_all();
                    return Err(RetailSeedError::WorkerFailed {
                        stage: stage.name(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if tally.records < total && self.cancel.is_cancelled() {
            return Err(self.cancelled(stage, completed_stages));
        }

        let report = StageReport {
            stage,
            state: StageState::Complete,
            records: tally.records,
            writes: tally.writes,
            document_failures: tally.document_failures,
            wide_column_failures: tally.wide_column_failures,
            duration: started.elapsed(),
        };
        info!(
            "Stage '{}' complete: {} records, {} writes, {} document / {} wide-column failures",
            stage,
            report.records,
            report.writes,
            report.document_failures,
            report.wide_column_failures
        );
        self.emit(ProgressEvent::StageCompleted(report.clone()));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Volumes;
    use crate::schema::types::{Record, Row};
    use crate::sink::{MemorySink, RecordSink, SinkError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn tiny_settings() -> PipelineSettings {
        PipelineSettings {
            volumes: Volumes {
                cities: 5,
                addresses: None,
                suppliers: 4,
                products: 6,
                stores: 2,
                terminals: 3,
                registers: 3,
                customers: 8,
                invoices: 12,
            },
            workers: 3,
            seed: 99,
            base_time: chrono::NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0),
            catalog_source: SinkRole::Document,
        }
    }

    fn memory_pipeline(settings: PipelineSettings) -> (Pipeline, Arc<MemorySink>, Arc<MemorySink>) {
        let document = Arc::new(MemorySink::new("document"));
        let wide_column = Arc::new(MemorySink::new("wide-column"));
        let writer = DualWriter::new(document.clone(), wide_column.clone());
        (Pipeline::new(settings, writer).unwrap(), document, wide_column)
    }

    #[tokio::test]
    async fn test_full_run_fills_both_sinks() {
        let (pipeline, document, wide_column) = memory_pipeline(tiny_settings());
        let report = pipeline.run().await.unwrap();

        assert!(report.is_complete());
        assert_eq!(report.stage(Stage::Addresses).unwrap().records, 10);
        assert_eq!(report.stage(Stage::Invoices).unwrap().records, 12);
        assert_eq!(report.total_failures(SinkRole::Document), 0);
        for sink in [&document, &wide_column] {
            assert_eq!(sink.len("cidade"), 5);
            assert_eq!(sink.len("cliente"), 8);
            assert_eq!(sink.len("nota_fiscal"), 12);
            assert_eq!(
                sink.len("item_nota_fiscal"),
                report.stage(Stage::Invoices).unwrap().writes - 12
            );
        }
    }

    #[tokio::test]
    async fn test_progress_events_arrive_in_stage_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let (pipeline, _, _) = memory_pipeline(tiny_settings());
        let pipeline = pipeline.with_progress(Arc::new(move |event: &ProgressEvent| {
            sink.lock().unwrap().push(event.clone());
        }));
        pipeline.run().await.unwrap();

        let events = events.lock().unwrap();
        let started: Vec<Stage> = events
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::StageStarted { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(started, Stage::ALL.to_vec());
        assert!(events
            .iter()
            .any(|e| matches!(e, ProgressEvent::CatalogLoaded { products: 6, .. })));
    }

    #[tokio::test]
    async fn test_catalog_read_failure_is_fatal() {
        let (pipeline, document, wide_column) = memory_pipeline(tiny_settings());
        document.fail_reads(true);
        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, RetailSeedError::CatalogReadBack { .. }), "{}", err);
        assert_eq!(wide_column.len("produto"), 6);
        assert_eq!(wide_column.len("nota_fiscal"), 0);
    }

    #[tokio::test]
    async fn test_catalog_can_come_from_wide_column_store() {
        let settings = PipelineSettings {
            catalog_source: SinkRole::WideColumn,
            ..tiny_settings()
        };
        let (pipeline, document, _) = memory_pipeline(settings);
        document.fail_reads(true);
        assert!(pipeline.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_catalog_is_fatal() {
        let (pipeline, document, _) = memory_pipeline(tiny_settings());
        document.fail_table("produto");
        let err = pipeline.run().await.unwrap_err();
        assert!(
            matches!(err, RetailSeedError::EmptyCatalog { invoices: 12, .. }),
            "{}",
            err
        );
    }

    #[tokio::test]
    async fn test_cancel_between_stages() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let (pipeline, document, _) = memory_pipeline(tiny_settings());
        let pipeline = pipeline
            .with_cancellation(cancel)
            .with_progress(Arc::new(move |event: &ProgressEvent| {
                if let ProgressEvent::StageCompleted(report) = event {
                    if report.stage == Stage::Suppliers {
                        trigger.cancel();
                    }
                }
            }));

        let err = pipeline.run().await.unwrap_err();
        match err {
            RetailSeedError::Cancelled {
                stage,
                completed_stages,
            } => {
                assert_eq!(stage, "products");
                assert_eq!(completed_stages, 3);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(document.len("fornecedor"), 4);
        assert_eq!(document.len("produto"), 0);
    }

    struct PanickingSink;

    #[async_trait]
    impl RecordSink for PanickingSink {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn upsert(
            &self,
            _table: &str,
            _record: &Record,
        ) -> std::result::Result<(), SinkError> {
            panic!("sink exploded");
        }

        async fn bulk_read(&self, _table: &str) -> std::result::Result<Vec<Row>, SinkError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_worker_panic_surfaces_as_worker_failed() {
        let writer = DualWriter::new(Arc::new(PanickingSink), Arc::new(MemorySink::new("memory")));
        let pipeline = Pipeline::new(tiny_settings(), writer).unwrap();
        let err = pipeline.run().await.unwrap_err();
        assert!(
            matches!(err, RetailSeedError::WorkerFailed { stage: "cities", .. }),
            "{}",
            err
        );
    }

    #[test]
    fn test_zero_workers_rejected_before_any_stage() {
        let settings = PipelineSettings {
            workers: 0,
            ..tiny_settings()
        };
        let writer = DualWriter::new(
            Arc::new(MemorySink::new("a")),
            Arc::new(MemorySink::new("b")),
        );
        assert!(matches!(
            Pipeline::new(settings, writer),
            Err(RetailSeedError::Config { .. })
        ));
    }
}
