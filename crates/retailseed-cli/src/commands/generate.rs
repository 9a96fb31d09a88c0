use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use comfy_table::{Cell, Table as ComfyTable};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use retailseed_core::config::{self, RetailSeedConfig};
use retailseed_core::pipeline::{ProgressEvent, RunReport, Stage};
use retailseed_core::sink::cassandra::parse_consistency;
use retailseed_core::sink::{CassandraSink, MemorySink, MongoSink};
use retailseed_core::{DualWriter, Pipeline, RetailSeedError, SinkRole};

use crate::args::GenerateArgs;

pub async fn run(args: &GenerateArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;

    let mut settings = config.settings()?;
    if let Some(workers) = args.workers {
        settings.workers = workers;
    }
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }

    let writer = if args.dry_run {
        eprintln!("Dry run: writing into in-memory sinks");
        DualWriter::new(
            Arc::new(MemorySink::new("memory-document")),
            Arc::new(MemorySink::new("memory-wide-column")),
        )
    } else {
        connect(&config, args).await?
    };

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling... waiting for in-flight writes to finish");
            on_ctrl_c.cancel();
        }
    });

    let seed = settings.seed;
    let bars = StageBars::new();
    let progress_bars = Arc::clone(&bars);
    let pipeline = Pipeline::new(settings, writer)?
        .with_cancellation(cancel)
        .with_progress(Arc::new(move |event: &ProgressEvent| {
            progress_bars.handle(event);
        }));

    eprintln!(
        "Generating with seed {} and {} workers per stage",
        seed,
        pipeline.settings().workers
    );

    let report = pipeline.run().await;
    bars.clear();
    let report = report.context("Pipeline run failed; completed stages keep their data")?;

    print_summary(&report);
    eprintln!(
        "\n✓ Generated {} records ({} writes) across {} stages in {:.1?} (seed {})",
        report.total_records(),
        report.total_writes(),
        report.stages.len(),
        report.duration,
        report.seed,
    );
    let failures =
        report.total_failures(SinkRole::Document) + report.total_failures(SinkRole::WideColumn);
    if failures > 0 {
        eprintln!(
            "  {} sink writes failed and were skipped (see warnings above)",
            failures
        );
    }

    Ok(())
}

/// Explicit `--config` must exist; otherwise `./retailseed.toml` is optional.
fn load_config(explicit: Option<&Path>) -> Result<RetailSeedConfig> {
    let config = match explicit {
        Some(path) => config::load_config_file(path)?,
        None => config::read_config(Path::new("."))?.unwrap_or_default(),
    };
    match &config.config_path {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No {} found, using defaults", config::CONFIG_FILE_NAME),
    }
    Ok(config)
}

async fn connect(config: &RetailSeedConfig, args: &GenerateArgs) -> Result<DualWriter> {
    let uri = args
        .mongo_uri
        .clone()
        .unwrap_or_else(|| config.document_store.uri.clone());
    let mongo = MongoSink::connect(&uri, &config.document_store.database)
        .await
        .map_err(|source| RetailSeedError::Connection {
            role: SinkRole::Document,
            message: format!("database '{}'", config.document_store.database),
            endpoint_hint: redact_uri(&uri),
            source,
        })?;
    info!(
        "Connected to MongoDB at {} (database '{}')",
        redact_uri(&uri),
        config.document_store.database
    );

    let hosts = if args.cassandra_host.is_empty() {
        config.wide_column_store.hosts.clone()
    } else {
        args.cassandra_host.clone()
    };
    let consistency = parse_consistency(&config.wide_column_store.consistency)
        .map_err(|message| RetailSeedError::Config { message })?;
    let cassandra = CassandraSink::connect(
        &hosts,
        &config.wide_column_store.keyspace,
        consistency,
        args.create_tables,
    )
    .await
    .map_err(|source| RetailSeedError::Connection {
        role: SinkRole::WideColumn,
        message: format!("keyspace '{}'", config.wide_column_store.keyspace),
        endpoint_hint: hosts.join(","),
        source,
    })?;
    info!(
        "Connected to Cassandra at {} (keyspace '{}')",
        hosts.join(","),
        config.wide_column_store.keyspace
    );

    Ok(DualWriter::new(Arc::new(mongo), Arc::new(cassandra)))
}

/// Hide credentials in a connection string before printing it.
fn redact_uri(uri: &str) -> String {
    match (uri.find("://"), uri.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &uri[..scheme_end], &uri[at..])
        }
        _ => uri.to_string(),
    }
}

/// One progress bar per stage, created when the stage starts.
struct StageBars {
    multi: MultiProgress,
    bars: Mutex<HashMap<Stage, ProgressBar>>,
}

impl StageBars {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        })
    }

    fn handle(&self, event: &ProgressEvent) {
        let mut bars = match self.bars.lock() {
            Ok(bars) => bars,
            Err(poisoned) => poisoned.into_inner(),
        };
        match event {
            ProgressEvent::StageStarted { stage, total } => {
                let position = Stage::ALL.iter().position(|s| s == stage).unwrap_or(0) + 1;
                let pb = self.multi.add(ProgressBar::new(*total as u64));
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template(
                            "{spinner:.cyan} [{prefix}] {msg:<10} {bar:40.cyan/dim} {pos}/{len} ({eta})",
                        )
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░"),
                );
                pb.set_prefix(format!("{}/{}", position, Stage::ALL.len()));
                pb.set_message(stage.name());
                pb.enable_steady_tick(std::time::Duration::from_millis(100));
                bars.insert(*stage, pb);
            }
            ProgressEvent::Milestone {
                stage, processed, ..
            } => {
                if let Some(pb) = bars.get(stage) {
                    pb.set_position(*processed as u64);
                }
            }
            ProgressEvent::CatalogLoaded { products, source } => {
                let _ = self
                    .multi
                    .println(format!("  Loaded {} products from the {}", products, source));
            }
            ProgressEvent::StageCompleted(report) => {
                if let Some(pb) = bars.get(&report.stage) {
                    pb.set_position(report.records as u64);
                    pb.finish_with_message(format!("{} ✓", report.stage));
                }
            }
        }
    }

    /// Stop ticking bars left open by a failed or cancelled stage.
    fn clear(&self) {
        let bars = match self.bars.lock() {
            Ok(bars) => bars,
            Err(poisoned) => poisoned.into_inner(),
        };
        for pb in bars.values() {
            if !pb.is_finished() {
                pb.abandon();
            }
        }
    }
}

fn print_summary(report: &RunReport) {
    let mut t = ComfyTable::new();
    t.set_header(vec![
        "Stage",
        "Records",
        "Writes",
        "MongoDB failures",
        "Cassandra failures",
        "Duration",
    ]);
    for stage in &report.stages {
        t.add_row(vec![
            Cell::new(stage.stage.name()),
            Cell::new(stage.records),
            Cell::new(stage.writes),
            Cell::new(stage.document_failures),
            Cell::new(stage.wide_column_failures),
            Cell::new(format!("{:.1?}", stage.duration)),
        ]);
    }
    println!("{}", t);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());

        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[pipeline]\nworkers = 4\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.pipeline.workers, Some(4));
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_redact_uri_hides_credentials() {
        assert_eq!(
            redact_uri("mongodb://root:secret@db:27017"),
            "mongodb://***@db:27017"
        );
        assert_eq!(
            redact_uri("mongodb://localhost:27017"),
            "mongodb://localhost:27017"
        );
    }
}
