use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::Table as ComfyTable;

use retailseed_core::config::{PipelineSettings, Volumes};
use retailseed_core::generate::value::Value;
use retailseed_core::schema::EntityKind;
use retailseed_core::sink::MemorySink;
use retailseed_core::{DualWriter, Pipeline, SinkRole};

use crate::args::PreviewArgs;

/// Run a miniature pipeline into in-memory sinks and print what landed.
pub async fn run(args: &PreviewArgs) -> Result<()> {
    let n = args.rows.max(1);
    let settings = PipelineSettings {
        volumes: Volumes {
            cities: n,
            addresses: None,
            suppliers: n,
            products: n,
            stores: n,
            terminals: n,
            registers: n,
            customers: n,
            invoices: n,
        },
        workers: 1,
        seed: args.seed,
        base_time: None,
        catalog_source: SinkRole::Document,
    };

    let document = Arc::new(MemorySink::new("preview"));
    let writer = DualWriter::new(document.clone(), Arc::new(MemorySink::new("preview-shadow")));
    Pipeline::new(settings, writer)?
        .run()
        .await
        .context("Preview generation failed")?;

    for kind in EntityKind::ALL {
        let records = document.records(kind.table_name());
        if records.is_empty() {
            continue;
        }

        let shown: Vec<_> = records.iter().take(n).collect();
        println!(
            "━━━ {} ({} of {} records) ━━━",
            kind.table_name(),
            shown.len(),
            records.len()
        );

        // Products without a promotion lack the promotion columns, so
        // collect headers across all shown records.
        let mut columns: Vec<&str> = Vec::new();
        for record in &shown {
            for (name, _) in record.fields() {
                if !columns.contains(&name) {
                    columns.push(name);
                }
            }
        }

        let mut t = ComfyTable::new();
        t.set_header(columns.clone());
        for record in shown {
            let values: Vec<String> = columns
                .iter()
                .map(|col| match record.get(col) {
                    Some(Value::Null) => "null".to_string(),
                    Some(v) => truncate(&v.to_string(), 40),
                    None => "-".to_string(),
                })
                .collect();
            t.add_row(values);
        }

        println!("{}\n", t);
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
