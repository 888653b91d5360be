#![doc = include_str!("../README.md")]

mod config;
mod snapshot;
mod telemetry;

use std::io::{self, BufWriter, Write};

use clap::Parser;
use config::{Action, CliArgs, CliConfig, ScriptKind};
use revkey::{InMemorySequenceSource, PooledBitReversedSequenceGenerator, SchemaExporter};
use snapshot::SchemaSnapshot;
use telemetry::init_telemetry;

// mimalloc keeps allocation cheap under contention, including on musl.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_telemetry()?;
    tracing::debug!(?config, "starting");

    let lines = match &config.action {
        Action::Script { kind, snapshot } => {
            let snapshot = SchemaSnapshot::load(snapshot)?;
            render_script(&config, *kind, &snapshot)?
        }
        Action::Allocate { descriptor, count } => {
            let generator = PooledBitReversedSequenceGenerator::new(InMemorySequenceSource::new())
                .with_dialect(config.dialect);
            let keys = (0..*count)
                .map(|_| generator.next_id(descriptor).map(|key| key.to_string()))
                .collect::<revkey::Result<Vec<_>>>()?;
            tracing::info!(
                sequence = %descriptor.name(),
                keys = keys.len(),
                round_trips = generator.source().round_trips(),
                "allocated"
            );
            keys
        }
    };

    let mut out = BufWriter::new(io::stdout().lock());
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

fn render_script(
    config: &CliConfig,
    kind: ScriptKind,
    snapshot: &SchemaSnapshot,
) -> anyhow::Result<Vec<String>> {
    let graph = snapshot.graph(&config.dialect)?;
    let mut exporter =
        SchemaExporter::new(config.dialect).with_after_batch(snapshot.after_batch.iter().cloned());
    if let Some(max) = config.max_batch_statements {
        exporter = exporter.with_max_statements_per_batch(max);
    }

    let script = match kind {
        ScriptKind::Create => exporter.generate_create_script(&graph)?,
        ScriptKind::Drop => match &snapshot.existing {
            Some(existing) => exporter.generate_drop_script_for(&graph, existing)?,
            None => exporter.generate_drop_script(&graph)?,
        },
        ScriptKind::Update => {
            exporter.generate_update_script(&graph, &snapshot.existing_or_empty())?
        }
        ScriptKind::Recreate => {
            exporter.generate_recreate_script(&graph, &snapshot.existing_or_empty())?
        }
    };
    Ok(script)
}
