pub mod enrich;
pub mod populate;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::batch::{BatchOptions, BatchRunner, BatchSummary, Selection};
use crate::cli::StoreArgs;
use crate::config::{EnrichConfig, load_config};
use crate::engine::passes::EnrichPass;
use crate::generation::{NoTranslator, TranslationMemory, Translator};
use crate::model::EnrichRunManifest;
use crate::store::{JsonDirStore, RecordStore, SqliteStore};
use crate::util::{interrupt_flag, now_utc_string, utc_compact_string, write_json_atomic};

pub fn open_store(args: &StoreArgs) -> Result<Box<dyn RecordStore>> {
    match &args.db_path {
        Some(db_path) => Ok(Box::new(SqliteStore::open(db_path)?)),
        None => Ok(Box::new(JsonDirStore::open(&args.records_dir)?)),
    }
}

pub fn load_store_config(args: &StoreArgs) -> Result<EnrichConfig> {
    load_config(args.config.as_deref())
}

pub fn load_translator(path: Option<&Path>) -> Result<Box<dyn Translator>> {
    match path {
        Some(path) => Ok(Box::new(TranslationMemory::load(path)?)),
        None => Ok(Box::new(NoTranslator)),
    }
}

pub struct BatchCommand<'a> {
    pub command: &'static str,
    pub store: &'a dyn RecordStore,
    pub config: &'a EnrichConfig,
    pub passes: &'a [Box<dyn EnrichPass + 'a>],
    pub options: BatchOptions,
    pub report_path: Option<PathBuf>,
}

// Runs the batch, writes the run manifest and fails the command when any
// record failed or the run was interrupted.
pub fn run_batch(command: BatchCommand<'_>, selection: Selection) -> Result<()> {
    let started = Utc::now();
    let started_at = now_utc_string();
    let cancel = interrupt_flag();

    let runner = BatchRunner {
        store: command.store,
        config: command.config,
        passes: command.passes,
        options: command.options,
        cancel: &cancel,
    };
    let summary = runner.run(selection)?;

    let manifest = build_manifest(&command, &runner.pass_names(), &summary, started_at, started);
    let manifest_path = command.report_path.clone().unwrap_or_else(|| {
        command
            .store
            .manifest_dir()
            .join(format!("enrich_run_{}.json", utc_compact_string(started)))
    });
    write_json_atomic(&manifest_path, &manifest)
        .with_context(|| format!("failed to write run manifest {}", manifest_path.display()))?;
    info!(path = %manifest_path.display(), status = %manifest.status, "wrote run manifest");

    for (key, err) in summary.failures() {
        error!(key = %key, kind = err.kind(), error = %err, "failed record");
    }
    for warning in &summary.warnings {
        warn!(warning = %warning, "batch warning");
    }

    let counts = manifest.counts;
    if counts.errors > 0 {
        bail!(
            "{} of {} records failed; see {}",
            counts.errors,
            counts.selected,
            manifest_path.display()
        );
    }
    if summary.interrupted {
        bail!("run interrupted after {} records", counts.selected);
    }
    Ok(())
}

fn build_manifest(
    command: &BatchCommand<'_>,
    passes: &[String],
    summary: &BatchSummary,
    started_at: String,
    started: chrono::DateTime<Utc>,
) -> EnrichRunManifest {
    let counts = summary.counts();
    let status = if summary.interrupted {
        "interrupted"
    } else if counts.errors > 0 {
        "completed_with_errors"
    } else {
        "completed"
    };

    EnrichRunManifest {
        manifest_version: 1,
        run_id: format!("run-{}", utc_compact_string(started)),
        command: command.command.to_string(),
        status: status.to_string(),
        started_at,
        updated_at: now_utc_string(),
        store: command.store.describe(),
        passes: passes.to_vec(),
        dry_run: command.options.dry_run,
        counts,
        records: summary.reports.iter().map(|report| report.to_entry()).collect(),
        warnings: summary.warnings.clone(),
    }
}
