use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::engine::SectionNumber;
use crate::model::EnrichRunManifest;
use crate::store::RecordStore;

use super::open_store;

#[derive(Debug, Default, PartialEq, Eq)]
struct CorpusStatus {
    records: usize,
    unnumbered: usize,
    vocabulary: usize,
    dialogue_lines: usize,
    exercises: usize,
    missing_locators: usize,
    provisional: usize,
}

pub fn run(args: StatusArgs) -> Result<()> {
    let store = open_store(&args.store)?;
    info!(store = %store.describe(), "status requested");

    let status = collect_status(store.as_ref())?;
    info!(
        records = status.records,
        unnumbered = status.unnumbered,
        vocabulary = status.vocabulary,
        dialogue_lines = status.dialogue_lines,
        exercises = status.exercises,
        missing_locators = status.missing_locators,
        provisional_translations = status.provisional,
        "corpus status"
    );

    match latest_manifest(&store.manifest_dir())? {
        Some(path) => {
            let raw = fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let manifest: EnrichRunManifest = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            info!(
                run_id = %manifest.run_id,
                command = %manifest.command,
                status = %manifest.status,
                updated_at = %manifest.updated_at,
                modified = manifest.counts.modified,
                unmodified = manifest.counts.unmodified,
                errors = manifest.counts.errors,
                "last run manifest"
            );
        }
        None => warn!(path = %store.manifest_dir().display(), "no run manifest found"),
    }

    Ok(())
}

fn collect_status(store: &dyn RecordStore) -> Result<CorpusStatus> {
    let mut status = CorpusStatus::default();
    for key in store.list_keys()? {
        if SectionNumber::parse(&key).is_none() {
            status.unnumbered += 1;
            continue;
        }
        let Some(record) = store.load(&key)? else {
            continue;
        };
        status.records += 1;

        for item in entries(&record, "vocabulary") {
            status.vocabulary += 1;
            status.missing_locators += usize::from(lacks_locator(item));
        }
        for dialogue in entries(&record, "dialogues") {
            for line in entries(dialogue, "lines") {
                status.dialogue_lines += 1;
                status.missing_locators += usize::from(lacks_locator(line));
            }
        }
        status.exercises += entries(&record, "exercises").len();
        status.provisional += entries(&record, "provisionalTranslations").len();
    }
    Ok(status)
}

fn entries<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn lacks_locator(entity: &Value) -> bool {
    entity
        .get("audioUrl")
        .and_then(Value::as_str)
        .map(|url| url.trim().is_empty())
        .unwrap_or(true)
}

fn latest_manifest(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut manifests = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("enrich_run_") && name.ends_with(".json"))
            .unwrap_or(false);
        if is_run_manifest {
            manifests.push(path);
        }
    }

    manifests.sort();
    Ok(manifests.pop())
}
