use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::EnrichConfig;
use crate::engine::SectionNumber;
use crate::engine::diff::detect_changes;
use crate::engine::normalize::normalize_record;
use crate::engine::passes::{EnrichPass, SectionContext, synthesize_skeleton};
use crate::error::{EnrichError, EnrichResult};
use crate::model::{Record, RecordRunEntry, RunCounts};
use crate::store::RecordStore;
use crate::util::sha256_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Single(SectionNumber),
    Range {
        start: SectionNumber,
        end: SectionNumber,
    },
}

impl Selection {
    pub fn range(start: u32, end: u32) -> Result<Self> {
        if start > end {
            bail!("invalid section range {start}..={end}: start is after end");
        }
        Ok(Self::Range {
            start: SectionNumber::new(start),
            end: SectionNumber::new(end),
        })
    }

    fn contains(self, section: SectionNumber) -> bool {
        match self {
            Self::All => true,
            Self::Single(only) => only == section,
            Self::Range { start, end } => start <= section && section <= end,
        }
    }

    fn explicit_sections(self) -> Vec<SectionNumber> {
        match self {
            Self::All => Vec::new(),
            Self::Single(only) => vec![only],
            Self::Range { start, end } => (start.number()..=end.number())
                .map(SectionNumber::new)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    pub dry_run: bool,
    pub synthesize_missing: bool,
}

#[derive(Debug)]
pub enum RecordOutcome {
    Modified { changed_paths: Vec<String> },
    Unmodified,
    Failed(EnrichError),
}

impl RecordOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Modified { .. } => "modified",
            Self::Unmodified => "unmodified",
            Self::Failed(_) => "error",
        }
    }
}

#[derive(Debug)]
pub struct RecordReport {
    pub key: String,
    pub section: SectionNumber,
    pub outcome: RecordOutcome,
    pub hash_before: Option<String>,
    pub hash_after: Option<String>,
}

impl RecordReport {
    pub fn to_entry(&self) -> RecordRunEntry {
        let (changed_paths, error_kind, error) = match &self.outcome {
            RecordOutcome::Modified { changed_paths } => (changed_paths.clone(), None, None),
            RecordOutcome::Unmodified => (Vec::new(), None, None),
            RecordOutcome::Failed(err) => (
                Vec::new(),
                Some(err.kind().to_string()),
                Some(err.to_string()),
            ),
        };

        RecordRunEntry {
            key: self.key.clone(),
            section: Some(self.section.number()),
            outcome: self.outcome.label().to_string(),
            changed_paths,
            error_kind,
            error,
            hash_before: self.hash_before.clone(),
            hash_after: self.hash_after.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<RecordReport>,
    pub interrupted: bool,
    pub warnings: Vec<String>,
}

impl BatchSummary {
    pub fn counts(&self) -> RunCounts {
        let mut counts = RunCounts {
            selected: self.reports.len(),
            modified: 0,
            unmodified: 0,
            errors: 0,
        };
        for report in &self.reports {
            match report.outcome {
                RecordOutcome::Modified { .. } => counts.modified += 1,
                RecordOutcome::Unmodified => counts.unmodified += 1,
                RecordOutcome::Failed(_) => counts.errors += 1,
            }
        }
        counts
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &EnrichError)> {
        self.reports.iter().filter_map(|report| match &report.outcome {
            RecordOutcome::Failed(err) => Some((report.key.as_str(), err)),
            _ => None,
        })
    }
}

pub struct BatchRunner<'a> {
    pub store: &'a dyn RecordStore,
    pub config: &'a EnrichConfig,
    pub passes: &'a [Box<dyn EnrichPass + 'a>],
    pub options: BatchOptions,
    pub cancel: &'a AtomicBool,
}

struct Target {
    key: String,
    section: SectionNumber,
}

impl BatchRunner<'_> {
    pub fn run(&self, selection: Selection) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        let targets = self.resolve_targets(selection, &mut summary)?;

        info!(
            store = %self.store.describe(),
            selected = targets.len(),
            passes = ?self.pass_names(),
            dry_run = self.options.dry_run,
            "starting enrichment batch"
        );

        for target in targets {
            if self.cancel.load(Ordering::SeqCst) {
                warn!(next = %target.key, "batch interrupted before completion");
                summary.interrupted = true;
                break;
            }

            let report = self.process(target);
            match &report.outcome {
                RecordOutcome::Modified { changed_paths } => info!(
                    key = %report.key,
                    changed = changed_paths.len(),
                    dry_run = self.options.dry_run,
                    "record modified"
                ),
                RecordOutcome::Unmodified => debug!(key = %report.key, "record unmodified"),
                RecordOutcome::Failed(err) => error!(
                    key = %report.key,
                    kind = err.kind(),
                    error = %err,
                    "record failed"
                ),
            }
            summary.reports.push(report);
        }

        let counts = summary.counts();
        info!(
            selected = counts.selected,
            modified = counts.modified,
            unmodified = counts.unmodified,
            errors = counts.errors,
            interrupted = summary.interrupted,
            "enrichment batch finished"
        );

        Ok(summary)
    }

    pub fn pass_names(&self) -> Vec<String> {
        self.passes
            .iter()
            .map(|pass| pass.name().to_string())
            .collect()
    }

    fn resolve_targets(
        &self,
        selection: Selection,
        summary: &mut BatchSummary,
    ) -> Result<Vec<Target>> {
        let mut by_section: BTreeMap<SectionNumber, Vec<String>> = BTreeMap::new();
        for key in self.store.list_keys()? {
            match SectionNumber::parse(&key) {
                Some(section) if selection.contains(section) => {
                    by_section.entry(section).or_default().push(key)
                }
                Some(_) => {}
                None => debug!(key = %key, "skipping key without a section number"),
            }
        }

        for section in selection.explicit_sections() {
            if !by_section.contains_key(&section) {
                // Missing records are either synthesized or reported as
                // unknown by `process`.
                by_section.insert(section, vec![section.record_id()]);
            }
        }

        let mut targets = Vec::new();
        for (section, keys) in by_section {
            if keys.len() > 1 {
                let message = format!(
                    "section {section} is stored under several keys: {}",
                    keys.join(", ")
                );
                warn!(section = %section, keys = ?keys, "duplicate section records");
                summary.warnings.push(message);
            }
            targets.extend(keys.into_iter().map(|key| Target { key, section }));
        }
        Ok(targets)
    }

    fn process(&self, target: Target) -> RecordReport {
        let mut report = RecordReport {
            key: target.key,
            section: target.section,
            outcome: RecordOutcome::Unmodified,
            hash_before: None,
            hash_after: None,
        };

        report.outcome = match self.enrich_one(&mut report) {
            Ok(outcome) => outcome,
            Err(err) => RecordOutcome::Failed(err),
        };
        report
    }

    fn enrich_one(&self, report: &mut RecordReport) -> EnrichResult<RecordOutcome> {
        let key = report.key.clone();
        let key = key.as_str();
        let raw = self
            .store
            .read_raw(key)
            .map_err(|err| EnrichError::persistence(key, &err))?
            .map(|text| parse_stored(&text))
            .transpose()?;

        let mut record = match &raw {
            Some(raw) => {
                report.hash_before = Some(hash_value(key, raw)?);
                normalize_record(raw, &self.config.language_policy())?
            }
            None if self.options.synthesize_missing => {
                info!(key = %key, "synthesizing skeleton record");
                synthesize_skeleton(report.section, self.config)?
            }
            None => return Err(EnrichError::UnknownSection(report.section.number())),
        };

        let section = authoritative_section(&record, report.section);
        let context = SectionContext {
            section,
            config: self.config,
        };
        for pass in self.passes {
            pass.apply(&context, &mut record)?;
        }

        let candidate = record_value(&record)?;
        let changes = detect_changes(raw.as_ref().unwrap_or(&Value::Null), &candidate);
        if !changes.is_modified() {
            report.hash_after = report.hash_before.clone();
            return Ok(RecordOutcome::Unmodified);
        }

        report.hash_after = Some(hash_value(key, &candidate)?);
        if !self.options.dry_run {
            self.store
                .save(key, &candidate)
                .map_err(|err| EnrichError::persistence(key, &err))?;
        }

        Ok(RecordOutcome::Modified {
            changed_paths: changes.changed_paths,
        })
    }
}

// The numeric part of the stored id wins over the storage key.
fn authoritative_section(record: &Record, fallback: SectionNumber) -> SectionNumber {
    SectionNumber::parse(&record.id).unwrap_or(fallback)
}

fn parse_stored(text: &str) -> EnrichResult<Value> {
    serde_json::from_str(text).map_err(|err| {
        EnrichError::malformed("$", format!("stored record is not valid JSON: {err}"))
    })
}

fn record_value(record: &Record) -> EnrichResult<Value> {
    serde_json::to_value(record)
        .map_err(|err| EnrichError::malformed("$", format!("failed to serialize record: {err}")))
}

fn hash_value(key: &str, value: &Value) -> EnrichResult<String> {
    sha256_json(value).map_err(|err| EnrichError::persistence(key, &err))
}

#[cfg(test)]
mod tests;
