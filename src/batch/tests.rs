use std::fs;
use std::sync::atomic::AtomicBool;

use serde_json::{Value, json};

use super::*;
use crate::engine::passes::{AssignIdsPass, DeriveLocatorsPass, FallbackPass, GeneratePass};
use crate::engine::merge::ContentGroup;
use crate::generation::ResponseDirGenerator;
use crate::store::JsonDirStore;

fn languages(text: &str) -> Value {
    json!({ "en": text, "bn": text, "hi": text, "ur": text, "tr": text })
}

fn canonical_record(section: u32) -> Value {
    let nn = format!("{section:02}");
    json!({
        "id": format!("section_{nn}"),
        "order": section,
        "level": "A1",
        "title": languages("Ward routines"),
        "textContent": {
            "learningObjectives": {
                "en": ["Greet a patient"],
                "bn": ["Greet a patient"],
                "hi": ["Greet a patient"],
                "ur": ["Greet a patient"],
                "tr": ["Greet a patient"]
            }
        },
        "vocabulary": [
            {
                "id": format!("v{nn}_01"),
                "germanTerm": "das Herz",
                "translation": languages("heart"),
                "audioUrl": format!("assets/audio/sections/section_{nn}/vocabulary/v{nn}_01.mp3")
            },
            {
                "id": format!("v{nn}_02"),
                "germanTerm": "die Lunge",
                "translation": languages("lung"),
                "audioUrl": format!("assets/audio/sections/section_{nn}/vocabulary/v{nn}_02.mp3")
            }
        ],
        "dialogues": [
            {
                "id": format!("d{nn}_01"),
                "title": languages("Admission"),
                "lines": [
                    {
                        "speaker": "Pflegekraft",
                        "germanText": "Guten Morgen!",
                        "audioUrl": format!("assets/audio/sections/section_{nn}/dialogues/d{nn}_01_line1.mp3")
                    }
                ]
            }
        ],
        "media": { "cover": null }
    })
}

fn seed_store(count: u32) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for section in 1..=count {
        let path = dir.path().join(format!("section_{section:02}.json"));
        fs::write(&path, serde_json::to_string_pretty(&canonical_record(section)).expect("json"))
            .expect("seed record");
    }
    dir
}

fn enrich_passes(config: &EnrichConfig) -> Vec<Box<dyn EnrichPass + '_>> {
    vec![
        Box::new(AssignIdsPass),
        Box::new(DeriveLocatorsPass::new(config)),
        Box::new(FallbackPass),
    ]
}

fn run(
    store: &dyn RecordStore,
    config: &EnrichConfig,
    passes: &[Box<dyn EnrichPass + '_>],
    options: BatchOptions,
    selection: Selection,
) -> BatchSummary {
    let cancel = AtomicBool::new(false);
    BatchRunner {
        store,
        config,
        passes,
        options,
        cancel: &cancel,
    }
    .run(selection)
    .expect("batch should run")
}

#[test]
fn only_the_record_missing_a_locator_is_modified() {
    let dir = seed_store(55);
    let mut broken = canonical_record(17);
    broken["vocabulary"][1]
        .as_object_mut()
        .expect("vocabulary item")
        .remove("audioUrl");
    fs::write(
        dir.path().join("section_17.json"),
        serde_json::to_string(&broken).expect("json"),
    )
    .expect("seed broken record");

    let store = JsonDirStore::open(dir.path()).expect("store");
    let config = EnrichConfig::default();
    let passes = enrich_passes(&config);

    let summary = run(&store, &config, &passes, BatchOptions::default(), Selection::All);
    let counts = summary.counts();
    assert_eq!(counts.selected, 55);
    assert_eq!(counts.modified, 1);
    assert_eq!(counts.unmodified, 54);
    assert_eq!(counts.errors, 0);

    let modified = summary
        .reports
        .iter()
        .find(|report| matches!(report.outcome, RecordOutcome::Modified { .. }))
        .expect("one modified record");
    assert_eq!(modified.key, "section_17");
    match &modified.outcome {
        RecordOutcome::Modified { changed_paths } => {
            assert_eq!(changed_paths, &vec!["vocabulary[1].audioUrl".to_string()])
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_ne!(modified.hash_before, modified.hash_after);

    let repaired: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("section_17.json")).expect("read back"),
    )
    .expect("parse back");
    assert_eq!(
        repaired["vocabulary"][1]["audioUrl"],
        "assets/audio/sections/section_17/vocabulary/v17_02.mp3"
    );
    assert_eq!(repaired["media"], json!({ "cover": null }));

    let second = run(&store, &config, &passes, BatchOptions::default(), Selection::All);
    assert_eq!(second.counts().modified, 0);
    assert_eq!(second.counts().unmodified, 55);
}

#[test]
fn unmodified_records_are_not_rewritten() {
    let dir = seed_store(2);
    let path = dir.path().join("section_01.json");
    let before = fs::read_to_string(&path).expect("read");

    let store = JsonDirStore::open(dir.path()).expect("store");
    let config = EnrichConfig::default();
    let passes = enrich_passes(&config);
    let summary = run(&store, &config, &passes, BatchOptions::default(), Selection::All);

    assert_eq!(summary.counts().unmodified, 2);
    assert_eq!(fs::read_to_string(&path).expect("read"), before);
}

#[test]
fn failures_are_isolated_and_reported() {
    let dir = seed_store(3);
    fs::write(
        dir.path().join("section_02.json"),
        r#"{ "id": "section_02", "title": 42 }"#,
    )
    .expect("seed malformed record");
    let mut stale = canonical_record(3);
    stale["vocabulary"][0]["id"] = json!("x");
    fs::write(
        dir.path().join("section_03.json"),
        serde_json::to_string(&stale).expect("json"),
    )
    .expect("seed stale record");

    let store = JsonDirStore::open(dir.path()).expect("store");
    let config = EnrichConfig::default();
    let passes = enrich_passes(&config);
    let summary = run(&store, &config, &passes, BatchOptions::default(), Selection::All);

    let counts = summary.counts();
    assert_eq!(counts.errors, 1);
    assert_eq!(counts.modified, 1);
    assert_eq!(counts.unmodified, 1);

    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "section_02");
    assert_eq!(failures[0].1.kind(), "malformed-input");
}

#[test]
fn unparseable_record_is_malformed_input() {
    let dir = seed_store(2);
    fs::write(dir.path().join("section_02.json"), "{ not json").expect("seed broken json");

    let store = JsonDirStore::open(dir.path()).expect("store");
    let config = EnrichConfig::default();
    let passes = enrich_passes(&config);
    let summary = run(&store, &config, &passes, BatchOptions::default(), Selection::All);

    assert_eq!(summary.counts().unmodified, 1);
    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "section_02");
    assert_eq!(failures[0].1.kind(), "malformed-input");
}

#[test]
fn explicit_null_scalars_do_not_count_as_changes() {
    let dir = seed_store(1);
    let mut record = canonical_record(1);
    record["vocabulary"][0]["plural"] = Value::Null;
    record["dialogues"][0]["lines"][0]["speakerRole"] = Value::Null;
    record["exercises"] = json!([{
        "id": "e01_01",
        "type": "fillBlank",
        "correctAnswer": null,
        "points": null
    }]);
    let raw = serde_json::to_string_pretty(&record).expect("json");
    fs::write(dir.path().join("section_01.json"), &raw).expect("seed");

    let store = JsonDirStore::open(dir.path()).expect("store");
    let config = EnrichConfig::default();
    let passes = enrich_passes(&config);
    let summary = run(&store, &config, &passes, BatchOptions::default(), Selection::All);

    assert_eq!(summary.counts().unmodified, 1, "{:?}", summary.reports);
    assert_eq!(
        fs::read_to_string(dir.path().join("section_01.json")).expect("read"),
        raw
    );
}

#[test]
fn dry_run_reports_changes_without_writing() {
    let dir = seed_store(1);
    let mut stale = canonical_record(1);
    stale["dialogues"][0]["lines"][0]["audioUrl"] = json!("old.mp3");
    let raw = serde_json::to_string(&stale).expect("json");
    fs::write(dir.path().join("section_01.json"), &raw).expect("seed");

    let store = JsonDirStore::open(dir.path()).expect("store");
    let config = EnrichConfig::default();
    let passes = enrich_passes(&config);
    let options = BatchOptions {
        dry_run: true,
        ..BatchOptions::default()
    };
    let summary = run(&store, &config, &passes, options, Selection::All);

    assert_eq!(summary.counts().modified, 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("section_01.json")).expect("read"),
        raw
    );
}

#[test]
fn selection_limits_records_and_reports_missing_sections() {
    let dir = seed_store(6);
    let store = JsonDirStore::open(dir.path()).expect("store");
    let config = EnrichConfig::default();
    let passes = enrich_passes(&config);

    let summary = run(
        &store,
        &config,
        &passes,
        BatchOptions::default(),
        Selection::range(5, 7).expect("range"),
    );
    let keys: Vec<_> = summary.reports.iter().map(|report| report.key.as_str()).collect();
    assert_eq!(keys, vec!["section_05", "section_06", "section_07"]);

    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "section_07");
    assert_eq!(failures[0].1.kind(), "unknown-section");

    let single = run(
        &store,
        &config,
        &passes,
        BatchOptions::default(),
        Selection::Single(SectionNumber::new(2)),
    );
    assert_eq!(single.counts().selected, 1);
    assert!(Selection::range(9, 3).is_err());
}

#[test]
fn cancellation_stops_before_the_next_record() {
    let dir = seed_store(3);
    let store = JsonDirStore::open(dir.path()).expect("store");
    let config = EnrichConfig::default();
    let passes = enrich_passes(&config);
    let cancel = AtomicBool::new(true);

    let summary = BatchRunner {
        store: &store,
        config: &config,
        passes: &passes,
        options: BatchOptions::default(),
        cancel: &cancel,
    }
    .run(Selection::All)
    .expect("batch should run");

    assert!(summary.interrupted);
    assert_eq!(summary.counts().selected, 0);
}

#[test]
fn populate_synthesizes_missing_sections_from_recorded_responses() {
    let records = tempfile::tempdir().expect("records");
    let responses = tempfile::tempdir().expect("responses");
    let section_dir = responses.path().join("section_14");
    fs::create_dir_all(&section_dir).expect("response dir");
    fs::write(
        section_dir.join("vocabulary.json"),
        r#"[
            {"germanTerm": "die Schmerzskala", "translation": {"en": "pain scale"}},
            {"germanTerm": "der Verband", "translation": "bandage"},
        ]"#,
    )
    .expect("vocabulary response");
    fs::write(
        section_dir.join("metadata.json"),
        r#"{
            "title": {"en": "Pain assessment"},
            "description": {"en": "Asking about pain"},
            "textContent": {"grammarFocus": {"en": "Adjective endings"}},
            "learningObjectives": ["Use a pain scale"]
        }"#,
    )
    .expect("metadata response");

    let store = JsonDirStore::open(records.path()).expect("store");
    let config = EnrichConfig::default();
    let generator = ResponseDirGenerator::new(responses.path());
    let mut groups = ContentGroup::METADATA.to_vec();
    groups.push(ContentGroup::Vocabulary);
    let passes: Vec<Box<dyn EnrichPass + '_>> = vec![
        Box::new(GeneratePass::new(&generator, groups)),
        Box::new(AssignIdsPass),
        Box::new(DeriveLocatorsPass::new(&config)),
        Box::new(FallbackPass),
    ];
    let options = BatchOptions {
        synthesize_missing: true,
        ..BatchOptions::default()
    };

    let summary = run(
        &store,
        &config,
        &passes,
        options,
        Selection::Single(SectionNumber::new(14)),
    );
    assert_eq!(summary.counts().modified, 1, "{:?}", summary.reports);

    let saved = store
        .load("section_14")
        .expect("load")
        .expect("record should be written");
    assert_eq!(saved["id"], "section_14");
    assert_eq!(saved["level"], "B1");
    assert_eq!(saved["isPremium"], true);
    assert_eq!(saved["title"]["en"], "Pain assessment");
    assert_eq!(saved["title"]["tr"], "Pain assessment");
    assert_eq!(saved["vocabulary"][1]["id"], "v14_02");
    assert_eq!(saved["vocabulary"][1]["translation"], json!({ "en": "bandage" }));
    assert_eq!(
        saved["vocabulary"][1]["audioUrl"],
        "assets/audio/sections/section_14/vocabulary/v14_02.mp3"
    );
    assert_eq!(
        saved["textContent"]["learningObjectives"]["en"],
        json!(["Use a pain scale"])
    );
    assert!(
        saved["provisionalTranslations"]
            .as_array()
            .expect("markers")
            .contains(&json!("textContent.grammarFocus.bn"))
    );

    let rerun = run(
        &store,
        &config,
        &passes,
        options,
        Selection::Single(SectionNumber::new(14)),
    );
    assert_eq!(rerun.counts().unmodified, 1);
}
