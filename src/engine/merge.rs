use std::collections::BTreeSet;

use serde_json::Value;

use crate::config::LanguagePolicy;
use crate::engine::normalize::{normalize_list, normalize_text};
use crate::error::EnrichResult;
use crate::generation::Translator;
use crate::model::{
    Dialogue, Exercise, LangList, LangText, Language, Record, TextContent, TextField,
    VocabularyItem,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentGroup {
    Title,
    Description,
    Introduction,
    GrammarFocus,
    CulturalNotes,
    Summary,
    LearningObjectives,
    Vocabulary,
    Dialogues,
    Exercises,
}

impl ContentGroup {
    pub const METADATA: [ContentGroup; 7] = [
        ContentGroup::Title,
        ContentGroup::Description,
        ContentGroup::Introduction,
        ContentGroup::GrammarFocus,
        ContentGroup::CulturalNotes,
        ContentGroup::Summary,
        ContentGroup::LearningObjectives,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Introduction => "textContent.introduction",
            Self::GrammarFocus => "textContent.grammarFocus",
            Self::CulturalNotes => "textContent.culturalNotes",
            Self::Summary => "textContent.summary",
            Self::LearningObjectives => "textContent.learningObjectives",
            Self::Vocabulary => "vocabulary",
            Self::Dialogues => "dialogues",
            Self::Exercises => "exercises",
        }
    }

    fn text_field(self) -> Option<TextField> {
        match self {
            Self::Introduction => Some(TextField::Introduction),
            Self::GrammarFocus => Some(TextField::GrammarFocus),
            Self::CulturalNotes => Some(TextField::CulturalNotes),
            Self::Summary => Some(TextField::Summary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SuppliedContent {
    pub title: Option<LangText>,
    pub description: Option<LangText>,
    pub introduction: Option<LangText>,
    pub grammar_focus: Option<LangText>,
    pub cultural_notes: Option<LangText>,
    pub summary: Option<LangText>,
    pub learning_objectives: Option<LangList>,
    pub vocabulary: Option<Vec<VocabularyItem>>,
    pub dialogues: Option<Vec<Dialogue>>,
    pub exercises: Option<Vec<Exercise>>,
}

impl SuppliedContent {
    // Metadata responses carry `title`, `description`, a `textContent` object
    // and, at the top level, `learningObjectives`.
    pub fn from_metadata(value: &Value, policy: &LanguagePolicy) -> EnrichResult<Self> {
        let text_content = value.get("textContent");
        let text_value = |key: &str| {
            text_content
                .and_then(|content| content.get(key))
                .map(|inner| normalize_text(inner, &format!("textContent.{key}"), policy))
                .transpose()
                .map(Option::flatten)
        };
        let objectives = value
            .get("learningObjectives")
            .or_else(|| text_content.and_then(|content| content.get("learningObjectives")));

        Ok(Self {
            title: value
                .get("title")
                .map(|inner| normalize_text(inner, "title", policy))
                .transpose()?
                .flatten(),
            description: value
                .get("description")
                .map(|inner| normalize_text(inner, "description", policy))
                .transpose()?
                .flatten(),
            introduction: text_value("introduction")?,
            grammar_focus: text_value("grammarFocus")?,
            cultural_notes: text_value("culturalNotes")?,
            summary: text_value("summary")?,
            learning_objectives: objectives
                .map(|inner| normalize_list(inner, "learningObjectives", policy))
                .transpose()?
                .flatten(),
            ..Self::default()
        })
    }

    fn text(&self, field: TextField) -> Option<&LangText> {
        match field {
            TextField::Introduction => self.introduction.as_ref(),
            TextField::GrammarFocus => self.grammar_focus.as_ref(),
            TextField::CulturalNotes => self.cultural_notes.as_ref(),
            TextField::Summary => self.summary.as_ref(),
        }
    }
}

// Returns the paths of the groups whose value changed. Groups not listed are
// never touched.
pub fn merge_content(
    record: &mut Record,
    supplied: &SuppliedContent,
    groups: &[ContentGroup],
) -> Vec<String> {
    let mut changed = Vec::new();

    for group in groups {
        let path = group.path();
        let group_changed = match group {
            ContentGroup::Title => merge_lang_text(
                &mut record.title,
                supplied.title.as_ref(),
                path,
                &mut record.provisional_translations,
            ),
            ContentGroup::Description => merge_lang_text(
                &mut record.description,
                supplied.description.as_ref(),
                path,
                &mut record.provisional_translations,
            ),
            ContentGroup::Introduction
            | ContentGroup::GrammarFocus
            | ContentGroup::CulturalNotes
            | ContentGroup::Summary => {
                let Some(field) = group.text_field() else {
                    continue;
                };
                let Some(new) = supplied.text(field).filter(|map| has_text(map)) else {
                    continue;
                };
                let text_content = record.text_content.get_or_insert_with(TextContent::default);
                merge_lang_text(
                    text_content.field_mut(field),
                    Some(new),
                    path,
                    &mut record.provisional_translations,
                )
            }
            ContentGroup::LearningObjectives => {
                let Some(new) = supplied
                    .learning_objectives
                    .as_ref()
                    .filter(|lists| lists.values().any(|items| !items.is_empty()))
                else {
                    continue;
                };
                let text_content = record.text_content.get_or_insert_with(TextContent::default);
                merge_lang_list(
                    &mut text_content.learning_objectives,
                    Some(new),
                    path,
                    &mut record.provisional_translations,
                )
            }
            ContentGroup::Vocabulary => replace_list(
                &mut record.vocabulary,
                supplied.vocabulary.as_ref(),
                path,
                &mut record.provisional_translations,
            ),
            ContentGroup::Dialogues => replace_list(
                &mut record.dialogues,
                supplied.dialogues.as_ref(),
                path,
                &mut record.provisional_translations,
            ),
            ContentGroup::Exercises => replace_list(
                &mut record.exercises,
                supplied.exercises.as_ref(),
                path,
                &mut record.provisional_translations,
            ),
        };

        if group_changed {
            changed.push(path.to_string());
        }
    }

    changed
}

pub fn merge_lang_text(
    target: &mut Option<LangText>,
    new: Option<&LangText>,
    path: &str,
    provisional: &mut BTreeSet<String>,
) -> bool {
    let Some(new) = new else {
        return false;
    };

    let mut changed = false;
    for (language, value) in new {
        if value.trim().is_empty() {
            continue;
        }
        let map = target.get_or_insert_with(LangText::new);
        if map.get(language) != Some(value) {
            map.insert(*language, value.clone());
            changed = true;
        }
        changed |= provisional.remove(&marker(path, *language));
    }
    changed
}

pub fn merge_lang_list(
    target: &mut Option<LangList>,
    new: Option<&LangList>,
    path: &str,
    provisional: &mut BTreeSet<String>,
) -> bool {
    let Some(new) = new else {
        return false;
    };

    let mut changed = false;
    let lists = target.get_or_insert_with(LangList::new);
    for (language, items) in new {
        if items.is_empty() {
            if !lists.contains_key(language) {
                lists.insert(*language, Vec::new());
                changed = true;
            }
            continue;
        }
        if lists.get(language) != Some(items) {
            lists.insert(*language, items.clone());
            changed = true;
        }
        changed |= provisional.remove(&marker(path, *language));
    }
    changed
}

fn replace_list<T: Clone + PartialEq>(
    target: &mut Option<Vec<T>>,
    new: Option<&Vec<T>>,
    path: &str,
    provisional: &mut BTreeSet<String>,
) -> bool {
    let Some(new) = new.filter(|items| !items.is_empty()) else {
        return false;
    };
    if target.as_ref() == Some(new) {
        return false;
    }

    *target = Some(new.clone());
    let prefix = format!("{path}[");
    provisional.retain(|entry| !entry.starts_with(&prefix));
    true
}

pub fn marker(path: &str, language: Language) -> String {
    format!("{path}.{}", language.code())
}

fn has_text(map: &LangText) -> bool {
    map.values().any(|value| !value.trim().is_empty())
}

// Copies the source-language value into every requested language that has
// none, and records each copy as provisional.
pub fn fill_from_source(
    map: &mut LangText,
    targets: &[Language],
    source: Language,
    path: &str,
    provisional: &mut BTreeSet<String>,
) -> Vec<Language> {
    let Some(source_text) = map
        .get(&source)
        .filter(|text| !text.trim().is_empty())
        .cloned()
    else {
        return Vec::new();
    };

    let mut filled = Vec::new();
    for language in targets {
        if *language == source {
            continue;
        }
        let missing = map
            .get(language)
            .map(|text| text.trim().is_empty())
            .unwrap_or(true);
        if missing {
            map.insert(*language, source_text.clone());
            provisional.insert(marker(path, *language));
            filled.push(*language);
        }
    }
    filled
}

pub fn fill_list_from_source(
    lists: &mut LangList,
    targets: &[Language],
    source: Language,
    path: &str,
    provisional: &mut BTreeSet<String>,
) -> Vec<Language> {
    let Some(source_items) = lists.get(&source).filter(|items| !items.is_empty()).cloned() else {
        return Vec::new();
    };

    let mut filled = Vec::new();
    for language in targets {
        if *language == source {
            continue;
        }
        let missing = lists.get(language).map(Vec::is_empty).unwrap_or(true);
        if missing {
            lists.insert(*language, source_items.clone());
            provisional.insert(marker(path, *language));
            filled.push(*language);
        }
    }
    filled
}

pub fn apply_fallback(record: &mut Record, targets: &[Language], source: Language) -> usize {
    let mut filled = 0usize;
    let provisional = &mut record.provisional_translations;

    if let Some(title) = record.title.as_mut() {
        filled += fill_from_source(title, targets, source, "title", provisional).len();
    }
    if let Some(description) = record.description.as_mut() {
        filled += fill_from_source(description, targets, source, "description", provisional).len();
    }

    if let Some(text_content) = record.text_content.as_mut() {
        for field in TextField::ALL {
            if let Some(map) = text_content.field_mut(field).as_mut() {
                filled += fill_from_source(map, targets, source, &field.path(), provisional).len();
            }
        }
        if let Some(lists) = text_content.learning_objectives.as_mut() {
            filled += fill_list_from_source(
                lists,
                targets,
                source,
                ContentGroup::LearningObjectives.path(),
                provisional,
            )
            .len();
        }
    }

    filled
}

// Fills languages that are missing, empty or only provisionally filled with a
// real translation of the source-language value. Languages the translator
// cannot serve are left as they are.
pub fn backfill_translations(
    record: &mut Record,
    translator: &dyn Translator,
    targets: &[Language],
    source: Language,
) -> usize {
    let mut translated = 0usize;
    let provisional = &mut record.provisional_translations;

    if let Some(title) = record.title.as_mut() {
        translated += translate_text_map(title, translator, targets, source, "title", provisional);
    }
    if let Some(description) = record.description.as_mut() {
        translated +=
            translate_text_map(description, translator, targets, source, "description", provisional);
    }

    if let Some(text_content) = record.text_content.as_mut() {
        for field in TextField::ALL {
            if let Some(map) = text_content.field_mut(field).as_mut() {
                translated += translate_text_map(
                    map,
                    translator,
                    targets,
                    source,
                    &field.path(),
                    provisional,
                );
            }
        }
        if let Some(lists) = text_content.learning_objectives.as_mut() {
            translated += translate_list_map(
                lists,
                translator,
                targets,
                source,
                ContentGroup::LearningObjectives.path(),
                provisional,
            );
        }
    }

    translated
}

fn translate_text_map(
    map: &mut LangText,
    translator: &dyn Translator,
    targets: &[Language],
    source: Language,
    path: &str,
    provisional: &mut BTreeSet<String>,
) -> usize {
    let Some(source_text) = map
        .get(&source)
        .filter(|text| !text.trim().is_empty())
        .cloned()
    else {
        return 0;
    };

    let mut translated = 0usize;
    for language in targets {
        if *language == source {
            continue;
        }
        let key = marker(path, *language);
        let needs_translation = provisional.contains(&key)
            || map
                .get(language)
                .map(|text| text.trim().is_empty())
                .unwrap_or(true);
        if !needs_translation {
            continue;
        }

        let Some(text) = translator
            .translate(&source_text, source, *language)
            .filter(|text| !text.trim().is_empty())
        else {
            continue;
        };
        map.insert(*language, text);
        provisional.remove(&key);
        translated += 1;
    }
    translated
}

fn translate_list_map(
    lists: &mut LangList,
    translator: &dyn Translator,
    targets: &[Language],
    source: Language,
    path: &str,
    provisional: &mut BTreeSet<String>,
) -> usize {
    let Some(source_items) = lists.get(&source).filter(|items| !items.is_empty()).cloned() else {
        return 0;
    };

    let mut translated = 0usize;
    for language in targets {
        if *language == source {
            continue;
        }
        let key = marker(path, *language);
        let needs_translation = provisional.contains(&key)
            || lists.get(language).map(Vec::is_empty).unwrap_or(true);
        if !needs_translation {
            continue;
        }

        let items = source_items
            .iter()
            .map(|item| {
                translator
                    .translate(item, source, *language)
                    .filter(|text| !text.trim().is_empty())
            })
            .collect::<Option<Vec<String>>>();
        let Some(items) = items else {
            continue;
        };
        lists.insert(*language, items);
        provisional.remove(&key);
        translated += 1;
    }
    translated
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;
    use crate::model::DialogueLine;

    struct StubTranslator {
        entries: HashMap<(String, Language), String>,
    }

    impl Translator for StubTranslator {
        fn translate(&self, text: &str, _source: Language, target: Language) -> Option<String> {
            self.entries.get(&(text.to_string(), target)).cloned()
        }
    }

    fn lang_text(entries: &[(Language, &str)]) -> LangText {
        entries
            .iter()
            .map(|(language, text)| (*language, text.to_string()))
            .collect()
    }

    fn sample_record() -> Record {
        Record {
            id: "section_05".to_string(),
            title: Some(lang_text(&[(Language::En, "Equipment"), (Language::Bn, "সরঞ্জাম")])),
            text_content: Some(TextContent {
                grammar_focus: Some(lang_text(&[(Language::En, "Articles")])),
                ..Default::default()
            }),
            vocabulary: Some(vec![VocabularyItem {
                id: Some("v05_01".to_string()),
                german_term: Some(Some("das Stethoskop".to_string())),
                ..Default::default()
            }]),
            dialogues: Some(vec![Dialogue {
                id: Some("d05_01".to_string()),
                lines: vec![DialogueLine {
                    german_text: Some(Some("Guten Morgen".to_string())),
                    ..Default::default()
                }],
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn merging_vocabulary_leaves_other_groups_untouched() {
        let mut record = sample_record();
        let before = record.clone();
        let supplied = SuppliedContent {
            vocabulary: Some(vec![VocabularyItem {
                german_term: Some(Some("die Spritze".to_string())),
                ..Default::default()
            }]),
            dialogues: Some(Vec::new()),
            title: Some(lang_text(&[(Language::En, "Replaced")])),
            ..Default::default()
        };

        let changed = merge_content(&mut record, &supplied, &[ContentGroup::Vocabulary]);

        assert_eq!(changed, vec!["vocabulary".to_string()]);
        assert_eq!(record.dialogues, before.dialogues);
        assert_eq!(record.title, before.title);
        assert_eq!(record.text_content, before.text_content);
        assert_eq!(
            record
                .vocabulary
                .as_ref()
                .and_then(|items| items.first())
                .and_then(|item| item.german_term.clone().flatten()),
            Some("die Spritze".to_string())
        );
    }

    #[test]
    fn empty_supplied_content_preserves_existing_values() {
        let mut record = sample_record();
        let before = record.clone();
        let supplied = SuppliedContent {
            dialogues: Some(Vec::new()),
            title: Some(lang_text(&[(Language::En, ""), (Language::Bn, "  ")])),
            grammar_focus: Some(LangText::new()),
            ..Default::default()
        };

        let changed = merge_content(
            &mut record,
            &supplied,
            &[
                ContentGroup::Dialogues,
                ContentGroup::Title,
                ContentGroup::GrammarFocus,
                ContentGroup::Exercises,
            ],
        );

        assert!(changed.is_empty());
        assert_eq!(record, before);
    }

    #[test]
    fn language_level_merge_keeps_absent_languages() {
        let mut record = sample_record();
        let supplied = SuppliedContent {
            title: Some(lang_text(&[(Language::En, "Medical Equipment"), (Language::Tr, "Tıbbi Ekipman")])),
            ..Default::default()
        };

        merge_content(&mut record, &supplied, &[ContentGroup::Title]);

        let title = record.title.unwrap_or_default();
        assert_eq!(title.get(&Language::En).map(String::as_str), Some("Medical Equipment"));
        assert_eq!(title.get(&Language::Bn).map(String::as_str), Some("সরঞ্জাম"));
        assert_eq!(title.get(&Language::Tr).map(String::as_str), Some("Tıbbi Ekipman"));
    }

    #[test]
    fn fallback_fills_missing_language_and_marks_it_provisional() {
        let mut record = sample_record();
        if let Some(grammar) = record
            .text_content
            .as_mut()
            .and_then(|content| content.grammar_focus.as_mut())
        {
            grammar.insert(Language::De, String::new());
        }

        let filled = apply_fallback(&mut record, &[Language::En, Language::De], Language::En);

        assert_eq!(filled, 2);
        let grammar = record
            .text_content
            .as_ref()
            .and_then(|content| content.grammar_focus.clone())
            .unwrap_or_default();
        assert_eq!(grammar.get(&Language::De).map(String::as_str), Some("Articles"));
        assert!(
            record
                .provisional_translations
                .contains("textContent.grammarFocus.de")
        );
        assert!(record.provisional_translations.contains("title.de"));

        assert_eq!(apply_fallback(&mut record, &[Language::En, Language::De], Language::En), 0);
    }

    #[test]
    fn real_translation_overwrites_provisional_value_and_clears_marker() {
        let mut record = sample_record();
        apply_fallback(&mut record, &[Language::En, Language::De], Language::En);

        let supplied = SuppliedContent {
            grammar_focus: Some(lang_text(&[(Language::De, "Artikel")])),
            ..Default::default()
        };
        let changed = merge_content(&mut record, &supplied, &[ContentGroup::GrammarFocus]);

        assert_eq!(changed, vec!["textContent.grammarFocus".to_string()]);
        assert!(
            !record
                .provisional_translations
                .contains("textContent.grammarFocus.de")
        );
        assert!(record.provisional_translations.contains("title.de"));
    }

    #[test]
    fn backfill_uses_translator_and_skips_unavailable_languages() {
        let mut record = sample_record();
        apply_fallback(&mut record, &[Language::En, Language::Hi], Language::En);

        let translator = StubTranslator {
            entries: HashMap::from([(("Articles".to_string(), Language::Hi), "आर्टिकल".to_string())]),
        };
        let translated = backfill_translations(
            &mut record,
            &translator,
            &[Language::En, Language::Hi, Language::Ur],
            Language::En,
        );

        assert_eq!(translated, 1);
        let grammar = record
            .text_content
            .as_ref()
            .and_then(|content| content.grammar_focus.clone())
            .unwrap_or_default();
        assert_eq!(grammar.get(&Language::Hi).map(String::as_str), Some("आर्टिकल"));
        assert!(grammar.get(&Language::Ur).is_none());
        assert!(
            !record
                .provisional_translations
                .contains("textContent.grammarFocus.hi")
        );
        assert!(record.provisional_translations.contains("title.hi"));
    }

    #[test]
    fn metadata_response_maps_top_level_objectives() {
        let policy = LanguagePolicy {
            fallback: Language::En,
            targets: vec![Language::En, Language::Bn],
        };
        let value = json!({
            "title": { "en": "Vital Signs", "bn": "জীবনী লক্ষণ" },
            "description": "Measure and report vital signs.",
            "textContent": {
                "introduction": { "en": "Intro" },
                "grammarFocus": { "en": "- Point 1\n- Point 2" }
            },
            "learningObjectives": ["Measure blood pressure", "Report pulse"]
        });

        let supplied = SuppliedContent::from_metadata(&value, &policy).expect("metadata should map");

        assert_eq!(
            supplied.description.and_then(|map| map.get(&Language::En).cloned()).as_deref(),
            Some("Measure and report vital signs.")
        );
        let objectives = supplied.learning_objectives.unwrap_or_default();
        assert_eq!(objectives.get(&Language::En).map(Vec::len), Some(2));
        assert_eq!(objectives.get(&Language::Bn), Some(&Vec::new()));
        assert!(supplied.summary.is_none());
    }
}
