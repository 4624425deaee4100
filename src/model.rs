use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    De,
    Bn,
    Hi,
    Ur,
    Tr,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::En,
        Language::De,
        Language::Bn,
        Language::Hi,
        Language::Ur,
        Language::Tr,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::De => "de",
            Self::Bn => "bn",
            Self::Hi => "hi",
            Self::Ur => "ur",
            Self::Tr => "tr",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|language| language.code() == normalized)
    }
}

pub type LangText = BTreeMap<Language, String>;
pub type LangList = BTreeMap<Language, Vec<String>>;

// Plain scalar fields keep an explicit JSON `null` apart from an absent key:
// `None` is absent, `Some(None)` is written back as `null`.
pub type Nullable<T> = Option<Option<T>>;

fn nullable<'de, D, T>(deserializer: D) -> Result<Nullable<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub phase_id: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub order: Nullable<u32>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub title_de: Nullable<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<LangText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LangText>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub level: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Nullable<u32>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub is_premium: Nullable<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<Vec<VocabularyItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialogues: Option<Vec<Dialogue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercises: Option<Vec<Exercise>>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub provisional_translations: BTreeSet<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introduction: Option<LangText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grammar_focus: Option<LangText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultural_notes: Option<LangText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LangText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_objectives: Option<LangList>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Introduction,
    GrammarFocus,
    CulturalNotes,
    Summary,
}

impl TextField {
    pub const ALL: [TextField; 4] = [
        TextField::Introduction,
        TextField::GrammarFocus,
        TextField::CulturalNotes,
        TextField::Summary,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Introduction => "introduction",
            Self::GrammarFocus => "grammarFocus",
            Self::CulturalNotes => "culturalNotes",
            Self::Summary => "summary",
        }
    }

    pub fn path(self) -> String {
        format!("textContent.{}", self.key())
    }
}

impl TextContent {
    pub fn field_mut(&mut self, field: TextField) -> &mut Option<LangText> {
        match field {
            TextField::Introduction => &mut self.introduction,
            TextField::GrammarFocus => &mut self.grammar_focus,
            TextField::CulturalNotes => &mut self.cultural_notes,
            TextField::Summary => &mut self.summary,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub german_term: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub article: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub plural: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub pronunciation: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub category: Nullable<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<LangText>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub example_sentence: Nullable<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_translation: Option<LangText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dialogue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<LangText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<LangText>,
    #[serde(default)]
    pub lines: Vec<DialogueLine>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueLine {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub speaker: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub speaker_role: Nullable<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub german_text: Nullable<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<LangText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExerciseType {
    MultipleChoice,
    FillBlank,
    Translation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<LangText>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub options: Nullable<Vec<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub correct_answer: Nullable<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<LangText>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub points: Nullable<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCounts {
    pub selected: usize,
    pub modified: usize,
    pub unmodified: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRunEntry {
    pub key: String,
    pub section: Option<u32>,
    pub outcome: String,
    pub changed_paths: Vec<String>,
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub hash_before: Option<String>,
    pub hash_after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub command: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub store: String,
    pub passes: Vec<String>,
    pub dry_run: bool,
    pub counts: RunCounts,
    pub records: Vec<RecordRunEntry>,
    pub warnings: Vec<String>,
}
