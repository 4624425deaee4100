mod response_dir;
mod translation_memory;

use serde_json::Value;

use crate::engine::SectionNumber;
use crate::engine::parse::ResponseShape;
use crate::error::{EnrichError, EnrichResult};
use crate::model::Language;

pub use response_dir::ResponseDirGenerator;
pub use translation_memory::TranslationMemory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    VocabularyBatch,
    DialogueBatch,
    ExerciseBatch,
    Metadata,
}

impl ContentKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::VocabularyBatch => "vocabulary",
            Self::DialogueBatch => "dialogues",
            Self::ExerciseBatch => "exercises",
            Self::Metadata => "metadata",
        }
    }

    pub fn shape(self) -> ResponseShape {
        match self {
            Self::Metadata => ResponseShape::Object,
            _ => ResponseShape::List,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub section: SectionNumber,
    pub kind: ContentKind,
    pub topic: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedContent {
    Object(Value),
    Items(Vec<Value>),
}

impl GeneratedContent {
    pub fn from_value(kind: ContentKind, value: Value) -> EnrichResult<Self> {
        match value {
            Value::Object(_) if kind.shape() == ResponseShape::Object => Ok(Self::Object(value)),
            Value::Array(items) if kind.shape() == ResponseShape::List => Ok(Self::Items(items)),
            other => Err(EnrichError::MalformedResponse {
                kind: kind.label().to_string(),
                reason: format!("unexpected {} response", json_kind(&other)),
            }),
        }
    }

    pub fn into_object(self, kind: ContentKind) -> EnrichResult<Value> {
        match self {
            Self::Object(value) => Ok(value),
            Self::Items(_) => Err(EnrichError::MalformedResponse {
                kind: kind.label().to_string(),
                reason: "expected an object, got a list".to_string(),
            }),
        }
    }

    pub fn into_items(self, kind: ContentKind) -> EnrichResult<Vec<Value>> {
        match self {
            Self::Items(items) => Ok(items),
            Self::Object(_) => Err(EnrichError::MalformedResponse {
                kind: kind.label().to_string(),
                reason: "expected a list, got an object".to_string(),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

pub trait ContentGenerator {
    fn generate(&self, request: &GenerationRequest) -> EnrichResult<GeneratedContent>;
}

pub trait Translator {
    fn translate(&self, text: &str, source: Language, target: Language) -> Option<String>;
}

// Used when no translation source is configured; every language stays on
// its fallback copy.
pub struct NoTranslator;

impl Translator for NoTranslator {
    fn translate(&self, _text: &str, _source: Language, _target: Language) -> Option<String> {
        None
    }
}
