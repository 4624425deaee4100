use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::model::Language;

use super::Translator;

// Exact-match lookup keyed by source text, loaded from
// `{ "<source text>": { "<lang>": "<translation>" } }`.
#[derive(Debug, Clone, Default)]
pub struct TranslationMemory {
    entries: BTreeMap<String, BTreeMap<Language, String>>,
}

impl TranslationMemory {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read translation memory {}", path.display()))?;
        let memory = Self::from_json(&raw)
            .with_context(|| format!("failed to parse translation memory {}", path.display()))?;

        info!(
            path = %path.display(),
            entries = memory.entries.len(),
            "loaded translation memory"
        );
        Ok(memory)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: BTreeMap<String, BTreeMap<Language, String>> =
            serde_json::from_str(raw).context("translation memory is not a text-to-language map")?;
        Ok(Self { entries })
    }
}

impl Translator for TranslationMemory {
    fn translate(&self, text: &str, _source: Language, target: Language) -> Option<String> {
        self.entries
            .get(text.trim())
            .and_then(|translations| translations.get(&target))
            .filter(|translation| !translation.trim().is_empty())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_exact_source_text_only() {
        let memory = TranslationMemory::from_json(
            r#"{ "Modal verbs": { "de": "Modalverben", "bn": "" } }"#,
        )
        .expect("memory should parse");

        assert_eq!(
            memory.translate("Modal verbs", Language::En, Language::De),
            Some("Modalverben".to_string())
        );
        assert_eq!(memory.translate("Modal verbs", Language::En, Language::Bn), None);
        assert_eq!(memory.translate("Modal verb", Language::En, Language::De), None);
    }

    #[test]
    fn unknown_language_codes_are_rejected() {
        assert!(TranslationMemory::from_json(r#"{ "x": { "fr": "y" } }"#).is_err());
    }
}
