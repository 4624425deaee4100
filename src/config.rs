use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::info;

use crate::engine::SectionNumber;
use crate::model::Language;

pub const DEFAULT_ASSET_ROOT: &str = "assets/audio";
pub const DEFAULT_AUDIO_EXTENSION: &str = "mp3";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrichConfig {
    pub asset_root: String,
    pub audio_extension: String,
    pub fallback_language: Language,
    pub source_language: Language,
    pub target_languages: Vec<Language>,
    pub delay_ms: u64,
    pub vocabulary_count: usize,
    pub dialogue_count: usize,
    pub exercise_count: usize,
    pub skeleton: SkeletonPolicy,
    pub topics: BTreeMap<String, Topic>,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            asset_root: DEFAULT_ASSET_ROOT.to_string(),
            audio_extension: DEFAULT_AUDIO_EXTENSION.to_string(),
            fallback_language: Language::En,
            source_language: Language::En,
            target_languages: vec![
                Language::En,
                Language::Bn,
                Language::Hi,
                Language::Ur,
                Language::Tr,
            ],
            delay_ms: 0,
            vocabulary_count: 30,
            dialogue_count: 5,
            exercise_count: 18,
            skeleton: SkeletonPolicy::default(),
            topics: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkeletonPolicy {
    pub phases: Vec<Band>,
    pub levels: Vec<Band>,
    pub estimated_minutes: u32,
    pub premium_after: u32,
}

impl Default for SkeletonPolicy {
    fn default() -> Self {
        Self {
            phases: vec![
                Band::new(12, "phase1"),
                Band::new(29, "phase2"),
                Band::new(u32::MAX, "phase3"),
            ],
            levels: vec![
                Band::new(7, "A1"),
                Band::new(12, "A2"),
                Band::new(20, "B1"),
                Band::new(29, "B2"),
                Band::new(u32::MAX, "C1"),
            ],
            estimated_minutes: 45,
            premium_after: 12,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Band {
    pub max_section: u32,
    pub label: String,
}

impl Band {
    fn new(max_section: u32, label: &str) -> Self {
        Self {
            max_section,
            label: label.to_string(),
        }
    }
}

impl SkeletonPolicy {
    pub fn phase_for(&self, section: SectionNumber) -> Option<&str> {
        band_label(&self.phases, section)
    }

    pub fn level_for(&self, section: SectionNumber) -> Option<&str> {
        band_label(&self.levels, section)
    }
}

fn band_label(bands: &[Band], section: SectionNumber) -> Option<&str> {
    bands
        .iter()
        .find(|band| section.number() <= band.max_section)
        .map(|band| band.label.as_str())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub keywords: String,
}

impl Topic {
    pub fn description(&self) -> String {
        if self.keywords.trim().is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.keywords)
        }
    }
}

#[derive(Debug, Clone)]
pub struct LanguagePolicy {
    pub fallback: Language,
    pub targets: Vec<Language>,
}

impl EnrichConfig {
    pub fn language_policy(&self) -> LanguagePolicy {
        LanguagePolicy {
            fallback: self.fallback_language,
            targets: self.target_languages.clone(),
        }
    }

    pub fn topic_for(&self, section: SectionNumber) -> Option<&Topic> {
        self.topics
            .get(&section.number().to_string())
            .or_else(|| self.topics.get(&format!("{:02}", section.number())))
    }

    fn validate(&self) -> Result<()> {
        if self.asset_root.trim().is_empty() {
            bail!("asset_root must not be empty");
        }
        if self.audio_extension.trim().is_empty() {
            bail!("audio_extension must not be empty");
        }
        if self.target_languages.is_empty() {
            bail!("target_languages must list at least one language");
        }
        for bands in [&self.skeleton.phases, &self.skeleton.levels] {
            if !bands
                .windows(2)
                .all(|pair| pair[0].max_section < pair[1].max_section)
            {
                bail!("skeleton bands must be sorted by ascending max_section");
            }
        }
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<EnrichConfig> {
    let Some(path) = path else {
        return Ok(EnrichConfig::default());
    };

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: EnrichConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;

    info!(
        path = %path.display(),
        topics = config.topics.len(),
        languages = config.target_languages.len(),
        "loaded enrichment config"
    );

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_curriculum_bands() {
        let config = EnrichConfig::default();
        let policy = &config.skeleton;

        assert_eq!(policy.level_for(SectionNumber::new(7)), Some("A1"));
        assert_eq!(policy.level_for(SectionNumber::new(8)), Some("A2"));
        assert_eq!(policy.level_for(SectionNumber::new(20)), Some("B1"));
        assert_eq!(policy.level_for(SectionNumber::new(29)), Some("B2"));
        assert_eq!(policy.level_for(SectionNumber::new(55)), Some("C1"));
        assert_eq!(policy.phase_for(SectionNumber::new(12)), Some("phase1"));
        assert_eq!(policy.phase_for(SectionNumber::new(13)), Some("phase2"));
        assert_eq!(policy.phase_for(SectionNumber::new(30)), Some("phase3"));
    }

    #[test]
    fn toml_config_overrides_defaults_and_loads_topics() {
        let raw = r#"
            asset_root = "cdn/audio"
            target_languages = ["en", "de"]

            [topics.5]
            name = "Medical Equipment"
            keywords = "Stethoskop, Thermometer"

            [topics.06]
            name = "Time & Scheduling"
        "#;

        let config: EnrichConfig = toml::from_str(raw).expect("config should parse");
        config.validate().expect("config should validate");

        assert_eq!(config.asset_root, "cdn/audio");
        assert_eq!(config.audio_extension, "mp3");
        assert_eq!(config.target_languages, vec![Language::En, Language::De]);
        assert_eq!(
            config
                .topic_for(SectionNumber::new(5))
                .map(Topic::description)
                .as_deref(),
            Some("Medical Equipment: Stethoskop, Thermometer")
        );
        assert_eq!(
            config
                .topic_for(SectionNumber::new(6))
                .map(Topic::description)
                .as_deref(),
            Some("Time & Scheduling")
        );
        assert!(config.topic_for(SectionNumber::new(7)).is_none());
    }

    #[test]
    fn unsorted_bands_are_rejected() {
        let raw = r#"
            [skeleton]
            levels = [
              { max_section = 20, label = "B1" },
              { max_section = 7, label = "A1" },
            ]
        "#;

        let config: EnrichConfig = toml::from_str(raw).expect("config should parse");
        assert!(config.validate().is_err());
    }
}
