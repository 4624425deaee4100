use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::{EnrichConfig, LanguagePolicy};
use crate::engine::ids::{SectionNumber, assign_ids};
use crate::engine::locator::{LocatorTemplate, derive_locators};
use crate::engine::merge::{
    ContentGroup, SuppliedContent, apply_fallback, backfill_translations, merge_content,
};
use crate::engine::normalize::normalize_items;
use crate::error::{EnrichError, EnrichResult};
use crate::generation::{
    ContentGenerator, ContentKind, GeneratedContent, GenerationRequest, Translator,
};
use crate::model::{LangText, Record};

pub struct SectionContext<'a> {
    pub section: SectionNumber,
    pub config: &'a EnrichConfig,
}

impl SectionContext<'_> {
    pub fn topic(&self) -> String {
        self.config
            .topic_for(self.section)
            .map(|topic| topic.description())
            .unwrap_or_else(|| format!("Section {}", self.section))
    }

    pub fn language_policy(&self) -> LanguagePolicy {
        self.config.language_policy()
    }
}

pub trait EnrichPass {
    fn name(&self) -> &'static str;

    fn apply(&self, context: &SectionContext<'_>, record: &mut Record) -> EnrichResult<()>;
}

pub struct AssignIdsPass;

impl EnrichPass for AssignIdsPass {
    fn name(&self) -> &'static str {
        "assign-ids"
    }

    fn apply(&self, context: &SectionContext<'_>, record: &mut Record) -> EnrichResult<()> {
        let changed = assign_ids(record, context.section);
        debug!(section = %context.section, changed, "assigned entity ids");
        Ok(())
    }
}

pub struct DeriveLocatorsPass {
    template: LocatorTemplate,
}

impl DeriveLocatorsPass {
    pub fn new(config: &EnrichConfig) -> Self {
        Self {
            template: LocatorTemplate::new(&config.asset_root, &config.audio_extension),
        }
    }
}

impl EnrichPass for DeriveLocatorsPass {
    fn name(&self) -> &'static str {
        "derive-locators"
    }

    fn apply(&self, context: &SectionContext<'_>, record: &mut Record) -> EnrichResult<()> {
        let changed = derive_locators(record, context.section, &self.template);
        debug!(section = %context.section, changed, "derived audio locators");
        Ok(())
    }
}

pub struct FallbackPass;

impl EnrichPass for FallbackPass {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn apply(&self, context: &SectionContext<'_>, record: &mut Record) -> EnrichResult<()> {
        let filled = apply_fallback(
            record,
            &context.config.target_languages,
            context.config.source_language,
        );
        if filled > 0 {
            debug!(section = %context.section, filled, "filled provisional translations");
        }
        Ok(())
    }
}

pub struct TranslatePass<'a> {
    translator: &'a dyn Translator,
}

impl<'a> TranslatePass<'a> {
    pub fn new(translator: &'a dyn Translator) -> Self {
        Self { translator }
    }
}

impl EnrichPass for TranslatePass<'_> {
    fn name(&self) -> &'static str {
        "translate"
    }

    fn apply(&self, context: &SectionContext<'_>, record: &mut Record) -> EnrichResult<()> {
        let translated = backfill_translations(
            record,
            self.translator,
            &context.config.target_languages,
            context.config.source_language,
        );
        debug!(section = %context.section, translated, "backfilled translations");
        Ok(())
    }
}

pub struct GeneratePass<'a> {
    generator: &'a dyn ContentGenerator,
    groups: Vec<ContentGroup>,
}

impl<'a> GeneratePass<'a> {
    pub fn new(generator: &'a dyn ContentGenerator, groups: Vec<ContentGroup>) -> Self {
        Self { generator, groups }
    }

    fn wants(&self, group: ContentGroup) -> bool {
        self.groups.contains(&group)
    }

    fn request(
        &self,
        context: &SectionContext<'_>,
        kind: ContentKind,
        count: usize,
    ) -> EnrichResult<GeneratedContent> {
        let request = GenerationRequest {
            section: context.section,
            kind,
            topic: context.topic(),
            count,
        };
        let content = self.generator.generate(&request)?;

        let delay = Duration::from_millis(context.config.delay_ms);
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        Ok(content)
    }

    fn supplied_content(&self, context: &SectionContext<'_>) -> EnrichResult<SuppliedContent> {
        let policy = context.language_policy();
        let mut supplied = SuppliedContent::default();

        if ContentGroup::METADATA.iter().any(|group| self.wants(*group)) {
            let metadata = self
                .request(context, ContentKind::Metadata, 1)?
                .into_object(ContentKind::Metadata)?;
            supplied = SuppliedContent::from_metadata(&metadata, &policy)?;
        }

        if self.wants(ContentGroup::Vocabulary) {
            let requested = context.config.vocabulary_count;
            let items = self
                .request(context, ContentKind::VocabularyBatch, requested)?
                .into_items(ContentKind::VocabularyBatch)?;
            warn_on_count(context, ContentKind::VocabularyBatch, items.len(), requested);
            supplied.vocabulary = Some(normalize_items("vocabulary", items, &policy)?);
        }

        if self.wants(ContentGroup::Dialogues) {
            let requested = context.config.dialogue_count;
            let items = self
                .request(context, ContentKind::DialogueBatch, requested)?
                .into_items(ContentKind::DialogueBatch)?;
            warn_on_count(context, ContentKind::DialogueBatch, items.len(), requested);
            supplied.dialogues = Some(normalize_items("dialogues", items, &policy)?);
        }

        if self.wants(ContentGroup::Exercises) {
            let requested = context.config.exercise_count;
            let items = self
                .request(context, ContentKind::ExerciseBatch, requested)?
                .into_items(ContentKind::ExerciseBatch)?;
            warn_on_count(context, ContentKind::ExerciseBatch, items.len(), requested);
            supplied.exercises = Some(normalize_items("exercises", items, &policy)?);
        }

        Ok(supplied)
    }
}

fn warn_on_count(
    context: &SectionContext<'_>,
    kind: ContentKind,
    received: usize,
    requested: usize,
) {
    if received != requested {
        warn!(
            section = %context.section,
            kind = kind.label(),
            received,
            requested,
            "generated item count differs from request"
        );
    }
}

impl EnrichPass for GeneratePass<'_> {
    fn name(&self) -> &'static str {
        "generate"
    }

    fn apply(&self, context: &SectionContext<'_>, record: &mut Record) -> EnrichResult<()> {
        let supplied = self.supplied_content(context)?;
        let changed = merge_content(record, &supplied, &self.groups);
        debug!(section = %context.section, groups = ?changed, "merged generated content");
        Ok(())
    }
}

// A fresh record derived purely from the section number and the configured
// curriculum policy.
pub fn synthesize_skeleton(section: SectionNumber, config: &EnrichConfig) -> EnrichResult<Record> {
    let policy = &config.skeleton;
    let level = policy.level_for(section).ok_or_else(|| {
        EnrichError::malformed("level", format!("no level band covers section {section}"))
    })?;
    let phase = policy.phase_for(section).ok_or_else(|| {
        EnrichError::malformed("phaseId", format!("no phase band covers section {section}"))
    })?;

    let title = config
        .topic_for(section)
        .map(|topic| LangText::from([(config.fallback_language, topic.name.clone())]));

    Ok(Record {
        id: section.record_id(),
        phase_id: Some(Some(phase.to_string())),
        order: Some(Some(section.number())),
        level: Some(Some(level.to_string())),
        title,
        estimated_minutes: Some(Some(policy.estimated_minutes)),
        is_premium: Some(Some(section.number() > policy.premium_after)),
        ..Default::default()
    })
}
