use crate::engine::ids::{EntityKind, SectionNumber, entity_id};
use crate::model::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorTemplate {
    asset_root: String,
    extension: String,
}

impl LocatorTemplate {
    pub fn new(asset_root: &str, extension: &str) -> Self {
        Self {
            asset_root: asset_root.trim_end_matches('/').to_string(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    fn section_root(&self, section: SectionNumber) -> String {
        format!("{}/sections/{}", self.asset_root, section.record_id())
    }

    pub fn vocabulary(&self, section: SectionNumber, item_id: &str) -> String {
        format!(
            "{}/vocabulary/{}.{}",
            self.section_root(section),
            item_id,
            self.extension
        )
    }

    pub fn dialogue_line(&self, section: SectionNumber, dialogue_id: &str, line: usize) -> String {
        format!(
            "{}/dialogues/{}_line{}.{}",
            self.section_root(section),
            dialogue_id,
            line,
            self.extension
        )
    }
}

// Locators are authoritative: a stale value is replaced, not kept.
pub fn derive_locators(
    record: &mut Record,
    section: SectionNumber,
    template: &LocatorTemplate,
) -> usize {
    let mut changed = 0usize;

    if let Some(items) = record.vocabulary.as_mut() {
        for (index, item) in items.iter_mut().enumerate() {
            let item_id = item
                .id
                .clone()
                .unwrap_or_else(|| entity_id(EntityKind::Vocabulary, section, index + 1));
            changed += set_locator(&mut item.audio_url, template.vocabulary(section, &item_id));
        }
    }

    if let Some(dialogues) = record.dialogues.as_mut() {
        for (index, dialogue) in dialogues.iter_mut().enumerate() {
            let dialogue_id = dialogue
                .id
                .clone()
                .unwrap_or_else(|| entity_id(EntityKind::Dialogue, section, index + 1));
            for (line_index, line) in dialogue.lines.iter_mut().enumerate() {
                changed += set_locator(
                    &mut line.audio_url,
                    template.dialogue_line(section, &dialogue_id, line_index + 1),
                );
            }
        }
    }

    changed
}

fn set_locator(slot: &mut Option<String>, expected: String) -> usize {
    if slot.as_deref() == Some(expected.as_str()) {
        return 0;
    }
    *slot = Some(expected);
    1
}
