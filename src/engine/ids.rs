use std::fmt;

use crate::model::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SectionNumber(u32);

impl SectionNumber {
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    pub fn number(self) -> u32 {
        self.0
    }

    // Accepts `section_05` and slugged legacy keys like `section_01_greetings`,
    // but not suffixed variants such as `section_01a`.
    pub fn parse(key: &str) -> Option<Self> {
        let rest = key.trim().strip_prefix("section_")?;
        let digits_end = rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, suffix) = rest.split_at(digits_end);
        if digits.is_empty() || !(suffix.is_empty() || suffix.starts_with('_')) {
            return None;
        }
        digits.parse::<u32>().ok().map(Self)
    }

    pub fn record_id(self) -> String {
        format!("section_{:02}", self.0)
    }
}

impl fmt::Display for SectionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Vocabulary,
    Dialogue,
    Exercise,
}

impl EntityKind {
    pub fn prefix(self) -> char {
        match self {
            Self::Vocabulary => 'v',
            Self::Dialogue => 'd',
            Self::Exercise => 'e',
        }
    }
}

pub fn entity_id(kind: EntityKind, section: SectionNumber, position: usize) -> String {
    format!("{}{}_{:02}", kind.prefix(), section, position)
}

pub fn assign_ids(record: &mut Record, section: SectionNumber) -> usize {
    let mut changed = 0usize;

    if record.id.trim().is_empty() {
        record.id = section.record_id();
        changed += 1;
    }

    if let Some(items) = record.vocabulary.as_mut() {
        for (index, item) in items.iter_mut().enumerate() {
            changed += set_id(
                &mut item.id,
                entity_id(EntityKind::Vocabulary, section, index + 1),
            );
        }
    }

    if let Some(dialogues) = record.dialogues.as_mut() {
        for (index, dialogue) in dialogues.iter_mut().enumerate() {
            changed += set_id(
                &mut dialogue.id,
                entity_id(EntityKind::Dialogue, section, index + 1),
            );
        }
    }

    if let Some(exercises) = record.exercises.as_mut() {
        for (index, exercise) in exercises.iter_mut().enumerate() {
            changed += set_id(
                &mut exercise.id,
                entity_id(EntityKind::Exercise, section, index + 1),
            );
        }
    }

    changed
}

fn set_id(slot: &mut Option<String>, expected: String) -> usize {
    if slot.as_deref() == Some(expected.as_str()) {
        return 0;
    }
    *slot = Some(expected);
    1
}
