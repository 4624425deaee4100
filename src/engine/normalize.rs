use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::config::LanguagePolicy;
use crate::error::{EnrichError, EnrichResult};
use crate::model::{LangList, LangText, Language, Record};

pub const PARAGRAPH_BREAK: &str = "\n\n";

const TEXT_CONTENT_FIELDS: [&str; 4] = ["introduction", "grammarFocus", "culturalNotes", "summary"];
const VOCABULARY_TEXT_FIELDS: [&str; 2] = ["translation", "exampleTranslation"];
const DIALOGUE_TEXT_FIELDS: [&str; 2] = ["title", "context"];
const LINE_TEXT_FIELDS: [&str; 1] = ["translation"];
const EXERCISE_TEXT_FIELDS: [&str; 2] = ["question", "explanation"];

pub fn normalize_record(raw: &Value, policy: &LanguagePolicy) -> EnrichResult<Record> {
    let Value::Object(fields) = raw else {
        return Err(EnrichError::malformed(
            "$",
            format!("expected record object, found {}", type_name(raw)),
        ));
    };

    let mut fields = fields.clone();
    for key in ["title", "description"] {
        coerce_text_field(&mut fields, key, key, policy)?;
    }

    take_null(&mut fields, "textContent");
    match fields.get_mut("textContent") {
        None => {}
        Some(Value::Object(text_content)) => {
            for key in TEXT_CONTENT_FIELDS {
                coerce_text_field(text_content, key, &format!("textContent.{key}"), policy)?;
            }
            coerce_list_field(
                text_content,
                "learningObjectives",
                "textContent.learningObjectives",
                policy,
            )?;
        }
        Some(other) => {
            return Err(EnrichError::malformed(
                "textContent",
                format!("expected object, found {}", type_name(other)),
            ));
        }
    }

    normalize_entity_lists(&mut fields, policy)?;

    serde_json::from_value(Value::Object(fields))
        .map_err(|err| EnrichError::malformed("$", err.to_string()))
}

// Coerces free-standing generated items (e.g. a vocabulary batch) with the
// same rules applied to stored records.
pub fn normalize_items<T: DeserializeOwned>(
    key: &str,
    items: Vec<Value>,
    policy: &LanguagePolicy,
) -> EnrichResult<Vec<T>> {
    let mut holder = Map::new();
    holder.insert(key.to_string(), Value::Array(items));
    normalize_entity_lists(&mut holder, policy)?;

    let value = holder.remove(key).unwrap_or(Value::Array(Vec::new()));
    serde_json::from_value(value).map_err(|err| EnrichError::malformed(key, err.to_string()))
}

pub fn normalize_text(
    value: &Value,
    path: &str,
    policy: &LanguagePolicy,
) -> EnrichResult<Option<LangText>> {
    let Some(coerced) = coerce_text(value, path, policy.fallback)? else {
        return Ok(None);
    };
    serde_json::from_value(coerced)
        .map(Some)
        .map_err(|err| EnrichError::malformed(path, err.to_string()))
}

pub fn normalize_list(
    value: &Value,
    path: &str,
    policy: &LanguagePolicy,
) -> EnrichResult<Option<LangList>> {
    let Some(coerced) = coerce_list(value, path, policy)? else {
        return Ok(None);
    };
    serde_json::from_value(coerced)
        .map(Some)
        .map_err(|err| EnrichError::malformed(path, err.to_string()))
}

fn normalize_entity_lists(fields: &mut Map<String, Value>, policy: &LanguagePolicy) -> EnrichResult<()> {
    normalize_entity_list(fields, "vocabulary", "vocabulary", &VOCABULARY_TEXT_FIELDS, policy)?;
    normalize_entity_list(fields, "exercises", "exercises", &EXERCISE_TEXT_FIELDS, policy)?;
    normalize_entity_list(fields, "dialogues", "dialogues", &DIALOGUE_TEXT_FIELDS, policy)?;

    if let Some(Value::Array(dialogues)) = fields.get_mut("dialogues") {
        for (index, dialogue) in dialogues.iter_mut().enumerate() {
            if let Value::Object(dialogue) = dialogue {
                normalize_entity_list(
                    dialogue,
                    "lines",
                    &format!("dialogues[{index}].lines"),
                    &LINE_TEXT_FIELDS,
                    policy,
                )?;
            }
        }
    }

    Ok(())
}

fn normalize_entity_list(
    fields: &mut Map<String, Value>,
    key: &str,
    path: &str,
    text_keys: &[&str],
    policy: &LanguagePolicy,
) -> EnrichResult<()> {
    if take_null(fields, key) {
        return Ok(());
    }
    let items = match fields.get_mut(key) {
        None => return Ok(()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(EnrichError::malformed(
                path,
                format!("expected list, found {}", type_name(other)),
            ));
        }
    };

    for (index, item) in items.iter_mut().enumerate() {
        let item_path = format!("{path}[{index}]");
        match item {
            Value::Object(entity) => {
                for text_key in text_keys {
                    coerce_text_field(
                        entity,
                        text_key,
                        &format!("{item_path}.{text_key}"),
                        policy,
                    )?;
                }
            }
            other => {
                return Err(EnrichError::malformed(
                    item_path,
                    format!("expected object, found {}", type_name(other)),
                ));
            }
        }
    }

    Ok(())
}

fn take_null(fields: &mut Map<String, Value>, key: &str) -> bool {
    if matches!(fields.get(key), Some(Value::Null)) {
        fields.remove(key);
        return true;
    }
    false
}

fn coerce_text_field(
    fields: &mut Map<String, Value>,
    key: &str,
    path: &str,
    policy: &LanguagePolicy,
) -> EnrichResult<()> {
    let Some(value) = fields.get(key) else {
        return Ok(());
    };
    match coerce_text(value, path, policy.fallback)? {
        Some(coerced) => {
            fields.insert(key.to_string(), coerced);
        }
        None => {
            fields.remove(key);
        }
    }
    Ok(())
}

fn coerce_list_field(
    fields: &mut Map<String, Value>,
    key: &str,
    path: &str,
    policy: &LanguagePolicy,
) -> EnrichResult<()> {
    let Some(value) = fields.get(key) else {
        return Ok(());
    };
    match coerce_list(value, path, policy)? {
        Some(coerced) => {
            fields.insert(key.to_string(), coerced);
        }
        None => {
            fields.remove(key);
        }
    }
    Ok(())
}

fn coerce_text(value: &Value, path: &str, fallback: Language) -> EnrichResult<Option<Value>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text_map([(fallback, text.clone())]))),
        Value::Array(items) => Ok(Some(text_map([(fallback, join_flattened(items.iter()))]))),
        Value::Object(map) => coerce_text_map(map, path, fallback).map(Some),
        Value::Bool(_) | Value::Number(_) => Err(EnrichError::malformed(
            path,
            format!("expected text or language map, found {}", type_name(value)),
        )),
    }
}

fn coerce_text_map(map: &Map<String, Value>, path: &str, fallback: Language) -> EnrichResult<Value> {
    if has_language_keys(map) {
        let mut out = BTreeMap::<Language, String>::new();
        for (key, value) in map {
            match Language::from_code(key) {
                Some(language) => {
                    out.insert(language, flatten_to_string(value));
                }
                None if is_blank(value) => {}
                None => {
                    return Err(EnrichError::malformed(
                        format!("{path}.{key}"),
                        "unrecognized language code",
                    ));
                }
            }
        }
        return Ok(text_map(out));
    }

    // Legacy sub-label shape (`point1`, `point2`, ...): join the points per
    // language in their original order.
    let mut parts = BTreeMap::<Language, Vec<String>>::new();
    for (label, value) in map {
        match value {
            Value::Object(inner) if has_language_keys(inner) => {
                for (key, inner_value) in inner {
                    match Language::from_code(key) {
                        Some(language) => {
                            push_non_empty(parts.entry(language).or_default(), inner_value);
                        }
                        None if is_blank(inner_value) => {}
                        None => {
                            return Err(EnrichError::malformed(
                                format!("{path}.{label}.{key}"),
                                "unrecognized language code",
                            ));
                        }
                    }
                }
            }
            other => push_non_empty(parts.entry(fallback).or_default(), other),
        }
    }

    Ok(text_map(
        parts
            .into_iter()
            .map(|(language, points)| (language, points.join(PARAGRAPH_BREAK))),
    ))
}

fn coerce_list(value: &Value, path: &str, policy: &LanguagePolicy) -> EnrichResult<Option<Value>> {
    let mut lists = BTreeMap::<Language, Vec<String>>::new();

    match value {
        Value::Null => return Ok(None),
        Value::String(_) | Value::Array(_) => {
            lists.insert(policy.fallback, list_items(value));
        }
        Value::Object(map) if has_language_keys(map) => {
            for (key, inner) in map {
                match Language::from_code(key) {
                    Some(language) => {
                        lists.insert(language, list_items(inner));
                    }
                    None if is_blank(inner) => {}
                    None => {
                        return Err(EnrichError::malformed(
                            format!("{path}.{key}"),
                            "unrecognized language code",
                        ));
                    }
                }
            }
        }
        Value::Object(map) => {
            for (label, inner) in map {
                match inner {
                    Value::Object(per_language) if has_language_keys(per_language) => {
                        for (key, item) in per_language {
                            match Language::from_code(key) {
                                Some(language) => {
                                    push_non_empty(lists.entry(language).or_default(), item);
                                }
                                None if is_blank(item) => {}
                                None => {
                                    return Err(EnrichError::malformed(
                                        format!("{path}.{label}.{key}"),
                                        "unrecognized language code",
                                    ));
                                }
                            }
                        }
                    }
                    other => push_non_empty(lists.entry(policy.fallback).or_default(), other),
                }
            }
        }
        Value::Bool(_) | Value::Number(_) => {
            return Err(EnrichError::malformed(
                path,
                format!("expected list or language map, found {}", type_name(value)),
            ));
        }
    }

    for language in &policy.targets {
        lists.entry(*language).or_default();
    }

    let out = lists
        .into_iter()
        .map(|(language, items)| {
            (
                language.code().to_string(),
                Value::Array(items.into_iter().map(Value::String).collect()),
            )
        })
        .collect::<Map<String, Value>>();
    Ok(Some(Value::Object(out)))
}

fn list_items(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(text) if text.is_empty() => Vec::new(),
        Value::Array(items) => items.iter().map(flatten_to_string).collect(),
        Value::Object(map) => map.values().map(flatten_to_string).collect(),
        other => vec![flatten_to_string(other)],
    }
}

fn text_map(entries: impl IntoIterator<Item = (Language, String)>) -> Value {
    Value::Object(
        entries
            .into_iter()
            .map(|(language, text)| (language.code().to_string(), Value::String(text)))
            .collect(),
    )
}

fn has_language_keys(map: &Map<String, Value>) -> bool {
    map.keys().any(|key| Language::from_code(key).is_some())
}

fn push_non_empty(parts: &mut Vec<String>, value: &Value) {
    let text = flatten_to_string(value);
    if !text.trim().is_empty() {
        parts.push(text);
    }
}

fn join_flattened<'a>(values: impl Iterator<Item = &'a Value>) -> String {
    values
        .map(flatten_to_string)
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<String>>()
        .join(PARAGRAPH_BREAK)
}

fn flatten_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => join_flattened(items.iter()),
        Value::Object(map) => join_flattened(map.values()),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.iter().all(is_blank),
        Value::Object(map) => map.values().all(is_blank),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
