use regex::Regex;
use serde_json::Value;

use crate::error::{EnrichError, EnrichResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Object,
    List,
}

impl ResponseShape {
    fn delimiters(self) -> (char, char) {
        match self {
            Self::Object => ('{', '}'),
            Self::List => ('[', ']'),
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::List => value.is_array(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::List => "list",
        }
    }
}

// Strict parse first; on failure one repair round (code fences, text around
// the outermost brackets, trailing separators) and a single re-parse.
pub fn parse_response(kind: &str, text: &str, shape: ResponseShape) -> EnrichResult<Value> {
    let strict_error = match serde_json::from_str::<Value>(text.trim()) {
        Ok(value) => return check_shape(kind, value, shape),
        Err(err) => err,
    };

    let repaired = repair_response(text, shape).map_err(|reason| EnrichError::MalformedResponse {
        kind: kind.to_string(),
        reason,
    })?;

    match serde_json::from_str::<Value>(&repaired) {
        Ok(value) => check_shape(kind, value, shape),
        Err(lenient_error) => Err(EnrichError::MalformedResponse {
            kind: kind.to_string(),
            reason: format!("strict parse: {strict_error}; after repair: {lenient_error}"),
        }),
    }
}

fn check_shape(kind: &str, value: Value, shape: ResponseShape) -> EnrichResult<Value> {
    if shape.matches(&value) {
        return Ok(value);
    }
    Err(EnrichError::MalformedResponse {
        kind: kind.to_string(),
        reason: format!("expected a JSON {}", shape.label()),
    })
}

fn repair_response(text: &str, shape: ResponseShape) -> Result<String, String> {
    let fence = Regex::new(r"(?m)^\s*```[A-Za-z]*\s*$")
        .map_err(|err| format!("failed to compile fence regex: {err}"))?;
    let trailing_separator = Regex::new(r",(\s*[\]}])")
        .map_err(|err| format!("failed to compile separator regex: {err}"))?;

    let unfenced = fence.replace_all(text, "");
    let (open, close) = shape.delimiters();
    let start = unfenced
        .find(open)
        .ok_or_else(|| format!("no '{open}' found in response"))?;
    let end = unfenced
        .rfind(close)
        .filter(|end| *end > start)
        .ok_or_else(|| format!("no closing '{close}' found in response"))?;

    let body = &unfenced[start..=end];
    Ok(trailing_separator.replace_all(body, "$1").into_owned())
}
