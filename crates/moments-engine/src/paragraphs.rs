//! Two-stage decoding of the copy returned by a text endpoint.
//!
//! Strict JSON first (`{"paragraphs": [...]}` or a bare array), then the
//! same after stripping a markdown fence, and finally a line split that
//! never fails.

use serde_json::Value;

pub const PARAGRAPH_COUNT: usize = 3;

/// Decodes a raw response into at most three trimmed, non-empty paragraphs.
/// Well-formed JSON with no usable rows yields an empty list.
pub fn decode_paragraphs(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if let Some(paragraphs) = parse_structured(trimmed) {
        return paragraphs;
    }
    let unfenced = strip_code_fence(trimmed);
    if let Some(paragraphs) = parse_structured(unfenced) {
        return paragraphs;
    }
    split_lines(unfenced)
}

/// Pads or truncates to exactly three paragraphs.
pub fn exactly_three(mut paragraphs: Vec<String>) -> Vec<String> {
    paragraphs.truncate(PARAGRAPH_COUNT);
    while paragraphs.len() < PARAGRAPH_COUNT {
        paragraphs.push(String::new());
    }
    paragraphs
}

/// Returns the body of the first fenced block, or the trimmed input when
/// there is none. Prose before the opening fence is ignored.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[open + 3..];
    // Drop the info string (`json`, `JSON`, ...) on the opening line.
    let body = match after_open.split_once('\n') {
        Some((info, rest)) if !info.trim_start().starts_with('{') && !info.trim_start().starts_with('[') => rest,
        _ => after_open,
    };
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

fn parse_structured(text: &str) -> Option<Vec<String>> {
    let value: Value = serde_json::from_str(text).ok()?;
    let rows = match &value {
        Value::Array(rows) => rows,
        Value::Object(map) => map.get("paragraphs")?.as_array()?,
        _ => return None,
    };
    let paragraphs: Vec<String> = rows
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|row| !row.is_empty())
        .take(PARAGRAPH_COUNT)
        .map(str::to_string)
        .collect();
    Some(paragraphs)
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(PARAGRAPH_COUNT)
        .map(str::to_string)
        .collect()
}
