use std::env;

use anyhow::{bail, Context, Result};
use reqwest::blocking::Response as HttpResponse;
use serde_json::Value;

const DATA_URL_IMAGE_PREFIXES: &[&str] = &["png", "jpeg", "jpg"];

pub(crate) fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

pub(crate) fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parts
            .last()
            .map(|existing| existing == trimmed)
            .unwrap_or(false)
        {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    if parts.is_empty() {
        return truncate_text(&err.to_string(), max_chars);
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

pub(crate) fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Removes a `data:image/(png|jpeg|jpg);base64,` prefix, leaving the raw
/// base64 body. Anything else is returned untouched.
pub fn strip_data_url_prefix(payload: &str) -> &str {
    let Some(rest) = payload.strip_prefix("data:image/") else {
        return payload;
    };
    for subtype in DATA_URL_IMAGE_PREFIXES {
        if let Some(body) = rest
            .strip_prefix(subtype)
            .and_then(|tail| tail.strip_prefix(";base64,"))
        {
            return body;
        }
    }
    payload
}

/// MIME type declared by a `data:` URL, if any.
pub fn data_url_mime(payload: &str) -> Option<&str> {
    let rest = payload.strip_prefix("data:")?;
    let (mime, _) = rest.split_once(";base64,")?;
    Some(mime).filter(|value| value.starts_with("image/"))
}

/// Splits an inline payload into `(mime, base64 body)`. Bare base64 is
/// assumed to be PNG.
pub(crate) fn inline_image_parts(payload: &str) -> (&str, &str) {
    if let Some(mime) = data_url_mime(payload) {
        if let Some((_, body)) = payload.split_once(";base64,") {
            return (mime, body);
        }
    }
    ("image/png", strip_data_url_prefix(payload))
}

pub fn is_remote_url(payload: &str) -> bool {
    let lowered = payload.trim_start().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}
