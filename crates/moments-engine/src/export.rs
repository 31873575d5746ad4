use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use moments_contracts::content::ContentDraft;
use reqwest::blocking::Client as HttpClient;

use crate::http::{is_remote_url, truncate_text};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// `moments-marketing-<unix ms>.png`, the name used when none is given.
pub fn default_export_name() -> PathBuf {
    PathBuf::from(format!(
        "moments-marketing-{}.png",
        Utc::now().timestamp_millis()
    ))
}

/// Paragraphs of the draft joined by blank lines, empty paragraphs skipped.
pub fn copy_text(draft: &ContentDraft) -> Option<String> {
    let rows: Vec<&str> = draft
        .text
        .iter()
        .map(String::as_str)
        .filter(|row| !row.trim().is_empty())
        .collect();
    if rows.is_empty() {
        return None;
    }
    Some(rows.join("\n\n"))
}

pub fn image_bytes(image_url: &str) -> Result<Vec<u8>> {
    if let Some(rest) = image_url.strip_prefix("data:") {
        let Some((_, body)) = rest.split_once(";base64,") else {
            bail!("unsupported data URL (expected base64 payload)");
        };
        return BASE64
            .decode(body.trim().as_bytes())
            .context("image data URL base64 decode failed");
    }
    if is_remote_url(image_url) {
        let response = HttpClient::new()
            .get(image_url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .with_context(|| format!("image download failed ({image_url})"))?;
        let status = response.status();
        if !status.is_success() {
            bail!(
                "image download failed ({}): {}",
                status.as_u16(),
                truncate_text(image_url, 120)
            );
        }
        let bytes = response
            .bytes()
            .context("image download body read failed")?;
        return Ok(bytes.to_vec());
    }
    bail!(
        "image is neither a data URL nor a remote URL: {}",
        truncate_text(image_url, 120)
    )
}

/// Writes the image behind `image_url` to `destination`, returning the
/// number of bytes written.
pub fn save_image(image_url: &str, destination: &Path) -> Result<usize> {
    let bytes = image_bytes(image_url)?;
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(destination, &bytes)
        .with_context(|| format!("failed to write {}", destination.display()))?;
    Ok(bytes.len())
}
