use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Theme label recorded for images supplied by the user.
pub const UPLOADED_THEME_LABEL: &str = "用户上传图片";
/// Theme label shown when an AI image carries no theme of its own.
pub const DEFAULT_THEME_LABEL: &str = "教育插画";

const SUMMARY_ADVANTAGE_CHARS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    Idle,
    GeneratingImage,
    ImageReady,
    GeneratingText,
    Complete,
    Error,
}

impl GenerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::GeneratingImage => "generating_image",
            Self::ImageReady => "image_ready",
            Self::GeneratingText => "generating_text",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    pub fn is_busy(self) -> bool {
        matches!(self, Self::GeneratingImage | Self::GeneratingText)
    }
}

/// One completed generation cycle. Entries are never mutated after creation.
///
/// The serialized form uses camelCase keys and is the on-disk history format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContent {
    pub id: String,
    pub image_url: String,
    pub image_description: String,
    pub theme: String,
    pub text: Vec<String>,
    pub advantage_used: String,
    pub timestamp: i64,
    #[serde(default)]
    pub is_uploaded: bool,
}

impl GeneratedContent {
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Paragraphs joined the way they are pasted into a post.
    pub fn copy_text(&self) -> String {
        self.text.join("\n\n")
    }

    /// One-line history listing: local `HH:MM`, theme and a clipped selling point.
    pub fn summary_line(&self) -> String {
        let time = Local
            .timestamp_millis_opt(self.timestamp)
            .single()
            .map(|value| value.format("%H:%M").to_string())
            .unwrap_or_else(|| "--:--".to_string());
        let advantage: String = self
            .advantage_used
            .chars()
            .take(SUMMARY_ADVANTAGE_CHARS)
            .collect();
        let suffix = if self.advantage_used.chars().count() > SUMMARY_ADVANTAGE_CHARS {
            "..."
        } else {
            ""
        };
        format!("{time}  {}  [{advantage}{suffix}]", self.theme)
    }
}

/// The in-progress view of a generation cycle. Fields fill in as the
/// pipeline advances and the whole draft resets on a fresh start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDraft {
    pub id: Option<String>,
    pub image_url: Option<String>,
    pub image_description: Option<String>,
    pub theme: Option<String>,
    pub text: Vec<String>,
    pub advantage_used: Option<String>,
    pub timestamp: Option<i64>,
    pub is_uploaded: bool,
}

impl ContentDraft {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<GeneratedContent> for ContentDraft {
    fn from(content: GeneratedContent) -> Self {
        Self {
            id: Some(content.id),
            image_url: Some(content.image_url),
            image_description: Some(content.image_description),
            theme: Some(content.theme),
            text: content.text,
            advantage_used: Some(content.advantage_used),
            timestamp: Some(content.timestamp),
            is_uploaded: content.is_uploaded,
        }
    }
}

/// A user-supplied image: what is displayed, what is sent to providers, and
/// the provider-authored description (empty until analysis succeeds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub display_url: String,
    pub payload: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn sample() -> GeneratedContent {
        GeneratedContent {
            id: "abc".to_string(),
            image_url: "https://cdn.example/a.png".to_string(),
            image_description: "An iceberg".to_string(),
            theme: "冰山理论".to_string(),
            text: vec!["一".to_string(), "二".to_string(), "三".to_string()],
            advantage_used: "随时随地灵活上课".to_string(),
            timestamp: 1_700_000_000_000,
            is_uploaded: false,
        }
    }

    #[test]
    fn serializes_with_camel_case_keys() -> anyhow::Result<()> {
        let value = serde_json::to_value(sample())?;
        assert_eq!(value["imageUrl"], json!("https://cdn.example/a.png"));
        assert_eq!(value["imageDescription"], json!("An iceberg"));
        assert_eq!(value["advantageUsed"], json!("随时随地灵活上课"));
        assert_eq!(value["isUploaded"], json!(false));
        assert!(value.get("image_url").is_none());
        Ok(())
    }

    #[test]
    fn missing_is_uploaded_defaults_to_false() -> anyhow::Result<()> {
        let raw = json!({
            "id": "x",
            "imageUrl": "data:image/png;base64,AAAA",
            "imageDescription": "d",
            "theme": "t",
            "text": ["a", "b", "c"],
            "advantageUsed": "s",
            "timestamp": 1
        });
        let parsed: GeneratedContent = serde_json::from_value(raw)?;
        assert!(!parsed.is_uploaded);
        Ok(())
    }

    #[test]
    fn copy_text_joins_with_blank_lines() {
        assert_eq!(sample().copy_text(), "一\n\n二\n\n三");
    }

    #[test]
    fn summary_line_clips_long_selling_points() {
        let line = sample().summary_line();
        assert!(line.contains("冰山理论"));
        assert!(line.ends_with("[随时随地灵活上课]"));

        let mut long = sample();
        long.advantage_used = "在线外教一对一教学，个性化指导".to_string();
        assert!(long.summary_line().ends_with("[在线外教一对一教...]"));
    }

    #[test]
    fn draft_from_content_is_fully_populated() {
        let draft = ContentDraft::from(sample());
        assert_eq!(draft.id.as_deref(), Some("abc"));
        assert_eq!(draft.text.len(), 3);
        assert!(!draft.is_empty());
        assert!(ContentDraft::default().is_empty());
    }

    #[test]
    fn status_serializes_like_storage_enum() -> anyhow::Result<()> {
        let value = serde_json::to_value(GenerationStatus::GeneratingImage)?;
        assert_eq!(value, Value::String("GENERATING_IMAGE".to_string()));
        assert!(GenerationStatus::GeneratingText.is_busy());
        assert!(!GenerationStatus::ImageReady.is_busy());
        Ok(())
    }
}
