//! The session state machine. It is the only place where provider errors
//! become localized messages and status transitions.

use chrono::Utc;
use moments_contracts::content::{
    ContentDraft, GeneratedContent, GenerationStatus, UploadedImage, DEFAULT_THEME_LABEL,
    UPLOADED_THEME_LABEL,
};

use crate::http::truncate_text;
use crate::{EngineError, GeneratedImage};

pub const MISSING_IMAGE_MESSAGE: &str = "请先生成或上传图片，并提供图片描述。";
const IMAGE_FAILURE_MESSAGE: &str = "AI图片生成失败，请重试。";
const UPLOAD_FAILURE_MESSAGE: &str = "上传图片分析失败，无法生成文案。";
const TEXT_FAILURE_MESSAGE: &str = "文案生成失败，请重试。";
const HISTORY_FAILURE_MESSAGE: &str = "历史记录保存失败，文案仅保留在当前会话。";

pub const DESCRIPTION_PREVIEW_CHARS: usize = 100;

/// Generation counter value captured when an operation is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Outcome of folding a provider result back into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    Applied(T),
    Failed(EngineError),
    /// A newer action superseded the one that produced this result.
    Stale,
}

impl<T> Resolution<T> {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }
}

/// Everything a text request needs, captured at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextJob {
    pub ticket: Ticket,
    pub image_payload: String,
    pub display_url: String,
    pub description: String,
    pub theme: String,
    pub is_uploaded: bool,
}

struct ActiveImage {
    payload: String,
    display_url: String,
    description: String,
    theme: String,
    is_uploaded: bool,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    status: GenerationStatus,
    current: ContentDraft,
    uploaded: Option<UploadedImage>,
    error_message: Option<String>,
    generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: GenerationStatus::Idle,
            current: ContentDraft::default(),
            uploaded: None,
            error_message: None,
            generation: 0,
        }
    }

    pub fn status(&self) -> GenerationStatus {
        self.status
    }

    pub fn current(&self) -> &ContentDraft {
        &self.current
    }

    pub fn uploaded(&self) -> Option<&UploadedImage> {
        self.uploaded.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_busy(&self) -> bool {
        self.status.is_busy()
    }

    pub fn can_generate_text(&self) -> bool {
        !self.is_busy() && self.active_image().is_some()
    }

    /// The image to show: the upload wins over an AI image.
    pub fn display_image_url(&self) -> Option<&str> {
        match &self.uploaded {
            Some(upload) => Some(upload.display_url.as_str()),
            None => self.current.image_url.as_deref(),
        }
    }

    pub fn display_description(&self) -> Option<&str> {
        match &self.uploaded {
            Some(upload) => Some(upload.description.as_str()).filter(|value| !value.is_empty()),
            None => self.current.image_description.as_deref(),
        }
    }

    pub fn description_preview(&self) -> Option<String> {
        self.display_description()
            .map(|value| truncate_text(value, DESCRIPTION_PREVIEW_CHARS))
    }

    pub fn display_theme(&self) -> &str {
        if self.uploaded.is_some() {
            return UPLOADED_THEME_LABEL;
        }
        self.current
            .theme
            .as_deref()
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_THEME_LABEL)
    }

    fn next_ticket(&mut self) -> Ticket {
        self.generation += 1;
        Ticket(self.generation)
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    fn discard_stale<T>(&self, ticket: Ticket, stage: &str) -> Option<Resolution<T>> {
        if self.is_current(ticket) {
            return None;
        }
        tracing::debug!(
            stage,
            ticket = ticket.0,
            generation = self.generation,
            "discarding stale result"
        );
        Some(Resolution::Stale)
    }

    fn reset(&mut self, status: GenerationStatus) -> Ticket {
        self.current = ContentDraft::default();
        self.uploaded = None;
        self.error_message = None;
        self.status = status;
        self.next_ticket()
    }

    pub fn begin_image_generation(&mut self) -> Ticket {
        self.reset(GenerationStatus::GeneratingImage)
    }

    pub fn finish_image_generation(
        &mut self,
        ticket: Ticket,
        result: Result<GeneratedImage, EngineError>,
    ) -> Resolution<()> {
        if let Some(stale) = self.discard_stale(ticket, "image") {
            return stale;
        }
        match result {
            Ok(image) => {
                let theme = if image.theme.trim().is_empty() {
                    DEFAULT_THEME_LABEL.to_string()
                } else {
                    image.theme
                };
                self.current = ContentDraft {
                    image_url: Some(image.image_url),
                    image_description: Some(image.description),
                    theme: Some(theme),
                    is_uploaded: false,
                    ..ContentDraft::default()
                };
                self.status = GenerationStatus::ImageReady;
                Resolution::Applied(())
            }
            Err(err) => {
                self.status = GenerationStatus::Error;
                self.error_message = Some(format!("{IMAGE_FAILURE_MESSAGE} ({err})"));
                Resolution::Failed(err)
            }
        }
    }

    /// Replaces any current content with the upload before analysis starts.
    pub fn begin_upload(&mut self, display_url: String, payload: String) -> Ticket {
        let ticket = self.reset(GenerationStatus::GeneratingImage);
        self.uploaded = Some(UploadedImage {
            display_url,
            payload,
            description: String::new(),
        });
        ticket
    }

    pub fn finish_upload(
        &mut self,
        ticket: Ticket,
        result: Result<String, EngineError>,
    ) -> Resolution<()> {
        if let Some(stale) = self.discard_stale(ticket, "upload") {
            return stale;
        }
        match result {
            Ok(description) => {
                if let Some(upload) = self.uploaded.as_mut() {
                    upload.description = description;
                }
                self.status = GenerationStatus::ImageReady;
                Resolution::Applied(())
            }
            Err(err) => {
                self.uploaded = None;
                self.status = GenerationStatus::Error;
                self.error_message = Some(format!("{UPLOAD_FAILURE_MESSAGE} ({err})"));
                Resolution::Failed(err)
            }
        }
    }

    pub fn clear_uploaded_image(&mut self) {
        self.reset(GenerationStatus::Idle);
    }

    fn active_image(&self) -> Option<ActiveImage> {
        if let Some(upload) = &self.uploaded {
            if !upload.description.trim().is_empty() {
                return Some(ActiveImage {
                    payload: upload.payload.clone(),
                    display_url: upload.display_url.clone(),
                    description: upload.description.clone(),
                    theme: UPLOADED_THEME_LABEL.to_string(),
                    is_uploaded: true,
                });
            }
        }
        let image_url = self.current.image_url.as_deref()?;
        let description = self
            .current
            .image_description
            .as_deref()
            .filter(|value| !value.trim().is_empty())?;
        Some(ActiveImage {
            payload: image_url.to_string(),
            display_url: image_url.to_string(),
            description: description.to_string(),
            theme: self.display_theme().to_string(),
            is_uploaded: self.current.is_uploaded,
        })
    }

    /// Checks the precondition and moves to `GeneratingText`. A rejection
    /// records the message and leaves the status untouched.
    pub fn begin_text_generation(&mut self) -> Result<TextJob, EngineError> {
        let Some(active) = self.active_image() else {
            self.error_message = Some(MISSING_IMAGE_MESSAGE.to_string());
            return Err(EngineError::Validation(MISSING_IMAGE_MESSAGE.to_string()));
        };
        self.error_message = None;
        self.status = GenerationStatus::GeneratingText;
        Ok(TextJob {
            ticket: self.next_ticket(),
            image_payload: active.payload,
            display_url: active.display_url,
            description: active.description,
            theme: active.theme,
            is_uploaded: active.is_uploaded,
        })
    }

    pub fn finish_text_generation(
        &mut self,
        job: &TextJob,
        selling_point: &str,
        result: Result<Vec<String>, EngineError>,
    ) -> Resolution<GeneratedContent> {
        if let Some(stale) = self.discard_stale(job.ticket, "text") {
            return stale;
        }
        match result {
            Ok(text) => {
                let content = GeneratedContent {
                    id: GeneratedContent::new_id(),
                    image_url: job.display_url.clone(),
                    image_description: job.description.clone(),
                    theme: job.theme.clone(),
                    text,
                    advantage_used: selling_point.to_string(),
                    timestamp: Utc::now().timestamp_millis(),
                    is_uploaded: job.is_uploaded,
                };
                self.current = ContentDraft::from(content.clone());
                self.status = GenerationStatus::Complete;
                Resolution::Applied(content)
            }
            Err(err) => {
                self.status = GenerationStatus::ImageReady;
                self.error_message = Some(format!("{TEXT_FAILURE_MESSAGE} ({err})"));
                Resolution::Failed(err)
            }
        }
    }

    /// The copy was produced but could not be written to history. The
    /// session stays `Complete` so the result can still be copied or saved.
    pub fn note_history_unsaved(&mut self, cause: &str) {
        self.error_message = Some(format!("{HISTORY_FAILURE_MESSAGE} ({cause})"));
    }

    /// Jumps straight to `Complete` with the entry's content. Any in-flight
    /// result becomes stale.
    pub fn restore(&mut self, item: GeneratedContent) {
        self.reset(GenerationStatus::Complete);
        self.current = ContentDraft::from(item);
    }
}
