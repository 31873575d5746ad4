use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use moments_contracts::content::GeneratedContent;
use moments_contracts::events::{
    EventPayload, EventWriter, GENERATION_FAILED, HISTORY_RESTORED, IMAGE_DESCRIBED,
    IMAGE_GENERATED, PROVIDER_SELECTED, SESSION_STARTED, STALE_RESULT_DISCARDED, TEXT_GENERATED,
    UPLOAD_CLEARED, VALIDATION_REJECTED,
};
use moments_contracts::history::HistoryStore;
use moments_contracts::providers::{NamedProvider, ProviderKind, ProviderRegistry, ProviderSelector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};

pub mod config;
pub mod error;
pub mod export;
pub mod gemini;
pub mod http;
pub mod paragraphs;
pub mod prompt;
pub mod retry;
pub mod session;
pub mod upload;
pub mod zhipu;

pub use config::{EngineConfig, GeminiSettings, ZhipuSettings};
pub use error::EngineError;
pub use gemini::GeminiProvider;
pub use retry::{retry_with_policy, RetryPolicy, Retrying};
pub use session::{Resolution, SessionState, TextJob, Ticket};
pub use zhipu::{ZhipuCredentials, ZhipuProvider};

/// What an image call hands back: a displayable URL (inline `data:` or
/// remote) plus the theme text the copy is written against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub image_url: String,
    pub description: String,
    pub theme: String,
}

/// The three capabilities every backend offers.
pub trait MarketingProvider: NamedProvider + Send + Sync {
    fn generate_image(&self) -> Result<GeneratedImage, EngineError>;
    fn describe_image(&self, image_payload: &str) -> Result<String, EngineError>;
    fn generate_text(
        &self,
        image_payload: &str,
        selling_point: &str,
        image_description: &str,
    ) -> Result<Vec<String>, EngineError>;
}

pub type ProviderSet = ProviderRegistry<Box<dyn MarketingProvider>>;

/// Both remote clients, each behind the shared retry policy.
pub fn default_provider_registry(config: &EngineConfig) -> ProviderSet {
    let mut registry: ProviderSet = ProviderRegistry::default();
    registry.register(Box::new(Retrying::new(
        GeminiProvider::new(config.gemini.clone()),
        config.retry,
    )));
    registry.register(Box::new(Retrying::new(
        ZhipuProvider::new(config.zhipu.clone()),
        config.retry,
    )));
    registry
}

/// Owns the session, the history and the provider routing. Every user
/// action goes through one of the handlers below.
pub struct MarketingEngine {
    session: SessionState,
    history: HistoryStore,
    selector: ProviderSelector,
    providers: ProviderSet,
    events: EventWriter,
    rng: StdRng,
}

impl MarketingEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::with_events(config, config.events_path())
    }

    pub fn with_events(config: &EngineConfig, events_path: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(config.data_dir())
            .with_context(|| format!("failed to create {}", config.data_dir().display()))?;
        let session_id = format!("moments-{}", Utc::now().format("%Y%m%dT%H%M%S"));
        let events = EventWriter::new(events_path.as_ref(), session_id);
        let history = HistoryStore::load(config.history_path());
        Self::with_providers(
            default_provider_registry(config),
            config.default_provider,
            history,
            events,
        )
    }

    pub fn with_providers(
        providers: ProviderSet,
        default_provider: ProviderKind,
        history: HistoryStore,
        events: EventWriter,
    ) -> Result<Self> {
        events.emit(
            SESSION_STARTED,
            map_object(json!({
                "provider": default_provider.as_str(),
                "history_len": history.len(),
                "providers": providers
                    .kinds()
                    .iter()
                    .map(|kind| kind.as_str())
                    .collect::<Vec<_>>(),
            })),
        )?;
        Ok(Self {
            session: SessionState::new(),
            history,
            selector: ProviderSelector::new(default_provider),
            providers,
            events,
            rng: StdRng::from_entropy(),
        })
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn active_provider(&self) -> ProviderKind {
        self.selector.active()
    }

    pub fn provider_kinds(&self) -> Vec<ProviderKind> {
        self.providers.kinds()
    }

    pub fn event_writer(&self) -> EventWriter {
        self.events.clone()
    }

    fn provider(&self, kind: ProviderKind) -> Result<&dyn MarketingProvider, EngineError> {
        self.providers
            .get(kind)
            .map(|provider| provider.as_ref())
            .ok_or_else(|| EngineError::Auth(format!("Provider '{kind}' is not configured.")))
    }

    /// Changes routing for the next action only. Session and history are
    /// left alone.
    pub fn select_provider(&mut self, kind: ProviderKind) -> bool {
        let changed = self.selector.select(kind);
        if changed {
            self.events.record(
                PROVIDER_SELECTED,
                map_object(json!({ "provider": kind.as_str() })),
            );
        }
        changed
    }

    pub fn generate_image(&mut self) -> Resolution<()> {
        let kind = self.selector.active();
        let ticket = self.session.begin_image_generation();
        let result = self
            .provider(kind)
            .and_then(|provider| provider.generate_image());
        let theme = result.as_ref().ok().map(|image| image.theme.clone());
        let resolution = self.session.finish_image_generation(ticket, result);
        match &resolution {
            Resolution::Applied(()) => self.events.record(
                IMAGE_GENERATED,
                map_object(json!({
                    "provider": kind.as_str(),
                    "theme": theme,
                    "remote": self
                        .session
                        .display_image_url()
                        .map(http::is_remote_url)
                        .unwrap_or(false),
                })),
            ),
            Resolution::Failed(err) => self.record_failure("image", kind, err),
            Resolution::Stale => self.record_stale("image", ticket),
        }
        resolution
    }

    /// Reads a file from disk and runs the upload pipeline on it. Only I/O
    /// problems are returned as errors.
    pub fn upload_image(&mut self, path: &Path) -> Result<Resolution<()>> {
        let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(self.upload_bytes(&bytes, path))
    }

    pub fn upload_bytes(&mut self, bytes: &[u8], file_name: &Path) -> Resolution<()> {
        let prepared = match upload::prepare_upload(bytes, file_name) {
            Ok(prepared) => prepared,
            Err(err) => {
                self.record_validation("upload", &err);
                return Resolution::Failed(err);
            }
        };
        let kind = self.selector.active();
        let ticket = self
            .session
            .begin_upload(prepared.data_url.clone(), prepared.data_url);
        let result = self
            .provider(kind)
            .and_then(|provider| provider.describe_image(&self.current_upload_payload()));
        let resolution = self.session.finish_upload(ticket, result);
        match &resolution {
            Resolution::Applied(()) => self.events.record(
                IMAGE_DESCRIBED,
                map_object(json!({
                    "provider": kind.as_str(),
                    "mime": prepared.mime,
                    "bytes": prepared.byte_len,
                    "description": self.session.display_description(),
                })),
            ),
            Resolution::Failed(err) => self.record_failure("upload", kind, err),
            Resolution::Stale => self.record_stale("upload", ticket),
        }
        resolution
    }

    fn current_upload_payload(&self) -> String {
        self.session
            .uploaded()
            .map(|upload| upload.payload.clone())
            .unwrap_or_default()
    }

    pub fn clear_uploaded_image(&mut self) {
        let had_upload = self.session.uploaded().is_some();
        self.session.clear_uploaded_image();
        self.events.record(
            UPLOAD_CLEARED,
            map_object(json!({ "had_upload": had_upload })),
        );
    }

    /// Draws a selling point, asks the active provider for copy and, on
    /// success, prepends the finished item to history. A missing image is
    /// reported as a failed resolution without any remote call. A history
    /// write failure keeps the result in the session and sets its message.
    pub fn generate_text(&mut self) -> Resolution<GeneratedContent> {
        let job = match self.session.begin_text_generation() {
            Ok(job) => job,
            Err(err) => {
                self.record_validation("text", &err);
                return Resolution::Failed(err);
            }
        };
        let kind = self.selector.active();
        let selling_point = prompt::pick_selling_point(&mut self.rng).content;
        let result = self.provider(kind).and_then(|provider| {
            provider.generate_text(&job.image_payload, selling_point, &job.description)
        });
        let resolution = self
            .session
            .finish_text_generation(&job, selling_point, result);
        match &resolution {
            Resolution::Applied(content) => {
                if let Err(err) = self.history.prepend(content.clone()) {
                    self.record_unsaved_history(kind, content, &err);
                    return resolution;
                }
                self.events.record(
                    TEXT_GENERATED,
                    map_object(json!({
                        "provider": kind.as_str(),
                        "id": content.id,
                        "theme": content.theme,
                        "advantage_used": content.advantage_used,
                        "is_uploaded": content.is_uploaded,
                        "history_len": self.history.len(),
                    })),
                );
            }
            Resolution::Failed(err) => self.record_failure("text", kind, err),
            Resolution::Stale => self.record_stale("text", job.ticket),
        }
        resolution
    }

    fn record_unsaved_history(
        &mut self,
        kind: ProviderKind,
        content: &GeneratedContent,
        err: &anyhow::Error,
    ) {
        tracing::warn!(
            path = %self.history.path().display(),
            id = %content.id,
            "failed to persist history: {err:#}"
        );
        self.session
            .note_history_unsaved(&http::error_chain_text(err, 200));
        self.events.record(
            GENERATION_FAILED,
            map_object(json!({
                "stage": "history",
                "provider": kind.as_str(),
                "id": content.id,
                "error": format!("{err:#}"),
                "message": self.session.error_message(),
            })),
        );
    }

    /// Restores a history entry (1-based position or id) into the session.
    pub fn select_history(&mut self, key: &str) -> Option<GeneratedContent> {
        let item = self.history.find(key)?.clone();
        self.session.restore(item.clone());
        self.events.record(
            HISTORY_RESTORED,
            map_object(json!({ "id": item.id, "theme": item.theme })),
        );
        Some(item)
    }

    fn record_failure(&self, stage: &str, kind: ProviderKind, err: &EngineError) {
        self.events.record(
            GENERATION_FAILED,
            map_object(json!({
                "stage": stage,
                "provider": kind.as_str(),
                "error_kind": err.kind(),
                "error": err.to_string(),
                "message": self.session.error_message(),
            })),
        );
    }

    fn record_validation(&self, stage: &str, err: &EngineError) {
        self.events.record(
            VALIDATION_REJECTED,
            map_object(json!({ "stage": stage, "message": err.to_string() })),
        );
    }

    fn record_stale(&self, stage: &str, ticket: Ticket) {
        self.events.record(
            STALE_RESULT_DISCARDED,
            map_object(json!({
                "stage": stage,
                "ticket": ticket.value(),
                "generation": self.session.generation(),
            })),
        );
    }
}

fn map_object(value: Value) -> EventPayload {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
