use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use moments_contracts::providers::ProviderKind;

use crate::http::non_empty_env;
use crate::retry::RetryPolicy;

pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ZHIPU_API_BASE: &str = "https://open.bigmodel.cn/api";
pub const DEFAULT_DATA_DIR: &str = ".moments";

pub const HISTORY_FILE_NAME: &str = "history.json";
pub const EVENTS_FILE_NAME: &str = "events.jsonl";

const DEFAULT_REQUEST_TIMEOUT_S: f64 = 90.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub image_model: String,
    pub vision_model: String,
    pub text_model: String,
    pub request_timeout: Duration,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            vision_model: "gemini-2.5-flash".to_string(),
            text_model: "gemini-2.5-flash".to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_S),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZhipuSettings {
    /// Raw `id.secret` key; validated when a token is minted.
    pub api_key: Option<String>,
    pub api_base: String,
    pub image_model: String,
    pub vision_model: String,
    pub text_model: String,
    pub request_timeout: Duration,
}

impl Default for ZhipuSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_ZHIPU_API_BASE.to_string(),
            image_model: "cogview-3-plus".to_string(),
            vision_model: "glm-4v-plus".to_string(),
            text_model: "glm-4-plus".to_string(),
            request_timeout: Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_S),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub gemini: GeminiSettings,
    pub zhipu: ZhipuSettings,
    pub retry: RetryPolicy,
    pub default_provider: ProviderKind,
    pub data_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiSettings::default(),
            zhipu: ZhipuSettings::default(),
            retry: RetryPolicy::default(),
            default_provider: ProviderKind::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(non_empty_env)
    }

    /// Builds a config from any key lookup. Lookups must already be trimmed
    /// and return `None` for blank values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let timeout = Duration::from_secs_f64(clamped(
            lookup("MOMENTS_REQUEST_TIMEOUT").as_deref(),
            DEFAULT_REQUEST_TIMEOUT_S,
            15.0,
            300.0,
        ));

        let gemini = &mut config.gemini;
        gemini.api_key = lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY"));
        if let Some(base) = lookup("GEMINI_API_BASE").map(|value| trim_base(&value)) {
            gemini.api_base = base;
        }
        override_model(&mut gemini.image_model, lookup("GEMINI_IMAGE_MODEL"));
        override_model(&mut gemini.vision_model, lookup("GEMINI_VISION_MODEL"));
        override_model(&mut gemini.text_model, lookup("GEMINI_TEXT_MODEL"));
        gemini.request_timeout = timeout;

        let zhipu = &mut config.zhipu;
        zhipu.api_key = lookup("ZHIPU_API_KEY").or_else(|| lookup("VITE_ZHIPU_API_KEY"));
        if let Some(base) = lookup("ZHIPU_API_BASE").map(|value| trim_base(&value)) {
            zhipu.api_base = base;
        }
        override_model(&mut zhipu.image_model, lookup("ZHIPU_IMAGE_MODEL"));
        override_model(&mut zhipu.vision_model, lookup("ZHIPU_VISION_MODEL"));
        override_model(&mut zhipu.text_model, lookup("ZHIPU_TEXT_MODEL"));
        zhipu.request_timeout = timeout;

        let max_retries = clamped(lookup("MOMENTS_MAX_RETRIES").as_deref(), 2.0, 0.0, 5.0);
        let base_ms = clamped(
            lookup("MOMENTS_RETRY_BASE_MS").as_deref(),
            1000.0,
            0.0,
            30_000.0,
        );
        config.retry = RetryPolicy::new(
            max_retries.round() as u32,
            Duration::from_millis(base_ms.round() as u64),
        );

        if let Some(raw) = lookup("MOMENTS_PROVIDER") {
            config.default_provider = raw
                .parse::<ProviderKind>()
                .map_err(anyhow::Error::msg)
                .context("MOMENTS_PROVIDER is not a known provider")?;
        }
        if let Some(home) = lookup("MOMENTS_HOME") {
            config.data_dir = PathBuf::from(home);
        }
        Ok(config)
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE_NAME)
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join(EVENTS_FILE_NAME)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn trim_base(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn override_model(slot: &mut String, value: Option<String>) {
    if let Some(model) = value {
        *slot = model;
    }
}

fn clamped(raw: Option<&str>, default: f64, min: f64, max: f64) -> f64 {
    let parsed = raw
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(default);
    parsed.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use moments_contracts::providers::ProviderKind;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() -> anyhow::Result<()> {
        let config = EngineConfig::from_lookup(lookup_from(&[]))?;
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.gemini.image_model, "gemini-2.5-flash-image");
        assert_eq!(config.zhipu.text_model, "glm-4-plus");
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.base_delay, Duration::from_millis(1000));
        assert_eq!(config.history_path(), PathBuf::from(".moments/history.json"));
        Ok(())
    }

    #[test]
    fn overrides_and_fallback_keys_apply() -> anyhow::Result<()> {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "g-key"),
            ("GEMINI_API_BASE", "http://127.0.0.1:9999/v1beta/"),
            ("VITE_ZHIPU_API_KEY", "abc.def"),
            ("ZHIPU_TEXT_MODEL", "glm-4-air"),
            ("MOMENTS_PROVIDER", "glm"),
            ("MOMENTS_HOME", "/tmp/moments-test"),
        ]))?;
        assert_eq!(config.gemini.api_key.as_deref(), Some("g-key"));
        assert_eq!(config.gemini.api_base, "http://127.0.0.1:9999/v1beta");
        assert_eq!(config.zhipu.api_key.as_deref(), Some("abc.def"));
        assert_eq!(config.zhipu.text_model, "glm-4-air");
        assert_eq!(config.default_provider, ProviderKind::Zhipu);
        assert_eq!(
            config.events_path(),
            PathBuf::from("/tmp/moments-test/events.jsonl")
        );
        Ok(())
    }

    #[test]
    fn numeric_settings_are_clamped() -> anyhow::Result<()> {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("MOMENTS_MAX_RETRIES", "42"),
            ("MOMENTS_RETRY_BASE_MS", "-5"),
            ("MOMENTS_REQUEST_TIMEOUT", "2"),
        ]))?;
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay, Duration::ZERO);
        assert_eq!(config.gemini.request_timeout, Duration::from_secs(15));
        assert_eq!(config.zhipu.request_timeout, Duration::from_secs(15));

        let garbage = EngineConfig::from_lookup(lookup_from(&[("MOMENTS_MAX_RETRIES", "lots")]))?;
        assert_eq!(garbage.retry.max_retries, 2);
        Ok(())
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let Err(err) = EngineConfig::from_lookup(lookup_from(&[("MOMENTS_PROVIDER", "dalle")]))
        else {
            panic!("unknown provider was accepted");
        };
        let text = format!("{err:#}");
        assert!(text.starts_with("MOMENTS_PROVIDER is not a known provider: "), "{text}");
        assert!(text.contains("dalle"), "{text}");
    }
}
