use std::sync::Mutex;

use anyhow::{Context, Result};
use moments_contracts::catalog::{DESCRIBE_INSTRUCTION, TEXT_SYSTEM_INSTRUCTION};
use moments_contracts::providers::{NamedProvider, ProviderKind};
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};

use crate::config::GeminiSettings;
use crate::http::{inline_image_parts, is_remote_url, response_json_or_error};
use crate::paragraphs::{decode_paragraphs, exactly_three};
use crate::prompt::{gemini_image_prompt, gemini_text_prompt, pick_concept};
use crate::{EngineError, GeneratedImage, MarketingProvider};

const MISSING_KEY_MESSAGE: &str =
    "Google Gemini API Key is missing. Please configure it or use Zhipu AI.";
const NO_IMAGE_MESSAGE: &str =
    "No image data received from API. The model may have refused the prompt.";
const EMPTY_DESCRIPTION_MESSAGE: &str = "无法分析图片内容以生成描述。";

/// Client for the `generateContent` family, authenticated with the `key`
/// query parameter.
pub struct GeminiProvider {
    settings: GeminiSettings,
    http: HttpClient,
    rng: Mutex<StdRng>,
}

impl GeminiProvider {
    pub fn new(settings: GeminiSettings) -> Self {
        Self {
            settings,
            http: HttpClient::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn settings(&self) -> &GeminiSettings {
        &self.settings
    }

    fn api_key(&self) -> Result<&str, EngineError> {
        self.settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| EngineError::Auth(MISSING_KEY_MESSAGE.to_string()))
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.settings.api_base, model_path)
    }

    fn post(&self, model: &str, api_key: &str, payload: &Value) -> Result<Value> {
        let endpoint = self.endpoint_for_model(model);
        tracing::debug!(provider = "gemini", %endpoint, "dispatching request");
        let response = self
            .http
            .post(&endpoint)
            .query(&[("key", api_key)])
            .timeout(self.settings.request_timeout)
            .json(payload)
            .send()
            .with_context(|| format!("Gemini request failed ({endpoint})"))?;
        response_json_or_error("Gemini", response)
    }
}

impl NamedProvider for GeminiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }
}

impl MarketingProvider for GeminiProvider {
    fn generate_image(&self) -> Result<GeneratedImage, EngineError> {
        let api_key = self.api_key()?;
        let pick = {
            let mut rng = self
                .rng
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            pick_concept(&mut *rng)
        };
        tracing::debug!(
            theme = pick.theme.label,
            category = pick.theme.category.as_str(),
            style = pick.style,
            "generating Gemini image"
        );
        let payload = json!({
            "contents": [{ "parts": [{ "text": gemini_image_prompt(&pick) }] }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": "1:1" },
            },
        });
        let response = self
            .post(&self.settings.image_model, api_key, &payload)
            .map_err(EngineError::generation)?;
        let image_url = extract_inline_image(&response)?;
        Ok(GeneratedImage {
            image_url,
            description: pick.theme.description_for_text_ai.to_string(),
            theme: pick.theme.label.to_string(),
        })
    }

    fn describe_image(&self, image_payload: &str) -> Result<String, EngineError> {
        let api_key = self.api_key()?;
        if is_remote_url(image_payload) {
            return Err(EngineError::Description(
                "Gemini can only describe inline image data.".to_string(),
            ));
        }
        let (mime, data) = inline_image_parts(image_payload);
        let payload = json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": mime, "data": data } },
                    { "text": DESCRIBE_INSTRUCTION },
                ],
            }],
            "generationConfig": {
                "temperature": 0.2,
                "maxOutputTokens": 100,
            },
        });
        let response = self
            .post(&self.settings.vision_model, api_key, &payload)
            .map_err(EngineError::description)?;
        let text = response_text(&response);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EngineError::Description(
                EMPTY_DESCRIPTION_MESSAGE.to_string(),
            ));
        }
        Ok(trimmed.to_string())
    }

    fn generate_text(
        &self,
        image_payload: &str,
        selling_point: &str,
        image_description: &str,
    ) -> Result<Vec<String>, EngineError> {
        let api_key = self.api_key()?;
        let mut parts = Vec::new();
        // A remote URL (an image from the other provider) cannot be inlined;
        // the description carries the metaphor on its own.
        if !is_remote_url(image_payload) {
            let (mime, data) = inline_image_parts(image_payload);
            parts.push(json!({ "inlineData": { "mimeType": mime, "data": data } }));
        }
        parts.push(json!({ "text": gemini_text_prompt(image_description, selling_point) }));
        let payload = json!({
            "contents": [{ "parts": parts }],
            "systemInstruction": { "parts": [{ "text": TEXT_SYSTEM_INSTRUCTION }] },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "paragraphs": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": "The three paragraphs of the marketing copy.",
                        },
                    },
                    "required": ["paragraphs"],
                },
            },
        });
        let response = self
            .post(&self.settings.text_model, api_key, &payload)
            .map_err(EngineError::text_generation)?;
        let text = response_text(&response);
        if text.trim().is_empty() {
            return Err(EngineError::TextGeneration("No text generated".to_string()));
        }
        Ok(exactly_three(decode_paragraphs(&text)))
    }
}

fn first_candidate(response: &Value) -> Option<&Value> {
    response
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
}

fn candidate_parts(response: &Value) -> Vec<&Value> {
    first_candidate(response)
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| parts.iter().collect())
        .unwrap_or_default()
}

fn response_text(response: &Value) -> String {
    candidate_parts(response)
        .into_iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("")
}

fn extract_inline_image(response: &Value) -> Result<String, EngineError> {
    if let Some(reason) = response
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
    {
        return Err(blocked(reason));
    }

    for part in candidate_parts(response) {
        let Some(inline) = part.get("inlineData").or_else(|| part.get("inline_data")) else {
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                tracing::warn!("Gemini returned text instead of an image: {text}");
            }
            continue;
        };
        let data = inline
            .get("data")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if data.is_empty() {
            continue;
        }
        let mime = inline
            .get("mimeType")
            .or_else(|| inline.get("mime_type"))
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .unwrap_or("image/png");
        return Ok(format!("data:{mime};base64,{data}"));
    }

    let finish_reason = first_candidate(response)
        .and_then(|candidate| candidate.get("finishReason"))
        .and_then(Value::as_str);
    match finish_reason {
        Some(reason) if reason != "STOP" => Err(blocked(reason)),
        _ => Err(EngineError::Generation(NO_IMAGE_MESSAGE.to_string())),
    }
}

fn blocked(reason: &str) -> EngineError {
    EngineError::Generation(format!("Image generation blocked. Reason: {reason}"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn settings_for(server: &mockito::Server, key: Option<&str>) -> GeminiSettings {
        GeminiSettings {
            api_key: key.map(str::to_string),
            api_base: server.url(),
            request_timeout: Duration::from_secs(15),
            ..GeminiSettings::default()
        }
    }

    #[test]
    fn generate_image_returns_inline_data_url_and_theme() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash-image:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": {
                    "responseModalities": ["IMAGE"],
                    "imageConfig": { "aspectRatio": "1:1" },
                },
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "finishReason": "STOP",
                        "content": { "parts": [
                            { "text": "here you go" },
                            { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } },
                        ] },
                    }],
                })
                .to_string(),
            )
            .create();

        let provider = GeminiProvider::new(settings_for(&server, Some("test-key"))).with_seed(3);
        let image = provider.generate_image()?;
        mock.assert();
        assert_eq!(image.image_url, "data:image/png;base64,iVBORw0KGgo=");
        assert!(!image.theme.is_empty());
        assert!(!image.description.is_empty());
        Ok(())
    }

    #[test]
    fn non_stop_finish_reason_is_a_generation_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash-image:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[{"finishReason":"SAFETY","content":{"parts":[]}}]}"#)
            .create();

        let provider = GeminiProvider::new(settings_for(&server, Some("k")));
        assert_eq!(
            provider.generate_image().err(),
            Some(EngineError::Generation(
                "Image generation blocked. Reason: SAFETY".to_string()
            ))
        );
    }

    #[test]
    fn missing_image_with_stop_is_a_generation_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash-image:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[{"finishReason":"STOP","content":{"parts":[{"text":"no"}]}}]}"#)
            .create();

        let provider = GeminiProvider::new(settings_for(&server, Some("k")));
        assert_eq!(
            provider.generate_image().err(),
            Some(EngineError::Generation(NO_IMAGE_MESSAGE.to_string()))
        );
    }

    #[test]
    fn http_failure_keeps_status_and_body() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash-image:generateContent")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("overloaded")
            .create();

        let provider = GeminiProvider::new(settings_for(&server, Some("k")));
        match provider.generate_image() {
            Err(EngineError::Generation(message)) => {
                assert!(message.contains("503"), "{message}");
                assert!(message.contains("overloaded"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create();

        let provider = GeminiProvider::new(settings_for(&server, None));
        assert!(matches!(provider.generate_image(), Err(EngineError::Auth(_))));
        assert!(matches!(provider.describe_image("AAAA"), Err(EngineError::Auth(_))));
        mock.assert();
    }

    #[test]
    fn describe_strips_prefix_and_trims() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "parts": [
                    { "inlineData": { "mimeType": "image/jpeg", "data": "QUJD" } },
                    { "text": DESCRIBE_INSTRUCTION },
                ] }],
                "generationConfig": { "temperature": 0.2, "maxOutputTokens": 100 },
            })))
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"  一座冰山  \n"}]}}]}"#)
            .create();

        let provider = GeminiProvider::new(settings_for(&server, Some("k")));
        assert_eq!(provider.describe_image("data:image/jpeg;base64,QUJD")?, "一座冰山");
        mock.assert();
        Ok(())
    }

    #[test]
    fn describe_with_empty_text_is_a_description_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[]}}]}"#)
            .create();

        let provider = GeminiProvider::new(settings_for(&server, Some("k")));
        assert_eq!(
            provider.describe_image("QUJD").err(),
            Some(EngineError::Description(EMPTY_DESCRIPTION_MESSAGE.to_string()))
        );
    }

    #[test]
    fn generate_text_decodes_structured_paragraphs() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let inner = json!({ "paragraphs": ["🌊一🌊", "📚二📚"] }).to_string();
        let mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": { "responseMimeType": "application/json" },
            })))
            .with_status(200)
            .with_body(
                json!({ "candidates": [{ "content": { "parts": [{ "text": inner }] } }] })
                    .to_string(),
            )
            .create();

        let provider = GeminiProvider::new(settings_for(&server, Some("k")));
        let paragraphs =
            provider.generate_text("https://cdn.example/remote.png", "卖点", "冰山")?;
        mock.assert();
        assert_eq!(paragraphs, vec!["🌊一🌊".to_string(), "📚二📚".to_string(), String::new()]);
        Ok(())
    }

    #[test]
    fn generate_text_without_text_is_an_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/models/gemini-2.5-flash:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create();

        let provider = GeminiProvider::new(settings_for(&server, Some("k")));
        assert_eq!(
            provider.generate_text("QUJD", "卖点", "冰山").err(),
            Some(EngineError::TextGeneration("No text generated".to_string()))
        );
    }

    #[test]
    fn endpoint_accepts_prefixed_model_names() {
        let provider = GeminiProvider::new(GeminiSettings::default());
        assert_eq!(
            provider.endpoint_for_model("models/gemini-2.5-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
