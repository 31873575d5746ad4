//! BigModel (Zhipu) client. Every call mints a short-lived HS256 token
//! from the `id.secret` key and sends it as a bearer credential.

use std::sync::Mutex;

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use moments_contracts::catalog::{TEXT_SYSTEM_INSTRUCTION, ZHIPU_DESCRIBE_INSTRUCTION};
use moments_contracts::providers::{NamedProvider, ProviderKind};
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::blocking::Client as HttpClient;
use serde_json::{json, Value};
use sha2::Sha256;

use crate::config::ZhipuSettings;
use crate::http::{response_json_or_error, strip_data_url_prefix};
use crate::paragraphs::{decode_paragraphs, exactly_three};
use crate::prompt::{pick_concept, zhipu_image_prompt, zhipu_text_prompt};
use crate::{EngineError, GeneratedImage, MarketingProvider};

pub const TOKEN_TTL_SECONDS: i64 = 5 * 60;

const MISSING_KEY_MESSAGE: &str =
    "Zhipu API Key is missing. Set ZHIPU_API_KEY to an `id.secret` key.";
const INVALID_KEY_MESSAGE: &str = "Invalid Zhipu API Key format";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone, PartialEq, Eq)]
pub struct ZhipuCredentials {
    id: String,
    secret: String,
}

impl std::fmt::Debug for ZhipuCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZhipuCredentials")
            .field("id", &self.id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl ZhipuCredentials {
    /// Splits an `id.secret` key. Anything without exactly one dot, or with
    /// an empty half, is rejected.
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EngineError::Auth(MISSING_KEY_MESSAGE.to_string()));
        }
        let mut parts = trimmed.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(id), Some(secret), None) if !id.is_empty() && !secret.is_empty() => Ok(Self {
                id: id.to_string(),
                secret: secret.to_string(),
            }),
            _ => Err(EngineError::Auth(INVALID_KEY_MESSAGE.to_string())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Compact HS256 token: header `{alg, sign_type}`, claims
    /// `{api_key, exp, timestamp}` with `exp` in seconds and `timestamp`
    /// in milliseconds.
    pub fn mint_token(&self, now: DateTime<Utc>) -> Result<String, EngineError> {
        let header = json!({ "alg": "HS256", "sign_type": "SIGN" });
        let claims = json!({
            "api_key": self.id,
            "exp": now.timestamp() + TOKEN_TTL_SECONDS,
            "timestamp": now.timestamp_millis(),
        });
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| EngineError::Auth(INVALID_KEY_MESSAGE.to_string()))?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{signing_input}.{signature}"))
    }
}

pub struct ZhipuProvider {
    settings: ZhipuSettings,
    http: HttpClient,
    rng: Mutex<StdRng>,
}

impl ZhipuProvider {
    pub fn new(settings: ZhipuSettings) -> Self {
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

    pub fn settings(&self) -> &ZhipuSettings {
        &self.settings
    }

    fn bearer_token(&self) -> Result<String, EngineError> {
        let raw = self.settings.api_key.as_deref().unwrap_or_default();
        ZhipuCredentials::parse(raw)?.mint_token(Utc::now())
    }

    fn post(&self, label: &str, path: &str, token: &str, payload: &Value) -> Result<Value> {
        let endpoint = format!("{}/{}", self.settings.api_base, path);
        tracing::debug!(provider = "zhipu", %endpoint, "dispatching request");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(token)
            .timeout(self.settings.request_timeout)
            .json(payload)
            .send()
            .with_context(|| format!("{label} request failed ({endpoint})"))?;
        response_json_or_error(label, response)
    }
}

impl NamedProvider for ZhipuProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Zhipu
    }
}

impl MarketingProvider for ZhipuProvider {
    fn generate_image(&self) -> Result<GeneratedImage, EngineError> {
        let token = self.bearer_token()?;
        let pick = {
            let mut rng = self
                .rng
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            pick_concept(&mut *rng)
        };
        tracing::debug!(theme = pick.theme.label, "generating Zhipu image");
        let payload = json!({
            "model": self.settings.image_model,
            "prompt": zhipu_image_prompt(&pick),
            "size": "1024x1024",
        });
        let response = self
            .post("Zhipu Image API", "paas/v4/images/generations", &token, &payload)
            .map_err(EngineError::generation)?;
        let image_url = response
            .get("data")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .and_then(|row| row.get("url"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                EngineError::Generation("Invalid response from Zhipu Image API".to_string())
            })?;
        Ok(GeneratedImage {
            image_url: image_url.to_string(),
            description: pick.theme.description_for_text_ai.to_string(),
            theme: pick.theme.label.to_string(),
        })
    }

    fn describe_image(&self, image_payload: &str) -> Result<String, EngineError> {
        let token = self.bearer_token()?;
        let payload = json!({
            "model": self.settings.vision_model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": ZHIPU_DESCRIBE_INSTRUCTION },
                    { "type": "image_url", "image_url": { "url": strip_data_url_prefix(image_payload) } },
                ],
            }],
            "max_tokens": 100,
        });
        let response = self
            .post("Zhipu Vision API", "paas/v4/chat/completions", &token, &payload)
            .map_err(EngineError::description)?;
        let content = message_content(&response);
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(EngineError::Description(
                "No description generated by Zhipu.".to_string(),
            ));
        }
        Ok(trimmed.to_string())
    }

    /// The image payload is not sent; the description carries the metaphor.
    fn generate_text(
        &self,
        _image_payload: &str,
        selling_point: &str,
        image_description: &str,
    ) -> Result<Vec<String>, EngineError> {
        let token = self.bearer_token()?;
        let payload = json!({
            "model": self.settings.text_model,
            "messages": [
                { "role": "system", "content": TEXT_SYSTEM_INSTRUCTION },
                { "role": "user", "content": zhipu_text_prompt(image_description, selling_point) },
            ],
            "max_tokens": 800,
            "temperature": 0.7,
        });
        let response = self
            .post("Zhipu Text API", "paas/v4/chat/completions", &token, &payload)
            .map_err(EngineError::text_generation)?;
        let content = message_content(&response);
        if content.trim().is_empty() {
            return Err(EngineError::TextGeneration(
                "No text generated by Zhipu.".to_string(),
            ));
        }
        Ok(exactly_three(decode_paragraphs(&content)))
    }
}

fn message_content(response: &Value) -> String {
    response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use chrono::TimeZone;
    use hmac::Mac;
    use mockito::Matcher;
    use serde_json::{json, Value};

    use super::*;

    fn settings_for(server: &mockito::Server, key: Option<&str>) -> ZhipuSettings {
        ZhipuSettings {
            api_key: key.map(str::to_string),
            api_base: server.url(),
            request_timeout: Duration::from_secs(15),
            ..ZhipuSettings::default()
        }
    }

    fn decode_segment(segment: &str) -> anyhow::Result<Value> {
        let bytes = URL_SAFE_NO_PAD.decode(segment)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[test]
    fn credentials_reject_malformed_keys() {
        for raw in ["nodot", "a.b.c", ".secret", "id.", "   "] {
            assert!(
                matches!(ZhipuCredentials::parse(raw), Err(EngineError::Auth(_))),
                "{raw}"
            );
        }
        assert_eq!(
            ZhipuCredentials::parse("abc").err(),
            Some(EngineError::Auth(INVALID_KEY_MESSAGE.to_string()))
        );
    }

    #[test]
    fn minted_token_has_expected_header_claims_and_signature() -> anyhow::Result<()> {
        let credentials = ZhipuCredentials::parse("my-id.my-secret")?;
        let now = Utc
            .timestamp_millis_opt(1_700_000_000_123)
            .single()
            .ok_or_else(|| anyhow::anyhow!("bad fixture time"))?;
        let token = credentials.mint_token(now)?;

        let segments: Vec<&str> = token.split('.').collect();
        assert_eq!(segments.len(), 3);
        assert_eq!(
            decode_segment(segments[0])?,
            json!({ "alg": "HS256", "sign_type": "SIGN" })
        );
        assert_eq!(
            decode_segment(segments[1])?,
            json!({
                "api_key": "my-id",
                "exp": 1_700_000_000i64 + 300,
                "timestamp": 1_700_000_000_123i64,
            })
        );

        let mut mac = HmacSha256::new_from_slice(b"my-secret")
            .map_err(|_| anyhow::anyhow!("hmac key rejected"))?;
        mac.update(format!("{}.{}", segments[0], segments[1]).as_bytes());
        mac.verify_slice(&URL_SAFE_NO_PAD.decode(segments[2])?)
            .map_err(|_| anyhow::anyhow!("signature mismatch"))?;
        Ok(())
    }

    #[test]
    fn debug_output_hides_the_secret() -> anyhow::Result<()> {
        let credentials = ZhipuCredentials::parse("my-id.super-secret")?;
        let printed = format!("{credentials:?}");
        assert!(printed.contains("my-id"));
        assert!(!printed.contains("super-secret"));
        Ok(())
    }

    #[test]
    fn generate_image_sends_bearer_token_and_reads_url() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/paas/v4/images/generations")
            .match_header("authorization", Matcher::Regex(r"^Bearer [\w-]+\.[\w-]+\.[\w-]+$".into()))
            .match_body(Matcher::PartialJson(json!({
                "model": "cogview-3-plus",
                "size": "1024x1024",
            })))
            .with_status(200)
            .with_body(r#"{"data":[{"url":"https://cdn.example/cog.png"}]}"#)
            .create();

        let provider = ZhipuProvider::new(settings_for(&server, Some("id.secret"))).with_seed(9);
        let image = provider.generate_image()?;
        mock.assert();
        assert_eq!(image.image_url, "https://cdn.example/cog.png");
        assert!(!image.theme.is_empty());
        Ok(())
    }

    #[test]
    fn image_response_without_url_is_invalid() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/paas/v4/images/generations")
            .with_status(200)
            .with_body(r#"{"data":[]}"#)
            .create();

        let provider = ZhipuProvider::new(settings_for(&server, Some("id.secret")));
        assert_eq!(
            provider.generate_image().err(),
            Some(EngineError::Generation(
                "Invalid response from Zhipu Image API".to_string()
            ))
        );
    }

    #[test]
    fn bad_key_fails_before_any_request() {
        let mut server = mockito::Server::new();
        let mock = server.mock("POST", Matcher::Any).expect(0).create();

        let provider = ZhipuProvider::new(settings_for(&server, Some("not-a-key")));
        assert_eq!(
            provider.generate_text("", "卖点", "冰山").err(),
            Some(EngineError::Auth(INVALID_KEY_MESSAGE.to_string()))
        );
        let missing = ZhipuProvider::new(settings_for(&server, None));
        assert!(matches!(missing.describe_image("AAAA"), Err(EngineError::Auth(_))));
        mock.assert();
    }

    #[test]
    fn describe_sends_stripped_payload_and_trims() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/paas/v4/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "model": "glm-4v-plus",
                "max_tokens": 100,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": ZHIPU_DESCRIBE_INSTRUCTION },
                        { "type": "image_url", "image_url": { "url": "QUJD" } },
                    ],
                }],
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"  沙漏与书本 "}}]}"#)
            .create();

        let provider = ZhipuProvider::new(settings_for(&server, Some("id.secret")));
        assert_eq!(provider.describe_image("data:image/png;base64,QUJD")?, "沙漏与书本");
        mock.assert();
        Ok(())
    }

    #[test]
    fn generate_text_handles_fenced_json() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let content = "```json\n{\"paragraphs\": [\"🌊一🌊\", \"📚二📚\", \"🚀三🚀\"]}\n```";
        let _mock = server
            .mock("POST", "/paas/v4/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "model": "glm-4-plus",
                "max_tokens": 800,
                "temperature": 0.7,
            })))
            .with_status(200)
            .with_body(json!({ "choices": [{ "message": { "content": content } }] }).to_string())
            .create();

        let provider = ZhipuProvider::new(settings_for(&server, Some("id.secret")));
        assert_eq!(
            provider.generate_text("https://cdn.example/cog.png", "卖点", "冰山")?,
            vec!["🌊一🌊", "📚二📚", "🚀三🚀"]
        );
        Ok(())
    }

    #[test]
    fn generate_text_falls_back_to_line_split() -> anyhow::Result<()> {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/paas/v4/chat/completions")
            .with_status(200)
            .with_body(
                json!({ "choices": [{ "message": { "content": "🌊一🌊\n\n📚二📚" } }] })
                    .to_string(),
            )
            .create();

        let provider = ZhipuProvider::new(settings_for(&server, Some("id.secret")));
        assert_eq!(
            provider.generate_text("", "卖点", "冰山")?,
            vec!["🌊一🌊".to_string(), "📚二📚".to_string(), String::new()]
        );
        Ok(())
    }

    #[test]
    fn server_error_becomes_text_generation_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("POST", "/paas/v4/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"rate limited"}}"#)
            .create();

        let provider = ZhipuProvider::new(settings_for(&server, Some("id.secret")));
        match provider.generate_text("", "卖点", "冰山") {
            Err(EngineError::TextGeneration(message)) => {
                assert!(message.starts_with("Zhipu Text API request failed (429)"), "{message}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
