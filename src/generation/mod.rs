//! Content generation for food records.
//!
//! A `GenerationBackend` turns a prompt into raw text via an external
//! generative service (Gemini). `FoodDataGenerator` wraps a backend together
//! with the response parser and degrades to a deterministic fallback draft on
//! every failure mode, so callers never see an error from this module.
//!
//! The service call is a single attempt with no retry: repeated user
//! submissions are the retry mechanism, which keeps latency bounded when the
//! upstream is failing.

pub mod image;
pub mod parser;

use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::models::food::FoodDraft;

/// Neutral rating used by every fallback draft.
pub const FALLBACK_RATING: i32 = 3;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no usable generation credential configured")]
    MissingCredential,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("generation response contained no text")]
    EmptyResponse,
}

/// Generation client configuration.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub model: String,
    pub request_timeout: Duration,
}

impl GenerationConfig {
    pub fn new(api_key: Option<String>) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .unwrap_or_default();

        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Whether the configured credential looks real. Empty keys and known
    /// placeholder values disable generation entirely.
    pub fn credential_usable(&self) -> bool {
        !(self.api_key.is_empty()
            || self.api_key == "TODO"
            || self.api_key.contains("YOUR_API_KEY"))
    }
}

/// Abstraction over text-generation providers.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Issue one generation request and return the raw response text.
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Gemini API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: Option<GeminiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    code: u16,
    message: String,
}

// ============================================================================
// GeminiClient
// ============================================================================

/// Gemini text-generation client. One bounded-timeout attempt per call.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    config: GenerationConfig,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        Self::with_base_url(config, GEMINI_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(
        config: GenerationConfig,
        base_url: String,
    ) -> Result<Self, GenerationError> {
        if !config.credential_usable() {
            return Err(GenerationError::MissingCredential);
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.config.model, self.config.api_key
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_detail = serde_json::from_str::<GeminiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error);

            let (code, message) = error_detail
                .map(|e| (e.code, e.message))
                .unwrap_or((status.as_u16(), error_body));

            warn!("Gemini API error ({}): {}", code, message);

            return Err(GenerationError::Api { code, message });
        }

        let gemini_response: GeminiResponse = response.json().await?;

        gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(GenerationError::EmptyResponse)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ============================================================================
// FoodDataGenerator
// ============================================================================

/// Prompt template sent for every food lookup.
fn build_prompt(food_name: &str) -> String {
    format!(
        "For the food item \"{}\", provide:\n\
         1. A health rating from 1 to 5 (integer), where 5 is very healthy and 1 is unhealthy.\n\
         2. A nutrition note for kids (about 100 words). Explain clearly and simply what health \
         benefits the food brings (like vitamins, energy, strong bones) or if it should be eaten \
         in moderation (like too much sugar or salt) and why. Make it engaging and easy to understand.\n\n\
         Return the result as a JSON object with keys \"healthRating\" (number) and \
         \"nutritionNote\" (string), and optionally \"imagePrompt\" (string) describing an \
         appealing illustration of the food.\n\
         Do not include markdown formatting.",
        food_name
    )
}

/// Produces a [`FoodDraft`] for any food name, falling back to a deterministic
/// neutral draft whenever generation is disabled or fails. Its output type has
/// no error variant by design.
pub struct FoodDataGenerator {
    backend: Option<Box<dyn GenerationBackend>>,
}

impl FoodDataGenerator {
    /// Build a generator from configuration. A missing or placeholder
    /// credential yields a generator that always answers with the disabled
    /// fallback and never touches the network.
    pub fn new(config: GenerationConfig) -> Self {
        if !config.credential_usable() {
            info!("No usable generation credential configured; AI food data is disabled");
            return Self { backend: None };
        }

        match GeminiClient::new(config) {
            Ok(client) => Self {
                backend: Some(Box::new(client)),
            },
            Err(e) => {
                warn!("Failed to initialize generation client, falling back to disabled mode: {}", e);
                Self { backend: None }
            }
        }
    }

    /// Generator with an injected backend (test doubles, alternate providers).
    pub fn with_backend(backend: Box<dyn GenerationBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Generator that always answers with the disabled fallback.
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Generate descriptive food data. Never fails: any credential, network,
    /// service or parse problem is absorbed into a fallback draft whose note
    /// carries the failure cause for operator diagnosis.
    pub async fn generate(&self, food_name: &str) -> FoodDraft {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => return Self::disabled_draft(food_name),
        };

        let raw = match backend.generate_text(&build_prompt(food_name)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Generation failed for '{}' via {}: {}", food_name, backend.name(), e);
                return Self::failure_draft(food_name, &e.to_string());
            }
        };

        match parser::parse(&raw) {
            Ok(generated) => FoodDraft {
                // Generation-time invariant: ratings are always within [1,5].
                health_rating: generated.health_rating.clamp(1, 5),
                nutrition_note: generated.nutrition_note,
                image_prompt: generated.image_prompt,
            },
            Err(e) => {
                warn!("Unparseable generation output for '{}': {}", food_name, e);
                if let parser::ParseError::Malformed { raw } = &e {
                    log::debug!("Offending generation output: {}", raw);
                }
                Self::failure_draft(food_name, &e.to_string())
            }
        }
    }

    fn disabled_draft(food_name: &str) -> FoodDraft {
        FoodDraft {
            health_rating: FALLBACK_RATING,
            nutrition_note: format!(
                "A yummy treat called {}. It's important to eat a balanced diet! \
                 (AI generation is disabled: configure a valid GOOGLE_API_KEY to enable it.)",
                food_name
            ),
            image_prompt: None,
        }
    }

    fn failure_draft(food_name: &str, cause: &str) -> FoodDraft {
        FoodDraft {
            health_rating: FALLBACK_RATING,
            nutrition_note: format!(
                "Error generating data for {}: {}. Please check your API key and quota.",
                food_name, cause
            ),
            image_prompt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_key: &str) -> GenerationConfig {
        let _ = env_logger::builder().is_test(true).try_init();
        GenerationConfig {
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }

    fn gemini_text_response(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [
                { "content": { "parts": [{ "text": text }] } }
            ]
        })
    }

    async fn generator_against(mock_server: &MockServer) -> FoodDataGenerator {
        let client = GeminiClient::with_base_url(test_config("test-api-key"), mock_server.uri())
            .expect("failed to create client");
        FoodDataGenerator::with_backend(Box::new(client))
    }

    #[test]
    fn test_placeholder_credentials_are_rejected() {
        assert!(!GenerationConfig::new(Some("".to_string())).credential_usable());
        assert!(!GenerationConfig::new(Some("TODO".to_string())).credential_usable());
        assert!(!GenerationConfig::new(Some("YOUR_API_KEY_HERE".to_string())).credential_usable());
        assert!(GenerationConfig::new(Some("real-key".to_string())).credential_usable());
    }

    #[test]
    fn test_client_refuses_placeholder_credential() {
        let result = GeminiClient::new(test_config("TODO"));
        assert!(matches!(result, Err(GenerationError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_disabled_generator_returns_neutral_draft_with_food_name() {
        let generator = FoodDataGenerator::new(test_config("TODO"));
        let draft = generator.generate("Dragon Fruit").await;
        assert_eq!(draft.health_rating, FALLBACK_RATING);
        assert!(draft.nutrition_note.contains("Dragon Fruit"));
        assert_eq!(draft.image_prompt, None);
    }

    #[tokio::test]
    async fn test_successful_generation_parses_fenced_payload() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/models/{}:generateContent", DEFAULT_MODEL)))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text_response(
                "```json\n{\"healthRating\":5,\"nutritionNote\":\"Full of vitamins!\"}\n```",
            )))
            .expect(1)
            .mount(&mock_server)
            .await;

        let generator = generator_against(&mock_server).await;
        let draft = generator.generate("Broccoli").await;
        assert_eq!(draft.health_rating, 5);
        assert_eq!(draft.nutrition_note, "Full of vitamins!");
    }

    #[tokio::test]
    async fn test_out_of_range_rating_is_clamped_at_generation_time() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text_response(
                "{\"healthRating\":9,\"nutritionNote\":\"Suspiciously healthy.\"}",
            )))
            .mount(&mock_server)
            .await;

        let generator = generator_against(&mock_server).await;
        let draft = generator.generate("Kale").await;
        assert_eq!(draft.health_rating, 5);
    }

    #[tokio::test]
    async fn test_unparseable_response_falls_back_with_diagnostic_note() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_text_response(
                "I'm sorry, I don't know that food.",
            )))
            .mount(&mock_server)
            .await;

        let generator = generator_against(&mock_server).await;
        let draft = generator.generate("Mystery Goo").await;
        assert_eq!(draft.health_rating, FALLBACK_RATING);
        assert!(draft.nutrition_note.contains("Mystery Goo"));
        assert!(draft.nutrition_note.contains("Error generating data"));
    }

    #[tokio::test]
    async fn test_api_error_falls_back_with_diagnostic_note() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "code": 429, "message": "Quota exceeded" }
            })))
            .mount(&mock_server)
            .await;

        let generator = generator_against(&mock_server).await;
        let draft = generator.generate("Pizza").await;
        assert_eq!(draft.health_rating, FALLBACK_RATING);
        assert!(draft.nutrition_note.contains("Quota exceeded"));
    }

    #[tokio::test]
    async fn test_empty_candidates_falls_back() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })),
            )
            .mount(&mock_server)
            .await;

        let generator = generator_against(&mock_server).await;
        let draft = generator.generate("Tofu").await;
        assert_eq!(draft.health_rating, FALLBACK_RATING);
        assert!(draft.nutrition_note.contains("no text"));
    }

    #[test]
    fn test_prompt_embeds_food_name() {
        let prompt = build_prompt("Sushi");
        assert!(prompt.contains("\"Sushi\""));
        assert!(prompt.contains("healthRating"));
        assert!(prompt.contains("nutritionNote"));
    }
}
