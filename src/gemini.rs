//! Gemini generation collaborator: marketing captions, product image
//! variants, and the free-form assistant chat.
//!
//! Calls are plain REST requests against `generativelanguage.googleapis.com`.
//! No automatic retries: a failed or empty generation is surfaced to the
//! caller, which ends the flow and lets the user restart or regenerate.

use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::session::{Caption, ChatTurn, GeneratedImage};
use crate::storage::{self, MediaStore};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const TEXT_MODEL: &str = "gemini-2.5-flash";
const IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// Number of independent image generation attempts per request. Attempts
/// that fail are skipped; whatever succeeded is returned.
pub const IMAGE_ATTEMPTS: usize = 3;

/// System prompt seeding the free-form assistant chat.
pub const SYSTEM_PROMPT: &str = "You are CraftPost, a friendly marketing assistant for artisans \
and small craft businesses. You help with product descriptions, social media captions, hashtag \
ideas and promotion advice. Keep answers short, concrete and encouraging. Greet the user and \
mention that /create_post builds a complete social media post from a product photo.";

/// Failure modes of the generation collaborator.
#[derive(Debug, Clone)]
pub enum GenerationError {
    /// Transport-level request errors
    Request(String),
    /// Non-success HTTP status from the API
    Status(String),
    /// Unparseable or unexpected response payload
    Decode(String),
    /// Structurally valid response carrying no usable content
    Empty,
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::Request(msg) => write!(f, "Request error: {msg}"),
            GenerationError::Status(msg) => write!(f, "API error: {msg}"),
            GenerationError::Decode(msg) => write!(f, "Decode error: {msg}"),
            GenerationError::Empty => write!(f, "Empty generation result"),
        }
    }
}

impl std::error::Error for GenerationError {}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::Request(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Deserialize)]
struct CaptionSet {
    captions: Vec<Caption>,
}

/// Client for the Gemini REST API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key =
            env::var("GEMINI_API_KEY").map_err(|_| anyhow::anyhow!("GEMINI_API_KEY must be set"))?;
        Ok(Self::new(api_key))
    }

    async fn generate_content(
        &self,
        model: &str,
        body: Value,
    ) -> Result<GenerateContentResponse, GenerationError> {
        let url = format!("{API_BASE}/{model}:generateContent?key={}", self.api_key);

        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status(format!("{status}: {detail}")));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))
    }

    /// Text parts of the first candidate, concatenated.
    fn response_text(response: &GenerateContentResponse) -> Option<String> {
        let parts = &response.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Free-form chat completion over the stored per-user history.
    pub async fn chat_response(&self, history: &[ChatTurn]) -> Result<String, GenerationError> {
        let contents: Vec<Value> = history
            .iter()
            .map(|turn| json!({ "role": turn.role, "parts": [{ "text": turn.text }] }))
            .collect();

        let response = self
            .generate_content(TEXT_MODEL, json!({ "contents": contents }))
            .await?;
        Self::response_text(&response).ok_or(GenerationError::Empty)
    }

    /// Generate exactly three marketing captions for the product image.
    ///
    /// The response schema forces a JSON object with a three-element
    /// `captions` array of `{text, hashtags, emojis}`.
    pub async fn generate_marketing_captions(
        &self,
        image_path: &Path,
        description: &str,
    ) -> Result<Vec<Caption>, GenerationError> {
        let image_part = inline_image_part(image_path)?;
        let prompt = format!(
            "Write marketing captions for a social media post about this handmade product. \
Product description: {description}. Each caption text should stay under 200 characters, \
with fitting hashtags and emojis."
        );

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }, image_part],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "object",
                    "properties": {
                        "captions": {
                            "type": "array",
                            "minItems": 3,
                            "maxItems": 3,
                            "items": {
                                "type": "object",
                                "properties": {
                                    "text": { "type": "string" },
                                    "hashtags": { "type": "array", "items": { "type": "string" } },
                                    "emojis": { "type": "array", "items": { "type": "string" } },
                                },
                                "required": ["text", "hashtags", "emojis"],
                            },
                        },
                    },
                    "required": ["captions"],
                },
            },
        });

        let response = self.generate_content(TEXT_MODEL, body).await?;
        let text = Self::response_text(&response).ok_or(GenerationError::Empty)?;

        let set: CaptionSet = serde_json::from_str(&text)
            .map_err(|e| GenerationError::Decode(format!("caption payload: {e}")))?;
        debug!(captions = set.captions.len(), "Caption generation completed");
        Ok(set.captions)
    }

    /// Generate up to [`IMAGE_ATTEMPTS`] variant images of the product.
    ///
    /// Attempts are independent: a failed attempt is logged and skipped, and
    /// the remaining attempts still run. An all-failed request returns an
    /// empty list, which the caller treats as a terminal generation failure.
    pub async fn generate_product_images(
        &self,
        image_path: &Path,
        description: &str,
        media: &MediaStore,
    ) -> Result<Vec<GeneratedImage>, GenerationError> {
        let image_part = inline_image_part(image_path)?;

        let mut images = Vec::new();
        for attempt in 0..IMAGE_ATTEMPTS {
            match self
                .generate_single_image(&image_part, description, attempt, media)
                .await
            {
                Ok(image) => images.push(image),
                Err(e) => {
                    warn!(attempt, error = %e, "Image generation attempt failed");
                }
            }
        }
        Ok(images)
    }

    async fn generate_single_image(
        &self,
        image_part: &Value,
        description: &str,
        attempt: usize,
        media: &MediaStore,
    ) -> Result<GeneratedImage, GenerationError> {
        let prompt = format!(
            "Create a polished product marketing photograph based on this image of a handmade \
product. Product description: {description}. Produce a distinct composition (variant {}), \
clean background, suitable for a social media post.",
            attempt + 1
        );

        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }, image_part],
            }],
            "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
        });

        let response = self.generate_content(IMAGE_MODEL, body).await?;
        let inline = response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| {
                content
                    .parts
                    .iter()
                    .find_map(|part| part.inline_data.as_ref())
            })
            .ok_or(GenerationError::Empty)?;

        let bytes = BASE64
            .decode(&inline.data)
            .map_err(|e| GenerationError::Decode(format!("image payload: {e}")))?;

        let (file_name, file_path) = media
            .save_generated(&bytes, storage::sniff_extension(&bytes))
            .map_err(|e| GenerationError::Request(format!("failed to store generated image: {e}")))?;

        Ok(GeneratedImage {
            file_name,
            file_path,
        })
    }
}

/// Inline a local image file as a base64 request part.
fn inline_image_part(image_path: &Path) -> Result<Value, GenerationError> {
    let bytes = fs::read(image_path).map_err(|e| {
        GenerationError::Request(format!("failed to read {}: {e}", image_path.display()))
    })?;
    Ok(json!({
        "inlineData": {
            "mimeType": storage::mime_for_path(image_path),
            "data": BASE64.encode(&bytes),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_formatting() {
        let status_error = GenerationError::Status("429: quota".to_string());
        assert_eq!(format!("{status_error}"), "API error: 429: quota");

        let empty = GenerationError::Empty;
        assert_eq!(format!("{empty}"), "Empty generation result");
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello " }, { "text": "there" }] }
            }]
        }))
        .unwrap();
        assert_eq!(
            GeminiClient::response_text(&response),
            Some("Hello there".to_string())
        );
    }

    #[test]
    fn test_response_text_empty_candidates() {
        let response: GenerateContentResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(GeminiClient::response_text(&response), None);
    }

    #[test]
    fn test_caption_payload_parsing() {
        let payload = r##"{
            "captions": [
                { "text": "Handmade warmth", "hashtags": ["#artisan"], "emojis": ["🏺"] },
                { "text": "Crafted for you", "hashtags": [], "emojis": [] },
                { "text": "One of a kind", "hashtags": ["#handmade"], "emojis": ["✨"] }
            ]
        }"##;
        let set: CaptionSet = serde_json::from_str(payload).unwrap();
        assert_eq!(set.captions.len(), 3);
        assert_eq!(set.captions[0].text, "Handmade warmth");
        assert_eq!(set.captions[2].hashtags, vec!["#handmade"]);
    }

    #[test]
    fn test_inline_data_snake_case_alias() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "inline_data": { "data": "aGk=" } }] }
            }]
        }))
        .unwrap();
        assert!(response.candidates[0]
            .content
            .as_ref()
            .unwrap()
            .parts[0]
            .inline_data
            .is_some());
    }
}
