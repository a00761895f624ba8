//! DashScope HTTP client for embeddings, captioning, and transcription.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ModelError, ModelResult};

const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";

const TEXT_EMBEDDING_ENDPOINT: &str = "/services/embeddings/text-embedding/text-embedding";
const MULTIMODAL_EMBEDDING_ENDPOINT: &str =
    "/services/embeddings/multimodal-embedding/multimodal-embedding";
const GENERATION_ENDPOINT: &str = "/services/aigc/multimodal-generation/generation";
const TRANSCRIPTION_ENDPOINT: &str = "/services/audio/asr/transcription";

/// Media input for multimodal embedding calls.
#[derive(Debug, Clone, Copy)]
pub enum MediaInput<'a> {
    Image(&'a str),
    Video(&'a str),
}

impl MediaInput<'_> {
    fn as_content(&self) -> serde_json::Value {
        match self {
            MediaInput::Image(url) => json!({ "image": url }),
            MediaInput::Video(url) => json!({ "video": url }),
        }
    }
}

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    output: EmbeddingOutput,
}

#[derive(Debug, Deserialize)]
struct EmbeddingOutput {
    embeddings: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    output: GenerationOutput,
}

#[derive(Debug, Deserialize)]
struct GenerationOutput {
    choices: Vec<GenerationChoice>,
}

#[derive(Debug, Deserialize)]
struct GenerationChoice {
    message: GenerationMessage,
}

#[derive(Debug, Deserialize)]
struct GenerationMessage {
    content: Vec<GenerationContent>,
}

#[derive(Debug, Deserialize)]
struct GenerationContent {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    output: TranscriptionOutput,
}

#[derive(Debug, Default, Deserialize)]
struct TranscriptionOutput {
    #[serde(default)]
    text: String,
}

// ============================================================================
// Client
// ============================================================================

/// DashScope API client.
#[derive(Clone)]
pub struct DashScopeClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl DashScopeClient {
    /// Create a new client with the given call timeout.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> ModelResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ModelError::from)?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
        context: &str,
    ) -> ModelResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let envelope: ErrorEnvelope = serde_json::from_str(&text).unwrap_or_default();
            return Err(classify_vendor_error(
                envelope.code.as_deref().unwrap_or("Unknown"),
                envelope.message.as_deref().unwrap_or(&text),
                context,
            ));
        }

        serde_json::from_str(&text)
            .map_err(|e| ModelError::media_processing(format!("{context}: unexpected response: {e}")))
    }

    /// Embed a text string.
    pub async fn text_embedding(&self, model: &str, text: &str) -> ModelResult<Vec<f32>> {
        let body = json!({
            "model": model,
            "input": { "texts": [text] },
        });

        let response: EmbeddingResponse = self
            .post(TEXT_EMBEDDING_ENDPOINT, &body, "text embedding")
            .await?;

        first_embedding(response, "text embedding")
    }

    /// Embed image or video content.
    pub async fn multimodal_embedding(
        &self,
        model: &str,
        input: MediaInput<'_>,
        dimension: Option<usize>,
    ) -> ModelResult<Vec<f32>> {
        let mut body = json!({
            "model": model,
            "input": { "contents": [input.as_content()] },
        });
        if let Some(dimension) = dimension {
            body["parameters"] = json!({ "dimension": dimension });
        }

        let context = match input {
            MediaInput::Image(_) => "image embedding",
            MediaInput::Video(_) => "video embedding",
        };
        let response: EmbeddingResponse = self
            .post(MULTIMODAL_EMBEDDING_ENDPOINT, &body, context)
            .await?;

        first_embedding(response, context)
    }

    /// Describe an image with a vision-language model.
    pub async fn caption(&self, model: &str, image_url: &str, prompt: &str) -> ModelResult<String> {
        let body = json!({
            "model": model,
            "input": {
                "messages": [{
                    "role": "user",
                    "content": [
                        { "image": image_url },
                        { "text": prompt },
                    ],
                }],
            },
        });

        let response: GenerationResponse = self.post(GENERATION_ENDPOINT, &body, "caption").await?;

        response
            .output
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content.into_iter().find_map(|c| c.text))
            .ok_or_else(|| ModelError::media_processing("caption: no text in response"))
    }

    /// Transcribe 16 kHz mono WAV audio by URL.
    pub async fn transcribe(
        &self,
        model: &str,
        audio_url: &str,
        language_hints: &[String],
    ) -> ModelResult<String> {
        let body = json!({
            "model": model,
            "input": { "file_urls": [audio_url] },
            "parameters": {
                "format": "wav",
                "sample_rate": 16000,
                "language_hints": language_hints,
            },
        });

        let response: TranscriptionResponse = self
            .post(TRANSCRIPTION_ENDPOINT, &body, "transcription")
            .await?;
        Ok(response.output.text)
    }
}

fn first_embedding(response: EmbeddingResponse, context: &str) -> ModelResult<Vec<f32>> {
    response
        .output
        .embeddings
        .into_iter()
        .next()
        .map(|row| row.embedding)
        .ok_or_else(|| ModelError::media_processing(format!("{context}: no embedding in response")))
}

/// Classify a vendor failure into an error kind.
///
/// The vendor reports media problems in its message text; match the known
/// phrasings and keep everything else as a coded vendor error.
fn classify_vendor_error(code: &str, message: &str, context: &str) -> ModelError {
    let lowered = message.to_lowercase();
    if lowered.contains("download") || lowered.contains("unreachable") {
        ModelError::media_download(format!("{context}: {message}"))
    } else if lowered.contains("format")
        || lowered.contains("decode")
        || lowered.contains("illegal")
        || lowered.contains("cannot be opened")
    {
        ModelError::invalid_media(format!("{context}: {message}"))
    } else {
        ModelError::vendor(code, format!("{context}: {message}"))
    }
}
