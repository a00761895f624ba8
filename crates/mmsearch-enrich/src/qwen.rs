//! Qwen adapter implementations over the DashScope API.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::adapters::{Captioner, ImageEmbedder, TextEmbedder, Transcriber, VideoEmbedder};
use crate::config::{AdapterConfig, CaptionerConfig, TranscriberConfig};
use crate::dashscope::{DashScopeClient, MediaInput};
use crate::error::{ModelError, ModelResult};

/// Text embedder backed by the Qwen text-embedding models.
pub struct QwenTextEmbedder {
    client: DashScopeClient,
    model: String,
}

impl QwenTextEmbedder {
    pub fn new(config: &AdapterConfig, timeout: Duration) -> ModelResult<Self> {
        Ok(Self {
            client: DashScopeClient::new(&config.api_key, timeout)?,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextEmbedder for QwenTextEmbedder {
    async fn embed_text(&self, text: &str) -> ModelResult<Vec<f32>> {
        self.client.text_embedding(&self.model, text).await
    }
}

/// Image embedder backed by the Qwen multimodal-embedding models.
pub struct QwenImageEmbedder {
    client: DashScopeClient,
    model: String,
    dimension: Option<usize>,
}

impl QwenImageEmbedder {
    pub fn new(config: &AdapterConfig, timeout: Duration) -> ModelResult<Self> {
        Ok(Self {
            client: DashScopeClient::new(&config.api_key, timeout)?,
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl ImageEmbedder for QwenImageEmbedder {
    async fn embed_image(&self, image_url: &str) -> ModelResult<Vec<f32>> {
        self.client
            .multimodal_embedding(&self.model, MediaInput::Image(image_url), self.dimension)
            .await
    }
}

/// Video embedder backed by the Qwen multimodal-embedding models.
pub struct QwenVideoEmbedder {
    client: DashScopeClient,
    model: String,
    dimension: Option<usize>,
}

impl QwenVideoEmbedder {
    pub fn new(config: &AdapterConfig, timeout: Duration) -> ModelResult<Self> {
        Ok(Self {
            client: DashScopeClient::new(&config.api_key, timeout)?,
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl VideoEmbedder for QwenVideoEmbedder {
    async fn embed_video(&self, video_url: &str) -> ModelResult<Vec<f32>> {
        self.client
            .multimodal_embedding(&self.model, MediaInput::Video(video_url), self.dimension)
            .await
    }
}

/// Captioner backed by the Qwen vision-language models.
///
/// The prompt file is read once at construction; an unreadable prompt is a
/// configuration error, not a per-call failure.
pub struct QwenCaptioner {
    client: DashScopeClient,
    model: String,
    prompt: String,
}

impl QwenCaptioner {
    pub fn new(config: &CaptionerConfig, timeout: Duration) -> ModelResult<Self> {
        let prompt = std::fs::read_to_string(&config.prompt_path).map_err(|e| {
            ModelError::config_error(format!(
                "cannot read caption prompt {}: {e}",
                config.prompt_path
            ))
        })?;
        debug!("Loaded caption prompt from {}", config.prompt_path);

        Ok(Self {
            client: DashScopeClient::new(&config.adapter.api_key, timeout)?,
            model: config.adapter.model.clone(),
            prompt,
        })
    }
}

#[async_trait]
impl Captioner for QwenCaptioner {
    async fn caption(&self, image_url: &str) -> ModelResult<String> {
        self.client.caption(&self.model, image_url, &self.prompt).await
    }
}

/// Transcriber backed by the Paraformer ASR models.
pub struct QwenTranscriber {
    client: DashScopeClient,
    model: String,
    language_hints: Vec<String>,
}

impl QwenTranscriber {
    pub fn new(config: &TranscriberConfig, timeout: Duration) -> ModelResult<Self> {
        Ok(Self {
            client: DashScopeClient::new(&config.adapter.api_key, timeout)?,
            model: config.adapter.model.clone(),
            language_hints: config.language_hints.clone(),
        })
    }
}

#[async_trait]
impl Transcriber for QwenTranscriber {
    async fn transcribe(&self, audio_url: &str) -> ModelResult<String> {
        self.client
            .transcribe(&self.model, audio_url, &self.language_hints)
            .await
    }
}
