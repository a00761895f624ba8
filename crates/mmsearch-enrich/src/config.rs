//! Adapter and pipeline configuration.

use std::time::Duration;

use crate::error::{ModelError, ModelResult};

/// Configuration shared by every model adapter.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Vendor tag selecting the implementation (e.g. "dashscope")
    pub impl_tag: String,
    /// Vendor API key
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Output dimension for embedding models that accept one
    pub dimension: Option<usize>,
}

impl AdapterConfig {
    /// Read `{PREFIX}_IMPL`, `{PREFIX}_API_KEY`, `{PREFIX}_MODEL`, and
    /// `{PREFIX}_DIMENSION` from the environment.
    pub fn from_env(prefix: &str, default_model: &str) -> ModelResult<Self> {
        let api_key_var = format!("{prefix}_API_KEY");
        Ok(Self {
            impl_tag: std::env::var(format!("{prefix}_IMPL"))
                .unwrap_or_else(|_| "dashscope".to_string()),
            api_key: std::env::var(&api_key_var)
                .map_err(|_| ModelError::config_error(format!("{api_key_var} not set")))?,
            model: std::env::var(format!("{prefix}_MODEL"))
                .unwrap_or_else(|_| default_model.to_string()),
            dimension: std::env::var(format!("{prefix}_DIMENSION"))
                .ok()
                .and_then(|s| s.parse().ok()),
        })
    }
}

/// Captioner configuration: base adapter plus the prompt file.
#[derive(Debug, Clone)]
pub struct CaptionerConfig {
    pub adapter: AdapterConfig,
    /// Path to the caption prompt, read once at startup
    pub prompt_path: String,
}

impl CaptionerConfig {
    pub fn from_env() -> ModelResult<Self> {
        Ok(Self {
            adapter: AdapterConfig::from_env("VLM", "qwen-vl-max-latest")?,
            prompt_path: std::env::var("VLM_PROMPT_PATH")
                .unwrap_or_else(|_| "caption_prompt.txt".to_string()),
        })
    }
}

/// Transcriber configuration: base adapter plus language hints.
#[derive(Debug, Clone)]
pub struct TranscriberConfig {
    pub adapter: AdapterConfig,
    pub language_hints: Vec<String>,
}

impl TranscriberConfig {
    pub fn from_env() -> ModelResult<Self> {
        let language_hints = std::env::var("ASR_LANGUAGE_HINTS")
            .map(|s| {
                s.split(',')
                    .map(|hint| hint.trim().to_string())
                    .filter(|hint| !hint.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| vec!["zh".to_string(), "en".to_string()]);

        Ok(Self {
            adapter: AdapterConfig::from_env("ASR", "paraformer-v2")?,
            language_hints,
        })
    }
}

/// Full enrichment configuration.
#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub text_embed: AdapterConfig,
    pub image_embed: AdapterConfig,
    pub video_embed: AdapterConfig,
    pub captioner: CaptionerConfig,
    pub transcriber: TranscriberConfig,
    /// Object key prefix for uploaded audio
    pub audio_prefix: String,
    /// Vendor HTTP call timeout
    pub model_timeout: Duration,
}

impl EnrichConfig {
    /// Create config from environment variables.
    pub fn from_env() -> ModelResult<Self> {
        Ok(Self {
            text_embed: AdapterConfig::from_env("TEXT_EMBED", "text-embedding-v4")?,
            image_embed: AdapterConfig::from_env("IMAGE_EMBED", "multimodal-embedding-v1")?,
            video_embed: AdapterConfig::from_env("VIDEO_EMBED", "multimodal-embedding-v1")?,
            captioner: CaptionerConfig::from_env()?,
            transcriber: TranscriberConfig::from_env()?,
            audio_prefix: std::env::var("AUDIO_PREFIX").unwrap_or_else(|_| "audio".to_string()),
            model_timeout: Duration::from_secs(
                std::env::var("MODEL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}
