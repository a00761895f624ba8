//! Startup-time adapter selection.
//!
//! Each adapter kind is chosen by its configured vendor tag; unknown tags
//! are configuration errors at startup, not runtime surprises.

use std::sync::Arc;

use mmsearch_storage::ObjectStoreClient;

use crate::adapters::{
    AudioUploader, Captioner, ImageEmbedder, TextEmbedder, Transcriber, VideoEmbedder,
};
use crate::audio::FfmpegAudioUploader;
use crate::config::EnrichConfig;
use crate::error::{ModelError, ModelResult};
use crate::pipeline::EnrichmentPipeline;
use crate::qwen::{
    QwenCaptioner, QwenImageEmbedder, QwenTextEmbedder, QwenTranscriber, QwenVideoEmbedder,
};

fn unknown_impl(kind: &str, tag: &str) -> ModelError {
    ModelError::config_error(format!("unknown {kind} implementation: {tag}"))
}

/// Build the full pipeline from configuration.
pub fn build_pipeline(
    config: &EnrichConfig,
    store: ObjectStoreClient,
) -> ModelResult<EnrichmentPipeline> {
    let timeout = config.model_timeout;

    let text_embedder: Arc<dyn TextEmbedder> = match config.text_embed.impl_tag.to_lowercase().as_str()
    {
        "dashscope" | "qwen" => Arc::new(QwenTextEmbedder::new(&config.text_embed, timeout)?),
        other => return Err(unknown_impl("text embedder", other)),
    };

    let image_embedder: Arc<dyn ImageEmbedder> =
        match config.image_embed.impl_tag.to_lowercase().as_str() {
            "dashscope" | "qwen" => Arc::new(QwenImageEmbedder::new(&config.image_embed, timeout)?),
            other => return Err(unknown_impl("image embedder", other)),
        };

    let video_embedder: Arc<dyn VideoEmbedder> =
        match config.video_embed.impl_tag.to_lowercase().as_str() {
            "dashscope" | "qwen" => Arc::new(QwenVideoEmbedder::new(&config.video_embed, timeout)?),
            other => return Err(unknown_impl("video embedder", other)),
        };

    let captioner: Arc<dyn Captioner> =
        match config.captioner.adapter.impl_tag.to_lowercase().as_str() {
            "dashscope" | "qwen" => Arc::new(QwenCaptioner::new(&config.captioner, timeout)?),
            other => return Err(unknown_impl("captioner", other)),
        };

    let transcriber: Arc<dyn Transcriber> =
        match config.transcriber.adapter.impl_tag.to_lowercase().as_str() {
            "dashscope" | "qwen" => Arc::new(QwenTranscriber::new(&config.transcriber, timeout)?),
            other => return Err(unknown_impl("transcriber", other)),
        };

    let audio_uploader: Arc<dyn AudioUploader> =
        Arc::new(FfmpegAudioUploader::new(store, config.audio_prefix.clone())?);

    Ok(EnrichmentPipeline::new(
        text_embedder,
        image_embedder,
        video_embedder,
        captioner,
        transcriber,
        audio_uploader,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdapterConfig, CaptionerConfig, TranscriberConfig};
    use std::time::Duration;

    #[test]
    fn test_unknown_vendor_tag_is_a_config_error() {
        let adapter = AdapterConfig {
            impl_tag: "acme".to_string(),
            api_key: "k".to_string(),
            model: "m".to_string(),
            dimension: None,
        };
        let config = EnrichConfig {
            text_embed: adapter.clone(),
            image_embed: adapter.clone(),
            video_embed: adapter.clone(),
            captioner: CaptionerConfig {
                adapter: adapter.clone(),
                prompt_path: "prompt.txt".to_string(),
            },
            transcriber: TranscriberConfig {
                adapter,
                language_hints: vec!["en".to_string()],
            },
            audio_prefix: "audio".to_string(),
            model_timeout: Duration::from_secs(5),
        };

        let store = ObjectStoreClient::new(mmsearch_storage::ObjectStoreConfig {
            endpoint_url: "https://oss.example.com".to_string(),
            access_key_id: "ak".to_string(),
            secret_access_key: "sk".to_string(),
            bucket_name: "b".to_string(),
            region: "auto".to_string(),
        });

        let result = build_pipeline(&config, store);
        assert!(matches!(result, Err(ModelError::Config(_))));
    }
}
