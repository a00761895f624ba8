//! The enrichment pipeline: raw item in, enrichment record out.
//!
//! The three per-modality subgraphs run concurrently; steps inside a
//! subgraph keep their required order (caption before caption embedding,
//! audio upload before transcription). A failure in any subgraph fails the
//! run with its adapter-level kind preserved. Speech recognition is the
//! one exception: it degrades to an empty transcript.

use std::sync::Arc;

use tracing::{debug, warn};

use mmsearch_models::{
    Enrichment, ImageEnrichment, MultimodalItem, TextEnrichment, VideoEnrichment,
};

use crate::adapters::{
    AudioUploader, Captioner, ImageEmbedder, TextEmbedder, Transcriber, VideoEmbedder,
};
use crate::error::ModelResult;

/// Fan-out-then-merge orchestrator over the six model adapters.
#[derive(Clone)]
pub struct EnrichmentPipeline {
    text_embedder: Arc<dyn TextEmbedder>,
    image_embedder: Arc<dyn ImageEmbedder>,
    video_embedder: Arc<dyn VideoEmbedder>,
    captioner: Arc<dyn Captioner>,
    transcriber: Arc<dyn Transcriber>,
    audio_uploader: Arc<dyn AudioUploader>,
}

impl EnrichmentPipeline {
    pub fn new(
        text_embedder: Arc<dyn TextEmbedder>,
        image_embedder: Arc<dyn ImageEmbedder>,
        video_embedder: Arc<dyn VideoEmbedder>,
        captioner: Arc<dyn Captioner>,
        transcriber: Arc<dyn Transcriber>,
        audio_uploader: Arc<dyn AudioUploader>,
    ) -> Self {
        Self {
            text_embedder,
            image_embedder,
            video_embedder,
            captioner,
            transcriber,
            audio_uploader,
        }
    }

    /// Produce the enrichment record for one item.
    pub async fn enrich(&self, item: &MultimodalItem) -> ModelResult<Enrichment> {
        debug!("Enriching item with modalities: {}", item.modalities());

        let (text, image, video) = tokio::try_join!(
            self.enrich_text(item.text.as_deref()),
            self.enrich_image(item.image_url.as_deref()),
            self.enrich_video(item.video_url.as_deref()),
        )?;

        Ok(Enrichment { text, image, video })
    }

    async fn enrich_text(&self, text: Option<&str>) -> ModelResult<Option<TextEnrichment>> {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let embedding = self.text_embedder.embed_text(text).await?;
        Ok(Some(TextEnrichment {
            embeddings: vec![embedding],
        }))
    }

    async fn enrich_image(&self, image_url: Option<&str>) -> ModelResult<Option<ImageEnrichment>> {
        let Some(image_url) = image_url.filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        // Content embedding and captioning are independent
        let (embedding, caption) = tokio::try_join!(
            self.image_embedder.embed_image(image_url),
            self.captioner.caption(image_url),
        )?;

        let caption_embeddings = if caption.is_empty() {
            Vec::new()
        } else {
            vec![self.text_embedder.embed_text(&caption).await?]
        };

        Ok(Some(ImageEnrichment {
            embedding: Some(embedding),
            caption: Some(caption),
            caption_embeddings,
        }))
    }

    async fn enrich_video(&self, video_url: Option<&str>) -> ModelResult<Option<VideoEnrichment>> {
        let Some(video_url) = video_url.filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        // Content embedding and audio extraction are independent
        let (embedding, audio_url) = tokio::try_join!(
            self.video_embedder.embed_video(video_url),
            self.audio_uploader.extract_and_upload(video_url),
        )?;

        // ASR failure is non-fatal: log and substitute an empty transcript
        let transcript = match self.transcriber.transcribe(&audio_url).await {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!("ASR failed for {}, substituting empty transcript: {}", video_url, e);
                String::new()
            }
        };

        let transcript_embeddings = if transcript.is_empty() {
            Vec::new()
        } else {
            vec![self.text_embedder.embed_text(&transcript).await?]
        };

        Ok(Some(VideoEnrichment {
            embedding: Some(embedding),
            transcript: Some(transcript),
            transcript_embeddings,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Text embedder that records every string it embeds.
    #[derive(Default)]
    struct RecordingTextEmbedder {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextEmbedder for RecordingTextEmbedder {
        async fn embed_text(&self, text: &str) -> ModelResult<Vec<f32>> {
            self.calls.lock().unwrap().push(text.to_string());
            Ok(vec![0.1; 8])
        }
    }

    struct StubImageEmbedder {
        result: fn() -> ModelResult<Vec<f32>>,
    }

    #[async_trait]
    impl ImageEmbedder for StubImageEmbedder {
        async fn embed_image(&self, _image_url: &str) -> ModelResult<Vec<f32>> {
            (self.result)()
        }
    }

    struct StubVideoEmbedder;

    #[async_trait]
    impl VideoEmbedder for StubVideoEmbedder {
        async fn embed_video(&self, _video_url: &str) -> ModelResult<Vec<f32>> {
            Ok(vec![0.3; 8])
        }
    }

    struct StubCaptioner {
        caption: String,
    }

    #[async_trait]
    impl Captioner for StubCaptioner {
        async fn caption(&self, _image_url: &str) -> ModelResult<String> {
            Ok(self.caption.clone())
        }
    }

    struct StubTranscriber {
        result: fn() -> ModelResult<String>,
    }

    #[async_trait]
    impl Transcriber for StubTranscriber {
        async fn transcribe(&self, _audio_url: &str) -> ModelResult<String> {
            (self.result)()
        }
    }

    struct StubAudioUploader;

    #[async_trait]
    impl AudioUploader for StubAudioUploader {
        async fn extract_and_upload(&self, _video_url: &str) -> ModelResult<String> {
            Ok("https://bucket.example.com/audio/x.wav".to_string())
        }
    }

    struct PipelineBuilder {
        text_embedder: Arc<RecordingTextEmbedder>,
        image_result: fn() -> ModelResult<Vec<f32>>,
        caption: String,
        transcribe_result: fn() -> ModelResult<String>,
    }

    impl PipelineBuilder {
        fn new() -> Self {
            Self {
                text_embedder: Arc::new(RecordingTextEmbedder::default()),
                image_result: || Ok(vec![0.2; 8]),
                caption: "a red car".to_string(),
                transcribe_result: || Ok("hello world".to_string()),
            }
        }

        fn build(&self) -> EnrichmentPipeline {
            EnrichmentPipeline::new(
                self.text_embedder.clone(),
                Arc::new(StubImageEmbedder {
                    result: self.image_result,
                }),
                Arc::new(StubVideoEmbedder),
                Arc::new(StubCaptioner {
                    caption: self.caption.clone(),
                }),
                Arc::new(StubTranscriber {
                    result: self.transcribe_result,
                }),
                Arc::new(StubAudioUploader),
            )
        }

        fn embedded_texts(&self) -> Vec<String> {
            self.text_embedder.calls.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_text_only_item_yields_text_subrecord_only() {
        let builder = PipelineBuilder::new();
        let pipeline = builder.build();

        let enrichment = pipeline
            .enrich(&MultimodalItem::from_text("hello"))
            .await
            .unwrap();

        let text = enrichment.text.expect("text sub-record");
        assert_eq!(text.embeddings.len(), 1);
        assert!(enrichment.image.is_none());
        assert!(enrichment.video.is_none());
        assert_eq!(builder.embedded_texts(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_image_subgraph_embeds_the_caption() {
        let builder = PipelineBuilder::new();
        let pipeline = builder.build();

        let enrichment = pipeline
            .enrich(&MultimodalItem::from_image("https://example.com/a.jpg"))
            .await
            .unwrap();

        let image = enrichment.image.expect("image sub-record");
        assert!(image.embedding.is_some());
        assert_eq!(image.caption.as_deref(), Some("a red car"));
        assert_eq!(image.caption_embeddings.len(), 1);
        assert_eq!(builder.embedded_texts(), vec!["a red car"]);
    }

    #[tokio::test]
    async fn test_empty_caption_skips_caption_embedding() {
        let mut builder = PipelineBuilder::new();
        builder.caption = String::new();
        let pipeline = builder.build();

        let enrichment = pipeline
            .enrich(&MultimodalItem::from_image("https://example.com/a.jpg"))
            .await
            .unwrap();

        let image = enrichment.image.expect("image sub-record");
        assert!(image.caption_embeddings.is_empty());
        assert!(builder.embedded_texts().is_empty());
    }

    #[tokio::test]
    async fn test_video_subgraph_embeds_the_transcript() {
        let builder = PipelineBuilder::new();
        let pipeline = builder.build();

        let enrichment = pipeline
            .enrich(&MultimodalItem::from_video("https://example.com/v.mp4"))
            .await
            .unwrap();

        let video = enrichment.video.expect("video sub-record");
        assert!(video.embedding.is_some());
        assert_eq!(video.transcript.as_deref(), Some("hello world"));
        assert_eq!(video.transcript_embeddings.len(), 1);
        assert_eq!(builder.embedded_texts(), vec!["hello world"]);
    }

    #[tokio::test]
    async fn test_asr_failure_substitutes_empty_transcript() {
        let mut builder = PipelineBuilder::new();
        builder.transcribe_result = || Err(ModelError::media_processing("ASR backend down"));
        let pipeline = builder.build();

        let enrichment = pipeline
            .enrich(&MultimodalItem::from_video("https://example.com/v.mp4"))
            .await
            .unwrap();

        let video = enrichment.video.expect("video sub-record");
        assert_eq!(video.transcript.as_deref(), Some(""));
        assert!(video.transcript_embeddings.is_empty());
        assert!(builder.embedded_texts().is_empty());
    }

    #[tokio::test]
    async fn test_image_failure_is_fatal_with_kind_preserved() {
        let mut builder = PipelineBuilder::new();
        builder.image_result = || Err(ModelError::media_download("HTTP 404"));
        let pipeline = builder.build();

        let item = MultimodalItem {
            text: Some("body".to_string()),
            image_url: Some("https://example.com/missing.jpg".to_string()),
            video_url: None,
        };
        let result = pipeline.enrich(&item).await;

        assert!(matches!(result, Err(ModelError::MediaDownload(_))));
    }

    #[tokio::test]
    async fn test_all_modalities_run_together() {
        let builder = PipelineBuilder::new();
        let pipeline = builder.build();

        let item = MultimodalItem {
            text: Some("body".to_string()),
            image_url: Some("https://example.com/a.jpg".to_string()),
            video_url: Some("https://example.com/v.mp4".to_string()),
        };
        let enrichment = pipeline.enrich(&item).await.unwrap();

        assert!(enrichment.text.is_some());
        assert!(enrichment.image.is_some());
        assert!(enrichment.video.is_some());
        assert_eq!(enrichment.labeled_embeddings().len(), 5);

        let mut embedded = builder.embedded_texts();
        embedded.sort();
        assert_eq!(embedded, vec!["a red car", "body", "hello world"]);
    }
}
