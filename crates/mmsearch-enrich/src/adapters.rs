//! Model adapter contracts.
//!
//! One trait per adapter kind; every implementation is safe to invoke from
//! many tasks simultaneously. Vendors classify failures into [`ModelError`]
//! kinds at the source.

use async_trait::async_trait;

use crate::error::ModelResult;

/// Embed a text string into a fixed-dimension vector.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed_text(&self, text: &str) -> ModelResult<Vec<f32>>;
}

/// Embed the content of an image URL.
///
/// Fails with `InvalidMedia` when the URL resolves to something the
/// provider cannot decode as an image.
#[async_trait]
pub trait ImageEmbedder: Send + Sync {
    async fn embed_image(&self, image_url: &str) -> ModelResult<Vec<f32>>;
}

/// Embed the content of a video URL.
///
/// Fails with `MediaDownload` when the URL is unreachable and
/// `MediaProcessing` for any failure after download.
#[async_trait]
pub trait VideoEmbedder: Send + Sync {
    async fn embed_video(&self, video_url: &str) -> ModelResult<Vec<f32>>;
}

/// Describe an image in natural language.
#[async_trait]
pub trait Captioner: Send + Sync {
    async fn caption(&self, image_url: &str) -> ModelResult<String>;
}

/// Transcribe speech from an audio URL. The transcript may be empty.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_url: &str) -> ModelResult<String>;
}

/// Extract the audio track of a video, upload it, and return its public URL.
#[async_trait]
pub trait AudioUploader: Send + Sync {
    async fn extract_and_upload(&self, video_url: &str) -> ModelResult<String>;
}
