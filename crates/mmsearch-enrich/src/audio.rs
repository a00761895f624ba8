//! Audio extract-and-upload adapter.
//!
//! Downloads the video, transcodes its audio track to 16 kHz mono WAV, and
//! uploads the WAV under `{prefix}/{uuid}.wav` so the transcriber can fetch
//! it by URL. Scratch files are removed on every exit path.

use async_trait::async_trait;
use tracing::info;

use mmsearch_media::{AudioExtractor, MediaError};
use mmsearch_storage::ObjectStoreClient;

use crate::adapters::AudioUploader;
use crate::error::{ModelError, ModelResult};

/// FFmpeg + object-store implementation of [`AudioUploader`].
pub struct FfmpegAudioUploader {
    extractor: AudioExtractor,
    store: ObjectStoreClient,
    prefix: String,
}

impl FfmpegAudioUploader {
    pub fn new(store: ObjectStoreClient, prefix: impl Into<String>) -> ModelResult<Self> {
        let extractor = AudioExtractor::new().map_err(|e| match e {
            MediaError::FfmpegNotFound => ModelError::config_error("ffmpeg not found in PATH"),
            other => ModelError::media_processing(other.to_string()),
        })?;

        Ok(Self {
            extractor,
            store,
            prefix: prefix.into(),
        })
    }
}

#[async_trait]
impl AudioUploader for FfmpegAudioUploader {
    async fn extract_and_upload(&self, video_url: &str) -> ModelResult<String> {
        let audio = self
            .extractor
            .extract_wav(video_url)
            .await
            .map_err(|e| match e {
                MediaError::DownloadFailed { message } => ModelError::media_download(message),
                other => ModelError::media_processing(other.to_string()),
            })?;

        let key = ObjectStoreClient::audio_key(&self.prefix);
        let url = self
            .store
            .upload_file(audio.path(), &key, "audio/wav")
            .await
            .map_err(|e| ModelError::media_processing(e.to_string()))?;

        // `audio` drops here, removing the scratch directory
        info!("Extracted audio for {} at {}", video_url, url);
        Ok(url)
    }
}
