//! Audio extraction: video URL in, 16 kHz mono WAV out.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::info;

use crate::command::FfmpegCommand;
use crate::download::download_to_file;
use crate::error::{MediaError, MediaResult};

/// Sample rate expected by the speech recognizer.
const ASR_SAMPLE_RATE_HZ: u32 = 16_000;

/// Timeout for the video download client.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// A transcoded WAV file inside its scratch directory.
///
/// The directory and everything in it are removed when this handle drops,
/// so the WAV must be consumed (uploaded) before then.
pub struct ExtractedAudio {
    dir: TempDir,
    wav_path: PathBuf,
}

impl ExtractedAudio {
    /// Path to the WAV file.
    pub fn path(&self) -> &Path {
        &self.wav_path
    }

    /// Scratch directory holding the intermediate files.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Downloads videos and extracts their audio track for ASR.
#[derive(Clone)]
pub struct AudioExtractor {
    http: reqwest::Client,
}

impl AudioExtractor {
    /// Create a new extractor.
    ///
    /// Fails when ffmpeg is not installed; better to surface that at
    /// startup than on the first video task.
    pub fn new() -> MediaResult<Self> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| MediaError::download_failed(e.to_string()))?;

        Ok(Self { http })
    }

    /// Download the video and transcode its audio track to 16 kHz mono WAV.
    ///
    /// Every intermediate file lives in the returned handle's scratch
    /// directory; dropping the handle removes them on success and failure
    /// alike.
    pub async fn extract_wav(&self, video_url: &str) -> MediaResult<ExtractedAudio> {
        let dir = TempDir::new()?;
        let video_path = dir.path().join("source.video");
        let wav_path = dir.path().join("audio.wav");

        let bytes = download_to_file(&self.http, video_url, &video_path).await?;
        info!("Downloaded {} bytes for audio extraction", bytes);

        wav_transcode_command(&video_path, &wav_path).run().await?;

        if !wav_path.exists() {
            return Err(MediaError::ffmpeg_failed(
                format!("no audio output produced for {video_url}"),
                None,
                None,
            ));
        }

        Ok(ExtractedAudio { dir, wav_path })
    }
}

/// FFmpeg invocation that strips video and resamples to ASR format.
fn wav_transcode_command(input: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .no_video()
        .audio_codec("pcm_s16le")
        .sample_rate(ASR_SAMPLE_RATE_HZ)
        .channels(1)
}
