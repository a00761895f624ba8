//! Multimodal input items.

use serde::{Deserialize, Serialize};

/// A raw item carrying any combination of a text body, an image URL, and a
/// video URL.
///
/// At least one modality must be present for the item to be processable;
/// the service facade rejects empty items before any model call is made.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultimodalItem {
    /// Text body
    #[serde(default)]
    pub text: Option<String>,
    /// Image locator
    #[serde(default)]
    pub image_url: Option<String>,
    /// Video locator
    #[serde(default)]
    pub video_url: Option<String>,
}

impl MultimodalItem {
    /// Create a text-only item.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Create an image-only item.
    pub fn from_image(image_url: impl Into<String>) -> Self {
        Self {
            image_url: Some(image_url.into()),
            ..Default::default()
        }
    }

    /// Create a video-only item.
    pub fn from_video(video_url: impl Into<String>) -> Self {
        Self {
            video_url: Some(video_url.into()),
            ..Default::default()
        }
    }

    /// Whether any modality is present.
    ///
    /// Empty strings count as absent; they carry nothing to embed.
    pub fn has_modality(&self) -> bool {
        let present = |f: &Option<String>| f.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.text) || present(&self.image_url) || present(&self.video_url)
    }

    /// Short description of the present modalities, for log lines.
    pub fn modalities(&self) -> String {
        let mut parts = Vec::new();
        if self.text.is_some() {
            parts.push("text");
        }
        if self.image_url.is_some() {
            parts.push("image");
        }
        if self.video_url.is_some() {
            parts.push("video");
        }
        parts.join("+")
    }
}
