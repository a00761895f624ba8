//! Embedding labels and the label → vector-field rule table.

use serde::{Deserialize, Serialize};

/// Canonical labels attached to embeddings by the enrichment pipeline.
pub mod labels {
    /// Embedding of the item's own text body.
    pub const TEXT: &str = "text_embedding";
    /// Embedding of the image content.
    pub const IMAGE: &str = "image_embedding";
    /// Embedding of the video content.
    pub const VIDEO: &str = "video_embedding";
    /// Embedding of the VLM-generated image caption.
    pub const IMAGE_CAPTION: &str = "image_text_embedding";
    /// Embedding of the ASR-generated video transcript.
    pub const VIDEO_TRANSCRIPT: &str = "video_text_embedding";
}

/// A labeled embedding vector, as produced by the enrichment pipeline or
/// supplied with a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingInfo {
    /// Free-form label routed to a vector field via [`VectorField::from_label`]
    pub label: String,
    /// The vector itself
    pub embedding: Vec<f32>,
}

impl EmbeddingInfo {
    /// Create a labeled embedding.
    pub fn new(label: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            label: label.into(),
            embedding,
        }
    }
}

/// The five dense-vector fields of an indexed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorField {
    TextEmbedding,
    ImageEmbedding,
    VideoEmbedding,
    ImageCaptionEmbedding,
    VideoTranscriptEmbedding,
}

impl VectorField {
    /// All vector fields, in document order.
    pub const ALL: [VectorField; 5] = [
        VectorField::TextEmbedding,
        VectorField::ImageEmbedding,
        VectorField::VideoEmbedding,
        VectorField::ImageCaptionEmbedding,
        VectorField::VideoTranscriptEmbedding,
    ];

    /// Field name as stored in the index mapping.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorField::TextEmbedding => "text_embedding",
            VectorField::ImageEmbedding => "image_embedding",
            VectorField::VideoEmbedding => "video_embedding",
            VectorField::ImageCaptionEmbedding => "image_caption_embedding",
            VectorField::VideoTranscriptEmbedding => "video_transcript_embedding",
        }
    }

    /// Map a free-form embedding label to its vector field.
    ///
    /// Rules are checked in order and the first match wins. The compound
    /// rules ("image_text", "video_text") must come before the plain
    /// substring rules so that a label like "image_text_embedding" routes to
    /// the caption field rather than matching "text" or "image" first.
    /// Unknown labels fall back to the text field.
    pub fn from_label(label: &str) -> VectorField {
        let label = label.to_lowercase();
        if label.contains("image_text") || label.contains("img_text") {
            VectorField::ImageCaptionEmbedding
        } else if label.contains("video_text") || label.contains("vid_text") {
            VectorField::VideoTranscriptEmbedding
        } else if label.contains("text") || label.contains("tembed") {
            VectorField::TextEmbedding
        } else if label.contains("image") || label.contains("img") || label.contains("iembed") {
            VectorField::ImageEmbedding
        } else if label.contains("video") || label.contains("vid") || label.contains("vembed") {
            VectorField::VideoEmbedding
        } else {
            VectorField::TextEmbedding
        }
    }
}

impl std::fmt::Display for VectorField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping_table() {
        let cases = [
            ("text_embedding", VectorField::TextEmbedding),
            ("image_text_embedding", VectorField::ImageCaptionEmbedding),
            ("video_text_embedding", VectorField::VideoTranscriptEmbedding),
            ("iembed", VectorField::ImageEmbedding),
            ("vembed", VectorField::VideoEmbedding),
            ("unknown", VectorField::TextEmbedding),
        ];
        for (label, expected) in cases {
            assert_eq!(VectorField::from_label(label), expected, "label {label}");
        }
    }

    #[test]
    fn test_compound_labels_win_over_substrings() {
        // "img_text" contains both "img" and "text"; the compound rule is first
        assert_eq!(
            VectorField::from_label("img_text_v2"),
            VectorField::ImageCaptionEmbedding
        );
        assert_eq!(
            VectorField::from_label("vid_text"),
            VectorField::VideoTranscriptEmbedding
        );
    }

    #[test]
    fn test_label_mapping_is_case_insensitive() {
        assert_eq!(
            VectorField::from_label("Image_Text_Embedding"),
            VectorField::ImageCaptionEmbedding
        );
        assert_eq!(VectorField::from_label("TEMBED"), VectorField::TextEmbedding);
    }

    #[test]
    fn test_canonical_labels_round_trip() {
        assert_eq!(
            VectorField::from_label(labels::TEXT),
            VectorField::TextEmbedding
        );
        assert_eq!(
            VectorField::from_label(labels::IMAGE),
            VectorField::ImageEmbedding
        );
        assert_eq!(
            VectorField::from_label(labels::VIDEO),
            VectorField::VideoEmbedding
        );
        assert_eq!(
            VectorField::from_label(labels::IMAGE_CAPTION),
            VectorField::ImageCaptionEmbedding
        );
        assert_eq!(
            VectorField::from_label(labels::VIDEO_TRANSCRIPT),
            VectorField::VideoTranscriptEmbedding
        );
    }
}
