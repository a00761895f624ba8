//! Enrichment records produced by the model pipeline.
//!
//! An enrichment record is the in-memory result of running a raw item
//! through the per-modality subgraphs. Absent modalities yield absent
//! sub-records; absent embeddings are `None` or empty lists, never zero
//! vectors.

use serde::{Deserialize, Serialize};

use crate::embedding::{labels, EmbeddingInfo};
use crate::item::MultimodalItem;

/// Text-modality enrichment: embeddings of the item's own text body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextEnrichment {
    pub embeddings: Vec<Vec<f32>>,
}

/// Image-modality enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageEnrichment {
    /// Embedding of the image content
    pub embedding: Option<Vec<f32>>,
    /// VLM-generated caption
    pub caption: Option<String>,
    /// Embeddings of the caption (empty when the caption was empty)
    pub caption_embeddings: Vec<Vec<f32>>,
}

/// Video-modality enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoEnrichment {
    /// Embedding of the video content
    pub embedding: Option<Vec<f32>>,
    /// ASR transcript of the extracted audio (empty when ASR failed)
    pub transcript: Option<String>,
    /// Embeddings of the transcript (empty when the transcript was empty)
    pub transcript_embeddings: Vec<Vec<f32>>,
}

/// Complete enrichment record for one multimodal item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub text: Option<TextEnrichment>,
    pub image: Option<ImageEnrichment>,
    pub video: Option<VideoEnrichment>,
}

impl Enrichment {
    /// Flatten into labeled embeddings for indexing or querying.
    ///
    /// Each present sub-record contributes its content embedding plus the
    /// first derived-text embedding, under the canonical labels.
    pub fn labeled_embeddings(&self) -> Vec<EmbeddingInfo> {
        let mut out = Vec::new();

        if let Some(text) = &self.text {
            if let Some(embedding) = text.embeddings.first() {
                out.push(EmbeddingInfo::new(labels::TEXT, embedding.clone()));
            }
        }

        if let Some(image) = &self.image {
            if let Some(embedding) = &image.embedding {
                out.push(EmbeddingInfo::new(labels::IMAGE, embedding.clone()));
            }
            if let Some(embedding) = image.caption_embeddings.first() {
                out.push(EmbeddingInfo::new(labels::IMAGE_CAPTION, embedding.clone()));
            }
        }

        if let Some(video) = &self.video {
            if let Some(embedding) = &video.embedding {
                out.push(EmbeddingInfo::new(labels::VIDEO, embedding.clone()));
            }
            if let Some(embedding) = video.transcript_embeddings.first() {
                out.push(EmbeddingInfo::new(
                    labels::VIDEO_TRANSCRIPT,
                    embedding.clone(),
                ));
            }
        }

        out
    }

    /// The VLM caption, if the image subgraph produced one.
    pub fn image_caption(&self) -> Option<&str> {
        self.image.as_ref()?.caption.as_deref()
    }

    /// The ASR transcript, if the video subgraph produced one.
    pub fn video_transcript(&self) -> Option<&str> {
        self.video.as_ref()?.transcript.as_deref()
    }

    /// Build the record to index from the original item plus this enrichment.
    pub fn to_insert_record(&self, item: &MultimodalItem) -> crate::search::InsertRecord {
        crate::search::InsertRecord {
            text: item.text.clone().unwrap_or_default(),
            image_url: item.image_url.clone().unwrap_or_default(),
            video_url: item.video_url.clone().unwrap_or_default(),
            image_caption: self.image_caption().unwrap_or_default().to_string(),
            video_transcript: self.video_transcript().unwrap_or_default().to_string(),
            embeddings: self.labeled_embeddings(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::VectorField;

    fn vec_of(v: f32) -> Vec<f32> {
        vec![v; 4]
    }

    #[test]
    fn test_labeled_embeddings_from_full_record() {
        let enrichment = Enrichment {
            text: Some(TextEnrichment {
                embeddings: vec![vec_of(0.1)],
            }),
            image: Some(ImageEnrichment {
                embedding: Some(vec_of(0.2)),
                caption: Some("a red car".into()),
                caption_embeddings: vec![vec_of(0.3)],
            }),
            video: Some(VideoEnrichment {
                embedding: Some(vec_of(0.4)),
                transcript: Some("hello world".into()),
                transcript_embeddings: vec![vec_of(0.5)],
            }),
        };

        let embeddings = enrichment.labeled_embeddings();
        assert_eq!(embeddings.len(), 5);

        let fields: Vec<VectorField> = embeddings
            .iter()
            .map(|e| VectorField::from_label(&e.label))
            .collect();
        assert_eq!(fields, VectorField::ALL.to_vec());
    }

    #[test]
    fn test_absent_modalities_contribute_nothing() {
        let enrichment = Enrichment {
            text: Some(TextEnrichment {
                embeddings: vec![vec_of(1.0)],
            }),
            image: None,
            video: None,
        };
        let embeddings = enrichment.labeled_embeddings();
        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].label, labels::TEXT);
    }

    #[test]
    fn test_empty_transcript_yields_no_transcript_embedding() {
        let enrichment = Enrichment {
            text: None,
            image: None,
            video: Some(VideoEnrichment {
                embedding: Some(vec_of(0.4)),
                transcript: Some(String::new()),
                transcript_embeddings: Vec::new(),
            }),
        };
        let embeddings = enrichment.labeled_embeddings();
        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].label, labels::VIDEO);
    }

    #[test]
    fn test_to_insert_record_carries_derived_text() {
        let item = MultimodalItem {
            text: Some("body".into()),
            image_url: Some("https://example.com/a.jpg".into()),
            video_url: None,
        };
        let enrichment = Enrichment {
            text: Some(TextEnrichment {
                embeddings: vec![vec_of(0.1)],
            }),
            image: Some(ImageEnrichment {
                embedding: Some(vec_of(0.2)),
                caption: Some("a dog".into()),
                caption_embeddings: vec![vec_of(0.3)],
            }),
            video: None,
        };

        let record = enrichment.to_insert_record(&item);
        assert_eq!(record.text, "body");
        assert_eq!(record.image_caption, "a dog");
        assert_eq!(record.video_transcript, "");
        assert_eq!(record.embeddings.len(), 3);
    }
}
