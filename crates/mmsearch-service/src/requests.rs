//! Caller intents accepted by the facade.

use serde::Deserialize;
use validator::Validate;

use mmsearch_models::MultimodalItem;

fn default_top_k() -> usize {
    mmsearch_models::DEFAULT_TOP_K
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    10
}

/// Text query.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TextSearchRequest {
    #[validate(length(min = 1, message = "query must not be empty"))]
    pub query: String,
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 100))]
    pub top_k: usize,
}

/// Image query.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ImageSearchRequest {
    #[validate(length(min = 1, message = "image_url must not be empty"))]
    pub image_url: String,
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 100))]
    pub top_k: usize,
}

/// Video query.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VideoSearchRequest {
    #[validate(length(min = 1, message = "video_url must not be empty"))]
    pub video_url: String,
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 100))]
    pub top_k: usize,
}

/// Query over any combination of modalities.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct MultimodalSearchRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 100))]
    pub top_k: usize,
}

impl MultimodalSearchRequest {
    /// The query expressed as a raw item for enrichment.
    pub fn to_item(&self) -> MultimodalItem {
        MultimodalItem {
            text: self.text.clone(),
            image_url: self.image_url.clone(),
            video_url: self.video_url.clone(),
        }
    }
}

/// Synchronous insert intent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct InsertRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

impl InsertRequest {
    pub fn to_item(&self) -> MultimodalItem {
        MultimodalItem {
            text: self.text.clone(),
            image_url: self.image_url.clone(),
            video_url: self.video_url.clone(),
        }
    }
}

/// Paged listing intent. `page` is 1-based.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListRequest {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: usize,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100))]
    pub page_size: usize,
}
