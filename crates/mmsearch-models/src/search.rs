//! Search, listing, and insert types.

use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingInfo;

/// Minimum accepted `top_k`.
pub const TOP_K_MIN: usize = 1;
/// Maximum accepted `top_k`.
pub const TOP_K_MAX: usize = 100;
/// Maximum accepted page size for listings.
pub const PAGE_SIZE_MAX: usize = 100;
/// Default `top_k` when the caller does not specify one.
pub const DEFAULT_TOP_K: usize = 10;

/// A hybrid search query: optional lexical text plus labeled vectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Lexical query text (empty disables the lexical clause)
    pub text: Option<String>,
    /// Labeled query vectors, each scored against its mapped field
    pub embeddings: Vec<EmbeddingInfo>,
    /// Result cap
    pub top_k: usize,
}

impl SearchQuery {
    /// Create a query with the default `top_k`.
    pub fn new() -> Self {
        Self {
            text: None,
            embeddings: Vec::new(),
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// A ranked hit returned from the hybrid index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Document identifier assigned at insert time
    pub id: String,
    pub text: String,
    pub image_url: String,
    pub video_url: String,
    pub image_caption: String,
    pub video_transcript: String,
    /// Backing-store relevance score (0.0 for unscored listings)
    pub score: f64,
}

/// One page of a listing, with the total document count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListPage {
    pub total: u64,
    pub items: Vec<SearchHit>,
}

/// A fully enriched document ready for indexing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsertRecord {
    pub text: String,
    pub image_url: String,
    pub video_url: String,
    pub image_caption: String,
    pub video_transcript: String,
    /// Labeled vectors, routed to fields via the label rule table
    pub embeddings: Vec<EmbeddingInfo>,
}
