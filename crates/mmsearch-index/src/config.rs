//! Index configuration.

use std::time::Duration;

use mmsearch_models::VectorField;

use crate::error::{IndexError, IndexResult};

/// Refresh policy for bulk writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Block until the next refresh makes the write searchable
    #[default]
    WaitFor,
    /// Force an immediate refresh
    True,
    /// Do not refresh
    False,
}

impl RefreshPolicy {
    /// Value for the `refresh` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            RefreshPolicy::WaitFor => "wait_for",
            RefreshPolicy::True => "true",
            RefreshPolicy::False => "false",
        }
    }

    /// Parse the configured policy name.
    pub fn parse(value: &str) -> IndexResult<Self> {
        match value {
            "wait_for" => Ok(RefreshPolicy::WaitFor),
            "true" => Ok(RefreshPolicy::True),
            "false" => Ok(RefreshPolicy::False),
            other => Err(IndexError::config(format!(
                "unknown refresh policy: {other}"
            ))),
        }
    }
}

/// Per-field dense-vector dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorDimensions {
    pub text_embedding: usize,
    pub image_embedding: usize,
    pub video_embedding: usize,
    pub image_caption_embedding: usize,
    pub video_transcript_embedding: usize,
}

impl Default for VectorDimensions {
    fn default() -> Self {
        Self {
            text_embedding: 1024,
            image_embedding: 1024,
            video_embedding: 1024,
            image_caption_embedding: 1024,
            video_transcript_embedding: 1024,
        }
    }
}

impl VectorDimensions {
    /// Configured dimension for one vector field.
    pub fn for_field(&self, field: VectorField) -> usize {
        match field {
            VectorField::TextEmbedding => self.text_embedding,
            VectorField::ImageEmbedding => self.image_embedding,
            VectorField::VideoEmbedding => self.video_embedding,
            VectorField::ImageCaptionEmbedding => self.image_caption_embedding,
            VectorField::VideoTranscriptEmbedding => self.video_transcript_embedding,
        }
    }

    fn env_dim(name: &str) -> usize {
        std::env::var(name)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1024)
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self {
            text_embedding: Self::env_dim("ES_DIM_TEXT"),
            image_embedding: Self::env_dim("ES_DIM_IMAGE"),
            video_embedding: Self::env_dim("ES_DIM_VIDEO"),
            image_caption_embedding: Self::env_dim("ES_DIM_IMAGE_CAPTION"),
            video_transcript_embedding: Self::env_dim("ES_DIM_VIDEO_TRANSCRIPT"),
        }
    }
}

/// Elasticsearch connection and index configuration.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    /// Index name
    pub index: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for transient errors
    pub max_retries: u32,
    /// Per-field vector dimensions
    pub dimensions: VectorDimensions,
    /// Chunk size for bulk writes
    pub batch_size: usize,
    /// Refresh policy for bulk writes
    pub refresh: RefreshPolicy,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9200,
            scheme: "http".to_string(),
            index: "mmsearch".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            dimensions: VectorDimensions::default(),
            batch_size: 100,
            refresh: RefreshPolicy::WaitFor,
        }
    }
}

impl IndexConfig {
    /// Create config from environment variables.
    pub fn from_env() -> IndexResult<Self> {
        let refresh = match std::env::var("ES_REFRESH_POLICY") {
            Ok(value) => RefreshPolicy::parse(&value)?,
            Err(_) => RefreshPolicy::WaitFor,
        };

        Ok(Self {
            host: std::env::var("ES_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("ES_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(9200),
            scheme: std::env::var("ES_SCHEME").unwrap_or_else(|_| "http".to_string()),
            index: std::env::var("ES_INDEX").unwrap_or_else(|_| "mmsearch".to_string()),
            username: std::env::var("ES_USERNAME").ok().filter(|s| !s.is_empty()),
            password: std::env::var("ES_PASSWORD").ok().filter(|s| !s.is_empty()),
            timeout: Duration::from_secs(
                std::env::var("ES_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: std::env::var("ES_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            dimensions: VectorDimensions::from_env(),
            batch_size: std::env::var("ES_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            refresh,
        })
    }

    /// Base URL of the cluster.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}
