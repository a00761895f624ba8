//! Model adapter error types.
//!
//! Adapters classify failures at the source so callers never have to sniff
//! message strings. The kinds map one-to-one onto the service error
//! taxonomy.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    #[error("Media download failed: {0}")]
    MediaDownload(String),

    #[error("Media processing failed: {0}")]
    MediaProcessing(String),

    #[error("Model call timed out: {0}")]
    Timeout(String),

    #[error("Vendor error {code}: {message}")]
    Vendor { code: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ModelError {
    pub fn invalid_media(msg: impl Into<String>) -> Self {
        Self::InvalidMedia(msg.into())
    }

    pub fn media_download(msg: impl Into<String>) -> Self {
        Self::MediaDownload(msg.into())
    }

    pub fn media_processing(msg: impl Into<String>) -> Self {
        Self::MediaProcessing(msg.into())
    }

    pub fn vendor(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Vendor {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether a retry can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::Timeout(_) | ModelError::Network(_))
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ModelError::Timeout(e.to_string())
        } else {
            ModelError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_retryable() {
        assert!(ModelError::Timeout("30s elapsed".into()).is_retryable());
        assert!(ModelError::Network("connection reset".into()).is_retryable());
        assert!(!ModelError::invalid_media("not an image").is_retryable());
        assert!(!ModelError::vendor("Throttled", "slow down").is_retryable());
    }
}
