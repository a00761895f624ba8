//! Service error taxonomy.
//!
//! Every failure a caller can observe is one of these kinds. Adapter
//! errors arrive already classified; the string-sniffing fallback survives
//! only for vendor errors that reach us unclassified.

use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    #[error("Media download failed: {0}")]
    MediaDownload(String),

    #[error("Media processing failed: {0}")]
    MediaProcessing(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service error: {0}")]
    Service(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn service(msg: impl Into<String>) -> Self {
        Self::Service(msg.into())
    }

    /// HTTP status class this kind surfaces as.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(_)
            | ServiceError::InvalidMedia(_)
            | ServiceError::MediaDownload(_)
            | ServiceError::MediaProcessing(_) => 422,
            ServiceError::NotFound(_) => 404,
            ServiceError::Service(_) => 500,
        }
    }

    /// Legacy fallback: classify an unkinded message by its text.
    pub fn from_unclassified(message: &str) -> Self {
        let lowered = message.to_lowercase();
        if lowered.contains("format is illegal") || lowered.contains("cannot be opened") {
            ServiceError::InvalidMedia(message.to_string())
        } else if lowered.contains("download error")
            || lowered.contains("inaccessible")
            || lowered.contains("unreachable")
        {
            ServiceError::MediaDownload(message.to_string())
        } else {
            ServiceError::Service(message.to_string())
        }
    }
}

impl From<mmsearch_enrich::ModelError> for ServiceError {
    fn from(e: mmsearch_enrich::ModelError) -> Self {
        use mmsearch_enrich::ModelError;
        match e {
            ModelError::InvalidMedia(msg) => ServiceError::InvalidMedia(msg),
            ModelError::MediaDownload(msg) => ServiceError::MediaDownload(msg),
            ModelError::MediaProcessing(msg) => ServiceError::MediaProcessing(msg),
            ModelError::Vendor { message, .. } => ServiceError::from_unclassified(&message),
            other => ServiceError::Service(other.to_string()),
        }
    }
}

impl From<mmsearch_index::IndexError> for ServiceError {
    fn from(e: mmsearch_index::IndexError) -> Self {
        ServiceError::Service(e.to_string())
    }
}

impl From<mmsearch_tasks::TaskError> for ServiceError {
    fn from(e: mmsearch_tasks::TaskError) -> Self {
        ServiceError::Service(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServiceError::Validation(e.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Service(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmsearch_enrich::ModelError;

    #[test]
    fn test_status_codes() {
        assert_eq!(ServiceError::validation("x").status_code(), 422);
        assert_eq!(ServiceError::InvalidMedia("x".into()).status_code(), 422);
        assert_eq!(ServiceError::not_found("x").status_code(), 404);
        assert_eq!(ServiceError::service("x").status_code(), 500);
    }

    #[test]
    fn test_model_error_kinds_are_preserved() {
        let e: ServiceError = ModelError::media_download("HTTP 404").into();
        assert!(matches!(e, ServiceError::MediaDownload(_)));

        let e: ServiceError = ModelError::invalid_media("not an image").into();
        assert!(matches!(e, ServiceError::InvalidMedia(_)));

        let e: ServiceError = ModelError::Timeout("30s".into()).into();
        assert!(matches!(e, ServiceError::Service(_)));
    }

    #[test]
    fn test_unclassified_messages_are_sniffed() {
        assert!(matches!(
            ServiceError::from_unclassified("image format is illegal"),
            ServiceError::InvalidMedia(_)
        ));
        assert!(matches!(
            ServiceError::from_unclassified("Video URL download error"),
            ServiceError::MediaDownload(_)
        ));
        assert!(matches!(
            ServiceError::from_unclassified("something else entirely"),
            ServiceError::Service(_)
        ));
    }
}
