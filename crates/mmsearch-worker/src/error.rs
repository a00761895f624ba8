//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid task payload: {0}")]
    InvalidPayload(String),

    #[error("Task store error: {0}")]
    Task(#[from] mmsearch_tasks::TaskError),

    #[error("Service error: {0}")]
    Service(#[from] mmsearch_service::ServiceError),
}

impl WorkerError {
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }
}
