//! Background task records.
//!
//! A task record is the durable description of one unit of background work.
//! Records are serialized to JSON and stored in Redis with a 24-hour TTL;
//! the worker loop is the only mutator after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::item::MultimodalItem;

/// Background task kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Enrich and index a single item
    SingleInsert,
    /// Enrich and index a list of items with partial-failure semantics
    BatchInsert,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::SingleInsert => "single_insert",
            TaskKind::BatchInsert => "batch_insert",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for the worker
    #[default]
    Pending,
    /// Claimed and running
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Terminal states receive no further updates.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Task payload: the raw item or list of raw items to process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskPayload {
    Single(MultimodalItem),
    Batch(Vec<MultimodalItem>),
}

/// Durable task record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub task_type: TaskKind,
    pub status: TaskStatus,
    /// Progress percentage in [0.0, 100.0]
    pub progress: f64,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Present iff status is `completed`
    pub result: Option<serde_json::Value>,
    pub payload: TaskPayload,
}

impl TaskRecord {
    /// Create a fresh pending record.
    pub fn new(task_type: TaskKind, payload: TaskPayload) -> Self {
        Self {
            task_id: Uuid::new_v4().to_string(),
            task_type,
            status: TaskStatus::Pending,
            progress: 0.0,
            message: "Task created".to_string(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            payload,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Merge an update into the record, stamping transition timestamps.
    ///
    /// `started_at` is set exactly on the first transition out of pending;
    /// `completed_at` exactly on the transition into a terminal state.
    pub fn apply(&mut self, update: TaskUpdate) {
        if let Some(status) = update.status {
            self.status = status;
            if status == TaskStatus::Processing && self.started_at.is_none() {
                self.started_at = Some(Utc::now());
            }
            if status.is_terminal() && self.completed_at.is_none() {
                self.completed_at = Some(Utc::now());
            }
        }
        if let Some(progress) = update.progress {
            self.progress = progress.clamp(0.0, 100.0);
        }
        if let Some(message) = update.message {
            self.message = message;
        }
        if let Some(result) = update.result {
            self.result = Some(result);
        }
    }
}

/// Partial update merged into a task record by [`TaskRecord::apply`].
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub progress: Option<f64>,
    pub message: Option<String>,
    pub result: Option<serde_json::Value>,
}

impl TaskUpdate {
    /// Update for the worker's claim transition.
    pub fn processing(progress: f64, message: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Processing),
            progress: Some(progress),
            message: Some(message.into()),
            result: None,
        }
    }

    /// Progress-only update while processing.
    pub fn progress(progress: f64, message: impl Into<String>) -> Self {
        Self {
            status: None,
            progress: Some(progress),
            message: Some(message.into()),
            result: None,
        }
    }

    /// Terminal success update.
    pub fn completed(message: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            status: Some(TaskStatus::Completed),
            progress: Some(100.0),
            message: Some(message.into()),
            result: Some(result),
        }
    }

    /// Terminal failure update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(TaskStatus::Failed),
            progress: None,
            message: Some(message.into()),
            result: None,
        }
    }
}

/// Aggregate task counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TaskRecord {
        TaskRecord::new(
            TaskKind::SingleInsert,
            TaskPayload::Single(MultimodalItem::from_text("hello")),
        )
    }

    #[test]
    fn test_new_record_is_pending() {
        let record = record();
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.progress, 0.0);
        assert!(record.started_at.is_none());
        assert!(record.completed_at.is_none());
        assert!(!record.is_terminal());
    }

    #[test]
    fn test_transition_timestamps_are_stamped_once() {
        let mut record = record();

        record.apply(TaskUpdate::processing(0.0, "processing"));
        let started = record.started_at.expect("started_at set on processing");

        record.apply(TaskUpdate::progress(50.0, "half way"));
        assert_eq!(record.started_at, Some(started));

        record.apply(TaskUpdate::completed("done", serde_json::json!({"inserted": 1})));
        let completed = record.completed_at.expect("completed_at set on terminal");

        assert!(record.created_at <= started);
        assert!(started <= completed);
        assert_eq!(record.progress, 100.0);
        assert!(record.is_terminal());

        // A second terminal apply must not re-stamp
        record.apply(TaskUpdate::failed("late failure"));
        assert_eq!(record.completed_at, Some(completed));
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut record = record();
        record.apply(TaskUpdate::progress(150.0, "overflow"));
        assert_eq!(record.progress, 100.0);
        record.apply(TaskUpdate::progress(-3.0, "underflow"));
        assert_eq!(record.progress, 0.0);
    }

    #[test]
    fn test_record_serializes_with_snake_case_fields() {
        let record = record();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["task_type"], "single_insert");
        assert_eq!(value["status"], "pending");
        assert!(value["started_at"].is_null());
        assert!(value["result"].is_null());
        assert_eq!(value["payload"]["text"], "hello");
    }

    #[test]
    fn test_batch_payload_round_trip() {
        let record = TaskRecord::new(
            TaskKind::BatchInsert,
            TaskPayload::Batch(vec![
                MultimodalItem::from_text("a"),
                MultimodalItem::from_text("b"),
            ]),
        );
        let json = serde_json::to_string(&record).unwrap();
        let parsed: TaskRecord = serde_json::from_str(&json).unwrap();
        match parsed.payload {
            TaskPayload::Batch(items) => assert_eq!(items.len(), 2),
            TaskPayload::Single(_) => panic!("expected batch payload"),
        }
    }
}
