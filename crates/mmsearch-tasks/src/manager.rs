//! Task manager: lifecycle operations over the durable store.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use tracing::{info, warn};

use mmsearch_models::{TaskKind, TaskPayload, TaskRecord, TaskStatistics, TaskStatus, TaskUpdate};

use crate::error::TaskResult;
use crate::keys;
use crate::store::KvStore;

/// Manager for durable background tasks.
///
/// All operations are safe to call concurrently from any number of actors;
/// the record key and index set are written with separate commands, so
/// readers always revalidate with a `get` after scanning the index.
#[derive(Clone)]
pub struct TaskManager {
    store: Arc<dyn KvStore>,
}

impl TaskManager {
    /// Create a manager over a store.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Create a new pending task and return its id.
    pub async fn create(&self, kind: TaskKind, payload: TaskPayload) -> TaskResult<String> {
        let record = TaskRecord::new(kind, payload);
        let serialized = serde_json::to_string(&record)?;

        self.store
            .put(&keys::task(&record.task_id), &serialized, Some(keys::TASK_TTL))
            .await?;
        self.store
            .set_add(keys::TASK_INDEX_KEY, &record.task_id)
            .await?;

        info!(task_id = %record.task_id, kind = %kind, "Created task");
        Ok(record.task_id)
    }

    /// Read a task record, `None` when absent or expired.
    pub async fn status(&self, task_id: &str) -> TaskResult<Option<TaskRecord>> {
        let Some(serialized) = self.store.get(&keys::task(task_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&serialized) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(task_id, "Discarding unreadable task record: {}", e);
                Ok(None)
            }
        }
    }

    /// Merge an update into a task record and rewrite it with a fresh TTL.
    ///
    /// Returns `false` when the record no longer exists.
    pub async fn update(&self, task_id: &str, update: TaskUpdate) -> TaskResult<bool> {
        let Some(mut record) = self.status(task_id).await? else {
            warn!(task_id, "Update for missing task");
            return Ok(false);
        };

        record.apply(update);
        let serialized = serde_json::to_string(&record)?;
        self.store
            .put(&keys::task(task_id), &serialized, Some(keys::TASK_TTL))
            .await?;

        info!(
            task_id,
            status = %record.status,
            progress = record.progress,
            "Updated task"
        );
        Ok(true)
    }

    /// All pending tasks, optionally filtered by kind.
    pub async fn list_pending(&self, kind: Option<TaskKind>) -> TaskResult<Vec<TaskRecord>> {
        let ids = self.store.set_members(keys::TASK_INDEX_KEY).await?;
        let mut pending = Vec::new();

        for id in ids {
            if let Some(record) = self.status(&id).await? {
                if record.status == TaskStatus::Pending
                    && kind.map_or(true, |k| record.task_type == k)
                {
                    pending.push(record);
                }
            }
        }

        Ok(pending)
    }

    /// All tasks, newest first, capped at `limit`.
    pub async fn list_all(&self, limit: usize) -> TaskResult<Vec<TaskRecord>> {
        let ids = self.store.set_members(keys::TASK_INDEX_KEY).await?;
        let mut records = Vec::new();

        for id in ids {
            if let Some(record) = self.status(&id).await? {
                records.push(record);
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }

    /// Remove terminal tasks whose `completed_at` is older than the given
    /// age, plus index entries whose record has already expired.
    ///
    /// Returns the number of removed entries.
    pub async fn cleanup(&self, max_age_hours: i64) -> TaskResult<usize> {
        let ids = self.store.set_members(keys::TASK_INDEX_KEY).await?;
        let cutoff = Utc::now() - ChronoDuration::hours(max_age_hours);
        let mut removed = 0;

        for id in ids {
            match self.status(&id).await? {
                None => {
                    // Record expired out from under the index set
                    self.store.set_remove(keys::TASK_INDEX_KEY, &id).await?;
                    removed += 1;
                }
                Some(record) if record.is_terminal() => {
                    let old_enough = record
                        .completed_at
                        .is_some_and(|completed_at| completed_at < cutoff);
                    if old_enough {
                        self.store.delete(&keys::task(&id)).await?;
                        self.store.set_remove(keys::TASK_INDEX_KEY, &id).await?;
                        removed += 1;
                    }
                }
                Some(_) => {}
            }
        }

        info!(removed, "Cleaned up tasks");
        Ok(removed)
    }

    /// Aggregate counts by status over all indexed tasks.
    pub async fn statistics(&self) -> TaskResult<TaskStatistics> {
        let ids = self.store.set_members(keys::TASK_INDEX_KEY).await?;
        let mut stats = TaskStatistics {
            total: ids.len(),
            ..Default::default()
        };

        for id in ids {
            if let Some(record) = self.status(&id).await? {
                match record.status {
                    TaskStatus::Pending => stats.pending += 1,
                    TaskStatus::Processing => stats.processing += 1,
                    TaskStatus::Completed => stats.completed += 1,
                    TaskStatus::Failed => stats.failed += 1,
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use mmsearch_models::MultimodalItem;

    fn manager() -> TaskManager {
        TaskManager::new(Arc::new(MemoryStore::new()))
    }

    fn single_payload(text: &str) -> TaskPayload {
        TaskPayload::Single(MultimodalItem::from_text(text))
    }

    #[tokio::test]
    async fn test_create_and_status_round_trip() {
        let manager = manager();
        let id = manager
            .create(TaskKind::SingleInsert, single_payload("hello"))
            .await
            .unwrap();

        let record = manager.status(&id).await.unwrap().expect("record exists");
        assert_eq!(record.task_id, id);
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.progress, 0.0);
    }

    #[tokio::test]
    async fn test_status_of_unknown_task_is_none() {
        let manager = manager();
        assert!(manager.status("no-such-task").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_stamps_transitions() {
        let manager = manager();
        let id = manager
            .create(TaskKind::SingleInsert, single_payload("hello"))
            .await
            .unwrap();

        manager
            .update(&id, TaskUpdate::processing(10.0, "starting"))
            .await
            .unwrap();
        let record = manager.status(&id).await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Processing);
        assert!(record.started_at.is_some());
        assert!(record.completed_at.is_none());

        manager
            .update(
                &id,
                TaskUpdate::completed("done", serde_json::json!({"inserted": 1})),
            )
            .await
            .unwrap();
        let record = manager.status(&id).await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.progress, 100.0);
        let completed_at = record.completed_at.unwrap();
        assert!(completed_at >= record.started_at.unwrap());
        assert!(record.started_at.unwrap() >= record.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_task_returns_false() {
        let manager = manager();
        let updated = manager
            .update("gone", TaskUpdate::failed("boom"))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_list_pending_filters_by_status_and_kind() {
        let manager = manager();
        let single = manager
            .create(TaskKind::SingleInsert, single_payload("a"))
            .await
            .unwrap();
        let batch = manager
            .create(
                TaskKind::BatchInsert,
                TaskPayload::Batch(vec![MultimodalItem::from_text("b")]),
            )
            .await
            .unwrap();

        manager
            .update(&single, TaskUpdate::processing(0.0, "claimed"))
            .await
            .unwrap();

        let pending = manager.list_pending(None).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].task_id, batch);

        let pending_single = manager
            .list_pending(Some(TaskKind::SingleInsert))
            .await
            .unwrap();
        assert!(pending_single.is_empty());
    }

    #[tokio::test]
    async fn test_list_all_is_newest_first_and_capped() {
        let manager = manager();
        let mut ids = Vec::new();
        for i in 0..5 {
            // Distinct creation instants so ordering is deterministic
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            ids.push(
                manager
                    .create(TaskKind::SingleInsert, single_payload(&format!("item {i}")))
                    .await
                    .unwrap(),
            );
        }

        let all = manager.list_all(3).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].task_id, ids[4]);
        assert!(all[0].created_at >= all[1].created_at);
        assert!(all[1].created_at >= all[2].created_at);
    }

    #[tokio::test]
    async fn test_statistics_counts_by_status() {
        let manager = manager();
        for _ in 0..3 {
            manager
                .create(TaskKind::SingleInsert, single_payload("x"))
                .await
                .unwrap();
        }
        let failing = manager
            .create(TaskKind::SingleInsert, single_payload("y"))
            .await
            .unwrap();
        manager
            .update(&failing, TaskUpdate::failed("boom"))
            .await
            .unwrap();

        let stats = manager.statistics().await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 0);
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let manager = manager();
        let id = manager
            .create(TaskKind::SingleInsert, single_payload("x"))
            .await
            .unwrap();
        manager
            .update(&id, TaskUpdate::completed("done", serde_json::json!({})))
            .await
            .unwrap();

        let first = manager.cleanup(0).await.unwrap();
        assert_eq!(first, 1);
        assert!(manager.status(&id).await.unwrap().is_none());

        let second = manager.cleanup(0).await.unwrap();
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_young_and_active_tasks() {
        let manager = manager();
        let pending = manager
            .create(TaskKind::SingleInsert, single_payload("a"))
            .await
            .unwrap();
        let completed = manager
            .create(TaskKind::SingleInsert, single_payload("b"))
            .await
            .unwrap();
        manager
            .update(
                &completed,
                TaskUpdate::completed("done", serde_json::json!({})),
            )
            .await
            .unwrap();

        // Recently completed tasks survive the 24h default
        let removed = manager.cleanup(24).await.unwrap();
        assert_eq!(removed, 0);
        assert!(manager.status(&pending).await.unwrap().is_some());
        assert!(manager.status(&completed).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_removes_dangling_index_entries() {
        let store = Arc::new(MemoryStore::new());
        let manager = TaskManager::new(store.clone());
        let id = manager
            .create(TaskKind::SingleInsert, single_payload("x"))
            .await
            .unwrap();

        // Simulate the record expiring while the index entry lingers
        store.delete(&keys::task(&id)).await.unwrap();

        let removed = manager.cleanup(24).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store
            .set_members(keys::TASK_INDEX_KEY)
            .await
            .unwrap()
            .is_empty());
    }
}
