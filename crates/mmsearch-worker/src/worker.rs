//! The worker loop and per-task processing.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde_json::json;
use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};

use mmsearch_models::{MultimodalItem, TaskKind, TaskPayload, TaskRecord, TaskUpdate};
use mmsearch_service::{SearchService, ServiceResult};
use mmsearch_tasks::TaskManager;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};

/// The one capability the worker needs from the service facade.
#[async_trait]
pub trait Inserter: Send + Sync {
    /// Enrich and index one item; returns the new document id.
    async fn insert_item(&self, item: &MultimodalItem) -> ServiceResult<String>;
}

#[async_trait]
impl Inserter for SearchService {
    async fn insert_item(&self, item: &MultimodalItem) -> ServiceResult<String> {
        SearchService::insert_item(self, item).await
    }
}

/// Single-process task worker.
///
/// One worker runs per deployment, so moving a task to `processing` is the
/// claim itself; a multi-worker deployment would need a compare-and-swap
/// on status before scaling out.
pub struct Worker {
    manager: TaskManager,
    inserter: Arc<dyn Inserter>,
    config: WorkerConfig,
    semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl Worker {
    /// Create a new worker.
    pub fn new(manager: TaskManager, inserter: Arc<dyn Inserter>, config: WorkerConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_tasks));
        let (shutdown, _) = watch::channel(false);
        Self {
            manager,
            inserter,
            config,
            semaphore,
            shutdown,
        }
    }

    /// Request the loop to stop at its next sleep boundary. In-flight tasks
    /// finish on their own.
    pub fn stop(&self) {
        self.shutdown.send(true).ok();
        info!("Worker stop requested");
    }

    /// Run the sweep loop until stopped.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Worker started, check interval {:?}, max {} concurrent tasks",
            self.config.check_interval, self.config.max_concurrent_tasks
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.config.check_interval) => {
                    if let Err(e) = self.sweep().await {
                        error!("Worker sweep failed: {}", e);
                    }
                }
            }
        }

        info!("Worker stopped");
        Ok(())
    }

    /// One sweep: pull every pending task, process them in parallel, and
    /// wait for all of them before returning to sleep.
    pub async fn sweep(&self) -> WorkerResult<()> {
        let pending = self.manager.list_pending(None).await?;
        if pending.is_empty() {
            return Ok(());
        }
        info!("Found {} pending tasks", pending.len());

        let mut handles = Vec::with_capacity(pending.len());
        for record in pending {
            let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
                break;
            };
            let manager = self.manager.clone();
            let inserter = Arc::clone(&self.inserter);

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                Self::process(manager, inserter, record).await;
            }));
        }

        for handle in handles {
            handle.await.ok();
        }
        Ok(())
    }

    /// Process one task to a terminal state. Never propagates an error to
    /// the loop; failures end up on the task record.
    async fn process(manager: TaskManager, inserter: Arc<dyn Inserter>, record: TaskRecord) {
        let task_id = record.task_id.clone();
        info!(task_id = %task_id, kind = %record.task_type, "Processing task");

        match Self::execute(&manager, inserter.as_ref(), &record).await {
            Ok(()) => {
                counter!("worker_tasks_total", "status" => "completed").increment(1);
                info!(task_id = %task_id, "Task completed");
            }
            Err(e) => {
                counter!("worker_tasks_total", "status" => "failed").increment(1);
                error!(task_id = %task_id, "Task failed: {}", e);
                manager
                    .update(&task_id, TaskUpdate::failed(format!("Task failed: {e}")))
                    .await
                    .ok();
            }
        }
    }

    async fn execute(
        manager: &TaskManager,
        inserter: &dyn Inserter,
        record: &TaskRecord,
    ) -> WorkerResult<()> {
        let task_id = &record.task_id;

        // The claim: with a single worker, this transition is exclusive
        manager
            .update(task_id, TaskUpdate::processing(0.0, "Processing task"))
            .await?;

        match (record.task_type, &record.payload) {
            (TaskKind::SingleInsert, TaskPayload::Single(item)) => {
                Self::run_single(manager, inserter, task_id, item).await
            }
            (TaskKind::BatchInsert, TaskPayload::Batch(items)) => {
                Self::run_batch(manager, inserter, task_id, items).await
            }
            (kind, _) => Err(WorkerError::invalid_payload(format!(
                "payload does not match task kind {kind}"
            ))),
        }
    }

    async fn run_single(
        manager: &TaskManager,
        inserter: &dyn Inserter,
        task_id: &str,
        item: &MultimodalItem,
    ) -> WorkerResult<()> {
        manager
            .update(task_id, TaskUpdate::progress(10.0, "Starting data insertion"))
            .await?;

        inserter.insert_item(item).await?;

        let result = json!({
            "inserted": 1,
            "data": item,
        });
        manager
            .update(task_id, TaskUpdate::completed("Task completed", result))
            .await?;
        Ok(())
    }

    async fn run_batch(
        manager: &TaskManager,
        inserter: &dyn Inserter,
        task_id: &str,
        items: &[MultimodalItem],
    ) -> WorkerResult<()> {
        let total = items.len();
        if total == 0 {
            return Err(WorkerError::invalid_payload("no items to insert"));
        }

        manager
            .update(
                task_id,
                TaskUpdate::progress(10.0, format!("Starting batch insertion of {total} items")),
            )
            .await?;

        let mut inserted = 0usize;
        for (i, item) in items.iter().enumerate() {
            match inserter.insert_item(item).await {
                Ok(_) => inserted += 1,
                Err(e) => {
                    warn!(task_id, item = i, "Batch item failed, continuing: {}", e);
                }
            }

            let done = i + 1;
            let progress = 10.0 + 80.0 * (done as f64 / total as f64);
            manager
                .update(
                    task_id,
                    TaskUpdate::progress(progress, format!("processed {done}/{total}")),
                )
                .await?;
        }

        // Partial failures still complete the batch
        let result = json!({
            "inserted": inserted,
            "total": total,
            "success_rate": inserted as f64 / total as f64,
        });
        manager
            .update(
                task_id,
                TaskUpdate::completed(
                    format!("Batch insertion completed: {inserted}/{total} items inserted"),
                    result,
                ),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmsearch_models::TaskStatus;
    use mmsearch_service::ServiceError;
    use mmsearch_tasks::MemoryStore;

    /// Inserter that fails for URLs containing a marker substring.
    struct StubInserter {
        failing_marker: Option<String>,
    }

    #[async_trait]
    impl Inserter for StubInserter {
        async fn insert_item(&self, item: &MultimodalItem) -> ServiceResult<String> {
            if let Some(marker) = &self.failing_marker {
                let matches = item
                    .image_url
                    .as_deref()
                    .is_some_and(|url| url.contains(marker.as_str()));
                if matches {
                    return Err(ServiceError::MediaDownload(format!(
                        "HTTP 404 fetching {:?}",
                        item.image_url
                    )));
                }
            }
            Ok("doc-1".to_string())
        }
    }

    fn worker_with(failing_marker: Option<&str>) -> (Worker, TaskManager) {
        let manager = TaskManager::new(Arc::new(MemoryStore::new()));
        let inserter = Arc::new(StubInserter {
            failing_marker: failing_marker.map(String::from),
        });
        let worker = Worker::new(manager.clone(), inserter, WorkerConfig::default());
        (worker, manager)
    }

    #[tokio::test]
    async fn test_single_insert_runs_to_completed() {
        let (worker, manager) = worker_with(None);
        let task_id = manager
            .create(
                TaskKind::SingleInsert,
                TaskPayload::Single(MultimodalItem::from_text("hello")),
            )
            .await
            .unwrap();

        worker.sweep().await.unwrap();

        let record = manager.status(&task_id).await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.progress, 100.0);
        assert!(record.started_at.is_some());
        assert!(record.completed_at.unwrap() >= record.started_at.unwrap());

        let result = record.result.unwrap();
        assert_eq!(result["inserted"], 1);
        assert_eq!(result["data"]["text"], "hello");
    }

    #[tokio::test]
    async fn test_batch_with_one_bad_item_still_completes() {
        let (worker, manager) = worker_with(Some("missing"));
        let items = vec![
            MultimodalItem::from_text("dogs playing"),
            MultimodalItem::from_image("https://example.com/missing.jpg"),
            MultimodalItem::from_text("a red car"),
        ];
        let task_id = manager
            .create(TaskKind::BatchInsert, TaskPayload::Batch(items))
            .await
            .unwrap();

        worker.sweep().await.unwrap();

        let record = manager.status(&task_id).await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.progress, 100.0);

        let result = record.result.unwrap();
        assert_eq!(result["inserted"], 2);
        assert_eq!(result["total"], 3);
        let success_rate = result["success_rate"].as_f64().unwrap();
        assert!((success_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failing_single_insert_ends_failed_with_message() {
        let (worker, manager) = worker_with(Some("missing"));
        let task_id = manager
            .create(
                TaskKind::SingleInsert,
                TaskPayload::Single(MultimodalItem::from_image(
                    "https://example.com/missing.jpg",
                )),
            )
            .await
            .unwrap();

        worker.sweep().await.unwrap();

        let record = manager.status(&task_id).await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.message.contains("HTTP 404"));
        assert!(record.completed_at.is_some());
        assert!(record.result.is_none());
    }

    #[tokio::test]
    async fn test_empty_batch_fails() {
        let (worker, manager) = worker_with(None);
        let task_id = manager
            .create(TaskKind::BatchInsert, TaskPayload::Batch(Vec::new()))
            .await
            .unwrap();

        worker.sweep().await.unwrap();

        let record = manager.status(&task_id).await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_sweep_processes_all_pending_tasks() {
        let (worker, manager) = worker_with(None);
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(
                manager
                    .create(
                        TaskKind::SingleInsert,
                        TaskPayload::Single(MultimodalItem::from_text(format!("item {i}"))),
                    )
                    .await
                    .unwrap(),
            );
        }

        worker.sweep().await.unwrap();

        for id in ids {
            let record = manager.status(&id).await.unwrap().unwrap();
            assert_eq!(record.status, TaskStatus::Completed);
        }
        assert!(manager.list_pending(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let (worker, _manager) = worker_with(None);
        let worker = Arc::new(worker);

        let runner = {
            let worker = Arc::clone(&worker);
            tokio::spawn(async move { worker.run().await })
        };

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        worker.stop();

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), runner)
            .await
            .expect("worker loop should stop promptly")
            .unwrap();
        assert!(result.is_ok());
    }
}
