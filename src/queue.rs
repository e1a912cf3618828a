//! Asynchronous intake: submit an inquiry, get a task id back at once, poll
//! for the outcome later.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::capability::SupportCapability;
use crate::error::SupportError;
use crate::orchestrator::WorkflowController;
use crate::orders::FactResolver;
use crate::workflow::{Inquiry, SupportReply};

/// Where a submitted task stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Processing,
    Completed { result: SupportReply },
    Failed { error: String },
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, TaskStatus::Processing)
    }
}

type StatusTable = Arc<RwLock<HashMap<Uuid, TaskStatus>>>;

/// Single-worker queue in front of a [`WorkflowController`].
///
/// Tasks run one at a time, in submission order. Finished statuses stay in
/// the table until the caller collects them with [`forget`](Self::forget).
pub struct TaskQueue {
    tx: mpsc::UnboundedSender<(Uuid, Inquiry)>,
    statuses: StatusTable,
    worker: JoinHandle<()>,
}

impl TaskQueue {
    /// Spawns the worker. Must be called inside a tokio runtime.
    pub fn start<R, C>(controller: WorkflowController<R, C>) -> Self
    where
        R: FactResolver + 'static,
        C: SupportCapability + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<(Uuid, Inquiry)>();
        let statuses: StatusTable = Arc::new(RwLock::new(HashMap::new()));
        let table = Arc::clone(&statuses);

        let worker = tokio::spawn(async move {
            while let Some((task_id, inquiry)) = rx.recv().await {
                let status = match controller.reply(inquiry, task_id).await {
                    Ok(result) => {
                        info!(%task_id, "Task completed");
                        TaskStatus::Completed { result }
                    }
                    Err(e) => {
                        error!(%task_id, error = %e, "Task failed");
                        TaskStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                table.write().await.insert(task_id, status);
            }
        });

        Self {
            tx,
            statuses,
            worker,
        }
    }

    /// Enqueues an inquiry and returns its task id immediately.
    pub async fn submit(&self, inquiry: Inquiry) -> Result<Uuid, SupportError> {
        let task_id = Uuid::new_v4();
        self.statuses
            .write()
            .await
            .insert(task_id, TaskStatus::Processing);

        if self.tx.send((task_id, inquiry)).is_err() {
            self.statuses.write().await.remove(&task_id);
            return Err(SupportError::QueueClosed);
        }
        info!(%task_id, "Task submitted");
        Ok(task_id)
    }

    /// `None` for ids this queue never handed out.
    pub async fn status(&self, task_id: Uuid) -> Option<TaskStatus> {
        self.statuses.read().await.get(&task_id).cloned()
    }

    /// Polls until the task leaves `Processing`.
    pub async fn wait(&self, task_id: Uuid, poll_interval: Duration) -> Option<TaskStatus> {
        loop {
            match self.status(task_id).await {
                Some(status) if status.is_finished() => return Some(status),
                Some(_) if self.worker.is_finished() => {
                    return Some(TaskStatus::Failed {
                        error: SupportError::QueueClosed.to_string(),
                    });
                }
                Some(_) => tokio::time::sleep(poll_interval).await,
                None => return None,
            }
        }
    }

    /// Drops a finished task's status. Tasks still processing are kept.
    pub async fn forget(&self, task_id: Uuid) -> bool {
        let mut table = self.statuses.write().await;
        let finished = table.get(&task_id).is_some_and(TaskStatus::is_finished);
        if finished {
            table.remove(&task_id);
        }
        finished
    }
}

/// Reads a JSON array of inquiries, as accepted by the `batch` command.
pub fn read_inquiries(path: &Path) -> Result<Vec<Inquiry>, SupportError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        AuditContext, AuditVerdict, Classification, DraftContext, OfflineCapability,
    };
    use crate::error::CapabilityError;
    use crate::orders::OrderBook;
    use crate::workflow::Category;

    const POLL: Duration = Duration::from_millis(5);

    struct BrokenDrafter;

    impl SupportCapability for BrokenDrafter {
        async fn classify(&self, _message: &str) -> Result<Classification, CapabilityError> {
            Ok(Classification {
                category: Category::General,
                reasoning: String::new(),
            })
        }

        async fn draft(&self, _ctx: &DraftContext) -> Result<String, CapabilityError> {
            Err(CapabilityError::Unavailable("drafting model offline".into()))
        }

        async fn audit(&self, _ctx: &AuditContext) -> Result<AuditVerdict, CapabilityError> {
            Ok(AuditVerdict::compliant())
        }
    }

    fn inquiry(order_id: &str, message: &str) -> Inquiry {
        Inquiry {
            order_id: order_id.into(),
            customer_message: message.into(),
        }
    }

    #[tokio::test]
    async fn submitted_task_completes() {
        let queue = TaskQueue::start(WorkflowController::new(
            OrderBook::sample(),
            OfflineCapability::new(),
        ));
        let id = queue
            .submit(inquiry("ORD456", "I want a refund"))
            .await
            .unwrap();

        match queue.wait(id, POLL).await {
            Some(TaskStatus::Completed { result }) => {
                assert_eq!(result.category, Category::Refund);
                assert!(result.compliance_checked);
                assert_eq!(result.logs[0], format!("Task {id} started."));
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[tokio::test]
    async fn tasks_are_independent() {
        let queue = TaskQueue::start(WorkflowController::new(
            OrderBook::sample(),
            OfflineCapability::new(),
        ));
        let first = queue.submit(inquiry("ORD123", "where is it?")).await.unwrap();
        let second = queue.submit(inquiry("ORD999", "refund please")).await.unwrap();
        assert_ne!(first, second);

        let Some(TaskStatus::Completed { result: a }) = queue.wait(first, POLL).await else {
            panic!("first task did not complete");
        };
        let Some(TaskStatus::Completed { result: b }) = queue.wait(second, POLL).await else {
            panic!("second task did not complete");
        };
        assert!(a.logs.iter().all(|l| !l.contains("ORD999")));
        assert!(b.logs.iter().any(|l| l.contains("ORD999")));
    }

    #[tokio::test]
    async fn capability_failure_marks_task_failed() {
        let queue = TaskQueue::start(WorkflowController::new(OrderBook::sample(), BrokenDrafter));
        let id = queue.submit(inquiry("ORD123", "hello")).await.unwrap();

        match queue.wait(id, POLL).await {
            Some(TaskStatus::Failed { error }) => {
                assert!(error.starts_with("Drafting failed"), "{error}");
                assert!(error.contains("drafting model offline"));
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_task_id_has_no_status() {
        let queue = TaskQueue::start(WorkflowController::new(
            OrderBook::sample(),
            OfflineCapability::new(),
        ));
        assert_eq!(queue.status(Uuid::new_v4()).await, None);
        assert_eq!(queue.wait(Uuid::new_v4(), POLL).await, None);
    }

    #[tokio::test]
    async fn forget_releases_finished_tasks() {
        let queue = TaskQueue::start(WorkflowController::new(
            OrderBook::sample(),
            OfflineCapability::new(),
        ));
        let id = queue.submit(inquiry("ORD789", "hello")).await.unwrap();
        assert!(queue.wait(id, POLL).await.unwrap().is_finished());
        assert!(queue.status(id).await.is_some());

        assert!(queue.forget(id).await);
        assert_eq!(queue.status(id).await, None);
        assert!(!queue.forget(id).await);
    }

    #[test]
    fn read_inquiries_parses_batch_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inquiries.json");
        std::fs::write(
            &path,
            r#"[{"order_id": "ORD123", "customer_message": "Where is my order?"}]"#,
        )
        .unwrap();

        let inquiries = read_inquiries(&path).unwrap();
        assert_eq!(inquiries.len(), 1);
        assert_eq!(inquiries[0].order_id, "ORD123");
    }

    #[test]
    fn read_inquiries_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inquiries.json");
        std::fs::write(&path, r#"{"order_id": "ORD123"}"#).unwrap();
        assert!(matches!(read_inquiries(&path), Err(SupportError::Json(_))));

        let missing = dir.path().join("absent.json");
        assert!(matches!(read_inquiries(&missing), Err(SupportError::Io(_))));
    }

    #[test]
    fn status_serializes_with_tag() {
        let json = serde_json::to_value(TaskStatus::Failed {
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");

        let json = serde_json::to_value(TaskStatus::Processing).unwrap();
        assert_eq!(json, serde_json::json!({"status": "processing"}));
    }
}
