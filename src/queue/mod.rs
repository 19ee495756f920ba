//! The task broker (§4.1): a persistent, at-least-once queue backed by Postgres, generalized from
//! the teacher's single `scrape_jobs` `SKIP LOCKED` table into three weighted named queues.

pub mod postgres;
pub mod retry;
pub mod weights;

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

pub use postgres::PostgresQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// A dispatched unit of work, as stored in the `tasks` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub queue: String,
    pub task_type: String,
    pub payload: Value,
    pub unique_key: Option<String>,
    pub status: TaskStatus,
    pub attempts: i32,
    pub max_retries: i32,
    pub run_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
    pub timeout_seconds: i32,
    pub retention_until: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// Options accepted by [`QueueBackend::enqueue`] (§4.1).
#[derive(Debug, Clone)]
pub struct EnqueueOptions {
    /// Caller-supplied id used for the `unique_for` dedup fingerprint (e.g. a `ScrapeJob` id).
    pub unique_key: Option<String>,
    pub max_retries: i32,
    pub timeout: Duration,
    /// Delay the task's first eligibility to run.
    pub process_in: Option<Duration>,
    /// Dedup window: a second enqueue with the same `unique_key` inside this window returns the
    /// existing task id instead of inserting a duplicate.
    pub unique_for: Option<Duration>,
    /// How long a terminal (failed) task is retained before it may be purged.
    pub retention: Duration,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            unique_key: None,
            max_retries: 8,
            timeout: Duration::from_secs(300),
            process_in: None,
            unique_for: Some(Duration::from_secs(3600)),
            retention: Duration::from_secs(7 * 24 * 3600),
        }
    }
}

/// A task broker contract (§4.1). All mutation is expressed as atomic, re-appliable SQL so
/// at-least-once delivery holds even across worker crashes.
#[async_trait::async_trait]
pub trait QueueBackend: Send + Sync {
    /// Enqueue `payload` of `task_type` onto `queue`, returning the task id. Deduplicates within
    /// `options.unique_for` against `options.unique_key` when both are set.
    async fn enqueue(
        &self,
        queue: &str,
        task_type: &str,
        payload: Value,
        options: EnqueueOptions,
    ) -> crate::error::Result<i64>;

    /// Atomically fetch and lock the next eligible task from any of `queues`, in the caller's
    /// draw order, using `FOR UPDATE SKIP LOCKED` so concurrent workers never double-dispatch.
    async fn dispatch(&self, queues: &[&str], locked_by: &str) -> crate::error::Result<Option<Task>>;

    /// Mark a task permanently completed (deletes it — completed tasks carry no further value).
    async fn complete(&self, task_id: i64) -> crate::error::Result<()>;

    /// Record a failed attempt. If `attempts` remains under `max_retries`, the task is unlocked
    /// and rescheduled for `retry_after`; otherwise it is marked [`TaskStatus::Failed`] and kept
    /// until its `retention_until`.
    async fn fail(
        &self,
        task_id: i64,
        error_message: &str,
        retry_after: Duration,
    ) -> crate::error::Result<()>;

    /// Release the lock on a task without touching its attempt count, e.g. on graceful shutdown
    /// of an in-flight handler (§4.2).
    async fn release(&self, task_id: i64) -> crate::error::Result<()>;

    /// Mark a task [`TaskStatus::Failed`] immediately, bypassing the retry schedule — used for
    /// permanent errors (§7's input-invalid/not-found classes) that will never succeed no matter
    /// how many attempts remain.
    async fn abandon(&self, task_id: i64, error_message: &str) -> crate::error::Result<()>;
}
