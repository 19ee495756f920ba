//! Postgres-backed [`QueueBackend`], generalized from `data::scrape_jobs::fetch_and_lock_job`'s
//! `FOR UPDATE SKIP LOCKED` pattern to a shared `tasks` table across three named queues.

use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use std::time::Duration;

use crate::error::Result;
use crate::queue::{EnqueueOptions, QueueBackend, Task};

#[derive(Clone)]
pub struct PostgresQueue {
    pool: PgPool,
}

impl PostgresQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl QueueBackend for PostgresQueue {
    async fn enqueue(
        &self,
        queue: &str,
        task_type: &str,
        payload: Value,
        options: EnqueueOptions,
    ) -> Result<i64> {
        if let (Some(unique_key), Some(unique_for)) = (&options.unique_key, options.unique_for) {
            let existing: Option<(i64,)> = sqlx::query_as(
                "SELECT id FROM tasks \
                 WHERE unique_key = $1 \
                   AND status IN ('queued', 'processing') \
                   AND run_at > NOW() - make_interval(secs => $2::double precision)",
            )
            .bind(unique_key)
            .bind(unique_for.as_secs_f64())
            .fetch_optional(&self.pool)
            .await?;

            if let Some((existing_id,)) = existing {
                return Ok(existing_id);
            }
        }

        let run_at = Utc::now() + chrono::Duration::from_std(options.process_in.unwrap_or_default()).unwrap_or_default();
        let retention_until = Utc::now() + chrono::Duration::from_std(options.retention).unwrap_or_default();

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO tasks \
                (queue, task_type, payload, unique_key, status, attempts, max_retries, \
                 run_at, timeout_seconds, retention_until) \
             VALUES ($1, $2, $3, $4, 'queued', 0, $5, $6, $7, $8) \
             RETURNING id",
        )
        .bind(queue)
        .bind(task_type)
        .bind(&payload)
        .bind(&options.unique_key)
        .bind(options.max_retries)
        .bind(run_at)
        .bind(options.timeout.as_secs() as i32)
        .bind(retention_until)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn dispatch(&self, queues: &[&str], locked_by: &str) -> Result<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let task = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks \
             WHERE queue = ANY($1) AND status = 'queued' AND run_at <= NOW() \
             ORDER BY run_at ASC \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED",
        )
        .bind(queues)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(ref task) = task {
            sqlx::query(
                "UPDATE tasks SET status = 'processing', locked_at = NOW(), locked_by = $2, \
                 attempts = attempts + 1 WHERE id = $1",
            )
            .bind(task.id)
            .bind(locked_by)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(task)
    }

    async fn complete(&self, task_id: i64) -> Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fail(&self, task_id: i64, error_message: &str, retry_after: Duration) -> Result<()> {
        let run_at = Utc::now() + chrono::Duration::from_std(retry_after).unwrap_or_default();

        sqlx::query(
            "UPDATE tasks SET \
                status = CASE WHEN attempts >= max_retries THEN 'failed' ELSE 'queued' END, \
                locked_at = NULL, locked_by = NULL, run_at = $2, last_error = $3 \
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(run_at)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn release(&self, task_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE tasks SET status = 'queued', locked_at = NULL, locked_by = NULL WHERE id = $1",
        )
        .bind(task_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn abandon(&self, task_id: i64, error_message: &str) -> Result<()> {
        sqlx::query(
            "UPDATE tasks SET status = 'failed', locked_at = NULL, locked_by = NULL, \
             last_error = $2 WHERE id = $1",
        )
        .bind(task_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
