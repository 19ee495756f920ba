//! `ScrapeJob` bookkeeping (§3, §4.3): pipeline state distinct from the `Request` it may produce.

use super::Store;
use crate::domain::scrape_job::{NewScrapeJob, ScrapeJob, ScrapeJobStatus};
use crate::error::Result;

pub struct ScrapeJobOps<'a> {
    store: &'a Store,
}

impl<'a> ScrapeJobOps<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub async fn create(&self, new_job: NewScrapeJob) -> Result<ScrapeJob> {
        let job = sqlx::query_as::<_, ScrapeJob>(
            "INSERT INTO scrape_jobs \
                (url, extract_links, status, retries, created_at, updated_at, parent_job_id, depth) \
             VALUES ($1, $2, 'queued', 0, NOW(), NOW(), $3, $4) \
             RETURNING *",
        )
        .bind(&new_job.url)
        .bind(new_job.extract_links)
        .bind(new_job.parent_job_id)
        .bind(new_job.depth)
        .fetch_one(self.store.pool())
        .await?;
        Ok(job)
    }

    pub async fn get(&self, id: i64) -> Result<Option<ScrapeJob>> {
        let job = sqlx::query_as::<_, ScrapeJob>("SELECT * FROM scrape_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(self.store.pool())
            .await?;
        Ok(job)
    }

    /// Mark `processing` (idempotent; a job already in a terminal state is left alone, §4.3
    /// step 1 and §4.1's idempotent-handler requirement).
    pub async fn mark_processing(&self, id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE scrape_jobs SET status = 'processing', updated_at = NOW() \
             WHERE id = $1 AND status NOT IN ('completed', 'failed')",
        )
        .bind(id)
        .execute(self.store.pool())
        .await?;
        Ok(())
    }

    pub async fn mark_completed(&self, id: i64, result_request_id: i64) -> Result<()> {
        sqlx::query(
            "UPDATE scrape_jobs SET status = 'completed', result_request_id = $2, \
             completed_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(result_request_id)
        .execute(self.store.pool())
        .await?;
        Ok(())
    }

    /// Flip to the terminal `failed` state (§4.3's failure-handling list) — used only when the
    /// handler has determined the error will never succeed on retry; a job this leaves behind is
    /// not picked up again by `mark_processing`'s terminal guard.
    pub async fn mark_failed(&self, id: i64, error_message: &str) -> Result<()> {
        sqlx::query(
            "UPDATE scrape_jobs SET status = 'failed', error_message = $2, \
             retries = retries + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(self.store.pool())
        .await?;
        Ok(())
    }

    /// Record a retryable attempt failure: increments `retries` and sets `error_message` without
    /// leaving the terminal `failed` state, so the broker's own redelivery can still call
    /// `mark_processing` again on the next attempt.
    pub async fn record_attempt_failure(&self, id: i64, error_message: &str) -> Result<()> {
        sqlx::query(
            "UPDATE scrape_jobs SET error_message = $2, retries = retries + 1, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(self.store.pool())
        .await?;
        Ok(())
    }

    pub async fn set_task_id(&self, id: i64, task_id: &str) -> Result<()> {
        sqlx::query("UPDATE scrape_jobs SET task_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(task_id)
            .execute(self.store.pool())
            .await?;
        Ok(())
    }

    pub async fn set_status(&self, id: i64, status: ScrapeJobStatus) -> Result<()> {
        sqlx::query("UPDATE scrape_jobs SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.store.pool())
            .await?;
        Ok(())
    }
}
