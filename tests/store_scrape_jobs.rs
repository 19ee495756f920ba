#[allow(dead_code)]
mod helpers;

use sqlx::PgPool;

use ingestor::domain::scrape_job::{NewScrapeJob, ScrapeJobStatus};
use ingestor::store::{Store, TombstonePeriods};

fn test_store(pool: PgPool) -> Store {
    Store::new(
        pool,
        TombstonePeriods { low_score_days: 7, tag_days: 90, manual_days: 30 },
        vec![],
    )
}

#[sqlx::test]
async fn create_root_job_has_queued_status_and_zero_depth(pool: PgPool) {
    let store = test_store(pool);

    let job = store
        .scrape_jobs()
        .create(NewScrapeJob::root("https://example.com", true))
        .await
        .unwrap();

    assert_eq!(job.status, ScrapeJobStatus::Queued);
    assert_eq!(job.depth, 0);
    assert_eq!(job.retries, 0);
    assert!(job.parent_job_id.is_none());
}

#[sqlx::test]
async fn create_child_job_records_parent_and_depth(pool: PgPool) {
    let store = test_store(pool);

    let parent = store
        .scrape_jobs()
        .create(NewScrapeJob::root("https://example.com", true))
        .await
        .unwrap();

    let child = store
        .scrape_jobs()
        .create(NewScrapeJob::child("https://example.com/a", parent.id, 1, 3))
        .await
        .unwrap();

    assert_eq!(child.parent_job_id, Some(parent.id));
    assert_eq!(child.depth, 1);
}

#[sqlx::test]
async fn mark_processing_is_a_no_op_on_terminal_jobs(pool: PgPool) {
    let store = test_store(pool.clone());

    let job = store
        .scrape_jobs()
        .create(NewScrapeJob::root("https://example.com", false))
        .await
        .unwrap();

    store.scrape_jobs().mark_failed(job.id, "permanent error").await.unwrap();
    store.scrape_jobs().mark_processing(job.id).await.unwrap();

    let reloaded = store.scrape_jobs().get(job.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, ScrapeJobStatus::Failed, "terminal status must not be overwritten");
}

#[sqlx::test]
async fn mark_completed_sets_result_request_id(pool: PgPool) {
    let store = test_store(pool);

    let job = store
        .scrape_jobs()
        .create(NewScrapeJob::root("https://example.com", false))
        .await
        .unwrap();

    store.scrape_jobs().mark_completed(job.id, 42).await.unwrap();

    let reloaded = store.scrape_jobs().get(job.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, ScrapeJobStatus::Completed);
    assert_eq!(reloaded.result_request_id, Some(42));
    assert!(reloaded.completed_at.is_some());
}

#[sqlx::test]
async fn mark_failed_flips_terminal_and_bumps_retries(pool: PgPool) {
    let store = test_store(pool);

    let job = store
        .scrape_jobs()
        .create(NewScrapeJob::root("https://example.com", false))
        .await
        .unwrap();

    store.scrape_jobs().mark_failed(job.id, "bad url").await.unwrap();

    let reloaded = store.scrape_jobs().get(job.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, ScrapeJobStatus::Failed);
    assert_eq!(reloaded.retries, 1);
    assert_eq!(reloaded.error_message.as_deref(), Some("bad url"));
}

#[sqlx::test]
async fn record_attempt_failure_bumps_retries_without_flipping_terminal(pool: PgPool) {
    let store = test_store(pool);

    let job = store
        .scrape_jobs()
        .create(NewScrapeJob::root("https://example.com", false))
        .await
        .unwrap();

    store.scrape_jobs().record_attempt_failure(job.id, "timeout").await.unwrap();

    let reloaded = store.scrape_jobs().get(job.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, ScrapeJobStatus::Queued, "non-terminal status must survive a retryable failure");
    assert_eq!(reloaded.retries, 1);
}
