#[allow(dead_code)]
mod helpers;

use std::sync::Arc;

use sqlx::PgPool;

use ingestor::collaborators::UrlCache;
use ingestor::domain::scrape_job::NewScrapeJob;
use ingestor::domain::tasks::{ScrapeTaskPayload, TaskPayload};
use ingestor::enqueuer::Enqueuer;
use ingestor::pipeline::scrape_handler::ScrapeHandler;
use ingestor::queue::{PostgresQueue, QueueBackend};
use ingestor::store::{Store, TombstonePeriods};
use ingestor::worker::handler::Handler;

fn test_store(pool: PgPool) -> Store {
    Store::new(pool, TombstonePeriods { low_score_days: 7, tag_days: 90, manual_days: 30 }, vec![])
}

fn scrape_payload(job_id: i64, url: &str, extract_links: bool, depth: i32) -> TaskPayload {
    TaskPayload::ScrapeUrl(ScrapeTaskPayload {
        job_id,
        url: url.to_string(),
        extract_links,
        parent_job_id: None,
        depth,
        trace_id: None,
        span_id: None,
        enqueued_at: 0,
    })
}

#[sqlx::test]
async fn below_threshold_scrape_tombstones_without_fetching_content(pool: PgPool) {
    let store = test_store(pool.clone());
    let job = store.scrape_jobs().create(NewScrapeJob::root("https://example.com/a", false)).await.unwrap();

    let queue: Arc<dyn QueueBackend> = Arc::new(PostgresQueue::new(pool.clone()));
    let enqueuer = Enqueuer::new(queue);
    let scraper = Arc::new(helpers::FakeScraperClient::new(0.1, vec!["article".to_string()]));
    let analyzer = Arc::new(helpers::FakeAnalyzerClient::pending());

    let handler = ScrapeHandler::new(store.clone(), enqueuer, scraper, analyzer, UrlCache::default(), 0.5, 3);

    handler.handle(&scrape_payload(job.id, "https://example.com/a", false, 0)).await.unwrap();

    let reloaded = store.scrape_jobs().get(job.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, ingestor::domain::scrape_job::ScrapeJobStatus::Completed);
    let request = store.requests().get(reloaded.result_request_id.unwrap()).await.unwrap().unwrap();
    assert!(!request.seo_enabled);
    assert_eq!(
        request.metadata.get("tombstone_reason").and_then(|v| v.as_str()),
        Some("below link-score threshold")
    );
}

#[sqlx::test]
async fn image_category_bypasses_threshold_and_skips_analysis(pool: PgPool) {
    let store = test_store(pool.clone());
    let job = store.scrape_jobs().create(NewScrapeJob::root("https://example.com/cat.png", false)).await.unwrap();

    let queue: Arc<dyn QueueBackend> = Arc::new(PostgresQueue::new(pool.clone()));
    let enqueuer = Enqueuer::new(queue);
    let scraper = Arc::new(helpers::FakeScraperClient::new(0.0, vec!["image".to_string()]));
    let analyzer = Arc::new(helpers::FakeAnalyzerClient::pending());

    let handler = ScrapeHandler::new(store.clone(), enqueuer, scraper, analyzer, UrlCache::default(), 0.5, 3);

    handler.handle(&scrape_payload(job.id, "https://example.com/cat.png", false, 0)).await.unwrap();

    let reloaded = store.scrape_jobs().get(job.id).await.unwrap().unwrap();
    let request = store.requests().get(reloaded.result_request_id.unwrap()).await.unwrap().unwrap();
    assert!(request.seo_enabled, "image bypass should not tombstone");
    assert!(request.metadata.get("textanalyzer_job_id").is_none(), "images skip analysis");
}

#[sqlx::test]
async fn successful_scrape_persists_request_and_spawns_analysis(pool: PgPool) {
    let store = test_store(pool.clone());
    let job = store.scrape_jobs().create(NewScrapeJob::root("https://example.com/article", false)).await.unwrap();

    let queue: Arc<dyn QueueBackend> = Arc::new(PostgresQueue::new(pool.clone()));
    let enqueuer = Enqueuer::new(queue.clone());
    let scraper = Arc::new(helpers::FakeScraperClient::new(0.9, vec!["article".to_string()]));
    let analyzer = Arc::new(helpers::FakeAnalyzerClient::pending());

    let handler = ScrapeHandler::new(store.clone(), enqueuer, scraper, analyzer, UrlCache::default(), 0.5, 3);

    handler.handle(&scrape_payload(job.id, "https://example.com/article", false, 0)).await.unwrap();

    let reloaded = store.scrape_jobs().get(job.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, ingestor::domain::scrape_job::ScrapeJobStatus::Completed);

    let request = store.requests().get(reloaded.result_request_id.unwrap()).await.unwrap().unwrap();
    assert!(request.seo_enabled);
    assert_eq!(request.scraper_uuid.as_deref(), Some("doc-1"));
    assert_eq!(
        request.metadata.get("textanalyzer_job_id").and_then(|v| v.as_str()),
        Some("job-1")
    );

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE task_type = 'retrieve:analysis'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "a retrieve:analysis task should have been spawned");
}

#[sqlx::test]
async fn extract_links_flag_spawns_link_extraction_task(pool: PgPool) {
    let store = test_store(pool.clone());
    let job = store.scrape_jobs().create(NewScrapeJob::root("https://example.com/article", true)).await.unwrap();

    let queue: Arc<dyn QueueBackend> = Arc::new(PostgresQueue::new(pool.clone()));
    let enqueuer = Enqueuer::new(queue);
    let scraper = Arc::new(helpers::FakeScraperClient::new(0.9, vec!["article".to_string()]));
    let analyzer = Arc::new(helpers::FakeAnalyzerClient::pending());

    let handler = ScrapeHandler::new(store.clone(), enqueuer, scraper, analyzer, UrlCache::default(), 0.5, 3);

    handler.handle(&scrape_payload(job.id, "https://example.com/article", true, 0)).await.unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE task_type = 'extract:links'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test]
async fn scraper_score_failure_records_retryable_attempt_and_propagates(pool: PgPool) {
    let store = test_store(pool.clone());
    let job = store.scrape_jobs().create(NewScrapeJob::root("https://example.com/article", false)).await.unwrap();

    let queue: Arc<dyn QueueBackend> = Arc::new(PostgresQueue::new(pool.clone()));
    let enqueuer = Enqueuer::new(queue);
    let scraper = Arc::new(
        helpers::FakeScraperClient::new(0.9, vec![])
            .with_score_failure(ingestor::error::AppError::NotReady("scraper".to_string())),
    );
    let analyzer = Arc::new(helpers::FakeAnalyzerClient::pending());

    let handler = ScrapeHandler::new(store.clone(), enqueuer, scraper, analyzer, UrlCache::default(), 0.5, 3);

    let result = handler.handle(&scrape_payload(job.id, "https://example.com/article", false, 0)).await;
    assert!(result.is_err());

    let reloaded = store.scrape_jobs().get(job.id).await.unwrap().unwrap();
    assert_eq!(reloaded.status, ingestor::domain::scrape_job::ScrapeJobStatus::Queued, "retryable error must not flip terminal state");
    assert_eq!(reloaded.retries, 1);
}
