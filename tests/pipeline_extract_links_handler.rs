#[allow(dead_code)]
mod helpers;

use std::sync::Arc;

use sqlx::PgPool;

use ingestor::domain::scrape_job::NewScrapeJob;
use ingestor::domain::tasks::{ExtractLinksTaskPayload, TaskPayload};
use ingestor::enqueuer::Enqueuer;
use ingestor::pipeline::extract_links_handler::ExtractLinksHandler;
use ingestor::queue::{PostgresQueue, QueueBackend};
use ingestor::store::{Store, TombstonePeriods};
use ingestor::worker::handler::Handler;

fn test_store(pool: PgPool) -> Store {
    Store::new(pool, TombstonePeriods { low_score_days: 7, tag_days: 90, manual_days: 30 }, vec![])
}

fn extract_payload(parent_job_id: i64, source_url: &str, parent_depth: i32) -> TaskPayload {
    TaskPayload::ExtractLinks(ExtractLinksTaskPayload {
        parent_job_id,
        source_url: source_url.to_string(),
        parent_depth,
        trace_id: None,
        span_id: None,
        enqueued_at: 0,
    })
}

#[sqlx::test]
async fn discovered_links_become_child_jobs(pool: PgPool) {
    let store = test_store(pool.clone());
    let parent = store.scrape_jobs().create(NewScrapeJob::root("https://example.com", true)).await.unwrap();

    let queue: Arc<dyn QueueBackend> = Arc::new(PostgresQueue::new(pool.clone()));
    let enqueuer = Enqueuer::new(queue);
    let scraper = Arc::new(
        helpers::FakeScraperClient::new(0.9, vec![])
            .with_links(vec!["https://example.com/a".to_string(), "https://example.com/b".to_string()]),
    );

    let handler = ExtractLinksHandler::new(store.clone(), enqueuer, scraper, 3);
    handler.handle(&extract_payload(parent.id, "https://example.com", 0)).await.unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scrape_jobs WHERE parent_job_id = $1")
        .bind(parent.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 2);

    let (scrape_task_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE task_type = 'scrape:url'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(scrape_task_count, 2);
}

#[sqlx::test]
async fn non_crawlable_links_are_skipped(pool: PgPool) {
    let store = test_store(pool.clone());
    let parent = store.scrape_jobs().create(NewScrapeJob::root("https://example.com", true)).await.unwrap();

    let queue: Arc<dyn QueueBackend> = Arc::new(PostgresQueue::new(pool.clone()));
    let enqueuer = Enqueuer::new(queue);
    let scraper = Arc::new(helpers::FakeScraperClient::new(0.9, vec![]).with_links(vec![
        "mailto:a@example.com".to_string(),
        "https://example.com/photo.png".to_string(),
        "https://example.com/kept".to_string(),
    ]));

    let handler = ExtractLinksHandler::new(store.clone(), enqueuer, scraper, 3);
    handler.handle(&extract_payload(parent.id, "https://example.com", 0)).await.unwrap();

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scrape_jobs WHERE parent_job_id = $1")
        .bind(parent.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "only the http(s) non-image link should be kept");
}

#[sqlx::test]
async fn child_job_at_max_depth_disables_further_extraction(pool: PgPool) {
    let store = test_store(pool.clone());
    let parent = store.scrape_jobs().create(NewScrapeJob::root("https://example.com", true)).await.unwrap();

    let queue: Arc<dyn QueueBackend> = Arc::new(PostgresQueue::new(pool.clone()));
    let enqueuer = Enqueuer::new(queue);
    let scraper = Arc::new(
        helpers::FakeScraperClient::new(0.9, vec![]).with_links(vec!["https://example.com/leaf".to_string()]),
    );

    // parent_depth = 2, max_link_depth = 3: the child lands at depth 3, which is not < 3.
    let handler = ExtractLinksHandler::new(store.clone(), enqueuer, scraper, 3);
    handler.handle(&extract_payload(parent.id, "https://example.com", 2)).await.unwrap();

    let (extract_links,): (bool,) = sqlx::query_as("SELECT extract_links FROM scrape_jobs WHERE parent_job_id = $1")
        .bind(parent.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!extract_links, "a child job at the depth cap must not request further extraction");
}
