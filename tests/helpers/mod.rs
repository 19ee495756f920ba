use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

use ingestor::collaborators::models::{AnalysisResult, AnalysisStatusResponse, Score, ScrapeResponse, ScrapedImage};
use ingestor::collaborators::{ScraperClient, TextAnalyzerClient};
use ingestor::domain::request::SourceType;
use ingestor::error::{AppError, Result};
use ingestor::store::requests::NewRequest;

/// Build a `NewRequest` with sensible defaults for a URL-sourced scrape.
pub fn new_request(tags: Vec<String>, metadata: Value) -> NewRequest {
    NewRequest {
        source_type: SourceType::Url,
        source_url: Some("https://example.com/article".to_string()),
        scraper_uuid: Some("scraper-uuid-1".to_string()),
        analyzer_job_id: None,
        tags,
        metadata,
        slug: None,
        seo_enabled: true,
    }
}

/// Insert a `tasks` row directly via SQL, returning its id.
pub async fn insert_task(
    pool: &PgPool,
    queue: &str,
    task_type: &str,
    payload: Value,
    run_at_offset_secs: i64,
) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO tasks \
            (queue, task_type, payload, status, attempts, max_retries, run_at, \
             timeout_seconds, retention_until) \
         VALUES ($1, $2, $3, 'queued', 0, 8, NOW() + make_interval(secs => $4::double precision), \
                 300, NOW() + INTERVAL '7 days') \
         RETURNING id",
    )
    .bind(queue)
    .bind(task_type)
    .bind(payload)
    .bind(run_at_offset_secs as f64)
    .fetch_one(pool)
    .await
    .expect("insert_task failed");

    id
}

/// A canned `ScraperClient` for handler tests — no mocking crate is in this stack, so handler
/// tests configure one of these directly the way the collaborator module's own doc comment
/// points to.
pub struct FakeScraperClient {
    pub score: Score,
    pub scrape: ScrapeResponse,
    pub links: Vec<String>,
    pub fail_score: Mutex<Option<AppError>>,
}

impl FakeScraperClient {
    pub fn new(score: f64, categories: Vec<String>) -> Self {
        Self {
            score: Score { score, reason: "test".to_string(), categories, is_recommended: true, malicious_indicators: vec![] },
            scrape: ScrapeResponse {
                id: "doc-1".to_string(),
                url: "https://example.com".to_string(),
                title: "Example Title".to_string(),
                content: "cleaned content".to_string(),
                raw_text: "<html>raw</html>".to_string(),
                slug: None,
                metadata: serde_json::json!({ "author": "tester" }),
                images: vec![ScrapedImage { url: "https://example.com/a.png".to_string(), alt_text: None }],
                score: None,
            },
            links: vec![],
            fail_score: Mutex::new(None),
        }
    }

    pub fn with_links(mut self, links: Vec<String>) -> Self {
        self.links = links;
        self
    }

    pub fn with_score_failure(self, err: AppError) -> Self {
        *self.fail_score.lock().unwrap() = Some(err);
        self
    }
}

#[async_trait]
impl ScraperClient for FakeScraperClient {
    async fn score(&self, _url: &str) -> Result<Score> {
        if let Some(err) = self.fail_score.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.score.clone())
    }

    async fn scrape(&self, _url: &str) -> Result<ScrapeResponse> {
        Ok(self.scrape.clone())
    }

    async fn extract_links(&self, _url: &str) -> Result<Vec<String>> {
        Ok(self.links.clone())
    }
}

/// A canned `TextAnalyzerClient` for handler tests.
pub struct FakeAnalyzerClient {
    pub job_id: String,
    pub status: String,
    pub result: Option<AnalysisResult>,
}

impl FakeAnalyzerClient {
    pub fn pending() -> Self {
        Self { job_id: "job-1".to_string(), status: "processing".to_string(), result: None }
    }

    pub fn completed(quality_score: f64, tags: Vec<String>) -> Self {
        Self {
            job_id: "job-1".to_string(),
            status: "completed".to_string(),
            result: Some(AnalysisResult {
                tags,
                synopsis: "a synopsis".to_string(),
                cleaned_text: "cleaned".to_string(),
                heuristic_cleaned_text: "heuristic".to_string(),
                quality_score: ingestor::collaborators::models::QualityScore { score: quality_score },
            }),
        }
    }
}

#[async_trait]
impl TextAnalyzerClient for FakeAnalyzerClient {
    async fn enqueue_analysis(&self, _content: &str, _compressed_html: Option<&str>, _image_urls: Vec<String>) -> Result<String> {
        Ok(self.job_id.clone())
    }

    async fn get_result(&self, _analysis_job_id: &str) -> Result<AnalysisStatusResponse> {
        Ok(AnalysisStatusResponse { status: self.status.clone(), result: self.result.clone() })
    }
}
