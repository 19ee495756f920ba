//! `ScrapeHandler` (§4.3): score → gate → scrape → enqueue analysis → persist → fan out.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::{error, warn};

use crate::collaborators::{ScraperClient, TextAnalyzerClient, UrlCache};
use crate::compression::compress_to_base64;
use crate::domain::quality::{below_threshold_tombstone, domain_of, is_image};
use crate::domain::request::{build_scrape_tags, SourceType};
use crate::domain::slug;
use crate::domain::tasks::{ScrapeTaskPayload, TaskPayload};
use crate::enqueuer::Enqueuer;
use crate::error::{AppError, Result};
use crate::store::requests::NewRequest;
use crate::store::Store;
use crate::worker::handler::Handler;

pub struct ScrapeHandler {
    store: Store,
    enqueuer: Enqueuer,
    scraper: Arc<dyn ScraperClient>,
    analyzer: Arc<dyn TextAnalyzerClient>,
    url_cache: UrlCache,
    link_score_threshold: f64,
    max_link_depth: i32,
}

impl ScrapeHandler {
    pub fn new(
        store: Store,
        enqueuer: Enqueuer,
        scraper: Arc<dyn ScraperClient>,
        analyzer: Arc<dyn TextAnalyzerClient>,
        url_cache: UrlCache,
        link_score_threshold: f64,
        max_link_depth: i32,
    ) -> Self {
        Self {
            store,
            enqueuer,
            scraper,
            analyzer,
            url_cache,
            link_score_threshold,
            max_link_depth,
        }
    }

    /// Records a failure against the `ScrapeJob` row (§4.3's failure-handling list): retryable
    /// errors just bump the attempt counter so the next redelivery can reprocess the job; only a
    /// permanent error flips it to the terminal state `mark_processing` won't revisit.
    async fn fail_job(&self, job_id: i64, err: &AppError) {
        let message = err.to_string();
        let result = if err.is_retryable() {
            self.store.scrape_jobs().record_attempt_failure(job_id, &message).await
        } else {
            self.store.scrape_jobs().mark_failed(job_id, &message).await
        };
        if let Err(e) = result {
            error!(job_id, error = ?e, "failed to record scrape job failure");
        }
    }

    async fn handle_scrape(&self, p: &ScrapeTaskPayload, trace: Option<crate::domain::tasks::TraceContext>) -> Result<()> {
        self.store.scrape_jobs().mark_processing(p.job_id).await?;

        let score = match self.scraper.score(&p.url).await {
            Ok(score) => score,
            Err(e) => {
                self.fail_job(p.job_id, &e).await;
                return Err(e);
            }
        };

        let image = is_image(&score.categories);
        let domain = domain_of(&p.url).unwrap_or_default();

        if !image && score.score < self.link_score_threshold {
            let now = Utc::now();
            let decision = below_threshold_tombstone(now, self.store.tombstone_periods().low_score_days);
            let tags = build_scrape_tags(&score.categories, &domain);
            let metadata = json!({
                "link_score": score.score,
                "below_threshold": true,
                "tombstone_datetime": decision.tombstone_datetime.to_rfc3339(),
                "tombstone_reason": decision.reason,
            });

            let new_request = NewRequest {
                source_type: SourceType::Url,
                source_url: Some(p.url.clone()),
                scraper_uuid: None,
                analyzer_job_id: None,
                tags,
                metadata,
                slug: None,
                seo_enabled: decision.seo_enabled,
            };

            let request = match self.store.requests().save(new_request).await {
                Ok(request) => request,
                Err(e) => {
                    self.fail_job(p.job_id, &e).await;
                    return Err(e);
                }
            };

            if let Err(e) = self.store.scrape_jobs().mark_completed(p.job_id, request.id).await {
                self.fail_job(p.job_id, &e).await;
                return Err(e);
            }

            return Ok(());
        }

        let scraped = match self.scraper.scrape(&p.url).await {
            Ok(scraped) => scraped,
            Err(e) => {
                self.fail_job(p.job_id, &e).await;
                return Err(e);
            }
        };

        let mut analyzer_job_id: Option<String> = None;
        if !image {
            let image_urls: Vec<String> = scraped.images.iter().map(|i| i.url.clone()).collect();
            match compress_to_base64(&scraped.raw_text) {
                Ok(compressed_html) => {
                    match self
                        .analyzer
                        .enqueue_analysis(&scraped.content, Some(&compressed_html), image_urls)
                        .await
                    {
                        Ok(job_id) => analyzer_job_id = Some(job_id),
                        Err(e) => warn!(job_id = p.job_id, error = ?e, "failed to enqueue analysis, continuing without it"),
                    }
                }
                Err(e) => warn!(job_id = p.job_id, error = ?e, "failed to compress raw text, continuing without analysis"),
            }
        }

        let tags = build_scrape_tags(&score.categories, &domain);
        let resolved_slug = scraped.slug.clone().unwrap_or_else(|| slug::generate(&scraped.title, &p.url));

        let mut metadata = json!({
            "scraper_metadata": scraped.metadata,
            "link_score": score.score,
        });
        if let Some(ref job_id) = analyzer_job_id {
            metadata["textanalyzer_job_id"] = json!(job_id);
            metadata["textanalyzer_status"] = json!("queued");
        }

        let new_request = NewRequest {
            source_type: SourceType::Url,
            source_url: Some(p.url.clone()),
            scraper_uuid: Some(scraped.id.clone()),
            analyzer_job_id: analyzer_job_id.clone(),
            tags,
            metadata,
            slug: Some(resolved_slug),
            seo_enabled: true,
        };

        let request = match self.store.requests().save(new_request).await {
            Ok(request) => request,
            Err(e) => {
                self.fail_job(p.job_id, &e).await;
                return Err(e);
            }
        };

        if let Err(e) = self.store.scrape_jobs().mark_completed(p.job_id, request.id).await {
            self.fail_job(p.job_id, &e).await;
            return Err(e);
        }

        self.url_cache.set(&p.url, &scraped.id);

        if let Some(analyzer_job_id) = analyzer_job_id {
            if let Err(e) = self
                .enqueuer
                .enqueue_retrieve_analysis(request.id, analyzer_job_id, 0, trace.clone())
                .await
            {
                warn!(job_id = p.job_id, error = ?e, "failed to spawn analysis retrieval");
            }
        }

        if p.extract_links && !image && p.depth < self.max_link_depth {
            if let Err(e) = self
                .enqueuer
                .enqueue_extract_links(p.job_id, p.url.clone(), p.depth, trace)
                .await
            {
                warn!(job_id = p.job_id, error = ?e, "failed to spawn link extraction");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Handler for ScrapeHandler {
    async fn handle(&self, payload: &TaskPayload) -> Result<()> {
        let TaskPayload::ScrapeUrl(p) = payload else {
            return Err(AppError::InputInvalid("expected a scrape:url payload".to_string()));
        };
        let trace = payload.trace_context();
        self.handle_scrape(p, trace).await
    }
}
