//! `ExtractLinksHandler` (§4.4): discover child URLs from a scraped page and fan out child jobs.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::collaborators::ScraperClient;
use crate::domain::quality::should_skip_url;
use crate::domain::scrape_job::NewScrapeJob;
use crate::domain::tasks::{ExtractLinksTaskPayload, TaskPayload};
use crate::enqueuer::Enqueuer;
use crate::error::{AppError, Result};
use crate::store::Store;
use crate::worker::handler::Handler;

pub struct ExtractLinksHandler {
    store: Store,
    enqueuer: Enqueuer,
    scraper: Arc<dyn ScraperClient>,
    max_link_depth: i32,
}

impl ExtractLinksHandler {
    pub fn new(store: Store, enqueuer: Enqueuer, scraper: Arc<dyn ScraperClient>, max_link_depth: i32) -> Self {
        Self {
            store,
            enqueuer,
            scraper,
            max_link_depth,
        }
    }

    async fn handle_extract(&self, p: &ExtractLinksTaskPayload, trace: Option<crate::domain::tasks::TraceContext>) -> Result<()> {
        let links = self.scraper.extract_links(&p.source_url).await?;

        let child_depth = p.parent_depth + 1;
        let child_extract_links = child_depth < self.max_link_depth;

        for link in links {
            if should_skip_url(&link) {
                continue;
            }

            let new_job = NewScrapeJob::child(link.clone(), p.parent_job_id, child_depth, self.max_link_depth);
            let job = match self.store.scrape_jobs().create(new_job).await {
                Ok(job) => job,
                Err(e) => {
                    warn!(parent_job_id = p.parent_job_id, url = %link, error = ?e, "failed to create child scrape job");
                    continue;
                }
            };

            match self
                .enqueuer
                .enqueue_scrape(job.id, link.clone(), child_extract_links, Some(p.parent_job_id), child_depth, trace.clone())
                .await
            {
                Ok(task_id) => {
                    if let Err(e) = self.store.scrape_jobs().set_task_id(job.id, &task_id.to_string()).await {
                        warn!(job_id = job.id, error = ?e, "failed to record broker task id on child job");
                    }
                }
                Err(e) => {
                    warn!(job_id = job.id, url = %link, error = ?e, "failed to enqueue child scrape");
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Handler for ExtractLinksHandler {
    async fn handle(&self, payload: &TaskPayload) -> Result<()> {
        let TaskPayload::ExtractLinks(p) = payload else {
            return Err(AppError::InputInvalid("expected an extract:links payload".to_string()));
        };
        let trace = payload.trace_context();
        self.handle_extract(p, trace).await
    }
}
