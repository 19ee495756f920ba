//! `Enqueuer`: the only path by which new tasks enter the [`QueueBackend`] (§3's ownership rule —
//! "handlers... publish new tasks via Enqueuer — never mutate broker state directly").

use std::sync::Arc;
use std::time::Duration;

use crate::domain::tasks::{ExtractLinksTaskPayload, RetrieveAnalysisTaskPayload, ScrapeTaskPayload, TaskPayload, TraceContext};
use crate::error::Result;
use crate::queue::{EnqueueOptions, QueueBackend};

/// Link extraction is deliberately decoupled from the parent scrape with a short delay so the
/// parent's `Request` write is durably visible before child discovery runs (§5).
const EXTRACT_LINKS_DELAY: Duration = Duration::from_secs(1);

/// Per-task-type wall-clock timeouts (§5). `retrieve:analysis` must exceed realistic analyzer
/// latency, not just the broker's default.
const SCRAPE_TIMEOUT: Duration = Duration::from_secs(3 * 3600);
const EXTRACT_LINKS_TIMEOUT: Duration = Duration::from_secs(3600);
const RETRIEVE_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(3 * 3600);

#[derive(Clone)]
pub struct Enqueuer {
    queue: Arc<dyn QueueBackend>,
}

impl Enqueuer {
    pub fn new(queue: Arc<dyn QueueBackend>) -> Self {
        Self { queue }
    }

    fn enqueued_at_now() -> i64 {
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    }

    /// Enqueue a `scrape:url` task. `job_id` doubles as the broker's dedup key — re-enqueuing the
    /// same `ScrapeJob` within the dedup window returns the existing task id (§9 open question).
    pub async fn enqueue_scrape(
        &self,
        job_id: i64,
        url: String,
        extract_links: bool,
        parent_job_id: Option<i64>,
        depth: i32,
        trace_context: Option<TraceContext>,
    ) -> Result<i64> {
        let (trace_id, span_id) = split(trace_context);
        let payload = TaskPayload::ScrapeUrl(ScrapeTaskPayload {
            job_id,
            url,
            extract_links,
            parent_job_id,
            depth,
            trace_id,
            span_id,
            enqueued_at: Self::enqueued_at_now(),
        });

        let options = EnqueueOptions {
            unique_key: Some(job_id.to_string()),
            timeout: SCRAPE_TIMEOUT,
            ..Default::default()
        };

        self.enqueue(payload, options).await
    }

    /// Enqueue an `extract:links` task.
    pub async fn enqueue_extract_links(
        &self,
        parent_job_id: i64,
        source_url: String,
        parent_depth: i32,
        trace_context: Option<TraceContext>,
    ) -> Result<i64> {
        let (trace_id, span_id) = split(trace_context);
        let payload = TaskPayload::ExtractLinks(ExtractLinksTaskPayload {
            parent_job_id,
            source_url,
            parent_depth,
            trace_id,
            span_id,
            enqueued_at: Self::enqueued_at_now(),
        });

        let options = EnqueueOptions {
            process_in: Some(EXTRACT_LINKS_DELAY),
            timeout: EXTRACT_LINKS_TIMEOUT,
            ..Default::default()
        };

        self.enqueue(payload, options).await
    }

    /// Enqueue a `retrieve:analysis` task.
    pub async fn enqueue_retrieve_analysis(
        &self,
        request_id: i64,
        analysis_job_id: String,
        attempt_count: i32,
        trace_context: Option<TraceContext>,
    ) -> Result<i64> {
        let (trace_id, span_id) = split(trace_context);
        let payload = TaskPayload::RetrieveAnalysis(RetrieveAnalysisTaskPayload {
            request_id,
            analysis_job_id,
            attempt_count,
            trace_id,
            span_id,
            enqueued_at: Self::enqueued_at_now(),
        });

        let options = EnqueueOptions { timeout: RETRIEVE_ANALYSIS_TIMEOUT, ..Default::default() };
        self.enqueue(payload, options).await
    }

    async fn enqueue(&self, mut payload: TaskPayload, options: EnqueueOptions) -> Result<i64> {
        if payload.trace_context().is_none() {
            if let Some(ctx) = crate::trace::context_from_current_span() {
                payload.set_trace_context(ctx);
            }
        }

        let queue = payload.queue_name();
        let task_type = payload.type_name();
        let value = serde_json::to_value(&payload).map_err(|e| anyhow::anyhow!(e))?;
        let task_id = self.queue.enqueue(queue, task_type, value, options).await?;

        tracing::info!(task_id, queue, task_type, "task_enqueued");

        Ok(task_id)
    }
}

fn split(trace_context: Option<TraceContext>) -> (Option<String>, Option<String>) {
    match trace_context {
        Some(ctx) => (Some(ctx.trace_id), Some(ctx.span_id)),
        None => (None, None),
    }
}
