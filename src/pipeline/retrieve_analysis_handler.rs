//! `RetrieveAnalysisHandler` (§4.5): poll the TextAnalyzer and merge its result into a `Request`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::collaborators::TextAnalyzerClient;
use crate::domain::quality::quality_score_tombstone;
use crate::domain::request::merge_tags_case_insensitive;
use crate::domain::tasks::{RetrieveAnalysisTaskPayload, TaskPayload};
use crate::error::{AppError, Result};
use crate::store::Store;
use crate::worker::handler::Handler;

pub struct RetrieveAnalysisHandler {
    store: Store,
    analyzer: Arc<dyn TextAnalyzerClient>,
    /// `None` means unlimited (§4.5's "0 = unlimited").
    max_analysis_wait: Option<Duration>,
}

impl RetrieveAnalysisHandler {
    pub fn new(store: Store, analyzer: Arc<dyn TextAnalyzerClient>, max_analysis_wait: Option<Duration>) -> Self {
        Self {
            store,
            analyzer,
            max_analysis_wait,
        }
    }

    async fn handle_retrieve(&self, p: &RetrieveAnalysisTaskPayload, enqueued_at: i64) -> Result<()> {
        let request = self.store.requests().get(p.request_id).await?;
        let Some(request) = request else {
            info!(request_id = p.request_id, "request not found, dropping analysis retrieval");
            return Ok(());
        };

        if let Some(max_wait) = self.max_analysis_wait {
            let now_nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
            let elapsed = Duration::from_nanos((now_nanos - enqueued_at).max(0) as u64);
            if elapsed > max_wait {
                let mut metadata = request.metadata.clone();
                metadata["analysis_retrieval_timeout"] = json!(true);
                metadata["analysis_retrieval_elapsed_minutes"] = json!(elapsed.as_secs() / 60);
                self.store.requests().update_metadata(p.request_id, metadata).await?;
                return Ok(());
            }
        }

        let status = self.analyzer.get_result(&p.analysis_job_id).await?;

        if status.status != "completed" {
            return Err(AppError::NotReady("analysis".to_string()));
        }

        let Some(result) = status.result else {
            return Err(AppError::NotReady("analysis".to_string()));
        };

        let mut metadata = request.metadata.clone();
        metadata["analyzer_metadata"] = json!({
            "cleaned_text": result.cleaned_text,
            "heuristic_cleaned_text": result.heuristic_cleaned_text,
            "synopsis": result.synopsis,
            "quality_score": result.quality_score.score,
        });

        let now = Utc::now();
        let mut seo_enabled = request.seo_enabled;
        if let Some(decision) = quality_score_tombstone(result.quality_score.score, now) {
            metadata["tombstone_datetime"] = json!(decision.tombstone_datetime.to_rfc3339());
            metadata["tombstone_reason"] = json!(decision.reason);
            seo_enabled = decision.seo_enabled;
        }

        // Metadata is a full-row rewrite, so it must land before the tag merge below: that call's
        // own auto-tombstone-tag policy (§4.7) writes directly against the persisted row and would
        // otherwise be clobbered by this wholesale replace.
        self.store.requests().update_metadata(p.request_id, metadata).await?;
        if seo_enabled != request.seo_enabled {
            self.store.requests().update_seo_enabled(p.request_id, seo_enabled).await?;
        }

        let mut tags = request.tags.clone();
        if merge_tags_case_insensitive(&mut tags, &result.tags) {
            self.store.requests().update_tags(p.request_id, tags).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Handler for RetrieveAnalysisHandler {
    async fn handle(&self, payload: &TaskPayload) -> Result<()> {
        let TaskPayload::RetrieveAnalysis(p) = payload else {
            return Err(AppError::InputInvalid("expected a retrieve:analysis payload".to_string()));
        };
        let enqueued_at = payload.enqueued_at_nanos();
        self.handle_retrieve(p, enqueued_at).await
    }
}
