//! Wire shapes for the three task payload families (§3, §6).
//!
//! These are deliberately flat, strongly-typed structs rather than the untyped JSON blobs the
//! upstream system used. The `task_type` is carried by the broker's own `tasks.task_type` column,
//! not duplicated inside the stored payload — `tasks.payload` is the variant's fields, bit-exact
//! and un-nested (§6). [`TaskPayload::type_name`]/[`TaskPayload::queue_name`] are what the queue
//! backend stores in that column and what the worker pool's handler registry dispatches on; §9's
//! "tagged variants at the JSON edge" note is about AI tag lists, not this wire format.

use serde::{Deserialize, Serialize};

/// Distributed trace identity carried across the queue boundary (§4.6).
///
/// Both fields are lowercase hex strings. They travel together or not at all: a payload either
/// carries a full trace context or none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
}

/// Payload for a `scrape:url` task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapeTaskPayload {
    pub job_id: i64,
    pub url: String,
    pub extract_links: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_job_id: Option<i64>,
    pub depth: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub span_id: Option<String>,
    pub enqueued_at: i64,
}

/// Payload for an `extract:links` task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractLinksTaskPayload {
    pub parent_job_id: i64,
    pub source_url: String,
    pub parent_depth: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub span_id: Option<String>,
    pub enqueued_at: i64,
}

/// Payload for a `retrieve:analysis` task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrieveAnalysisTaskPayload {
    pub request_id: i64,
    pub analysis_job_id: String,
    pub attempt_count: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub span_id: Option<String>,
    pub enqueued_at: i64,
}

/// A task payload of any of the three known families.
///
/// Stored flat in `tasks.payload` — no wrapper tag or nesting. The three variants' required
/// field names never overlap (`job_id`/`url`/`extract_links`/`depth` vs. `parent_job_id`/
/// `source_url`/`parent_depth` vs. `request_id`/`analysis_job_id`/`attempt_count`), so untagged
/// deserialization picks the right variant unambiguously from the row's own `task_type` context
/// — the queue backend routes dispatch to a handler keyed on `task_type`, which then knows which
/// variant to expect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TaskPayload {
    ScrapeUrl(ScrapeTaskPayload),
    ExtractLinks(ExtractLinksTaskPayload),
    RetrieveAnalysis(RetrieveAnalysisTaskPayload),
}

impl TaskPayload {
    /// The queue name this payload is routed to (§4.1).
    pub fn queue_name(&self) -> &'static str {
        match self {
            TaskPayload::ScrapeUrl(_) => "scrape",
            TaskPayload::ExtractLinks(_) => "link-extraction",
            TaskPayload::RetrieveAnalysis(_) => "analysis-retrieval",
        }
    }

    /// The string stored in the `tasks.task_type` column.
    pub fn type_name(&self) -> &'static str {
        match self {
            TaskPayload::ScrapeUrl(_) => "scrape:url",
            TaskPayload::ExtractLinks(_) => "extract:links",
            TaskPayload::RetrieveAnalysis(_) => "retrieve:analysis",
        }
    }

    pub fn trace_context(&self) -> Option<TraceContext> {
        let (trace_id, span_id) = match self {
            TaskPayload::ScrapeUrl(p) => (&p.trace_id, &p.span_id),
            TaskPayload::ExtractLinks(p) => (&p.trace_id, &p.span_id),
            TaskPayload::RetrieveAnalysis(p) => (&p.trace_id, &p.span_id),
        };
        match (trace_id, span_id) {
            (Some(trace_id), Some(span_id)) => Some(TraceContext {
                trace_id: trace_id.clone(),
                span_id: span_id.clone(),
            }),
            _ => None,
        }
    }

    pub fn enqueued_at_nanos(&self) -> i64 {
        match self {
            TaskPayload::ScrapeUrl(p) => p.enqueued_at,
            TaskPayload::ExtractLinks(p) => p.enqueued_at,
            TaskPayload::RetrieveAnalysis(p) => p.enqueued_at,
        }
    }

    /// Fill in a trace identity on a payload that was built without one (§4.6 enqueue-side
    /// minting). No-op if the payload already carries trace fields.
    pub fn set_trace_context(&mut self, ctx: TraceContext) {
        let (trace_id, span_id) = match self {
            TaskPayload::ScrapeUrl(p) => (&mut p.trace_id, &mut p.span_id),
            TaskPayload::ExtractLinks(p) => (&mut p.trace_id, &mut p.span_id),
            TaskPayload::RetrieveAnalysis(p) => (&mut p.trace_id, &mut p.span_id),
        };
        *trace_id = Some(ctx.trace_id);
        *span_id = Some(ctx.span_id);
    }
}
