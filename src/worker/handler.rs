//! The handler registry: dispatches a [`Task`](crate::queue::Task) by its `task_type` (§4.2).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::tasks::TaskPayload;
use crate::error::{AppError, Result};

/// One task-type handler. Implementors do the actual pipeline work (§4.3-4.5); the worker loop
/// only owns dispatch, timing, tracing, and retry bookkeeping.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, payload: &TaskPayload) -> Result<()>;
}

/// Maps a `task_type` string to its [`Handler`]. Unregistered types fail permanently rather than
/// panicking — a malformed or future producer shouldn't wedge the whole worker pool.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task_type: &'static str, handler: Arc<dyn Handler>) {
        self.handlers.insert(task_type, handler);
    }

    pub async fn dispatch(&self, task_type: &str, payload: &TaskPayload) -> Result<()> {
        match self.handlers.get(task_type) {
            Some(handler) => handler.handle(payload).await,
            None => Err(AppError::InputInvalid(format!("no handler registered for task type '{task_type}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tasks::ExtractLinksTaskPayload;

    struct AlwaysOk;

    #[async_trait]
    impl Handler for AlwaysOk {
        async fn handle(&self, _payload: &TaskPayload) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn unregistered_task_type_fails_permanently() {
        let registry = HandlerRegistry::new();
        let payload = TaskPayload::ExtractLinks(ExtractLinksTaskPayload {
            parent_job_id: 1,
            source_url: "https://example.com".to_string(),
            parent_depth: 0,
            trace_id: None,
            span_id: None,
            enqueued_at: 0,
        });

        let err = registry.dispatch("extract:links", &payload).await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn registered_task_type_dispatches() {
        let mut registry = HandlerRegistry::new();
        registry.register("extract:links", Arc::new(AlwaysOk));
        let payload = TaskPayload::ExtractLinks(ExtractLinksTaskPayload {
            parent_job_id: 1,
            source_url: "https://example.com".to_string(),
            parent_depth: 0,
            trace_id: None,
            span_id: None,
            enqueued_at: 0,
        });

        registry.dispatch("extract:links", &payload).await.unwrap();
    }
}
