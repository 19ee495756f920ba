//! The worker pool (§4.2): fixed concurrency over the shared broker, dispatching by task type and
//! honoring graceful shutdown. Modeled on `scraper::mod::ScraperService`'s pool-of-tasks-plus-
//! internal-broadcast-channel shape and `scraper::worker::Worker::run`'s poll loop.

pub mod handler;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::domain::tasks::TaskPayload;
use crate::queue::weights::WeightedQueueCursor;
use crate::queue::{retry, QueueBackend};
use handler::HandlerRegistry;

/// How long a worker sleeps after an empty poll cycle across every queue.
const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long shutdown waits for an in-flight task before abandoning the worker's handle.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// A single polling loop. `WorkerPool` owns `concurrency` of these.
pub struct Worker {
    id: usize,
    queue: Arc<dyn QueueBackend>,
    registry: HandlerRegistry,
}

impl Worker {
    pub fn new(id: usize, queue: Arc<dyn QueueBackend>, registry: HandlerRegistry) -> Self {
        Self { id, queue, registry }
    }

    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let locked_by = format!("worker-{}", self.id);
        let mut cursor = WeightedQueueCursor::new();
        info!(worker_id = self.id, "worker started");

        loop {
            let cycle = cursor.next_cycle();
            let mut dispatched = false;

            for queue_name in cycle {
                match self.queue.dispatch(&[queue_name], &locked_by).await {
                    Ok(Some(task)) => {
                        dispatched = true;
                        self.process_task(task, &mut shutdown_rx).await;
                        break;
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(worker_id = self.id, error = ?e, queue = queue_name, "failed to poll queue");
                    }
                }
            }

            if !dispatched {
                trace!(worker_id = self.id, "no tasks available, waiting");
                tokio::select! {
                    _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
                    _ = shutdown_rx.recv() => break,
                }
            }

            if matches!(shutdown_rx.try_recv(), Ok(()) | Err(broadcast::error::TryRecvError::Closed)) {
                break;
            }
        }

        info!(worker_id = self.id, "worker exiting");
    }

    async fn process_task(&self, task: crate::queue::Task, shutdown_rx: &mut broadcast::Receiver<()>) {
        let payload: TaskPayload = match serde_json::from_value(task.payload.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                error!(worker_id = self.id, task_id = task.id, error = %e, "malformed task payload");
                let _ = self.queue.abandon(task.id, &format!("malformed payload: {e}")).await;
                return;
            }
        };

        let enqueued_at = payload.enqueued_at_nanos();
        let now_nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let queue_wait = Duration::from_nanos((now_nanos - enqueued_at).max(0) as u64);

        let span = crate::trace::open_task_span(&task.task_type, payload.trace_context().as_ref(), queue_wait, enqueued_at);
        let _entered = span.enter();

        debug!(worker_id = self.id, task_id = task.id, queue = %task.queue, "dispatching task");

        let timeout = Duration::from_secs(task.timeout_seconds.max(0) as u64);
        let outcome = tokio::select! {
            result = tokio::time::timeout(timeout, self.registry.dispatch(&task.task_type, &payload)) => result,
            _ = shutdown_rx.recv() => {
                warn!(worker_id = self.id, task_id = task.id, "shutdown during handler, releasing task for redelivery");
                let _ = self.queue.release(task.id).await;
                return;
            }
        };

        match outcome {
            Ok(Ok(())) => {
                if let Err(e) = self.queue.complete(task.id).await {
                    error!(worker_id = self.id, task_id = task.id, error = ?e, "failed to mark task complete");
                }
            }
            Ok(Err(app_err)) => {
                self.record_failure(&task, &app_err.to_string(), app_err.is_retryable()).await;
            }
            Err(_elapsed) => {
                self.record_failure(&task, "task timed out", true).await;
            }
        }
    }

    async fn record_failure(&self, task: &crate::queue::Task, message: &str, retryable: bool) {
        error!(worker_id = self.id, task_id = task.id, error = message, retryable, "task failed");

        let result = if retryable {
            let attempt = (task.attempts).max(1) as u32;
            let delay = if task.queue == "analysis-retrieval" {
                retry::analysis_retrieval_delay(attempt)
            } else {
                retry::broker_retry_delay(attempt)
            };
            self.queue.fail(task.id, message, delay).await
        } else {
            self.queue.abandon(task.id, message).await
        };

        if let Err(e) = result {
            error!(worker_id = self.id, task_id = task.id, error = ?e, "failed to record task failure");
        }
    }
}

/// Owns the fixed-size fleet of [`Worker`]s and their shared shutdown fan-out, the way
/// `ScraperService` owns its scheduler and worker `JoinHandle`s.
pub struct WorkerPool {
    queue: Arc<dyn QueueBackend>,
    registry: HandlerRegistry,
    concurrency: usize,
    worker_handles: Vec<JoinHandle<()>>,
    shutdown_tx: Option<broadcast::Sender<()>>,
}

impl WorkerPool {
    pub fn new(queue: Arc<dyn QueueBackend>, registry: HandlerRegistry, concurrency: usize) -> Self {
        Self {
            queue,
            registry,
            concurrency,
            worker_handles: Vec::new(),
            shutdown_tx: None,
        }
    }

    pub async fn start(&mut self) {
        let (shutdown_tx, _) = broadcast::channel(1);
        self.shutdown_tx = Some(shutdown_tx.clone());

        for id in 0..self.concurrency {
            let worker = Worker::new(id, self.queue.clone(), self.registry.clone());
            let shutdown_rx = shutdown_tx.subscribe();
            let handle = tokio::spawn(async move {
                worker.run(shutdown_rx).await;
            });
            self.worker_handles.push(handle);
        }

        info!(concurrency = self.concurrency, "worker pool started");
    }

    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        info!("shutting down worker pool");

        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            warn!("worker pool shutdown called before start");
            return Ok(());
        };
        let _ = shutdown_tx.send(());

        let handles = std::mem::take(&mut self.worker_handles);
        let results = tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(handles)).await;

        match results {
            Ok(results) => {
                let failed = results.iter().filter(|r| r.is_err()).count();
                if failed > 0 {
                    warn!(failed_count = failed, "some workers panicked during shutdown");
                    return Err(anyhow::anyhow!("{failed} worker(s) panicked"));
                }
                info!("all workers shut down gracefully");
                Ok(())
            }
            Err(_) => {
                warn!("workers did not exit within {SHUTDOWN_GRACE:?}, abandoning");
                Err(anyhow::anyhow!("worker pool shutdown timed out"))
            }
        }
    }
}
