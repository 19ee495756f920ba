//! Wraps `worker::WorkerPool` as a `Service`, grounded on `scraper::mod::ScraperService`'s own
//! pattern of reporting into the shared `ServiceStatusRegistry` around an internal pool.

use crate::services::Service;
use crate::status::{ServiceStatus, ServiceStatusRegistry};
use crate::worker::WorkerPool;
use tracing::info;

pub struct WorkerPoolService {
    pool: WorkerPool,
    service_statuses: ServiceStatusRegistry,
}

impl WorkerPoolService {
    pub fn new(pool: WorkerPool, service_statuses: ServiceStatusRegistry) -> Self {
        Self { pool, service_statuses }
    }
}

#[async_trait::async_trait]
impl Service for WorkerPoolService {
    fn name(&self) -> &'static str {
        "worker_pool"
    }

    async fn run(&mut self) -> Result<(), anyhow::Error> {
        self.pool.start().await;
        self.service_statuses.set("worker_pool", ServiceStatus::Active);
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        self.service_statuses.set("worker_pool", ServiceStatus::Disabled);
        info!("shutting down worker pool service");
        self.pool.shutdown().await
    }
}
