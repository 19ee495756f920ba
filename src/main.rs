use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use ingestor::cli::Args;
use ingestor::collaborators::{HttpScraperClient, HttpTextAnalyzerClient, UrlCache};
use ingestor::config::Config;
use ingestor::enqueuer::Enqueuer;
use ingestor::logging::setup_logging;
use ingestor::pipeline::{extract_links_handler::ExtractLinksHandler, retrieve_analysis_handler::RetrieveAnalysisHandler, scrape_handler::ScrapeHandler};
use ingestor::queue::PostgresQueue;
use ingestor::services::manager::ServiceManager;
use ingestor::services::worker_pool::WorkerPoolService;
use ingestor::signals::handle_shutdown_signals;
use ingestor::status::ServiceStatusRegistry;
use ingestor::store::{Store, TombstonePeriods};
use ingestor::worker::handler::HandlerRegistry;
use ingestor::worker::WorkerPool;

use figment::value::UncasedStr;
use figment::{Figment, providers::Env};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config: Config = Figment::new()
        .merge(Env::raw().map(|k| {
            if k == UncasedStr::new("RAILWAY_DEPLOYMENT_DRAINING_SECONDS") {
                "SHUTDOWN_TIMEOUT".into()
            } else {
                k.into()
            }
        }))
        .extract()
        .expect("Failed to load config");

    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) { "development" } else { "production" },
        "starting ingestor"
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("Failed to create database pool");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations");

    info!(
        worker_concurrency = config.worker_concurrency,
        shutdown_timeout = format!("{:.2?}", config.shutdown_timeout),
        scraper_base_url = config.scraper_base_url,
        analyzer_base_url = config.analyzer_base_url,
        "configuration loaded"
    );

    let tombstone_periods = TombstonePeriods {
        low_score_days: config.tombstone_periods.low_score_days,
        tag_days: config.tombstone_periods.tag_days,
        manual_days: config.tombstone_periods.manual_days,
    };
    let store = Store::new(db_pool.clone(), tombstone_periods, config.tombstone_tags.clone());

    let queue = Arc::new(PostgresQueue::new(db_pool.clone()));
    let enqueuer = Enqueuer::new(queue.clone());

    let scraper: Arc<dyn ingestor::collaborators::ScraperClient> =
        Arc::new(HttpScraperClient::new(config.scraper_base_url.clone()).expect("failed to build scraper client"));
    let analyzer: Arc<dyn ingestor::collaborators::TextAnalyzerClient> =
        Arc::new(HttpTextAnalyzerClient::new(config.analyzer_base_url.clone()).expect("failed to build analyzer client"));
    let url_cache = UrlCache::new(ingestor::collaborators::url_cache::DEFAULT_TTL);

    let service_statuses = ServiceStatusRegistry::new();

    let max_analysis_wait = if config.max_analysis_wait.is_zero() {
        None
    } else {
        Some(config.max_analysis_wait)
    };

    let mut registry = HandlerRegistry::new();
    registry.register(
        "scrape:url",
        Arc::new(ScrapeHandler::new(
            store.clone(),
            enqueuer.clone(),
            scraper.clone(),
            analyzer.clone(),
            url_cache.clone(),
            config.link_score_threshold,
            config.max_link_depth,
        )),
    );
    registry.register(
        "extract:links",
        Arc::new(ExtractLinksHandler::new(store.clone(), enqueuer.clone(), scraper.clone(), config.max_link_depth)),
    );
    registry.register(
        "retrieve:analysis",
        Arc::new(RetrieveAnalysisHandler::new(store.clone(), analyzer.clone(), max_analysis_wait)),
    );

    let worker_pool = WorkerPool::new(queue.clone(), registry, config.worker_concurrency);
    let worker_pool_service = Box::new(WorkerPoolService::new(worker_pool, service_statuses.clone()));

    let mut service_manager = ServiceManager::new();
    service_manager.register_service("worker_pool", worker_pool_service);
    service_manager.spawn_all();

    handle_shutdown_signals(service_manager, config.shutdown_timeout).await
}
