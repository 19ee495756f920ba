//! Typed HTTP clients for the Scraper and TextAnalyzer collaborators, plus the best-effort URL
//! cache (§1, §6).

pub mod analyzer_client;
pub mod models;
pub mod scraper_client;
pub mod url_cache;

pub use analyzer_client::{HttpTextAnalyzerClient, TextAnalyzerClient};
pub use scraper_client::{HttpScraperClient, ScraperClient};
pub use url_cache::UrlCache;
