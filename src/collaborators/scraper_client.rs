//! `ScraperClient`: typed HTTP access to the Scraper service (§6), in the same `reqwest::Client`
//! builder style as the teacher's `BannerApi::new`.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::collaborators::models::{ExtractLinksRequest, ExtractLinksResponse, Score, ScoreRequest, ScoreResponse, ScrapeRequest, ScrapeResponse};
use crate::error::{AppError, Result};

/// The Scraper collaborator, trait-ized so `pipeline::scrape_handler` can run against a fake in
/// tests without a live HTTP server (no mocking crate is in this stack — see `ScraperClient` test
/// doubles alongside each handler's tests).
#[async_trait]
pub trait ScraperClient: Send + Sync {
    async fn score(&self, url: &str) -> Result<Score>;
    async fn scrape(&self, url: &str) -> Result<ScrapeResponse>;
    async fn extract_links(&self, url: &str) -> Result<Vec<String>>;
}

pub struct HttpScraperClient {
    client: Client,
    base_url: String,
}

impl HttpScraperClient {
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent("ingestor/1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(AppError::TransientRemote)?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl ScraperClient for HttpScraperClient {
    async fn score(&self, url: &str) -> Result<Score> {
        let response = self
            .client
            .post(format!("{}/api/score", self.base_url))
            .json(&ScoreRequest { url })
            .send()
            .await
            .map_err(AppError::TransientRemote)?
            .error_for_status()
            .map_err(AppError::TransientRemote)?
            .json::<ScoreResponse>()
            .await
            .map_err(AppError::TransientRemote)?;

        Ok(response.score)
    }

    async fn scrape(&self, url: &str) -> Result<ScrapeResponse> {
        let response = self
            .client
            .post(format!("{}/api/scrape", self.base_url))
            .json(&ScrapeRequest { url })
            .send()
            .await
            .map_err(AppError::TransientRemote)?
            .error_for_status()
            .map_err(AppError::TransientRemote)?
            .json::<ScrapeResponse>()
            .await
            .map_err(AppError::TransientRemote)?;

        Ok(response)
    }

    async fn extract_links(&self, url: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .post(format!("{}/api/extract-links", self.base_url))
            .json(&ExtractLinksRequest { url })
            .send()
            .await
            .map_err(AppError::TransientRemote)?
            .error_for_status()
            .map_err(AppError::TransientRemote)?
            .json::<ExtractLinksResponse>()
            .await
            .map_err(AppError::TransientRemote)?;

        Ok(response.links)
    }
}
