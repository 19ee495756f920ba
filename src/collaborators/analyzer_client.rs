//! `TextAnalyzerClient`: typed HTTP access to the TextAnalyzer service (§6).

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::collaborators::models::{AnalysisStatusResponse, AnalyzeRequest, AnalyzeResponse};
use crate::error::{AppError, Result};

#[async_trait]
pub trait TextAnalyzerClient: Send + Sync {
    async fn enqueue_analysis(
        &self,
        content: &str,
        compressed_html: Option<&str>,
        image_urls: Vec<String>,
    ) -> Result<String>;

    async fn get_result(&self, analysis_job_id: &str) -> Result<AnalysisStatusResponse>;
}

pub struct HttpTextAnalyzerClient {
    client: Client,
    base_url: String,
}

impl HttpTextAnalyzerClient {
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
impl TextAnalyzerClient for HttpTextAnalyzerClient {
    async fn enqueue_analysis(
        &self,
        content: &str,
        compressed_html: Option<&str>,
        image_urls: Vec<String>,
    ) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/api/analyze", self.base_url))
            .json(&AnalyzeRequest {
                content: content.to_string(),
                compressed_html: compressed_html.map(|s| s.to_string()),
                images: image_urls,
            })
            .send()
            .await
            .map_err(AppError::TransientRemote)?
            .error_for_status()
            .map_err(AppError::TransientRemote)?
            .json::<AnalyzeResponse>()
            .await
            .map_err(AppError::TransientRemote)?;

        Ok(response.job_id)
    }

    async fn get_result(&self, analysis_job_id: &str) -> Result<AnalysisStatusResponse> {
        let response = self
            .client
            .get(format!("{}/api/analysis/{}", self.base_url, analysis_job_id))
            .send()
            .await
            .map_err(AppError::TransientRemote)?
            .error_for_status()
            .map_err(AppError::TransientRemote)?
            .json::<AnalysisStatusResponse>()
            .await
            .map_err(AppError::TransientRemote)?;

        Ok(response)
    }
}
