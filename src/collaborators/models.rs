//! Wire shapes for the Scraper and TextAnalyzer collaborators (§6).

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct ScoreRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreResponse {
    pub url: String,
    pub score: Score,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Score {
    pub score: f64,
    pub reason: String,
    #[serde(default)]
    pub categories: Vec<String>,
    pub is_recommended: bool,
    #[serde(default)]
    pub malicious_indicators: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeResponse {
    pub id: String,
    pub url: String,
    pub title: String,
    pub content: String,
    pub raw_text: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub images: Vec<ScrapedImage>,
    #[serde(default)]
    pub score: Option<Score>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScrapedImage {
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractLinksRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractLinksResponse {
    pub url: String,
    #[serde(default)]
    pub links: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_html: Option<String>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    pub job_id: String,
    #[serde(default)]
    pub task_id: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisStatusResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<AnalysisResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub tags: Vec<String>,
    pub synopsis: String,
    pub cleaned_text: String,
    pub heuristic_cleaned_text: String,
    pub quality_score: QualityScore,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualityScore {
    pub score: f64,
}
