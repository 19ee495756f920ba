//! `ScrapeJob`: pipeline bookkeeping for one scrape attempt, distinct from the `Request` it may
//! eventually produce (§3). Modeled on the teacher's `ScrapeJob`/`ScrapeStatus` pair in
//! `data/models.rs`, with the university-scrape-specific fields replaced by this crate's own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "scrape_job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScrapeJobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScrapeJob {
    pub id: i64,
    pub url: String,
    pub extract_links: bool,
    pub status: ScrapeJobStatus,
    pub retries: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub result_request_id: Option<i64>,
    pub task_id: Option<String>,
    pub parent_job_id: Option<i64>,
    pub depth: i32,
}

/// Parameters for creating a new `ScrapeJob` row, before it has a broker task id or outcome.
#[derive(Debug, Clone)]
pub struct NewScrapeJob {
    pub url: String,
    pub extract_links: bool,
    pub parent_job_id: Option<i64>,
    pub depth: i32,
}

impl NewScrapeJob {
    pub fn root(url: impl Into<String>, extract_links: bool) -> Self {
        Self {
            url: url.into(),
            extract_links,
            parent_job_id: None,
            depth: 0,
        }
    }

    /// A child job discovered by `ExtractLinksHandler` (§4.4 step 4).
    pub fn child(url: impl Into<String>, parent_job_id: i64, child_depth: i32, max_link_depth: i32) -> Self {
        Self {
            url: url.into(),
            extract_links: child_depth < max_link_depth,
            parent_job_id: Some(parent_job_id),
            depth: child_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_job_extract_links_flag_respects_max_depth() {
        let shallow = NewScrapeJob::child("https://example.com/a", 1, 2, 5);
        assert!(shallow.extract_links);
        assert_eq!(shallow.depth, 2);

        let at_limit = NewScrapeJob::child("https://example.com/b", 1, 5, 5);
        assert!(!at_limit.extract_links);
    }

    #[test]
    fn root_job_has_no_parent_and_zero_depth() {
        let job = NewScrapeJob::root("https://example.com", true);
        assert_eq!(job.parent_job_id, None);
        assert_eq!(job.depth, 0);
    }
}
