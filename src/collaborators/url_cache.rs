//! Best-effort URL → scraper-document-id cache (§4.3 step 9, §5). Out of scope as a production
//! algorithm (§1) — this is a thin `DashMap`-backed TTL map in the same style as
//! [`crate::status::ServiceStatusRegistry`], not a distributed cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

struct Entry {
    scraper_document_id: String,
    inserted_at: Instant,
}

/// Default TTL (§4.3 step 9): 30 days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

#[derive(Clone)]
pub struct UrlCache {
    inner: Arc<DashMap<String, Entry>>,
    ttl: Duration,
}

impl UrlCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Last-writer-wins; no locking needed (§5).
    pub fn set(&self, url: &str, scraper_document_id: &str) {
        self.inner.insert(
            url.to_string(),
            Entry {
                scraper_document_id: scraper_document_id.to_string(),
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, url: &str) -> Option<String> {
        let entry = self.inner.get(url)?;
        if entry.inserted_at.elapsed() > self.ttl {
            drop(entry);
            self.inner.remove(url);
            return None;
        }
        Some(entry.scraper_document_id.clone())
    }
}

impl Default for UrlCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
