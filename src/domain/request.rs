//! The `Request` content record (§3) and the pure functions that govern its invariants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a `Request`'s content originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "source_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Url,
    Text,
}

/// A persisted content record — the outcome of one ingestion.
///
/// `metadata` is a nested key→value tree rather than a fixed struct because the Scraper and
/// TextAnalyzer collaborators are free to attach arbitrary nested fields (`scraper_metadata`,
/// `analyzer_metadata`, …); only the keys this crate reads or writes are named, everything else
/// passes through untouched.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Request {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub effective_date: DateTime<Utc>,
    pub source_type: SourceType,
    pub source_url: Option<String>,
    pub scraper_uuid: Option<String>,
    pub analyzer_job_id: Option<String>,
    #[sqlx(json)]
    pub tags: Vec<String>,
    #[sqlx(json)]
    pub metadata: Value,
    pub slug: Option<String>,
    pub seo_enabled: bool,
}

/// Derive `effective_date` from the first valid value in the metadata lookup chain (§3), falling
/// back to `created_at` if none of the candidate keys hold a parseable timestamp.
///
/// Lookup order: `scraper_metadata.publish_date` → `scraper_metadata.published_date` →
/// `additional_metadata.publish_date` → `additional_metadata.published_date` → `date` →
/// `created_at`.
pub fn derive_effective_date(metadata: &Value, created_at: DateTime<Utc>) -> DateTime<Utc> {
    const CANDIDATES: &[&[&str]] = &[
        &["scraper_metadata", "publish_date"],
        &["scraper_metadata", "published_date"],
        &["additional_metadata", "publish_date"],
        &["additional_metadata", "published_date"],
        &["date"],
    ];

    for path in CANDIDATES {
        if let Some(dt) = lookup_path(metadata, path).and_then(parse_timestamp) {
            return dt;
        }
    }

    created_at
}

fn lookup_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?;
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Normalize a tag for case-insensitive comparison without altering its stored case.
pub fn tag_key(tag: &str) -> String {
    tag.to_lowercase()
}

/// Append a batch of newly-discovered tags to an existing ordered tag list, skipping any that
/// already exist case-insensitively. Case of genuinely new tags is preserved (§4.5 tag merge).
///
/// Returns `true` if the tag list was actually mutated.
pub fn merge_tags_case_insensitive(existing: &mut Vec<String>, candidates: &[String]) -> bool {
    let mut seen: std::collections::HashSet<String> =
        existing.iter().map(|t| tag_key(t)).collect();
    let mut mutated = false;
    for candidate in candidates {
        let key = tag_key(candidate);
        if seen.insert(key) {
            existing.push(candidate.clone());
            mutated = true;
        }
    }
    mutated
}

/// Build the initial tag list for a scraped Request: normalized category tags, the URL's domain,
/// and the literal `scrape` tag, deduplicated case-insensitively in first-seen order.
pub fn build_scrape_tags(categories: &[String], domain: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    merge_tags_case_insensitive(&mut tags, categories);
    merge_tags_case_insensitive(&mut tags, std::slice::from_ref(&domain.to_string()));
    merge_tags_case_insensitive(&mut tags, &["scrape".to_string()]);
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn created_at() -> DateTime<Utc> {
        "2026-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn effective_date_falls_back_to_created_at() {
        let metadata = json!({});
        assert_eq!(derive_effective_date(&metadata, created_at()), created_at());
    }

    #[test]
    fn effective_date_prefers_scraper_metadata_publish_date() {
        let metadata = json!({
            "scraper_metadata": { "publish_date": "2025-06-01T00:00:00Z" },
            "date": "2025-01-01T00:00:00Z",
        });
        let expected: DateTime<Utc> = "2025-06-01T00:00:00Z".parse().unwrap();
        assert_eq!(derive_effective_date(&metadata, created_at()), expected);
    }

    #[test]
    fn effective_date_falls_through_chain_on_unparseable_values() {
        let metadata = json!({
            "scraper_metadata": { "publish_date": "not-a-date" },
            "additional_metadata": { "published_date": "2024-03-04T05:06:07Z" },
        });
        let expected: DateTime<Utc> = "2024-03-04T05:06:07Z".parse().unwrap();
        assert_eq!(derive_effective_date(&metadata, created_at()), expected);
    }

    #[test]
    fn effective_date_uses_top_level_date_last_before_created_at() {
        let metadata = json!({ "date": "2023-09-09T09:09:09Z" });
        let expected: DateTime<Utc> = "2023-09-09T09:09:09Z".parse().unwrap();
        assert_eq!(derive_effective_date(&metadata, created_at()), expected);
    }

    #[test]
    fn merge_tags_is_case_insensitive_and_preserves_new_case() {
        let mut tags = vec!["scrape".to_string(), "domain-example".to_string()];
        let mutated = merge_tags_case_insensitive(
            &mut tags,
            &["Programming".to_string(), "GOLANG".to_string(), "TuToRiAl".to_string()],
        );
        assert!(mutated);
        assert_eq!(
            tags,
            vec!["scrape", "domain-example", "Programming", "GOLANG", "TuToRiAl"]
        );
    }

    #[test]
    fn merge_tags_no_mutation_when_all_duplicates() {
        let mut tags = vec!["scrape".to_string(), "Programming".to_string()];
        let mutated = merge_tags_case_insensitive(&mut tags, &["programming".to_string()]);
        assert!(!mutated);
        assert_eq!(tags, vec!["scrape", "Programming"]);
    }

    #[test]
    fn build_scrape_tags_dedups_domain_against_category() {
        let tags = build_scrape_tags(
            &["Technical".to_string(), "example.com".to_string()],
            "example.com",
        );
        assert_eq!(tags, vec!["Technical", "example.com", "scrape"]);
    }
}
