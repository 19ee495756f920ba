//! Pure content-quality gating rules (§4.3, §4.4, §4.5, §4.7): threshold gating, image bypass,
//! link filtering, and the tombstone policies. None of these touch the database or network —
//! they take values in, and return a decision, the same shape as `scraper::adaptive::evaluate`'s
//! pure classification functions in the teacher.

use chrono::{DateTime, Duration, Utc};

/// The category name that bypasses the link-score threshold entirely (§4.3 step 3).
pub const IMAGE_CATEGORY: &str = "image";

/// Default auto-tombstone tag set (§4.7), used when configuration supplies none.
pub const DEFAULT_TOMBSTONE_TAGS: &[&str] = &["low-quality", "sparse-content"];

/// URL schemes other than `http`/`https` that `ExtractLinksHandler` must drop (§4.4 step 2).
const SKIPPED_SCHEMES: &[&str] = &[
    "mailto", "tel", "javascript", "data", "file", "about", "blob", "ftp",
];

/// Image file extensions `ExtractLinksHandler` treats as non-crawlable (§4.4 step 2, §8 bit-exact
/// testable property — exactly these eight, no more).
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "png", "gif", "webp", "svg", "bmp", "ico", "tiff"];

/// Does `categories` contain the image bypass category?
pub fn is_image(categories: &[String]) -> bool {
    categories.iter().any(|c| c.eq_ignore_ascii_case(IMAGE_CATEGORY))
}

/// Whether a scored URL passes the link-score gate (§4.3 steps 3-4): image-category documents
/// always pass regardless of score.
pub fn passes_threshold(score: f64, threshold: f64, categories: &[String]) -> bool {
    is_image(categories) || score >= threshold
}

/// A decision to tombstone a `Request`: set its hide-after timestamp, possibly flip
/// `seo_enabled`, and record why.
#[derive(Debug, Clone, PartialEq)]
pub struct TombstoneDecision {
    pub tombstone_datetime: DateTime<Utc>,
    pub seo_enabled: bool,
    pub reason: String,
}

/// The tombstone applied to a below-threshold scrape (§4.3 step 4).
pub fn below_threshold_tombstone(now: DateTime<Utc>, period_low_score_days: i64) -> TombstoneDecision {
    TombstoneDecision {
        tombstone_datetime: now + Duration::days(period_low_score_days),
        seo_enabled: false,
        reason: "below link-score threshold".to_string(),
    }
}

/// The two-tier tombstone derived from a TextAnalyzer `quality_score` (§4.5). The tier durations
/// (7 days / 30 days) are fixed by spec, independent of the configured tombstone periods used
/// elsewhere. Returns `None` when the score is high enough that no tombstone applies (`s >= 0.35`).
pub fn quality_score_tombstone(quality_score: f64, now: DateTime<Utc>) -> Option<TombstoneDecision> {
    if quality_score < 0.25 {
        Some(TombstoneDecision {
            tombstone_datetime: now + Duration::days(7),
            seo_enabled: false,
            reason: format!("Low quality score: {quality_score}"),
        })
    } else if quality_score < 0.35 {
        Some(TombstoneDecision {
            tombstone_datetime: now + Duration::days(30),
            seo_enabled: true,
            reason: format!("Low quality score: {quality_score}"),
        })
    } else {
        None
    }
}

/// The auto-tombstone applied when `UpdateRequestTags` introduces a configured tombstone tag
/// (§4.7). Matching is case-sensitive; returns the first configured tag found in `new_tags`.
pub fn matching_auto_tombstone_tag<'a>(new_tags: &[String], configured: &'a [String]) -> Option<&'a str> {
    configured
        .iter()
        .find(|configured_tag| new_tags.iter().any(|t| t == *configured_tag))
        .map(|s| s.as_str())
}

pub fn auto_tombstone(now: DateTime<Utc>, period_tag_days: i64, matched_tag: &str) -> TombstoneDecision {
    TombstoneDecision {
        tombstone_datetime: now + Duration::days(period_tag_days),
        seo_enabled: false,
        reason: format!("auto-tombstone: {matched_tag} tag"),
    }
}

/// Should `ExtractLinksHandler` drop this discovered URL before enqueuing a child scrape (§4.4
/// step 2)? Keeps only `http(s)` links that aren't an obviously non-crawlable scheme or an image.
pub fn should_skip_url(raw_url: &str) -> bool {
    let Ok(parsed) = url::Url::parse(raw_url) else {
        return true;
    };

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return true;
    }
    if SKIPPED_SCHEMES.contains(&scheme) {
        return true;
    }

    let Some(mut segments) = parsed.path_segments() else {
        return false;
    };
    let Some(last) = segments.next_back() else {
        return false;
    };
    match last.rsplit_once('.') {
        Some((_, ext)) => IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// The registered-domain host of a URL, used as an automatic category tag (§4.3 step 7).
pub fn domain_of(raw_url: &str) -> Option<String> {
    url::Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_category_bypasses_threshold() {
        assert!(passes_threshold(0.0, 0.5, &["image".to_string()]));
        assert!(passes_threshold(0.0, 0.5, &["Image".to_string()]));
    }

    #[test]
    fn non_image_below_threshold_fails() {
        assert!(!passes_threshold(0.4, 0.5, &["article".to_string()]));
    }

    #[test]
    fn non_image_at_or_above_threshold_passes() {
        assert!(passes_threshold(0.5, 0.5, &["article".to_string()]));
        assert!(passes_threshold(0.6, 0.5, &[]));
    }

    #[test]
    fn quality_score_low_tier() {
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let decision = quality_score_tombstone(0.1, now).unwrap();
        assert_eq!(decision.tombstone_datetime, now + Duration::days(7));
        assert!(!decision.seo_enabled);
        assert_eq!(decision.reason, "Low quality score: 0.1");
    }

    #[test]
    fn quality_score_mid_tier() {
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        let decision = quality_score_tombstone(0.3, now).unwrap();
        assert_eq!(decision.tombstone_datetime, now + Duration::days(30));
        assert!(decision.seo_enabled);
    }

    #[test]
    fn quality_score_high_tier_no_tombstone() {
        let now: DateTime<Utc> = "2026-01-01T00:00:00Z".parse().unwrap();
        assert!(quality_score_tombstone(0.35, now).is_none());
        assert!(quality_score_tombstone(0.9, now).is_none());
    }

    #[test]
    fn auto_tombstone_tag_match_is_case_sensitive() {
        let configured = vec!["low-quality".to_string(), "sparse-content".to_string()];
        let new_tags = vec!["Low-Quality".to_string(), "other".to_string()];
        assert!(matching_auto_tombstone_tag(&new_tags, &configured).is_none());

        let new_tags = vec!["low-quality".to_string()];
        assert_eq!(
            matching_auto_tombstone_tag(&new_tags, &configured),
            Some("low-quality")
        );
    }

    #[test]
    fn should_skip_url_rejects_non_http_schemes() {
        assert!(should_skip_url("mailto:a@example.com"));
        assert!(should_skip_url("javascript:void(0)"));
        assert!(should_skip_url("ftp://example.com/file"));
        assert!(should_skip_url("not a url"));
    }

    #[test]
    fn should_skip_url_rejects_image_extensions() {
        assert!(should_skip_url("https://example.com/photo.PNG"));
        assert!(should_skip_url("https://example.com/img/cat.gif"));
    }

    #[test]
    fn should_skip_url_keeps_non_image_extensions_crawlable() {
        // .jpeg and .avif are deliberately absent from the bit-exact extension list (§8).
        assert!(!should_skip_url("https://example.com/img/cat.jpeg"));
        assert!(!should_skip_url("https://example.com/img/cat.avif"));
    }

    #[test]
    fn should_skip_url_keeps_plain_http_links() {
        assert!(!should_skip_url("https://example.com/article/1"));
        assert!(!should_skip_url("http://example.com/"));
    }

    #[test]
    fn domain_of_extracts_host() {
        assert_eq!(
            domain_of("https://sub.example.com/a/b"),
            Some("sub.example.com".to_string())
        );
        assert_eq!(domain_of("not a url"), None);
    }
}
