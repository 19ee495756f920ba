//! Configuration module for the orchestrator.
//!
//! This module handles loading and parsing configuration from environment variables
//! using the figment crate. It supports flexible duration parsing that accepts both
//! numeric values (interpreted as seconds) and duration strings with units.

use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Main application configuration containing all sub-configurations
#[derive(Deserialize)]
pub struct Config {
    /// Log level for the application
    ///
    /// This value is used to set the log level for this application's target specifically.
    /// e.g. "debug" would be similar to "warn,ingestor=debug,..."
    ///
    /// Valid values are: "trace", "debug", "info", "warn", "error"
    /// Defaults to "info" if not specified
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Database connection URL
    pub database_url: String,
    /// Number of workers polling the broker concurrently
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
    /// Graceful shutdown timeout duration
    ///
    /// Accepts both numeric values (seconds) and duration strings
    /// Defaults to 30 seconds if not specified
    #[serde(
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub shutdown_timeout: Duration,

    /// Base URL of the scraper/scoring service
    pub scraper_base_url: String,
    /// Base URL of the text-analyzer service
    pub analyzer_base_url: String,

    /// Minimum link score a scraped URL must clear to avoid the below-threshold tombstone path
    #[serde(default = "default_link_score_threshold")]
    pub link_score_threshold: f64,
    /// Maximum crawl depth; link extraction stops spawning children past this depth
    #[serde(default = "default_max_link_depth")]
    pub max_link_depth: i32,
    /// How long `retrieve:analysis` will keep polling before giving up (0 = unlimited)
    #[serde(
        default = "default_max_analysis_wait",
        deserialize_with = "deserialize_duration"
    )]
    pub max_analysis_wait: Duration,

    /// Tombstone periods configuration
    #[serde(default = "default_tombstone_periods")]
    pub tombstone_periods: TombstonePeriodsConfig,
    /// Tags that, when applied to a request, trigger an auto-tombstone
    #[serde(default = "default_tombstone_tags")]
    pub tombstone_tags: Vec<String>,
}

/// Default log level of "info"
fn default_log_level() -> String {
    "info".to_string()
}

/// Default worker concurrency of 4
fn default_worker_concurrency() -> usize {
    4
}

/// Default shutdown timeout of 30 seconds
fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Default link-score threshold
fn default_link_score_threshold() -> f64 {
    0.5
}

/// Default max link depth
fn default_max_link_depth() -> i32 {
    3
}

/// Default max analysis wait of 60 minutes
fn default_max_analysis_wait() -> Duration {
    Duration::from_secs(60 * 60)
}

/// Tombstone-period configuration, mirrored into `store::TombstonePeriods` at startup.
#[derive(Deserialize, Clone, Copy, Debug)]
pub struct TombstonePeriodsConfig {
    /// Days until a below-link-score-threshold Request is tombstoned
    #[serde(default = "default_low_score_days")]
    pub low_score_days: i64,
    /// Days until a tag-triggered auto-tombstone takes effect
    #[serde(default = "default_tag_days")]
    pub tag_days: i64,
    /// Days until a manually-tombstoned Request takes effect
    #[serde(default = "default_manual_days")]
    pub manual_days: i64,
}

fn default_tombstone_periods() -> TombstonePeriodsConfig {
    TombstonePeriodsConfig {
        low_score_days: default_low_score_days(),
        tag_days: default_tag_days(),
        manual_days: default_manual_days(),
    }
}

/// Default low-score tombstone period of 7 days
fn default_low_score_days() -> i64 {
    7
}

/// Default tag-triggered tombstone period of 90 days
fn default_tag_days() -> i64 {
    90
}

/// Default manual tombstone period of 30 days
fn default_manual_days() -> i64 {
    30
}

/// Default auto-tombstone tag set
fn default_tombstone_tags() -> Vec<String> {
    crate::domain::quality::DEFAULT_TOMBSTONE_TAGS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Duration parser configured to handle various time units with seconds as default
///
/// Supports:
/// - Seconds (s) - default unit
/// - Milliseconds (ms)
/// - Minutes (m)
/// - Hours (h)
///
/// Does not support fractions, exponents, or infinity values
/// Allows for whitespace between the number and the time unit
/// Allows for multiple time units to be specified (summed together, e.g "10s 2m" = 120 + 10 = 130 seconds)
const DURATION_PARSER: DurationParser<'static> = DurationParser::builder()
    .time_units(&[TimeUnit::Second, TimeUnit::MilliSecond, TimeUnit::Minute, TimeUnit::Hour])
    .parse_multiple(None)
    .allow_time_unit_delimiter()
    .disable_infinity()
    .disable_fraction()
    .disable_exponent()
    .default_unit(TimeUnit::Second)
    .build();

/// Custom deserializer for duration fields that accepts both numeric and string values
///
/// This deserializer handles the flexible duration parsing by accepting:
/// - Unsigned integers (interpreted as seconds)
/// - Signed integers (interpreted as seconds, must be non-negative)
/// - Strings (parsed using the fundu duration parser)
///
/// # Examples
///
/// - `1` -> 1 second
/// - `"30s"` -> 30 seconds
/// - `"2 m"` -> 2 minutes
/// - `"1500ms"` -> 15 seconds
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a duration string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            DURATION_PARSER.parse(value)
                .map_err(|e| {
                    serde::de::Error::custom(format!(
                        "Invalid duration format '{}': {}. Examples: '5' (5 seconds), '3500ms', '30s', '2m', '1.5h'",
                        value, e
                    ))
                })?
                .try_into()
                .map_err(|e| serde::de::Error::custom(format!("Duration conversion error: {}", e)))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Duration::from_secs(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value < 0 {
                return Err(serde::de::Error::custom("Duration cannot be negative"));
            }
            Ok(Duration::from_secs(value as u64))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}
