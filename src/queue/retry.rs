//! Deterministic retry back-off tables (§4.1, §4.5, §7).
//!
//! Both schedules are plain lookup tables rather than an exponential formula — the teacher's own
//! job queue had no retry back-off at all (it just unlocked and re-raced), so this is new, but
//! kept in the same "one small pure function" style as `domain::quality`.

use std::time::Duration;

/// The broker's general-purpose retry schedule (§4.1): `{1m, 5m, 15m, 30m, 1h, 2h, 4h, 8h}`,
/// capped at the last entry for any attempt beyond the table's length.
const BROKER_BACKOFF: &[Duration] = &[
    Duration::from_secs(60),
    Duration::from_secs(5 * 60),
    Duration::from_secs(15 * 60),
    Duration::from_secs(30 * 60),
    Duration::from_secs(60 * 60),
    Duration::from_secs(2 * 60 * 60),
    Duration::from_secs(4 * 60 * 60),
    Duration::from_secs(8 * 60 * 60),
];

/// `RetrieveAnalysisHandler`'s dedicated back-off schedule (§4.5): `{30s, 2m, 5m, 10m, 20m, 40m,
/// 1h, 2h, 4h, 8h}`, capped at 8h.
const ANALYSIS_RETRIEVAL_BACKOFF: &[Duration] = &[
    Duration::from_secs(30),
    Duration::from_secs(2 * 60),
    Duration::from_secs(5 * 60),
    Duration::from_secs(10 * 60),
    Duration::from_secs(20 * 60),
    Duration::from_secs(40 * 60),
    Duration::from_secs(60 * 60),
    Duration::from_secs(2 * 60 * 60),
    Duration::from_secs(4 * 60 * 60),
    Duration::from_secs(8 * 60 * 60),
];

fn delay_for(table: &[Duration], attempt: u32) -> Duration {
    let index = (attempt as usize).saturating_sub(1).min(table.len() - 1);
    table[index]
}

/// The delay before attempt number `attempt` (1-indexed) of a generically-retried broker task.
pub fn broker_retry_delay(attempt: u32) -> Duration {
    delay_for(BROKER_BACKOFF, attempt)
}

/// The delay before attempt number `attempt` (1-indexed) of `retrieve:analysis` polling.
pub fn analysis_retrieval_delay(attempt: u32) -> Duration {
    delay_for(ANALYSIS_RETRIEVAL_BACKOFF, attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_delay_climbs_the_table() {
        assert_eq!(broker_retry_delay(1), Duration::from_secs(60));
        assert_eq!(broker_retry_delay(4), Duration::from_secs(30 * 60));
        assert_eq!(broker_retry_delay(8), Duration::from_secs(8 * 60 * 60));
    }

    #[test]
    fn broker_delay_caps_at_last_entry() {
        assert_eq!(broker_retry_delay(20), Duration::from_secs(8 * 60 * 60));
    }

    #[test]
    fn broker_delay_treats_attempt_zero_as_first() {
        assert_eq!(broker_retry_delay(0), Duration::from_secs(60));
    }

    #[test]
    fn analysis_delay_starts_at_thirty_seconds() {
        assert_eq!(analysis_retrieval_delay(1), Duration::from_secs(30));
    }

    #[test]
    fn analysis_delay_caps_at_eight_hours() {
        assert_eq!(analysis_retrieval_delay(100), Duration::from_secs(8 * 60 * 60));
    }
}
